//! Minimal dense-network building blocks with hand-written gradients.
pub mod activation;
pub mod linear;
pub mod loss;
pub mod optim;
