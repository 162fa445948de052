pub fn mse_loss(pred: &[f32], target: &[f32]) -> (f32, Vec<f32>) {
    let mut loss = 0.0;
    let mut grad = Vec::with_capacity(pred.len());
    let len = pred.len().max(1) as f32;
    for (p, t) in pred.iter().zip(target) {
        let diff = p - t;
        loss += diff * diff;
        grad.push(2.0 * diff / len);
    }
    (loss / len, grad)
}

/// Huber loss with beta = 1, averaged over elements.
pub fn smooth_l1_loss(pred: &[f32], target: &[f32]) -> (f32, Vec<f32>) {
    let mut loss = 0.0;
    let mut grad = Vec::with_capacity(pred.len());
    let len = pred.len().max(1) as f32;
    for (p, t) in pred.iter().zip(target) {
        let diff = p - t;
        if diff.abs() < 1.0 {
            loss += 0.5 * diff * diff;
            grad.push(diff / len);
        } else {
            loss += diff.abs() - 0.5;
            grad.push(diff.signum() / len);
        }
    }
    (loss / len, grad)
}
