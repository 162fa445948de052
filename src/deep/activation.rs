pub fn tanh(input: &[f32]) -> Vec<f32> {
    input.iter().map(|x| x.tanh()).collect()
}

/// Backward through `tanh` given its forward output.
pub fn tanh_backward(output: &[f32], grad_output: &[f32]) -> Vec<f32> {
    output
        .iter()
        .zip(grad_output.iter())
        .map(|(&y, &g)| g * (1.0 - y * y))
        .collect()
}
