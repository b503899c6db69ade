//! Population statistics over `f64` samples.
//!
//! Both functions shift by the first sample before accumulating, which keeps
//! them exact for constant input: the mean of identical values is that value
//! and their standard deviation is exactly zero.

pub fn mean(values: &[f64]) -> Option<f64> {
    let (&shift, _) = values.split_first()?;
    let offset: f64 = values.iter().map(|v| v - shift).sum::<f64>() / values.len() as f64;
    Some(shift + offset)
}

/// Population (divide by n) standard deviation.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let d = v - mu;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}
