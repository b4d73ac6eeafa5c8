use argminmax::ArgMinMax;
use std::f64;

/// `steps` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (steps - 1) as f64;
            (0..steps).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// Index of the largest value.
#[inline]
pub(crate) fn argmax(vec: &[f64]) -> usize {
    if vec.is_empty() {
        return 0;
    }
    vec.argmax()
}

/// Simple trailing moving average. `None` until `window` samples are available.
/// Each window is summed directly so equal inputs always give bit-identical averages.
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; data.len()];
    }

    (0..data.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let slice = &data[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

/// Mean and standard deviation with `ddof` delta degrees of freedom
/// (0 = population, 1 = sample). Std is 0.0 when there are not enough samples.
#[inline]
pub fn mean_and_stddev(data: &[f64], ddof: usize) -> (f64, f64) {
    let count = data.len();
    if count == 0 {
        return (0.0, 0.0);
    }

    let sum: f64 = data.iter().sum();
    let mean = sum / count as f64;

    if count <= ddof {
        return (mean, 0.0);
    }

    let variance: f64 = data
        .iter()
        .map(|value| {
            let diff = mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / (count - ddof) as f64;

    (mean, variance.sqrt())
}
