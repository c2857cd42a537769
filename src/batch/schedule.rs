//! Inter-item pacing delay calculation.

use rand::Rng;

/// Uniform in `[min, max]`; with `jitter`, adds ±20% multiplicative noise,
/// then rounds to the nearest millisecond.
pub fn delay_ms(min: u64, max: u64, jitter: bool) -> u64 {
    let mut rng = rand::rng();
    let base = if max > min {
        rng.random_range(min..=max)
    } else {
        min
    };

    if !jitter {
        return base;
    }

    let noise_range = (base as f64) * 0.2;
    let noise = rng.random_range(-noise_range..=noise_range);
    (base as f64 + noise).round().max(0.0) as u64
}
