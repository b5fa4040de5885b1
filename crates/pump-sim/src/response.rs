//! Lag-based response models
//!
//! Outflow and power are linear combinations of the last three speed samples
//! and the signal's own last three outputs, scaled by the pump's efficiency.
//! Until a history window is full the models fall back to a noise-free
//! cold-start formula driven by the newest samples only.
//!
//! Index 0 is the oldest sample. Zero-weighted coefficients are kept so the
//! models can be retuned without changing their shape.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::history::LagWindow;

/// Warm outflow weights on speed history
pub const OUTFLOW_SPEED_WEIGHTS: [f64; 3] = [0.12, 0.20, 0.00];
/// Warm outflow weights on outflow history
pub const OUTFLOW_LAG_WEIGHTS: [f64; 3] = [0.12, 0.02, 0.00];
/// Cold outflow weight on the newest speed
pub const COLD_OUTFLOW_SPEED_WEIGHT: f64 = 0.35;
/// Cold outflow weight on the newest outflow
pub const COLD_OUTFLOW_LAG_WEIGHT: f64 = 0.085;

/// Weight on the squared oldest speed (warm) or newest speed (cold)
pub const POWER_SPEED_SQUARED_WEIGHT: f64 = 0.00004;
/// Warm power weights on the middle and newest speed
pub const POWER_SPEED_WEIGHTS: [f64; 2] = [0.00015, 0.00];
/// Warm power weights on power history
pub const POWER_LAG_WEIGHTS: [f64; 3] = [0.00005, 0.0001, 0.00];

/// Zero-mean Gaussian noise with standard deviation `sigma`
pub fn gaussian_noise<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * sigma
}

/// Next outflow sample from speed and outflow history
pub fn speed_to_outflow<R: Rng + ?Sized>(
    speed: &LagWindow,
    outflow: &LagWindow,
    efficiency: f64,
    sigma: f64,
    rng: &mut R,
) -> f64 {
    if speed.has_gap() {
        return efficiency
            * (COLD_OUTFLOW_SPEED_WEIGHT * speed.newest()
                + COLD_OUTFLOW_LAG_WEIGHT * outflow.newest());
    }

    let s = OUTFLOW_SPEED_WEIGHTS;
    let o = OUTFLOW_LAG_WEIGHTS;
    efficiency
        * (s[0] * speed[0]
            + s[1] * speed[1]
            + s[2] * speed[2]
            + o[0] * outflow[0]
            + o[1] * outflow[1]
            + o[2] * outflow[2])
        + gaussian_noise(rng, sigma)
}

/// Next power sample from speed and power history
pub fn speed_to_power<R: Rng + ?Sized>(
    speed: &LagWindow,
    power: &LagWindow,
    efficiency: f64,
    sigma: f64,
    rng: &mut R,
) -> f64 {
    if power.has_gap() {
        return efficiency * (POWER_SPEED_SQUARED_WEIGHT * speed.newest().powi(2));
    }

    let s = POWER_SPEED_WEIGHTS;
    let p = POWER_LAG_WEIGHTS;
    efficiency
        * (POWER_SPEED_SQUARED_WEIGHT * speed[0].powi(2)
            + s[0] * speed[1]
            + s[1] * speed[2]
            + p[0] * power[0]
            + p[1] * power[1]
            + p[2] * power[2])
        + gaussian_noise(rng, sigma)
}
