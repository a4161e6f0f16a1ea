//! Confidence ("best") sort.
//!
//! Lower bound of the Wilson score interval at 80% confidence. Items with
//! few votes are pulled toward zero until enough votes back their ratio.
//! Small vote counts dominate real traffic, so values for
//! `ups < 400, downs < 100` are computed once into a lookup table.

use lazy_static::lazy_static;

/// z-score for an 80% confidence interval.
pub const CONFIDENCE_Z: f64 = 1.281_551_565_545;

const UP_RANGE: u64 = 400;
const DOWN_RANGE: u64 = 100;

lazy_static! {
    static ref CONFIDENCES: Vec<f64> = {
        let mut table = Vec::with_capacity((UP_RANGE * DOWN_RANGE) as usize);
        for ups in 0..UP_RANGE {
            for downs in 0..DOWN_RANGE {
                table.push(wilson_lower_bound(ups, downs));
            }
        }
        table
    };
}

/// Wilson lower bound, computed directly.
#[must_use]
pub fn wilson_lower_bound(ups: u64, downs: u64) -> f64 {
    let n = (ups + downs) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let z = CONFIDENCE_Z;
    let p = ups as f64 / n;
    let left = p + 1.0 / (2.0 * n) * z * z;
    let right = z * (p * (1.0 - p) / n + z * z / (4.0 * n * n)).sqrt();
    let under = 1.0 + 1.0 / n * z * z;
    (left - right) / under
}

/// Confidence sort value, served from the table when in range.
#[must_use]
pub fn confidence(ups: u64, downs: u64) -> f64 {
    if ups + downs == 0 {
        0.0
    } else if ups < UP_RANGE && downs < DOWN_RANGE {
        CONFIDENCES[(downs + ups * DOWN_RANGE) as usize]
    } else {
        wilson_lower_bound(ups, downs)
    }
}
