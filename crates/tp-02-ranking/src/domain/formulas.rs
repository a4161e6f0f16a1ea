//! Score, hot and controversy formulas.
//!
//! All three must stay bit-identical across deployments: listings built by
//! an old and a new worker are merged during rollout, and any divergence
//! reorders content. Only `f64` arithmetic, base-10 `log10`, `powf` and
//! round-half-away-from-zero are used.

use shared_types::Timestamp;

/// Reference epoch for hot ranking, in seconds. Changing it reorders every
/// historical listing.
pub const HOT_EPOCH_SECONDS: f64 = 1_134_028_003.0;

/// Seconds of age that weigh as much as one order of magnitude of score.
pub const HOT_DECAY_SECONDS: f64 = 45_000.0;

/// Decimal places kept by [`hot`].
pub const HOT_PRECISION: i32 = 7;

/// Net score.
#[must_use]
pub fn score(ups: u64, downs: u64) -> i64 {
    ups as i64 - downs as i64
}

/// Milliseconds since the Unix epoch as fractional seconds.
#[must_use]
pub fn epoch_seconds(ts: Timestamp) -> f64 {
    ts as f64 / 1000.0
}

/// Round half away from zero to `places` decimals.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Hot rank from vote counts and creation time.
///
/// `sign(s) * log10(max(|s|, 1)) + (created - EPOCH) / 45000`, rounded to
/// seven places.
#[must_use]
pub fn hot(ups: u64, downs: u64, created_at: Timestamp) -> f64 {
    hot_at_seconds(ups, downs, epoch_seconds(created_at))
}

/// [`hot`] with the creation time already in seconds.
#[must_use]
pub fn hot_at_seconds(ups: u64, downs: u64, created_secs: f64) -> f64 {
    let s = score(ups, downs);
    let order = (s.unsigned_abs().max(1) as f64).log10();
    let sign = match s {
        s if s > 0 => 1.0,
        s if s < 0 => -1.0,
        _ => 0.0,
    };
    let seconds = created_secs - HOT_EPOCH_SECONDS;
    round_to(sign * order + seconds / HOT_DECAY_SECONDS, HOT_PRECISION)
}

/// Controversy: high volume with a near-even split.
///
/// `0` when either side is zero, otherwise `(ups + downs) ^ (min / max)`.
#[must_use]
pub fn controversy(ups: u64, downs: u64) -> f64 {
    if ups == 0 || downs == 0 {
        return 0.0;
    }
    let magnitude = (ups + downs) as f64;
    let balance = if ups > downs {
        downs as f64 / ups as f64
    } else {
        ups as f64 / downs as f64
    };
    magnitude.powf(balance)
}
