//! # TP-02 Ranking Engine
//!
//! Pure functions that turn vote counts and item age into sort keys.
//!
//! ## Formulas
//!
//! | Value | Definition |
//! |-------|------------|
//! | `score` | `ups - downs` |
//! | `hot` | `sign(s) * log10(max(abs(s), 1)) + (created_secs - 1134028003) / 45000`, 7 places, half away from zero |
//! | `controversy` | `0` if a side is zero, else `(ups + downs) ^ (min / max)` |
//! | `confidence` | Wilson lower bound, z = 1.281551565545 |
//! | `qa` | `confidence(q) + confidence(best answer) + log10(len(q) + len(answer)) / 5` |
//!
//! ## Determinism
//!
//! Output must be bit-identical for identical input on every worker: listings
//! built by different worker versions are merged during rollout. Only `f64`
//! arithmetic, `log10`, `powf` and `f64::round` are used, never fused or
//! platform-dependent shortcuts.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): formula functions
//! - **Ports Layer** (`ports/`): `RankingApi`
//! - **Service Layer** (`service/`): `RankingEngine`

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::RankingApi;
pub use service::RankingEngine;
