//! # TP-07 Queue Supervisor
//!
//! Owns one consumer pool per logical queue and keeps it at its configured
//! size.
//!
//! ## Pool lifecycle
//!
//! ```text
//!            consumers = 0                 resize(n > 0)
//!   ┌──────────┐ ◄──────────────── ┌─────────┐ ◄──────────── ┌──────────┐
//!   │ Disabled │ ────────────────► │ Running │               │ Backoff  │
//!   └──────────┘   resize(n > 0)   └─────────┘ ────────────► └──────────┘
//!                                       ▲     queue unavailable    │
//!                                       └──── depth check passes ──┘
//! ```
//!
//! A consumer that loses the queue ends with `QueueUnavailable`. The pool
//! then stops its remaining consumers, sleeps for an exponential, jittered
//! delay and checks the queue before starting a new generation. Nothing
//! above the pool ever sees the failure: other queues keep running and the
//! process stays up.
//!
//! ## Backpressure
//!
//! A monitor samples every queue's depth. Crossing the high-water mark
//! engages the queue's [`BackpressureSignal`]; it clears only once depth
//! falls back to the low-water mark. Producers watch the signal through
//! [`QueueSupervisor::backpressure`].

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::QueueSupervisorApi;
pub use service::{QueueSupervisor, SupervisorDependencies};
