//! # MarkTab Common
//!
//! Utilities shared by the MarkTab crates.
//!
//! ## Features
//!
//! - Logging configuration and setup
//! - Wall clock abstraction with a manual clock for tests
//! - Best-effort combinators for cleanup calls whose failure is ignored

pub mod best_effort;
pub mod clock;
pub mod logging;

pub use best_effort::{attempt, BestEffort};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use logging::{init_logging, LogConfig, LogFormat};
