//! MarkTab Core Library
//!
//! This crate provides shared types, errors, and configuration for MarkTab.

pub mod config;
pub mod error;
pub mod types;
pub mod urls;

pub use config::{Preferences, TtlConfig};
pub use error::{HostError, MarkTabError, MarkTabResult};
pub use types::{CreateProperties, FrameId, NavigationCommitted, TabId, TabInfo, TransitionType};
pub use urls::{is_empty_like, NavigationFilter, BLANK_URL};
