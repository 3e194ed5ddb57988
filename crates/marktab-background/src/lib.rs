//! Background service of MarkTab.
//!
//! Reacts to host tab and navigation events. A bookmark activated in an
//! existing tab is reopened in a new tab, and the source tab goes back to
//! the page it showed before.

pub mod host;
pub mod interceptor;
pub mod prefs;
pub mod service;
pub mod sim;

pub use host::TabsApi;
pub use interceptor::{
    dedup_key, InterceptOutcome, NavigationInterceptor, SkipReason, SourceDisposition,
};
pub use prefs::PreferenceProvider;
pub use service::{BackgroundBuilder, BackgroundService, HostEvent};
pub use sim::{HostCall, SimBrowser};
