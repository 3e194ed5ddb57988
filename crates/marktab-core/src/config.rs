//! User preferences and bookkeeping lifetimes

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Storage key of the background-open toggle.
pub const OPEN_IN_BACKGROUND_KEY: &str = "openInBackground";

/// Storage key of the close-empty-source toggle.
pub const CLOSE_EMPTY_SOURCE_TAB_KEY: &str = "closeEmptySourceTab";

/// User preferences read on every bookmark decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Open the new tab without focusing it
    pub open_in_background: bool,

    /// Close the source tab when it cannot go back and shows nothing
    pub close_empty_source_tab: bool,
}

/// How long bookkeeping entries stay valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlConfig {
    /// Window in which a tab counts as freshly created
    pub just_created: Duration,

    /// Window in which a handled navigation is not handled again
    pub ignore: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            just_created: Duration::from_millis(6000),
            ignore: Duration::from_millis(5000),
        }
    }
}
