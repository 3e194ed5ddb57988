//! Persisted bookkeeping for the MarkTab background.
//!
//! The host may unload the background between events, so nothing here keeps
//! state in memory: every read goes back to a [`StorageArea`] and every
//! mutation is a full read-modify-write of one stored map.

pub mod expiring;
pub mod prefs;
pub mod session;
pub mod storage;
pub mod tracker;

pub use expiring::ExpiringMap;
pub use prefs::PreferenceStore;
pub use session::{SessionState, IGNORE_MAP_KEY, JUST_CREATED_KEY};
pub use storage::{JsonFileArea, MemoryArea, SharedArea, StorageArea};
pub use tracker::TabLifecycleTracker;
