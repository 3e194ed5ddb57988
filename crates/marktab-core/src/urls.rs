//! URL classification for source tabs and event filtering.

use url::Url;

/// Page a source tab is parked on when it cannot go back.
pub const BLANK_URL: &str = "about:blank";

const NEW_TAB_URLS: [&str; 2] = ["chrome://newtab/", "chrome://newtab"];

// Some platform builds serve the new tab page from here (e.g. local-ntp).
const SEARCH_SCHEME_PREFIX: &str = "chrome-search://";

/// Whether a tab showing `url` holds no user content worth keeping.
pub fn is_empty_like(url: &str) -> bool {
    url.is_empty()
        || url == BLANK_URL
        || NEW_TAB_URLS.contains(&url)
        || url.starts_with(SEARCH_SCHEME_PREFIX)
}

/// Scheme filter applied to navigation events before they are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationFilter {
    schemes: Vec<String>,
}

impl NavigationFilter {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
        }
    }

    /// Also deliver events for `scheme`.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        let scheme = scheme.into();
        if !self.schemes.contains(&scheme) {
            self.schemes.push(scheme);
        }
        self
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// Unparseable URLs never match.
    pub fn allows(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => self.schemes.iter().any(|s| s == parsed.scheme()),
            Err(_) => false,
        }
    }
}

impl Default for NavigationFilter {
    fn default() -> Self {
        Self::new(["http", "https"])
    }
}
