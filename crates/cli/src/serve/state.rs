//! Application state shared across request handlers.

use crate::commands::LedgerPlatform;

pub(crate) struct AppState {
    pub(crate) platform: LedgerPlatform,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
}
