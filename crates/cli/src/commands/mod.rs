//! Subcommand implementations. Each `cmd_*` function runs one operation
//! against the platform and prints its result in the requested format.

pub(crate) mod account;
pub(crate) mod admin;
pub(crate) mod tasks;

use std::path::Path;

use serde::Serialize;
use taskripple_ledger::storage::{CollectionStorage, JsonFileStore};
use taskripple_ledger::{Actor, LedgerConfig, LedgerError, Platform};

use crate::OutputFormat;

pub(crate) type Store = CollectionStorage<JsonFileStore>;
pub(crate) type LedgerPlatform = Platform<Store>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("this command acts on an account; pass --as <account-id>")]
    MissingIdentity,

    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl CliError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            CliError::Ledger(e) => e.code(),
            CliError::MissingIdentity => "missing_identity",
            CliError::Render(_) => "render",
            CliError::Server(_) => "server",
        }
    }
}

/// Load the ledger config and open the JSON store under `data_dir`.
pub(crate) async fn open_platform(
    data_dir: &Path,
    config: Option<&Path>,
) -> Result<LedgerPlatform, CliError> {
    let config = LedgerConfig::load(config)?;
    let store = JsonFileStore::open(data_dir)
        .await
        .map_err(LedgerError::from)?;
    let storage = CollectionStorage::open(store)
        .await
        .map_err(LedgerError::from)?;
    Ok(Platform::new(storage, config))
}

/// One CLI invocation: the opened platform, who is acting, and how to print.
pub(crate) struct Session {
    pub(crate) platform: LedgerPlatform,
    as_account: Option<String>,
    output: OutputFormat,
}

impl Session {
    pub(crate) fn new(
        platform: LedgerPlatform,
        as_account: Option<String>,
        output: OutputFormat,
    ) -> Self {
        Self {
            platform,
            as_account,
            output,
        }
    }

    /// The account named by `--as`, with its role read from the store.
    pub(crate) async fn actor(&self) -> Result<Actor, CliError> {
        let id = self
            .as_account
            .as_deref()
            .ok_or(CliError::MissingIdentity)?;
        Ok(self.platform.actor(id).await?)
    }

    /// Print `value` as JSON, or the text rendering produced by `text`.
    pub(crate) fn emit<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce() -> String,
    ) -> Result<(), CliError> {
        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => {
                let rendered = text();
                if !rendered.is_empty() {
                    println!("{}", rendered);
                }
            }
        }
        Ok(())
    }
}

/// Join rendered rows, or a placeholder when there are none.
pub(crate) fn lines<T>(items: &[T], empty: &str, render: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(render).collect::<Vec<_>>().join("\n")
}
