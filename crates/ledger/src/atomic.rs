use taskripple_storage::LedgerStorage;
use tracing::warn;

use crate::error::LedgerError;

/// Commit `snapshot` if `outcome` succeeded, abort it otherwise.
///
/// Every write path opens one snapshot, does all of its reads and writes
/// through it, and hands the result here. A failed commit is reported as
/// the operation's error.
pub(crate) async fn settle<S: LedgerStorage, T>(
    storage: &S,
    snapshot: S::Snapshot,
    operation: &'static str,
    outcome: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match outcome {
        Ok(value) => {
            storage.commit_snapshot(snapshot).await?;
            Ok(value)
        }
        Err(e) => {
            warn!(operation, error = %e, "aborting snapshot");
            let _ = storage.abort_snapshot(snapshot).await;
            Err(e)
        }
    }
}
