//! Cancellable pacing sleeps

use common::Range;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sleep a random duration drawn from `range` (seconds).
///
/// Returns `false` if the run was cancelled before or during the pause; the
/// caller stops at that boundary.
pub async fn pause(range: Range, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    let delay = range.sample_duration();
    if delay.is_zero() {
        return true;
    }
    debug!(secs = delay.as_secs(), "pausing");
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
