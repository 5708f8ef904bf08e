use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::currency::RateBook;

/// Default refresh period: six hours.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Start the exchange-rate refresher.
///
/// Rates are refreshed once immediately and then every `interval`.
/// Returns a CancellationToken that stops the loop when cancelled.
pub fn start(book: Arc<RateBook>, interval: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        info!("currency refresher started (interval={interval:?})");
        book.refresh().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("currency refresher stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    book.refresh().await;
                }
            }
        }
    });

    cancel
}
