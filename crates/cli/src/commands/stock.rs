//! Variant stock cache commands.
//!
//! ```bash
//! tl-cli stock refresh            # every variant
//! tl-cli stock refresh --item 12  # one product
//! ```

use thiserror::Error;

use threadline_core::ItemId;
use threadline_core::db::RepositoryError;
use threadline_core::db::ledger::{refresh_all_stock, refresh_item_stock};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Recompute cached variant stock from the storage lots.
///
/// # Errors
///
/// Returns `StockError` if the database is unreachable or the update fails.
pub async fn refresh(item: Option<i32>) -> Result<u64, StockError> {
    let pool = connect().await?;

    let refreshed = match item.map(ItemId::new) {
        Some(item_id) => {
            let n = refresh_item_stock(&pool, item_id).await?;
            tracing::info!(item_id = %item_id, variants_refreshed = n, "Variant stock refreshed");
            n
        }
        None => {
            let n = refresh_all_stock(&pool).await?;
            tracing::info!(variants_refreshed = n, "All variant stock refreshed");
            n
        }
    };

    Ok(refreshed)
}
