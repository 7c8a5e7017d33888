use std::sync::Arc;

use sii_db::Database;

use crate::error::ApiError;

/// Run a blocking store call off the async runtime. Any failure becomes an
/// [`ApiError::Store`] carrying `message` for the client.
pub(crate) async fn run<F, T>(db: &Arc<Database>, message: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| ApiError::store(message, anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(|e| ApiError::store(message, e))
}
