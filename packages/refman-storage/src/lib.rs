pub mod db;
pub mod memory;
pub mod models;
pub mod schema;
pub mod store;

mod error;

pub use error::Error;
pub use memory::MemoryStore;
pub use store::{BoxFuture, SearchField, Store, UnitOfWork};

use std::sync::Arc;

use refman_config::StorageBackend;

use crate::db::Db;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Opens the configured backend. Postgres stores get their schema bootstrapped first.
pub async fn open(cfg: &refman_config::Storage) -> Result<Arc<dyn Store>> {
	match cfg.backend {
		StorageBackend::Postgres => {
			let postgres = cfg.postgres.as_ref().ok_or_else(|| {
				Error::InvalidArgument(
					"storage.postgres is required when storage.backend is postgres.".to_string(),
				)
			})?;
			let db = Db::connect(postgres).await?;

			db.ensure_schema().await?;

			tracing::info!(pool_max_conns = postgres.pool_max_conns, "Postgres store ready.");

			Ok(Arc::new(db))
		},
		StorageBackend::Memory => {
			tracing::warn!("Using the in-memory store. Content is lost on exit.");

			Ok(Arc::new(MemoryStore::new()))
		},
	}
}
