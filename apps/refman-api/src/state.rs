use std::sync::Arc;

use refman_service::{HttpFetcher, MetadataService, PageFetcher, RefmanService};
use refman_storage::Store;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RefmanService>,
	pub metadata: Arc<MetadataService>,
}
impl AppState {
	pub async fn new(config: &refman_config::Config) -> color_eyre::Result<Self> {
		let store = refman_storage::open(&config.storage).await?;
		let fetcher = HttpFetcher::new(&config.metadata)?;

		Ok(Self::from_parts(store, Arc::new(fetcher)))
	}

	pub fn from_parts(store: Arc<dyn Store>, fetcher: Arc<dyn PageFetcher>) -> Self {
		Self {
			service: Arc::new(RefmanService::new(store)),
			metadata: Arc::new(MetadataService::new(fetcher)),
		}
	}
}
