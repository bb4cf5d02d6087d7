pub mod entries;
pub mod keywords;
pub mod metadata;
pub mod reconcile;
pub mod search;

mod error;

pub use entries::CreateOutcome;
pub use error::{Error, Result};
pub use keywords::KeywordRemoval;
pub use metadata::{HttpFetcher, MetadataService, Page, PageFetcher, PageMetadata};
pub use reconcile::{KeywordSetChange, RenameReport};
pub use search::SearchRequest;

use std::sync::Arc;

use refman_storage::Store;

/// Entry and keyword operations over a shared [`Store`]. Each public call runs in exactly one
/// unit of work.
#[derive(Clone)]
pub struct RefmanService {
	pub store: Arc<dyn Store>,
}
impl RefmanService {
	pub fn new(store: Arc<dyn Store>) -> Self {
		Self { store }
	}
}
