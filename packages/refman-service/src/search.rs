use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, RefmanService, Result};
use refman_storage::SearchField;

/// Search criteria. Every populated criterion contributes matches; the result is their union.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
	/// Entries tagged with any of these keywords.
	#[serde(default)]
	pub keywords: Vec<String>,
	/// Substring of an author or of the publisher.
	pub author: Option<String>,
	/// Substring of the title.
	pub title: Option<String>,
}

impl RefmanService {
	/// Matching entry ids, deduplicated, in the order the criteria first produced them: keyword
	/// hits, then author and publisher hits, then title hits.
	pub async fn search(&self, req: SearchRequest) -> Result<Vec<i64>> {
		let mut keywords = Vec::new();

		for keyword in req.keywords.iter().map(|keyword| keyword.trim()) {
			if !keyword.is_empty() && !keywords.contains(&keyword) {
				keywords.push(keyword);
			}
		}

		let author = non_empty(req.author.as_deref());
		let title = non_empty(req.title.as_deref());

		if keywords.is_empty() && author.is_none() && title.is_none() {
			return Err(Error::InvalidRequest { message: "No search query submitted.".to_string() });
		}

		let mut uow = self.store.begin().await?;
		let mut hits = Hits::default();

		for keyword in &keywords {
			hits.extend(uow.list_entry_ids_by_keyword(keyword).await?);
		}

		if let Some(author) = author {
			hits.extend(uow.search_by_substring(SearchField::Author, author).await?);
			hits.extend(uow.search_by_substring(SearchField::Publisher, author).await?);
		}
		if let Some(title) = title {
			hits.extend(uow.search_by_substring(SearchField::Title, title).await?);
		}

		tracing::debug!(
			keywords = keywords.len(),
			author = author.is_some(),
			title = title.is_some(),
			hits = hits.ids.len(),
			"Search completed."
		);

		Ok(hits.ids)
	}
}

#[derive(Default)]
struct Hits {
	seen: HashSet<i64>,
	ids: Vec<i64>,
}
impl Hits {
	fn extend(&mut self, ids: Vec<i64>) {
		for id in ids {
			if self.seen.insert(id) {
				self.ids.push(id);
			}
		}
	}
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}
