use refman_domain::{HeadValues, StoredEntry};

/// An `entries` row joined with its aggregated keywords.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EntryRow {
	pub entry_id: i64,
	pub title: Option<String>,
	pub author: Option<Vec<String>>,
	pub publisher: Option<String>,
	pub url: Option<String>,
	pub details: String,
	pub keywords: Vec<String>,
}
impl EntryRow {
	pub fn head(&self) -> HeadValues {
		HeadValues {
			title: self.title.clone(),
			author: self.author.clone(),
			publisher: self.publisher.clone(),
			url: self.url.clone(),
		}
	}
}
impl From<EntryRow> for StoredEntry {
	fn from(row: EntryRow) -> Self {
		Self {
			entry_id: row.entry_id,
			head: HeadValues {
				title: row.title,
				author: row.author,
				publisher: row.publisher,
				url: row.url,
			},
			details: row.details,
			keywords: row.keywords,
		}
	}
}
