//! Process-local [`Store`]. Units of work are serialized behind one async mutex and write to a
//! staged copy that replaces the shared state on commit.

use std::{
	collections::{BTreeMap, BTreeSet},
	future,
	sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use refman_domain::HeadValues;

use crate::{
	Result,
	models::EntryRow,
	store::{BoxFuture, SearchField, Store, UnitOfWork},
};

#[derive(Clone, Default)]
pub struct MemoryStore {
	state: Arc<Mutex<MemoryState>>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}
impl Store for MemoryStore {
	fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>>> {
		let state = Arc::clone(&self.state);

		Box::pin(async move {
			let guard = state.lock_owned().await;
			let staged = (*guard).clone();

			Ok(Box::new(MemoryUnitOfWork { guard, staged }) as Box<dyn UnitOfWork>)
		})
	}
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
	last_id: i64,
	entries: BTreeMap<i64, MemoryEntry>,
	keywords: BTreeSet<(i64, String)>,
}
impl MemoryState {
	fn row(&self, entry_id: i64, entry: &MemoryEntry) -> EntryRow {
		let keywords = self
			.keywords
			.iter()
			.filter(|(id, _)| *id == entry_id)
			.map(|(_, keyword)| keyword.clone())
			.collect();

		EntryRow {
			entry_id,
			title: entry.head.title.clone(),
			author: entry.head.author.clone(),
			publisher: entry.head.publisher.clone(),
			url: entry.head.url.clone(),
			details: entry.details.clone(),
			keywords,
		}
	}
}

#[derive(Debug, Clone)]
struct MemoryEntry {
	head: HeadValues,
	details: String,
}

struct MemoryUnitOfWork {
	guard: OwnedMutexGuard<MemoryState>,
	staged: MemoryState,
}
impl UnitOfWork for MemoryUnitOfWork {
	fn insert_entry<'a>(
		&'a mut self,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, Result<i64>> {
		self.staged.last_id += 1;

		let entry_id = self.staged.last_id;

		self.staged
			.entries
			.insert(entry_id, MemoryEntry { head: head.clone(), details: details.to_string() });

		ready(Ok(entry_id))
	}

	fn lock_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<bool>> {
		let exists = self.staged.entries.contains_key(&entry_id);

		ready(Ok(exists))
	}

	fn update_entry<'a>(
		&'a mut self,
		entry_id: i64,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, Result<bool>> {
		let updated = match self.staged.entries.get_mut(&entry_id) {
			Some(entry) => {
				entry.head = head.clone();
				entry.details = details.to_string();

				true
			},
			None => false,
		};

		ready(Ok(updated))
	}

	fn delete_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<bool>> {
		let deleted = self.staged.entries.remove(&entry_id).is_some();

		ready(Ok(deleted))
	}

	fn get_entries<'a>(&'a mut self, entry_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<EntryRow>>> {
		let wanted: BTreeSet<i64> = entry_ids.iter().copied().collect();
		let rows = wanted
			.into_iter()
			.filter_map(|id| self.staged.entries.get(&id).map(|entry| self.staged.row(id, entry)))
			.collect();

		ready(Ok(rows))
	}

	fn get_all_entries(&mut self) -> BoxFuture<'_, Result<Vec<EntryRow>>> {
		let rows =
			self.staged.entries.iter().map(|(id, entry)| self.staged.row(*id, entry)).collect();

		ready(Ok(rows))
	}

	fn list_entry_ids(&mut self) -> BoxFuture<'_, Result<Vec<i64>>> {
		let ids = self.staged.entries.keys().copied().collect();

		ready(Ok(ids))
	}

	fn search_by_substring<'a>(
		&'a mut self,
		field: SearchField,
		needle: &'a str,
	) -> BoxFuture<'a, Result<Vec<i64>>> {
		let needle = needle.to_lowercase();
		let contains = |value: &Option<String>| {
			value.as_deref().map(|value| value.to_lowercase().contains(&needle)).unwrap_or(false)
		};
		let ids = self
			.staged
			.entries
			.iter()
			.filter(|(_, entry)| match field {
				SearchField::Title => contains(&entry.head.title),
				SearchField::Publisher => contains(&entry.head.publisher),
				SearchField::Author => entry
					.head
					.author
					.iter()
					.flatten()
					.any(|author| author.to_lowercase().contains(&needle)),
			})
			.map(|(id, _)| *id)
			.collect();

		ready(Ok(ids))
	}

	fn list_keywords_by_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<Vec<String>>> {
		let keywords = self
			.staged
			.keywords
			.iter()
			.filter(|(id, _)| *id == entry_id)
			.map(|(_, keyword)| keyword.clone())
			.collect();

		ready(Ok(keywords))
	}

	fn list_distinct_keywords(&mut self) -> BoxFuture<'_, Result<Vec<String>>> {
		let keywords: BTreeSet<String> =
			self.staged.keywords.iter().map(|(_, keyword)| keyword.clone()).collect();

		ready(Ok(keywords.into_iter().collect()))
	}

	fn list_entry_ids_by_keyword<'a>(
		&'a mut self,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<Vec<i64>>> {
		let ids = self
			.staged
			.keywords
			.iter()
			.filter(|(_, value)| value == keyword)
			.map(|(id, _)| *id)
			.collect();

		ready(Ok(ids))
	}

	fn list_keyword_entry_ids(&mut self) -> BoxFuture<'_, Result<Vec<i64>>> {
		let ids: BTreeSet<i64> = self.staged.keywords.iter().map(|(id, _)| *id).collect();

		ready(Ok(ids.into_iter().collect()))
	}

	fn insert_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<bool>> {
		let inserted = self.staged.keywords.insert((entry_id, keyword.to_string()));

		ready(Ok(inserted))
	}

	fn update_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		from: &'a str,
		to: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		let result = if !self.staged.keywords.contains(&(entry_id, from.to_string())) {
			Ok(0)
		} else if from != to && self.staged.keywords.contains(&(entry_id, to.to_string())) {
			Err(crate::Error::Conflict(format!("Entry {entry_id} is already tagged {to:?}.")))
		} else {
			self.staged.keywords.remove(&(entry_id, from.to_string()));
			self.staged.keywords.insert((entry_id, to.to_string()));

			Ok(1)
		};

		ready(result)
	}

	fn delete_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		let removed = self.staged.keywords.remove(&(entry_id, keyword.to_string()));

		ready(Ok(u64::from(removed)))
	}

	fn delete_keywords_by_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<u64>> {
		let before = self.staged.keywords.len();

		self.staged.keywords.retain(|(id, _)| *id != entry_id);

		let removed = (before - self.staged.keywords.len()) as u64;

		ready(Ok(removed))
	}

	fn clear(&mut self) -> BoxFuture<'_, Result<()>> {
		self.staged.entries.clear();
		self.staged.keywords.clear();

		ready(Ok(()))
	}

	fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		let Self { mut guard, staged } = *self;

		*guard = staged;

		ready(Ok(()))
	}
}

fn ready<'a, T>(value: Result<T>) -> BoxFuture<'a, Result<T>>
where
	T: Send + 'a,
{
	Box::pin(future::ready(value))
}
