//! Storage seam between the service and a concrete backend.
//!
//! Every operation runs inside a [`UnitOfWork`]. Dropping a unit of work without calling
//! [`UnitOfWork::commit`] discards everything it wrote.

use std::{future::Future, pin::Pin};

use refman_domain::HeadValues;

use crate::{Result, models::EntryRow};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Head column a substring search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
	Title,
	Author,
	Publisher,
}

pub trait Store
where
	Self: Send + Sync,
{
	fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>>>;
}

pub trait UnitOfWork
where
	Self: Send,
{
	fn insert_entry<'a>(
		&'a mut self,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, Result<i64>>;

	/// Returns whether the entry exists. Holds it against concurrent writers until the unit of
	/// work ends.
	fn lock_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<bool>>;

	fn update_entry<'a>(
		&'a mut self,
		entry_id: i64,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, Result<bool>>;

	/// Deletes the entry row only. Keyword rows are left to the caller.
	fn delete_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<bool>>;

	/// Rows come back ordered by id. Unknown ids are skipped.
	fn get_entries<'a>(&'a mut self, entry_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<EntryRow>>>;

	fn get_all_entries(&mut self) -> BoxFuture<'_, Result<Vec<EntryRow>>>;

	fn list_entry_ids(&mut self) -> BoxFuture<'_, Result<Vec<i64>>>;

	/// Case-insensitive substring match.
	fn search_by_substring<'a>(
		&'a mut self,
		field: SearchField,
		needle: &'a str,
	) -> BoxFuture<'a, Result<Vec<i64>>>;

	fn list_keywords_by_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<Vec<String>>>;

	/// Sorted by byte order.
	fn list_distinct_keywords(&mut self) -> BoxFuture<'_, Result<Vec<String>>>;

	fn list_entry_ids_by_keyword<'a>(
		&'a mut self,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<Vec<i64>>>;

	/// Distinct entry ids referenced by keyword rows, live or not.
	fn list_keyword_entry_ids(&mut self) -> BoxFuture<'_, Result<Vec<i64>>>;

	/// Returns `false` when the pair already exists.
	fn insert_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<bool>>;

	fn update_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		from: &'a str,
		to: &'a str,
	) -> BoxFuture<'a, Result<u64>>;

	fn delete_keyword<'a>(&'a mut self, entry_id: i64, keyword: &'a str)
	-> BoxFuture<'a, Result<u64>>;

	fn delete_keywords_by_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<u64>>;

	/// Removes every entry and keyword row.
	fn clear(&mut self) -> BoxFuture<'_, Result<()>>;

	fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}
