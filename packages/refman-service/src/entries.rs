use futures::future;
use serde_json::{Map, Value};

use crate::{Error, RefmanService, Result, reconcile};
use refman_domain::{
	Field, FillMode, StoredEntry, WireRecord, from_storage_shape, merge_details,
	normalize::{DETAIL_ID_KEY, DETAIL_LABEL_KEY},
	to_storage_shape,
};

/// Result of one record of a batch create. `index` is the record's position in the submission.
#[derive(Debug)]
pub struct CreateOutcome {
	pub index: usize,
	pub result: Result<i64>,
}

impl RefmanService {
	pub async fn create_entry(&self, record: WireRecord) -> Result<i64> {
		let shape = to_storage_shape(record, FillMode::NullMissing);
		let head = shape.head.resolve(None);
		let mut uow = self.store.begin().await?;
		let entry_id = uow.insert_entry(&head, &shape.details).await?;
		let inserted = match shape.keywords.as_value() {
			Some(keywords) =>
				reconcile::reconcile_entry_keywords(&mut *uow, entry_id, keywords).await?,
			None => 0,
		};

		uow.commit().await?;

		tracing::info!(entry_id, keywords = inserted, "Entry created.");

		Ok(entry_id)
	}

	/// Creates every record in its own unit of work, all at once. A record that fails does not
	/// affect the others.
	pub async fn create_entries(&self, records: Vec<Value>) -> Vec<CreateOutcome> {
		let tasks = records.into_iter().enumerate().map(|(index, value)| async move {
			let result = match WireRecord::from_value(value) {
				Ok(record) => self.create_entry(record).await,
				Err(err) => Err(Error::InvalidRequest {
					message: format!("Record {index} is malformed: {err}."),
				}),
			};

			if let Err(err) = &result {
				tracing::warn!(index, error = %err, "Record was not created.");
			}

			CreateOutcome { index, result }
		});

		future::join_all(tasks).await
	}

	pub async fn get_entry(&self, entry_id: i64) -> Result<Map<String, Value>> {
		let mut uow = self.store.begin().await?;
		let row = uow
			.get_entries(&[entry_id])
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::entry_not_found(entry_id))?;

		Ok(from_storage_shape(StoredEntry::from(row)))
	}

	/// Records for the ids that exist, ordered by id.
	pub async fn get_entries(&self, entry_ids: &[i64]) -> Result<Vec<Map<String, Value>>> {
		let mut uow = self.store.begin().await?;
		let rows = uow.get_entries(entry_ids).await?;

		Ok(rows.into_iter().map(|row| from_storage_shape(row.into())).collect())
	}

	pub async fn dump(&self) -> Result<Vec<Map<String, Value>>> {
		let mut uow = self.store.begin().await?;
		let rows = uow.get_all_entries().await?;

		Ok(rows.into_iter().map(|row| from_storage_shape(row.into())).collect())
	}

	/// Replaces the whole entry. Head fields left out become null, details are replaced and the
	/// keyword set becomes exactly the submitted one.
	pub async fn overwrite_entry(&self, entry_id: i64, mut record: WireRecord) -> Result<()> {
		drop_echoed_id(&mut record, entry_id);

		let shape = to_storage_shape(record, FillMode::NullMissing);
		let head = shape.head.resolve(None);
		let keywords = shape.keywords.into_value().unwrap_or_default();
		let mut uow = self.store.begin().await?;

		if !uow.lock_entry(entry_id).await? {
			return Err(Error::entry_not_found(entry_id));
		}

		uow.update_entry(entry_id, &head, &shape.details).await?;

		let change = reconcile::replace_entry_keyword_set(&mut *uow, entry_id, &keywords).await?;

		uow.commit().await?;

		tracing::info!(
			entry_id,
			keywords_removed = change.removed,
			keywords_inserted = change.inserted,
			"Entry overwritten."
		);

		Ok(())
	}

	/// Applies the submitted fields over the stored entry. Missing head fields are kept, `null`
	/// clears them. Details are merged key by key with `null` deleting a key. Submitted keywords
	/// are added; `keywords: null` removes all of them.
	pub async fn patch_entry(&self, entry_id: i64, mut record: WireRecord) -> Result<()> {
		drop_echoed_id(&mut record, entry_id);

		let mut uow = self.store.begin().await?;

		if !uow.lock_entry(entry_id).await? {
			return Err(Error::entry_not_found(entry_id));
		}

		let current = uow
			.get_entries(&[entry_id])
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::entry_not_found(entry_id))?;

		keep_stored_label(&mut record, &current.details);

		let shape = to_storage_shape(record, FillMode::OmitMissing);
		let head = shape.head.resolve(Some(&current.head()));
		let details = merge_details(&current.details, &shape.details);

		uow.update_entry(entry_id, &head, &details).await?;

		match shape.keywords {
			Field::Absent => {},
			Field::Null => {
				reconcile::remove_all_keywords_for_entry(&mut *uow, entry_id).await?;
			},
			Field::Value(keywords) => {
				reconcile::reconcile_entry_keywords(&mut *uow, entry_id, &keywords).await?;
			},
		}

		uow.commit().await?;

		tracing::info!(entry_id, "Entry patched.");

		Ok(())
	}

	/// Deletes the entry together with its keywords.
	pub async fn delete_entry(&self, entry_id: i64) -> Result<()> {
		let mut uow = self.store.begin().await?;

		if !uow.lock_entry(entry_id).await? {
			return Err(Error::entry_not_found(entry_id));
		}

		let keywords = reconcile::remove_all_keywords_for_entry(&mut *uow, entry_id).await?;

		uow.delete_entry(entry_id).await?;
		uow.commit().await?;

		tracing::info!(entry_id, keywords, "Entry deleted.");

		Ok(())
	}

	/// Removes every entry and keyword.
	pub async fn clear(&self) -> Result<()> {
		let mut uow = self.store.begin().await?;

		uow.clear().await?;
		uow.commit().await?;

		tracing::info!("Store cleared.");

		Ok(())
	}
}

// A body that repeats the entry's own id is an echo of a fetched record, not a detail.
fn drop_echoed_id(record: &mut WireRecord, entry_id: i64) {
	if record.details.get(DETAIL_ID_KEY) == Some(&Value::from(entry_id)) {
		record.details.remove(DETAIL_ID_KEY);
	}
}

// An incoming `id` only seeds the label of an entry that has none.
fn keep_stored_label(record: &mut WireRecord, current_details: &str) {
	if record.details.contains_key(DETAIL_LABEL_KEY) {
		return;
	}

	let has_label = matches!(
		serde_json::from_str::<Value>(current_details),
		Ok(Value::Object(details)) if details.contains_key(DETAIL_LABEL_KEY)
	);

	if has_label {
		record.details.remove(DETAIL_ID_KEY);
	}
}
