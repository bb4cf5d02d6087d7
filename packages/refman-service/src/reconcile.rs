//! Keyword reconciliation. Every function works inside a unit of work the caller owns; none of
//! them commits, so a failure part way through is discarded with the unit of work.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use refman_domain::{
	RenamePlan,
	keywords::{self, extraneous_keywords, missing_keywords},
};
use refman_storage::UnitOfWork;

/// Outcome of a global keyword rename.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameReport {
	/// Associations rewritten in place.
	pub updated: u64,
	/// Associations dropped because the entry already carried the target keyword.
	pub merged: u64,
}
impl RenameReport {
	pub fn is_noop(&self) -> bool {
		self.updated == 0 && self.merged == 0
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSetChange {
	pub removed: u64,
	pub inserted: u64,
}

/// Adds every keyword in `desired` the entry does not carry yet. Never removes anything.
///
/// Returns the number of associations inserted; zero means nothing was written.
pub async fn reconcile_entry_keywords<S>(
	uow: &mut dyn UnitOfWork,
	entry_id: i64,
	desired: &[S],
) -> Result<u64>
where
	S: AsRef<str> + Sync,
{
	if !uow.lock_entry(entry_id).await? {
		return Err(Error::entry_not_found(entry_id));
	}

	let desired = keywords::keyword_set(desired);

	if desired.is_empty() {
		return Ok(0);
	}

	let current = current_keywords(uow, entry_id).await?;
	let mut inserted = 0;

	for keyword in missing_keywords(&current, &desired) {
		if uow.insert_keyword(entry_id, &keyword).await? {
			inserted += 1;
		}
	}

	Ok(inserted)
}

pub async fn remove_all_keywords_for_entry(uow: &mut dyn UnitOfWork, entry_id: i64) -> Result<u64> {
	Ok(uow.delete_keywords_by_entry(entry_id).await?)
}

/// Removes the listed associations of one entry. Keywords the entry does not carry are skipped.
pub async fn remove_specific_keywords<S>(
	uow: &mut dyn UnitOfWork,
	entry_id: i64,
	listed: &[S],
) -> Result<u64>
where
	S: AsRef<str> + Sync,
{
	let mut removed = 0;

	for keyword in keywords::keyword_set(listed) {
		removed += uow.delete_keyword(entry_id, &keyword).await?;
	}

	Ok(removed)
}

/// Deletes every association whose entry no longer exists.
pub async fn prune_orphaned_keywords(uow: &mut dyn UnitOfWork) -> Result<u64> {
	let live: BTreeSet<i64> = uow.list_entry_ids().await?.into_iter().collect();
	let mut removed = 0;

	for entry_id in uow.list_keyword_entry_ids().await? {
		if live.contains(&entry_id) {
			continue;
		}

		removed += uow.delete_keywords_by_entry(entry_id).await?;
	}

	Ok(removed)
}

/// Renames `from` to `to` across every entry. Entries already tagged `to` lose their `from`
/// association instead of gaining a duplicate.
pub async fn rename_keyword_globally(
	uow: &mut dyn UnitOfWork,
	from: &str,
	to: &str,
) -> Result<RenameReport> {
	if from == to {
		return Ok(RenameReport::default());
	}

	let tagged_from = uow.list_entry_ids_by_keyword(from).await?;

	if tagged_from.is_empty() {
		return Ok(RenameReport::default());
	}

	let tagged_to = uow.list_entry_ids_by_keyword(to).await?;
	let plan = RenamePlan::new(&tagged_from, &tagged_to);
	let mut report = RenameReport::default();

	for entry_id in plan.merge {
		report.merged += uow.delete_keyword(entry_id, from).await?;
	}
	for entry_id in plan.update {
		report.updated += uow.update_keyword(entry_id, from, to).await?;
	}

	Ok(report)
}

/// Makes the entry's keyword set exactly `desired`.
pub async fn replace_entry_keyword_set<S>(
	uow: &mut dyn UnitOfWork,
	entry_id: i64,
	desired: &[S],
) -> Result<KeywordSetChange>
where
	S: AsRef<str> + Sync,
{
	if !uow.lock_entry(entry_id).await? {
		return Err(Error::entry_not_found(entry_id));
	}

	let desired_set = keywords::keyword_set(desired);
	let current = current_keywords(uow, entry_id).await?;
	let extraneous = extraneous_keywords(&current, &desired_set);
	let removed = remove_specific_keywords(uow, entry_id, &extraneous).await?;
	let inserted = reconcile_entry_keywords(uow, entry_id, desired).await?;

	Ok(KeywordSetChange { removed, inserted })
}

async fn current_keywords(uow: &mut dyn UnitOfWork, entry_id: i64) -> Result<BTreeSet<String>> {
	Ok(uow.list_keywords_by_entry(entry_id).await?.into_iter().collect())
}
