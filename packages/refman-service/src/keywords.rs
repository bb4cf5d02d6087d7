use crate::{Error, KeywordSetChange, RefmanService, RenameReport, Result, reconcile};
use refman_domain::keywords::keyword_set;

/// Which associations of one entry to remove.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeywordRemoval {
	All,
	Only(Vec<String>),
}

impl RefmanService {
	/// Every keyword in use, in byte order.
	pub async fn list_keywords(&self) -> Result<Vec<String>> {
		let mut uow = self.store.begin().await?;

		Ok(uow.list_distinct_keywords().await?)
	}

	pub async fn entry_keywords(&self, entry_id: i64) -> Result<Vec<String>> {
		let mut uow = self.store.begin().await?;

		if !uow.lock_entry(entry_id).await? {
			return Err(Error::entry_not_found(entry_id));
		}

		Ok(uow.list_keywords_by_entry(entry_id).await?)
	}

	/// Tags the entry with every given keyword it does not carry yet. Returns how many were added.
	pub async fn add_entry_keywords(&self, entry_id: i64, keywords: &[String]) -> Result<u64> {
		if keyword_set(keywords).is_empty() {
			return Err(Error::InvalidRequest {
				message: "No usable keywords received.".to_string(),
			});
		}

		let mut uow = self.store.begin().await?;
		let inserted = reconcile::reconcile_entry_keywords(&mut *uow, entry_id, keywords).await?;

		uow.commit().await?;

		tracing::info!(entry_id, inserted, "Entry keywords reconciled.");

		Ok(inserted)
	}

	pub async fn replace_entry_keywords(
		&self,
		entry_id: i64,
		keywords: &[String],
	) -> Result<KeywordSetChange> {
		let mut uow = self.store.begin().await?;
		let change = reconcile::replace_entry_keyword_set(&mut *uow, entry_id, keywords).await?;

		uow.commit().await?;

		tracing::info!(
			entry_id,
			removed = change.removed,
			inserted = change.inserted,
			"Entry keywords replaced."
		);

		Ok(change)
	}

	pub async fn remove_entry_keywords(
		&self,
		entry_id: i64,
		removal: KeywordRemoval,
	) -> Result<u64> {
		if let KeywordRemoval::Only(keywords) = &removal
			&& keyword_set(keywords).is_empty()
		{
			return Err(Error::InvalidRequest { message: "No keywords received.".to_string() });
		}

		let mut uow = self.store.begin().await?;

		if !uow.lock_entry(entry_id).await? {
			return Err(Error::entry_not_found(entry_id));
		}

		let removed = match &removal {
			KeywordRemoval::All =>
				reconcile::remove_all_keywords_for_entry(&mut *uow, entry_id).await?,
			KeywordRemoval::Only(keywords) =>
				reconcile::remove_specific_keywords(&mut *uow, entry_id, keywords).await?,
		};

		uow.commit().await?;

		tracing::info!(entry_id, removed, "Entry keywords removed.");

		Ok(removed)
	}

	/// Deletes keyword associations left behind by entries that no longer exist.
	pub async fn prune_keywords(&self) -> Result<u64> {
		let mut uow = self.store.begin().await?;
		let removed = reconcile::prune_orphaned_keywords(&mut *uow).await?;

		uow.commit().await?;

		tracing::info!(removed, "Orphaned keywords pruned.");

		Ok(removed)
	}

	pub async fn rename_keyword(&self, from: &str, to: &str) -> Result<RenameReport> {
		let from = from.trim();
		let to = to.trim();

		if from.is_empty() || to.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Both from and to keywords are required.".to_string(),
			});
		}

		let mut uow = self.store.begin().await?;
		let report = reconcile::rename_keyword_globally(&mut *uow, from, to).await?;

		uow.commit().await?;

		tracing::info!(
			from,
			to,
			updated = report.updated,
			merged = report.merged,
			"Keyword renamed."
		);

		Ok(report)
	}
}
