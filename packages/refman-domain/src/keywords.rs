//! Keyword set arithmetic. Storage-free; the reconciler feeds it what it reads.

use std::collections::BTreeSet;

/// Trims, drops empty entries and collapses duplicates.
pub fn keyword_set<I, S>(keywords: I) -> BTreeSet<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	keywords
		.into_iter()
		.filter_map(|keyword| {
			let trimmed = keyword.as_ref().trim();

			(!trimmed.is_empty()).then(|| trimmed.to_string())
		})
		.collect()
}

/// `desired - current`: what has to be inserted.
pub fn missing_keywords(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Vec<String> {
	desired.difference(current).cloned().collect()
}

/// `current - desired`: what has to be removed.
pub fn extraneous_keywords(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> Vec<String> {
	current.difference(desired).cloned().collect()
}

/// Per-entry actions for renaming keyword `from` to `to`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
	/// Entries tagged only `from`: rewrite the association in place.
	pub update: Vec<i64>,
	/// Entries tagged with both: drop the `from` association.
	pub merge: Vec<i64>,
}
impl RenamePlan {
	pub fn new(tagged_from: &[i64], tagged_to: &[i64]) -> Self {
		let tagged_to: BTreeSet<i64> = tagged_to.iter().copied().collect();
		let tagged_from: BTreeSet<i64> = tagged_from.iter().copied().collect();
		let (merge, update) = tagged_from.into_iter().partition(|id| tagged_to.contains(id));

		Self { update, merge }
	}

	pub fn is_empty(&self) -> bool {
		self.update.is_empty() && self.merge.is_empty()
	}
}
