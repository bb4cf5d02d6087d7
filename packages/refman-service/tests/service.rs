use std::{future, sync::Arc};

use serde_json::{Value, json};

use refman_domain::{HeadValues, WireRecord};
use refman_service::{
	Error, KeywordRemoval, KeywordSetChange, RefmanService, RenameReport, SearchRequest, reconcile,
};
use refman_storage::{BoxFuture, MemoryStore, SearchField, Store, UnitOfWork, models::EntryRow};

/// Delegates to a [`MemoryStore`] but fails every attempt to insert one poisoned keyword.
struct PoisonedStore {
	inner: MemoryStore,
	poison: &'static str,
}
impl Store for PoisonedStore {
	fn begin(&self) -> BoxFuture<'_, refman_storage::Result<Box<dyn UnitOfWork>>> {
		Box::pin(async move {
			let inner = self.inner.begin().await?;

			Ok(Box::new(PoisonedUnitOfWork { inner, poison: self.poison }) as Box<dyn UnitOfWork>)
		})
	}
}

struct PoisonedUnitOfWork {
	inner: Box<dyn UnitOfWork>,
	poison: &'static str,
}
impl UnitOfWork for PoisonedUnitOfWork {
	fn insert_entry<'a>(
		&'a mut self,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<i64>> {
		self.inner.insert_entry(head, details)
	}

	fn lock_entry(&mut self, entry_id: i64) -> BoxFuture<'_, refman_storage::Result<bool>> {
		self.inner.lock_entry(entry_id)
	}

	fn update_entry<'a>(
		&'a mut self,
		entry_id: i64,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<bool>> {
		self.inner.update_entry(entry_id, head, details)
	}

	fn delete_entry(&mut self, entry_id: i64) -> BoxFuture<'_, refman_storage::Result<bool>> {
		self.inner.delete_entry(entry_id)
	}

	fn get_entries<'a>(
		&'a mut self,
		entry_ids: &'a [i64],
	) -> BoxFuture<'a, refman_storage::Result<Vec<EntryRow>>> {
		self.inner.get_entries(entry_ids)
	}

	fn get_all_entries(&mut self) -> BoxFuture<'_, refman_storage::Result<Vec<EntryRow>>> {
		self.inner.get_all_entries()
	}

	fn list_entry_ids(&mut self) -> BoxFuture<'_, refman_storage::Result<Vec<i64>>> {
		self.inner.list_entry_ids()
	}

	fn search_by_substring<'a>(
		&'a mut self,
		field: SearchField,
		needle: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<Vec<i64>>> {
		self.inner.search_by_substring(field, needle)
	}

	fn list_keywords_by_entry(
		&mut self,
		entry_id: i64,
	) -> BoxFuture<'_, refman_storage::Result<Vec<String>>> {
		self.inner.list_keywords_by_entry(entry_id)
	}

	fn list_distinct_keywords(&mut self) -> BoxFuture<'_, refman_storage::Result<Vec<String>>> {
		self.inner.list_distinct_keywords()
	}

	fn list_entry_ids_by_keyword<'a>(
		&'a mut self,
		keyword: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<Vec<i64>>> {
		self.inner.list_entry_ids_by_keyword(keyword)
	}

	fn list_keyword_entry_ids(&mut self) -> BoxFuture<'_, refman_storage::Result<Vec<i64>>> {
		self.inner.list_keyword_entry_ids()
	}

	fn insert_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<bool>> {
		if keyword == self.poison {
			let result: refman_storage::Result<bool> = Err(refman_storage::Error::InvalidArgument(
				format!("Refusing to store keyword {keyword:?}."),
			));

			return Box::pin(future::ready(result));
		}

		self.inner.insert_keyword(entry_id, keyword)
	}

	fn update_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		from: &'a str,
		to: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<u64>> {
		self.inner.update_keyword(entry_id, from, to)
	}

	fn delete_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, refman_storage::Result<u64>> {
		self.inner.delete_keyword(entry_id, keyword)
	}

	fn delete_keywords_by_entry(
		&mut self,
		entry_id: i64,
	) -> BoxFuture<'_, refman_storage::Result<u64>> {
		self.inner.delete_keywords_by_entry(entry_id)
	}

	fn clear(&mut self) -> BoxFuture<'_, refman_storage::Result<()>> {
		self.inner.clear()
	}

	fn commit(self: Box<Self>) -> BoxFuture<'static, refman_storage::Result<()>> {
		let Self { inner, .. } = *self;

		inner.commit()
	}
}

fn memory_service() -> (RefmanService, MemoryStore) {
	let store = MemoryStore::new();

	(RefmanService::new(Arc::new(store.clone())), store)
}

fn record(value: Value) -> WireRecord {
	WireRecord::from_value(value).expect("Test record must decode.")
}

async fn create(service: &RefmanService, value: Value) -> i64 {
	service.create_entry(record(value)).await.expect("Failed to create entry.")
}

async fn keywords_of(service: &RefmanService, entry_id: i64) -> Vec<String> {
	service.entry_keywords(entry_id).await.expect("Failed to list entry keywords.")
}

fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

#[tokio::test]
async fn created_record_reads_back_with_author_order_and_keywords() {
	let (service, _) = memory_service();
	let entry_id = create(
		&service,
		json!({ "title": "X", "author": ["A", "B"], "keywords": ["k1", "k2", "k1"] }),
	)
	.await;
	let fetched = service.get_entry(entry_id).await.expect("Failed to get entry.");

	assert_eq!(
		Value::Object(fetched),
		json!({ "id": entry_id, "title": "X", "author": ["A", "B"], "keywords": ["k1", "k2"] })
	);
}

#[tokio::test]
async fn author_names_with_commas_survive_storage() {
	let (service, _) = memory_service();
	let entry_id =
		create(&service, json!({ "author": ["Doe, Jane", "Roe, Richard"], "year": 1999 })).await;
	let fetched = service.get_entry(entry_id).await.expect("Failed to get entry.");

	assert_eq!(fetched["author"], json!(["Doe, Jane", "Roe, Richard"]));
	assert_eq!(fetched["year"], json!(1999));
}

#[tokio::test]
async fn detail_id_becomes_label() {
	let (service, _) = memory_service();
	let entry_id = create(&service, json!({ "id": "smith2020", "title": "T" })).await;
	let fetched = service.get_entry(entry_id).await.expect("Failed to get entry.");

	assert_eq!(fetched["label"], json!("smith2020"));
	assert_eq!(fetched["id"], json!(entry_id));
}

#[tokio::test]
async fn reconcile_is_idempotent() {
	let (_, store) = memory_service();
	let mut uow = store.begin().await.expect("Failed to begin unit of work.");
	let entry_id = uow.insert_entry(&HeadValues::default(), "{}").await.expect("insert");
	let desired = strings(&["a", "b"]);

	assert_eq!(
		reconcile::reconcile_entry_keywords(&mut *uow, entry_id, &desired).await.expect("first"),
		2
	);
	assert_eq!(
		reconcile::reconcile_entry_keywords(&mut *uow, entry_id, &desired).await.expect("second"),
		0
	);
	assert_eq!(uow.list_keywords_by_entry(entry_id).await.expect("list"), desired);
}

#[tokio::test]
async fn reconcile_never_removes() {
	let (service, _) = memory_service();
	let entry_id = create(&service, json!({ "keywords": ["a", "b"] })).await;
	let inserted =
		service.add_entry_keywords(entry_id, &strings(&["c"])).await.expect("Failed to add.");

	assert_eq!(inserted, 1);
	assert_eq!(keywords_of(&service, entry_id).await, strings(&["a", "b", "c"]));
	assert_eq!(
		service.add_entry_keywords(entry_id, &strings(&["a", " c "])).await.expect("add"),
		0
	);
}

#[tokio::test]
async fn reconcile_requires_an_existing_entry() {
	let (service, _) = memory_service();
	let err = service
		.add_entry_keywords(42, &strings(&["a"]))
		.await
		.expect_err("Expected a missing entry.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn blank_keyword_lists_are_rejected() {
	let (service, _) = memory_service();
	let entry_id = create(&service, json!({ "keywords": ["a"] })).await;
	let add = service.add_entry_keywords(entry_id, &strings(&[" ", ""])).await;
	let remove = service.remove_entry_keywords(entry_id, KeywordRemoval::Only(Vec::new())).await;

	assert!(matches!(add, Err(Error::InvalidRequest { .. })));
	assert!(matches!(remove, Err(Error::InvalidRequest { .. })));
	assert_eq!(keywords_of(&service, entry_id).await, strings(&["a"]));
}

#[tokio::test]
async fn replacing_keyword_sets_leaves_exactly_the_new_set() {
	let (service, _) = memory_service();
	let entry_id = create(&service, json!({ "title": "T" })).await;
	let first = service
		.replace_entry_keywords(entry_id, &strings(&["a", "b"]))
		.await
		.expect("Failed to replace keywords.");
	let second = service
		.replace_entry_keywords(entry_id, &strings(&["b", "c"]))
		.await
		.expect("Failed to replace keywords.");

	assert_eq!(first, KeywordSetChange { removed: 0, inserted: 2 });
	assert_eq!(second, KeywordSetChange { removed: 1, inserted: 1 });
	assert_eq!(keywords_of(&service, entry_id).await, strings(&["b", "c"]));
}

#[tokio::test]
async fn prune_removes_only_orphans_and_is_idempotent() {
	let (service, store) = memory_service();
	let gone = create(&service, json!({ "keywords": ["x", "y"] })).await;
	let kept = create(&service, json!({ "keywords": ["x"] })).await;
	let mut uow = store.begin().await.expect("Failed to begin unit of work.");

	assert!(uow.delete_entry(gone).await.expect("delete"));

	uow.commit().await.expect("Failed to commit.");

	assert_eq!(service.list_keywords().await.expect("list"), strings(&["x", "y"]));
	assert_eq!(service.prune_keywords().await.expect("Failed to prune."), 2);
	assert_eq!(keywords_of(&service, kept).await, strings(&["x"]));
	assert_eq!(service.list_keywords().await.expect("list"), strings(&["x"]));
	assert_eq!(service.prune_keywords().await.expect("Failed to prune."), 0);
}

#[tokio::test]
async fn rename_merges_instead_of_duplicating() {
	let (service, _) = memory_service();
	let only_js = create(&service, json!({ "keywords": ["js"] })).await;
	let both = create(&service, json!({ "keywords": ["js", "javascript"] })).await;
	let other = create(&service, json!({ "keywords": ["rust"] })).await;
	let report = service.rename_keyword("js", "javascript").await.expect("Failed to rename.");

	assert_eq!(report, RenameReport { updated: 1, merged: 1 });
	assert_eq!(keywords_of(&service, only_js).await, strings(&["javascript"]));
	assert_eq!(keywords_of(&service, both).await, strings(&["javascript"]));
	assert_eq!(keywords_of(&service, other).await, strings(&["rust"]));
	assert!(service.rename_keyword("js", "javascript").await.expect("rename").is_noop());
}

#[tokio::test]
async fn rename_onto_itself_changes_nothing() {
	let (service, _) = memory_service();
	let entry_id = create(&service, json!({ "keywords": ["js"] })).await;

	assert!(service.rename_keyword("js", "js").await.expect("rename").is_noop());
	assert_eq!(keywords_of(&service, entry_id).await, strings(&["js"]));
	assert!(matches!(service.rename_keyword(" ", "js").await, Err(Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn overwrite_nulls_missing_fields_and_replaces_keywords() {
	let (service, _) = memory_service();
	let entry_id = create(
		&service,
		json!({ "title": "Old", "publisher": "P", "year": 2001, "keywords": ["a", "b"] }),
	)
	.await;

	service
		.overwrite_entry(
			entry_id,
			record(json!({ "id": entry_id, "title": "New", "keywords": ["b", "c"] })),
		)
		.await
		.expect("Failed to overwrite entry.");

	let fetched = service.get_entry(entry_id).await.expect("Failed to get entry.");

	assert_eq!(
		Value::Object(fetched),
		json!({ "id": entry_id, "title": "New", "keywords": ["b", "c"] })
	);

	service
		.overwrite_entry(entry_id, record(json!({ "title": "Bare" })))
		.await
		.expect("Failed to overwrite entry.");

	assert!(keywords_of(&service, entry_id).await.is_empty());
}

#[tokio::test]
async fn patch_keeps_missing_fields_and_merges_details() {
	let (service, _) = memory_service();
	let entry_id = create(
		&service,
		json!({
			"title": "T",
			"publisher": "P",
			"url": "https://example.org",
			"year": 2001,
			"note": "n",
			"keywords": ["a"],
		}),
	)
	.await;

	service
		.patch_entry(
			entry_id,
			record(json!({ "publisher": null, "note": null, "pages": 10, "keywords": ["b"] })),
		)
		.await
		.expect("Failed to patch entry.");

	let fetched = service.get_entry(entry_id).await.expect("Failed to get entry.");

	assert_eq!(
		Value::Object(fetched),
		json!({
			"id": entry_id,
			"title": "T",
			"url": "https://example.org",
			"year": 2001,
			"pages": 10,
			"keywords": ["a", "b"],
		})
	);

	service
		.patch_entry(entry_id, record(json!({ "keywords": null })))
		.await
		.expect("Failed to patch entry.");

	assert!(keywords_of(&service, entry_id).await.is_empty());
}

#[tokio::test]
async fn patch_with_an_id_keeps_the_stored_label() {
	let (service, _) = memory_service();
	let labelled = create(&service, json!({ "title": "T", "label": "keep-me" })).await;
	let unlabelled = create(&service, json!({ "title": "U" })).await;

	for entry_id in [labelled, unlabelled] {
		service
			.patch_entry(entry_id, record(json!({ "id": "smith2020" })))
			.await
			.expect("Failed to patch entry.");
	}

	let fetched = service.get_entry(labelled).await.expect("Failed to get entry.");

	assert_eq!(
		Value::Object(fetched),
		json!({ "id": labelled, "label": "keep-me", "title": "T" })
	);

	let fetched = service.get_entry(unlabelled).await.expect("Failed to get entry.");

	assert_eq!(fetched["label"], json!("smith2020"));
}

#[tokio::test]
async fn mutations_of_missing_entries_are_not_found() {
	let (service, _) = memory_service();

	assert!(matches!(service.get_entry(9).await, Err(Error::NotFound { .. })));
	assert!(matches!(
		service.overwrite_entry(9, WireRecord::default()).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		service.patch_entry(9, WireRecord::default()).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(service.delete_entry(9).await, Err(Error::NotFound { .. })));
	assert!(matches!(service.entry_keywords(9).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn delete_cascades_to_keywords() {
	let (service, _) = memory_service();
	let entry_id = create(&service, json!({ "title": "T", "keywords": ["a"] })).await;

	service.delete_entry(entry_id).await.expect("Failed to delete entry.");

	assert!(service.list_keywords().await.expect("list").is_empty());
	assert_eq!(service.prune_keywords().await.expect("prune"), 0);
	assert!(matches!(service.get_entry(entry_id).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn batch_create_reports_each_record() {
	let (service, _) = memory_service();
	let outcomes = service
		.create_entries(vec![
			json!({ "title": "A" }),
			json!("not a record"),
			json!({ "title": "C", "author": 5 }),
			json!({ "title": "D", "keywords": ["k"] }),
		])
		.await;

	assert_eq!(outcomes.iter().map(|outcome| outcome.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
	assert!(outcomes[0].result.is_ok());
	assert!(matches!(outcomes[1].result, Err(Error::InvalidRequest { .. })));
	assert!(matches!(outcomes[2].result, Err(Error::InvalidRequest { .. })));
	assert!(outcomes[3].result.is_ok());

	let titles: Vec<Value> = service
		.dump()
		.await
		.expect("Failed to dump.")
		.into_iter()
		.map(|record| record["title"].clone())
		.collect();

	assert_eq!(titles, vec![json!("A"), json!("D")]);
}

#[tokio::test]
async fn failed_keyword_write_rolls_back_the_entry() {
	let store = MemoryStore::new();
	let service =
		RefmanService::new(Arc::new(PoisonedStore { inner: store.clone(), poison: "boom" }));
	let err = service
		.create_entry(record(json!({ "title": "T", "keywords": ["ok", "boom"] })))
		.await
		.expect_err("Expected the poisoned keyword to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
	assert!(service.dump().await.expect("dump").is_empty());
	assert!(service.list_keywords().await.expect("list").is_empty());
}

#[tokio::test]
async fn batch_failure_does_not_affect_siblings() {
	let store = MemoryStore::new();
	let service =
		RefmanService::new(Arc::new(PoisonedStore { inner: store.clone(), poison: "boom" }));
	let outcomes = service
		.create_entries(vec![
			json!({ "title": "A", "keywords": ["a"] }),
			json!({ "title": "B", "keywords": ["boom"] }),
			json!({ "title": "C", "keywords": ["c"] }),
		])
		.await;

	assert!(outcomes[0].result.is_ok());
	assert!(outcomes[1].result.is_err());
	assert!(outcomes[2].result.is_ok());
	assert_eq!(service.dump().await.expect("dump").len(), 2);
	assert_eq!(service.list_keywords().await.expect("list"), strings(&["a", "c"]));
}

#[tokio::test]
async fn search_unions_criteria_in_first_seen_order() {
	let (service, _) = memory_service();
	let rust_book = create(
		&service,
		json!({ "title": "Programming Rust", "author": ["Jim Blandy"], "keywords": ["rust"] }),
	)
	.await;
	let web_book = create(
		&service,
		json!({ "title": "Web Rust", "publisher": "Blandy Press", "keywords": ["web"] }),
	)
	.await;
	let other = create(&service, json!({ "title": "Other", "keywords": ["misc"] })).await;
	let ids = service
		.search(SearchRequest {
			keywords: strings(&["web"]),
			author: Some("BLANDY".to_string()),
			title: None,
		})
		.await
		.expect("Failed to search.");

	assert_eq!(ids, vec![web_book, rust_book]);

	let ids = service
		.search(SearchRequest { title: Some("rust".to_string()), ..Default::default() })
		.await
		.expect("Failed to search.");

	assert_eq!(ids, vec![rust_book, web_book]);

	let ids = service
		.search(SearchRequest { keywords: strings(&["misc", "nope"]), ..Default::default() })
		.await
		.expect("Failed to search.");

	assert_eq!(ids, vec![other]);
}

#[tokio::test]
async fn empty_search_is_rejected() {
	let (service, _) = memory_service();
	let err = service
		.search(SearchRequest {
			keywords: strings(&[" "]),
			author: Some(String::new()),
			title: None,
		})
		.await
		.expect_err("Expected an invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn clear_empties_the_store() {
	let (service, _) = memory_service();

	create(&service, json!({ "title": "T", "keywords": ["a"] })).await;
	service.clear().await.expect("Failed to clear.");

	assert!(service.dump().await.expect("dump").is_empty());
	assert!(service.list_keywords().await.expect("list").is_empty());
}
