use std::{future, sync::Arc};

use serde_json::json;

use refman_service::{Error, MetadataService, Page, PageFetcher, metadata::Url};
use refman_storage::BoxFuture;

const BOOK_HTML: &str = r#"<!doctype html>
<html lang="de">
<head>
	<title>Ignored when og:title is present</title>
	<meta property="og:title" content="Die Verwandlung">
	<meta property="og:type" content="book">
	<meta property="og:site_name" content="Projekt Gutenberg">
	<meta property="og:image" content="/covers/kafka.jpg">
	<meta name="description" content="Eine Erzählung.">
	<meta name="author" content="Franz Kafka">
	<meta itemprop="datePublished" content="1915">
	<meta name="keywords" content="novella, , kafka ">
	<link rel="canonical" href="https://gutenberg.example/kafka/verwandlung">
</head>
<body><p>Als Gregor Samsa eines Morgens ...</p></body>
</html>"#;

/// Serves a fixed page, or fails every fetch when `html` is `None`.
struct FixedPage {
	html: Option<&'static str>,
}
impl PageFetcher for FixedPage {
	fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, refman_service::Result<Page>> {
		let result = match self.html {
			Some(html) => Ok(Page { url: url.clone(), html: html.to_string() }),
			None => Err(Error::Upstream { message: format!("{url} answered 503.") }),
		};

		Box::pin(future::ready(result))
	}
}

fn service(html: Option<&'static str>) -> MetadataService {
	MetadataService::new(Arc::new(FixedPage { html }))
}

#[tokio::test]
async fn page_metadata_becomes_a_record() {
	let record = service(Some(BOOK_HTML))
		.lookup("https://gutenberg.example/5200", None)
		.await
		.expect("Failed to read metadata.");

	assert_eq!(
		serde_json::Value::Object(record),
		json!({
			"title": "Die Verwandlung",
			"description": "Eine Erzählung.",
			"language": "de",
			"entrysubtype": "book",
			"url": "https://gutenberg.example/kafka/verwandlung",
			"publisher": "Projekt Gutenberg",
			"author": ["Franz Kafka"],
			"date": "1915",
			"image": "https://gutenberg.example/covers/kafka.jpg",
			"icon": "https://gutenberg.example/favicon.ico",
			"keywords": ["novella", "kafka"],
		})
	);
}

#[tokio::test]
async fn field_list_selects_a_subset() {
	let record = service(Some(BOOK_HTML))
		.lookup("https://gutenberg.example/5200", Some(" publisher ,date,volume"))
		.await
		.expect("Failed to read metadata.");

	assert_eq!(
		serde_json::Value::Object(record),
		json!({ "publisher": "Projekt Gutenberg", "date": "1915" })
	);
}

#[tokio::test]
async fn bad_urls_are_rejected_before_fetching() {
	let service = service(None);

	for raw in ["", "gutenberg.example/5200", "mailto:someone@example.org"] {
		let err = service.lookup(raw, None).await.expect_err("Expected an invalid URL.");

		assert!(
			matches!(err, Error::InvalidRequest { .. }),
			"Unexpected error for {raw:?}: {err:?}"
		);
	}
}

#[tokio::test]
async fn fetch_failures_surface_as_upstream_errors() {
	let err = service(None)
		.lookup("https://gutenberg.example/5200", None)
		.await
		.expect_err("Expected a fetch failure.");

	assert!(matches!(err, Error::Upstream { .. }), "Unexpected error: {err:?}");
}
