//! Page metadata lookup, used to prefill a record from a URL.
//!
//! A page is fetched through a [`PageFetcher`], its `<meta>`, `<link>` and `<title>` tags are
//! read into [`PageMetadata`], and the result is mapped onto record field names: the page type
//! becomes `entrysubtype`, the site name becomes `publisher`, the publication time becomes `date`
//! and a single author becomes a one-element `author` list.

pub use reqwest::Url;

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::Client;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value};

use crate::{Error, Result};
use refman_storage::BoxFuture;

/// A fetched HTML page. `url` is the address after redirects.
#[derive(Debug, Clone)]
pub struct Page {
	pub url: Url,
	pub html: String,
}

pub trait PageFetcher
where
	Self: Send + Sync,
{
	fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Page>>;
}

pub struct HttpFetcher {
	client: Client,
	max_body_bytes: usize,
}
impl HttpFetcher {
	pub fn new(cfg: &refman_config::Metadata) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.user_agent(cfg.user_agent.as_str())
			.build()?;

		Ok(Self { client, max_body_bytes: cfg.max_body_bytes })
	}

	fn too_large(&self, url: &Url) -> Error {
		Error::Upstream {
			message: format!("Page {url} is larger than {} bytes.", self.max_body_bytes),
		}
	}
}
impl PageFetcher for HttpFetcher {
	fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Page>> {
		Box::pin(async move {
			let res = self.client.get(url.clone()).send().await?.error_for_status()?;

			if res.content_length().is_some_and(|len| len > self.max_body_bytes as u64) {
				return Err(self.too_large(url));
			}

			let final_url = res.url().clone();
			let body = res.bytes().await?;

			if body.len() > self.max_body_bytes {
				return Err(self.too_large(url));
			}

			Ok(Page { url: final_url, html: String::from_utf8_lossy(&body).into_owned() })
		})
	}
}

#[derive(Clone)]
pub struct MetadataService {
	pub fetcher: Arc<dyn PageFetcher>,
}
impl MetadataService {
	pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
		Self { fetcher }
	}

	/// Fetches `raw_url` and returns its metadata as a record. `fields` is a comma-separated
	/// subset of record keys to keep; a blank list keeps everything.
	pub async fn lookup(&self, raw_url: &str, fields: Option<&str>) -> Result<Map<String, Value>> {
		let url = parse_page_url(raw_url)?;
		let page = self.fetcher.fetch(&url).await.inspect_err(|err| {
			tracing::warn!(url = %url, error = %err, "Page fetch failed.");
		})?;
		let record = PageMetadata::parse(&page.html, &page.url).into_record();

		tracing::info!(url = %url, fields = record.len(), "Page metadata read.");

		Ok(match fields {
			Some(fields) => select_fields(record, fields),
			None => record,
		})
	}
}

/// Metadata read from one HTML page. Relative links are resolved against the page address.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageMetadata {
	pub title: Option<String>,
	pub description: Option<String>,
	pub language: Option<String>,
	pub kind: Option<String>,
	pub url: Option<String>,
	pub provider: Option<String>,
	pub author: Option<String>,
	pub published: Option<String>,
	pub modified: Option<String>,
	pub image: Option<String>,
	pub icon: Option<String>,
	pub keywords: Vec<String>,
}
impl PageMetadata {
	pub fn parse(html: &str, page_url: &Url) -> Self {
		let document = Html::parse_document(html);
		let root = document.root_element();
		let mut meta = HashMap::new();
		let mut links = HashMap::new();
		let mut title_text = None;

		for node in root.descendants() {
			let Some(element) = ElementRef::wrap(node) else {
				continue;
			};
			let tag = element.value();

			match tag.name() {
				"meta" => {
					let key = tag
						.attr("property")
						.or_else(|| tag.attr("name"))
						.or_else(|| tag.attr("itemprop"));

					if let (Some(key), Some(content)) = (key, non_blank(tag.attr("content"))) {
						meta.entry(key.trim().to_ascii_lowercase()).or_insert(content);
					}
				},
				"link" =>
					if let (Some(rel), Some(href)) = (tag.attr("rel"), non_blank(tag.attr("href")))
					{
						for token in rel.split_ascii_whitespace() {
							links.entry(token.to_ascii_lowercase()).or_insert_with(|| href.clone());
						}
					},
				"title" if title_text.is_none() => {
					title_text = non_blank(Some(element.text().collect::<String>().as_str()));
				},
				_ => {},
			}
		}

		let first = |keys: &[&str]| keys.iter().find_map(|key| meta.get(*key).cloned());
		let resolve = |href: String| page_url.join(&href).map(|url| url.to_string()).ok();

		Self {
			title: first(&["og:title", "twitter:title"]).or(title_text),
			description: first(&["og:description", "twitter:description", "description"]),
			language: non_blank(root.value().attr("lang")).or_else(|| first(&["og:locale"])),
			kind: first(&["og:type"]),
			url: first(&["og:url"])
				.or_else(|| links.get("canonical").cloned())
				.and_then(resolve)
				.or_else(|| Some(page_url.to_string())),
			provider: first(&["og:site_name", "application-name"])
				.or_else(|| host_label(page_url)),
			author: first(&["author", "article:author", "book:author", "twitter:creator"]),
			published: first(&[
				"article:published_time",
				"datepublished",
				"date",
				"dc.date",
				"dcterms.created",
			]),
			modified: first(&[
				"article:modified_time",
				"og:updated_time",
				"datemodified",
				"dcterms.modified",
			]),
			image: first(&["og:image", "og:image:url", "twitter:image"]).and_then(resolve),
			icon: links
				.get("icon")
				.or_else(|| links.get("apple-touch-icon"))
				.cloned()
				.or_else(|| Some("/favicon.ico".to_string()))
				.and_then(resolve),
			keywords: first(&["keywords"])
				.map(|raw| {
					raw.split(',')
						.map(str::trim)
						.filter(|keyword| !keyword.is_empty())
						.map(str::to_string)
						.collect()
				})
				.unwrap_or_default(),
		}
	}

	/// Maps the metadata onto record keys. Missing values are left out.
	pub fn into_record(self) -> Map<String, Value> {
		let mut record = Map::new();
		let fields = [
			("title", self.title),
			("description", self.description),
			("language", self.language),
			("entrysubtype", self.kind),
			("url", self.url),
			("publisher", self.provider),
			("date", self.published),
			("modified", self.modified),
			("image", self.image),
			("icon", self.icon),
		];

		for (key, value) in fields {
			if let Some(value) = value {
				record.insert(key.to_string(), Value::from(value));
			}
		}
		if let Some(author) = self.author {
			record.insert("author".to_string(), Value::from(vec![author]));
		}
		if !self.keywords.is_empty() {
			record.insert("keywords".to_string(), Value::from(self.keywords));
		}

		record
	}
}

fn parse_page_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw.trim()).map_err(|err| Error::InvalidRequest {
		message: format!("URL {raw:?} is invalid: {err}."),
	})?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(Error::InvalidRequest {
			message: format!("URL {raw:?} must use http or https."),
		});
	}

	Ok(url)
}

fn select_fields(mut record: Map<String, Value>, fields: &str) -> Map<String, Value> {
	let requested: Vec<&str> =
		fields.split(',').map(str::trim).filter(|field| !field.is_empty()).collect();

	if requested.is_empty() {
		return record;
	}

	requested.into_iter().filter_map(|field| record.remove_entry(field)).collect()
}

fn host_label(url: &Url) -> Option<String> {
	let host = url.host_str()?;

	Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn non_blank(raw: Option<&str>) -> Option<String> {
	raw.map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
}
