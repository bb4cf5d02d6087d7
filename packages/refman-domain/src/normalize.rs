//! Conversion between the wire shape of a record and its storage shape.
//!
//! On the wire a record is one flat JSON object. In storage it is split into a fixed set of
//! head columns, a JSON text blob holding every other key ("details"), and a keyword list kept
//! in its own association table.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::Field;

pub const DETAIL_ID_KEY: &str = "id";
pub const DETAIL_LABEL_KEY: &str = "label";

/// A submitted record: the declared head fields plus every other key as details.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireRecord {
	#[serde(default)]
	pub title: Field<String>,
	#[serde(default, deserialize_with = "deserialize_authors")]
	pub author: Field<Vec<String>>,
	#[serde(default)]
	pub publisher: Field<String>,
	#[serde(default)]
	pub url: Field<String>,
	#[serde(default)]
	pub keywords: Field<Vec<String>>,
	#[serde(flatten)]
	pub details: Map<String, Value>,
}
impl WireRecord {
	pub fn from_value(value: Value) -> serde_json::Result<Self> {
		serde_json::from_value(value)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
	/// Missing head fields become explicit nulls. Used by full overwrites.
	NullMissing,
	/// Missing head fields stay missing. Used by partial updates.
	OmitMissing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadFields {
	pub title: Field<String>,
	pub author: Field<Vec<String>>,
	pub publisher: Field<String>,
	pub url: Field<String>,
}
impl HeadFields {
	pub fn resolve(self, current: Option<&HeadValues>) -> HeadValues {
		let current = current.cloned().unwrap_or_default();

		HeadValues {
			title: self.title.resolve(current.title),
			author: self.author.resolve(current.author),
			publisher: self.publisher.resolve(current.publisher),
			url: self.url.resolve(current.url),
		}
	}
}

/// Head column values as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadValues {
	pub title: Option<String>,
	pub author: Option<Vec<String>>,
	pub publisher: Option<String>,
	pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageShape {
	pub head: HeadFields,
	/// JSON object text. Never contains the key `id`.
	pub details: String,
	/// Raw submitted keywords, not yet reconciled against storage.
	pub keywords: Field<Vec<String>>,
}

/// A persisted entry joined with its keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEntry {
	pub entry_id: i64,
	pub head: HeadValues,
	pub details: String,
	pub keywords: Vec<String>,
}

pub fn to_storage_shape(record: WireRecord, fill: FillMode) -> StorageShape {
	let WireRecord { title, author, publisher, url, keywords, mut details } = record;

	if let Some(id) = details.remove(DETAIL_ID_KEY)
		&& !details.contains_key(DETAIL_LABEL_KEY)
	{
		details.insert(DETAIL_LABEL_KEY.to_string(), id);
	}

	let head = match fill {
		FillMode::NullMissing => HeadFields {
			title: title.or_null(),
			author: author.or_null(),
			publisher: publisher.or_null(),
			url: url.or_null(),
		},
		FillMode::OmitMissing => HeadFields { title, author, publisher, url },
	};

	StorageShape { head, details: Value::Object(details).to_string(), keywords }
}

pub fn from_storage_shape(stored: StoredEntry) -> Map<String, Value> {
	let StoredEntry { entry_id, head, details, keywords } = stored;
	let mut record = parse_details(entry_id, &details);

	record.insert(DETAIL_ID_KEY.to_string(), Value::from(entry_id));
	record.insert("title".to_string(), head.title.map(Value::from).unwrap_or(Value::Null));
	record.insert("author".to_string(), head.author.map(Value::from).unwrap_or(Value::Null));
	record.insert("publisher".to_string(), head.publisher.map(Value::from).unwrap_or(Value::Null));
	record.insert("url".to_string(), head.url.map(Value::from).unwrap_or(Value::Null));
	record.insert("keywords".to_string(), Value::from(keywords));
	record.retain(|_, value| !is_empty_value(value));

	record
}

/// Merges a details patch into a stored details blob. A `null` in the patch deletes the key.
pub fn merge_details(current: &str, patch: &str) -> String {
	let mut merged = match serde_json::from_str::<Value>(current) {
		Ok(Value::Object(map)) => map,
		_ => Map::new(),
	};
	let patch = match serde_json::from_str::<Value>(patch) {
		Ok(Value::Object(map)) => map,
		_ => Map::new(),
	};

	for (key, value) in patch {
		if value.is_null() {
			merged.remove(&key);
		} else {
			merged.insert(key, value);
		}
	}

	Value::Object(merged).to_string()
}

fn parse_details(entry_id: i64, details: &str) -> Map<String, Value> {
	match serde_json::from_str::<Value>(details) {
		Ok(Value::Object(map)) => map,
		Ok(_) => {
			tracing::warn!(entry_id, "Details blob is not a JSON object. Ignoring it.");

			Map::new()
		},
		Err(err) => {
			tracing::warn!(entry_id, error = %err, "Details blob is not valid JSON. Ignoring it.");

			Map::new()
		},
	}
}

fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(text) => text.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
		Value::Bool(_) | Value::Number(_) => false,
	}
}

fn deserialize_authors<'de, D>(deserializer: D) -> Result<Field<Vec<String>>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Authors {
		One(String),
		Many(Vec<String>),
	}

	let authors = Option::<Authors>::deserialize(deserializer)?;

	Ok(Field::from(authors).map(|authors| match authors {
		Authors::One(author) => vec![author],
		Authors::Many(authors) => authors,
	}))
}
