use serde::{Deserialize, Deserializer};

/// A wire field that tells apart a missing key from an explicit `null`.
///
/// Use with `#[serde(default)]` so a missing key lands on [`Field::Absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
	Absent,
	Null,
	Value(T),
}
impl<T> Field<T> {
	pub fn as_value(&self) -> Option<&T> {
		match self {
			Self::Value(value) => Some(value),
			_ => None,
		}
	}

	pub fn into_value(self) -> Option<T> {
		match self {
			Self::Value(value) => Some(value),
			_ => None,
		}
	}

	/// Turns a missing key into an explicit `null`.
	pub fn or_null(self) -> Self {
		match self {
			Self::Absent => Self::Null,
			other => other,
		}
	}

	/// Applies this field over `current`: absent keeps it, null clears it, a value replaces it.
	pub fn resolve(self, current: Option<T>) -> Option<T> {
		match self {
			Self::Absent => current,
			Self::Null => None,
			Self::Value(value) => Some(value),
		}
	}

	pub fn map<U, F>(self, f: F) -> Field<U>
	where
		F: FnOnce(T) -> U,
	{
		match self {
			Self::Absent => Field::Absent,
			Self::Null => Field::Null,
			Self::Value(value) => Field::Value(f(value)),
		}
	}
}
impl<T> Default for Field<T> {
	fn default() -> Self {
		Self::Absent
	}
}
impl<T> From<Option<T>> for Field<T> {
	fn from(value: Option<T>) -> Self {
		match value {
			Some(value) => Self::Value(value),
			None => Self::Null,
		}
	}
}
impl<'de, T> Deserialize<'de> for Field<T>
where
	T: Deserialize<'de>,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Option::<T>::deserialize(deserializer).map(Self::from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Deserialize)]
	struct Holder {
		#[serde(default)]
		value: Field<String>,
	}

	#[test]
	fn distinguishes_missing_null_and_value() {
		let missing: Holder = serde_json::from_str("{}").expect("Failed to parse holder.");
		let null: Holder =
			serde_json::from_str(r#"{"value":null}"#).expect("Failed to parse holder.");
		let value: Holder =
			serde_json::from_str(r#"{"value":"x"}"#).expect("Failed to parse holder.");

		assert_eq!(missing.value, Field::Absent);
		assert_eq!(null.value, Field::Null);
		assert_eq!(value.value, Field::Value("x".to_string()));
	}

	#[test]
	fn resolve_follows_patch_rules() {
		let current = Some("old".to_string());

		assert_eq!(Field::Absent.resolve(current.clone()), current);
		assert_eq!(Field::<String>::Null.resolve(current.clone()), None);
		assert_eq!(Field::Value("new".to_string()).resolve(current), Some("new".to_string()));
	}
}
