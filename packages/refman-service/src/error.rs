pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Upstream error: {message}")]
	Upstream { message: String },
}
impl Error {
	pub(crate) fn entry_not_found(entry_id: i64) -> Self {
		Self::NotFound { message: format!("Entry {entry_id} does not exist.") }
	}
}

impl From<refman_storage::Error> for Error {
	fn from(err: refman_storage::Error) -> Self {
		match err {
			refman_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			refman_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			refman_storage::Error::NotFound(message) => Self::NotFound { message },
			refman_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Self::Upstream { message: err.to_string() }
	}
}
