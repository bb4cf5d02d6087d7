#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		if let Some(db_err) = err.as_database_error()
			&& db_err.is_unique_violation()
		{
			return Self::Conflict(db_err.message().to_string());
		}

		Self::Sqlx(err)
	}
}
