use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub security: Security,
	#[serde(default)]
	pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Answer CORS preflights for any origin. Browser bookmarklets need this.
	#[serde(default = "default_true")]
	pub cors_allow_any: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub backend: StorageBackend,
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
	Postgres,
	/// Process-local store. Content is lost on exit.
	Memory,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true }
	}
}

/// Page fetching for `GET /v1/metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
	#[serde(default = "default_metadata_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_metadata_user_agent")]
	pub user_agent: String,
	/// Pages larger than this are refused.
	#[serde(default = "default_metadata_max_body_bytes")]
	pub max_body_bytes: usize,
}
impl Default for Metadata {
	fn default() -> Self {
		Self {
			timeout_ms: default_metadata_timeout_ms(),
			user_agent: default_metadata_user_agent(),
			max_body_bytes: default_metadata_max_body_bytes(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_true() -> bool {
	true
}

fn default_metadata_timeout_ms() -> u64 {
	10_000
}

fn default_metadata_user_agent() -> String {
	"refman".to_string()
}

fn default_metadata_max_body_bytes() -> usize {
	2 * 1024 * 1024
}
