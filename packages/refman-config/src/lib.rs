mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Metadata, Postgres, Security, Service, Storage, StorageBackend};

use std::{fs, net::SocketAddr, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	let http_addr: SocketAddr = cfg.service.http_bind.parse().map_err(|_| Error::Validation {
		message: "service.http_bind must be a socket address such as 127.0.0.1:8080."
			.to_string(),
	})?;

	if cfg.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(Error::Validation {
			message: "service.http_bind must be a loopback address when \
				security.bind_localhost_only is true."
				.to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	match (cfg.storage.backend, cfg.storage.postgres.as_ref()) {
		(StorageBackend::Postgres, None) => {
			return Err(Error::Validation {
				message: "storage.postgres is required when storage.backend is postgres."
					.to_string(),
			});
		},
		(StorageBackend::Postgres, Some(postgres)) if postgres.pool_max_conns == 0 => {
			return Err(Error::Validation {
				message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
			});
		},
		_ => {},
	}

	if cfg.metadata.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "metadata.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.metadata.max_body_bytes == 0 {
		return Err(Error::Validation {
			message: "metadata.max_body_bytes must be greater than zero.".to_string(),
		});
	}
	if cfg.metadata.user_agent.trim().is_empty() {
		return Err(Error::Validation {
			message: "metadata.user_agent must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.postgres.as_ref().map(|pg| pg.dsn.trim().is_empty()).unwrap_or(false) {
		cfg.storage.postgres = None;
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
