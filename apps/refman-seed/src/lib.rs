//! Replaces the store content with the records found in a directory of `*.json` files.
//!
//! Each file holds one record object or an array of them.

use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use refman_service::RefmanService;

#[derive(Debug, Parser)]
#[command(
	version = refman_cli::VERSION,
	rename_all = "kebab",
	styles = refman_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Directory holding the `*.json` record files.
	#[arg(value_name = "DIR")]
	pub dir: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
	pub files: usize,
	pub created: usize,
	pub failed: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = refman_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	tracing::info!(version = refman_cli::VERSION, "Starting refman-seed.");

	let store = refman_storage::open(&config.storage).await?;
	let service = RefmanService::new(store);
	let report = seed(&service, &args.dir).await?;

	if report.failed > 0 {
		let total = report.failed + report.created;

		return Err(eyre::eyre!("{} of {total} records failed to import.", report.failed));
	}

	Ok(())
}

/// Wipes every entry and keyword, then creates one entry per record found under `dir`.
///
/// Files are read before anything is deleted, so an unreadable collection leaves the store
/// untouched.
pub async fn seed(service: &RefmanService, dir: &Path) -> color_eyre::Result<SeedReport> {
	let collection = read_collection(dir)?;
	let mut report = SeedReport { files: collection.len(), ..Default::default() };

	service.clear().await?;

	for (path, records) in collection {
		let outcomes = service.create_entries(records).await;
		let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();
		let created = outcomes.len() - failed;

		if failed > 0 {
			tracing::warn!(file = %path.display(), created, failed, "File imported with failures.");
		} else {
			tracing::info!(file = %path.display(), created, "File imported.");
		}

		report.created += created;
		report.failed += failed;
	}

	tracing::info!(
		files = report.files,
		created = report.created,
		failed = report.failed,
		"Seeding finished."
	);

	Ok(report)
}

fn read_collection(dir: &Path) -> color_eyre::Result<Vec<(PathBuf, Vec<Value>)>> {
	let mut paths = Vec::new();

	for dir_entry in
		fs::read_dir(dir).wrap_err_with(|| format!("Failed to list {}.", dir.display()))?
	{
		let path = dir_entry?.path();

		if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
			paths.push(path);
		}
	}

	paths.sort();

	let mut collection = Vec::with_capacity(paths.len());

	for path in paths {
		let raw = fs::read_to_string(&path)
			.wrap_err_with(|| format!("Failed to read {}.", path.display()))?;
		let records = match serde_json::from_str::<Value>(&raw)
			.wrap_err_with(|| format!("Failed to parse {}.", path.display()))?
		{
			Value::Array(records) => records,
			record => vec![record],
		};

		collection.push((path, records));
	}

	Ok(collection)
}
