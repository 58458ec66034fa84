//! Logging utilities for the application
//!
//! Logs go to stdout in a compact format unless `LOG_MODE=file` is set, in which
//! case they are written to a daily-rolling file under `LOG_DATA_DIR`
//! (default `logs/`). The level comes from `RUST_LOG`, then `LOG_LEVEL`, then `info`.
use std::path::{Path, PathBuf};

use tracing_appender::rolling;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// File name prefix of the rolling log files
const LOG_FILE_PREFIX: &str = "sentinel.log";

/// Default directory for file logging
const DEFAULT_LOG_DIR: &str = "logs";

/// Where log output should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
	Stdout,
	File(PathBuf),
}

impl LogMode {
	/// Reads `LOG_MODE` and `LOG_DATA_DIR`
	pub fn from_env() -> Self {
		match std::env::var("LOG_MODE") {
			Ok(mode) if mode.eq_ignore_ascii_case("file") => {
				let dir = std::env::var("LOG_DATA_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.into());
				Self::File(PathBuf::from(dir))
			}
			_ => Self::Stdout,
		}
	}
}

/// Builds the level filter from `RUST_LOG`, falling back to `LOG_LEVEL` and then `info`
pub fn build_filter() -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
		EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
	})
}

/// Setup logging for the application according to [`LogMode::from_env`]
pub fn setup_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	match LogMode::from_env() {
		LogMode::Stdout => setup_logging_with_writer(std::io::stdout, true),
		LogMode::File(dir) => setup_file_logging(&dir),
	}
}

/// Setup daily-rolling file logging inside `dir`
pub fn setup_file_logging(
	dir: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	std::fs::create_dir_all(dir)?;
	let appender = rolling::daily(dir, LOG_FILE_PREFIX);
	setup_logging_with_writer(appender, false)
}

/// Setup logging for the application with a custom writer
pub fn setup_logging_with_writer<W>(
	writer: W,
	ansi: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	tracing_subscriber::registry()
		.with(build_filter())
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(
					fmt::format()
						.with_level(true)
						.with_target(true)
						.with_thread_ids(false)
						.with_thread_names(false)
						.with_ansi(ansi)
						.compact(),
				)
				.fmt_fields(fmt::format::PrettyFields::new()),
		)
		.try_init()?;
	Ok(())
}
