//! Shared plumbing: payload and config loading, atomic writes, hashing.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use postwatch_recon::model::Report;
use postwatch_recon::{build_report, EntityResolver, ReportConfig};

use crate::{CliError, InputArgs};

const CONFIG_DIR: &str = "postwatch";
const CONFIG_FILE: &str = "report.toml";

/// `<config_dir>/postwatch/report.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the report config. An explicit path must exist; a missing file at the
/// default location means defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ReportConfig, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                log::debug!("no config file, using defaults");
                return Ok(ReportConfig::default());
            }
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|e| {
        CliError::config(format!("cannot read {}: {e}", path.display()))
    })?;
    let config = ReportConfig::from_toml(&text).map_err(|e| {
        CliError::config(format!("{}: {e}", path.display()))
    })?;
    log::debug!("config loaded from {}", path.display());
    Ok(config)
}

/// Read and parse one JSON payload file.
pub fn read_payload(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::input(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        CliError::input(format!("{}: invalid JSON: {e}", path.display()))
            .with_hint("payloads are JSON objects keyed by period")
    })
}

/// Everything a command needs after loading its inputs.
pub struct Prepared {
    pub config: ReportConfig,
    pub resolver: EntityResolver,
    pub report: Report,
}

/// Load config and payloads, then reconcile.
pub fn prepare(inputs: &InputArgs) -> Result<Prepared, CliError> {
    let config = load_config(inputs.config.as_deref())?;
    let resolver = config.resolver()?;
    let posts = read_payload(&inputs.posts)?;
    let election = read_payload(&inputs.election)?;

    let report = build_report(&posts, &election, &config, &resolver);
    for issue in &report.issues {
        log::info!("{issue}");
    }
    Ok(Prepared { config, resolver, report })
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so the target is either the old file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let fail = |e: &dyn std::fmt::Display| CliError::write(format!("cannot write {}: {e}", path.display()));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(&e))?;
    tmp.write_all(bytes).map_err(|e| fail(&e))?;
    tmp.as_file().sync_all().map_err(|e| fail(&e))?;
    tmp.persist(path).map_err(|e| fail(&e.error))?;
    Ok(())
}

/// `sha256:<hex>` of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(bytes))
}

/// One line to stdout; a closed pipe is a write failure.
pub fn print_line(line: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", line).map_err(|e| CliError::write(format!("stdout: {e}")))
}
