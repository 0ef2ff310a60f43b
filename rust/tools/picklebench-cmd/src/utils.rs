//! Common utilities for picklebench-cmd

use std::path::Path;

use anyhow::{Context, Result};
use picklebench_buffers::PoolConfig;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Installs the `tracing` subscriber that also receives the libraries' `log`
/// records. `RUST_LOG` takes precedence over the `-v` count.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Parses the `--pool-config` argument. A value starting with `{` is inline
/// JSON, anything else names a JSON file.
pub fn load_pool_config(arg: Option<&str>) -> Result<PoolConfig> {
    let Some(arg) = arg else {
        return Ok(PoolConfig::default());
    };
    let json = if arg.trim_start().starts_with('{') {
        arg.to_string()
    } else {
        let path = Path::new(arg);
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pool config: {}", path.display()))?
    };
    let config = PoolConfig::from_json(&json).context("Invalid pool config")?;
    log::debug!("pool config: {config:?}");
    Ok(config)
}

/// Formats a byte count in human-readable form
pub fn format_size(size: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_pool_config_inline_and_file() {
        assert_eq!(load_pool_config(None).unwrap(), PoolConfig::default());

        let inline = load_pool_config(Some(r#"{"max_idle": 4}"#)).unwrap();
        assert_eq!(inline.max_idle, Some(4));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_retained_capacity": 65536}}"#).unwrap();
        let from_file = load_pool_config(file.path().to_str()).unwrap();
        assert_eq!(from_file.max_retained_capacity, Some(65536));
        assert_eq!(from_file.max_idle, None);

        assert!(load_pool_config(Some("/nonexistent/pool.json")).is_err());
        assert!(load_pool_config(Some("{not json")).is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.50 MB");
    }
}
