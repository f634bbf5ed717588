//! Logging setup for binaries and tests.
//!
//! The library itself only logs through the `log` facade. `init_with_level`
//! installs `env_logger` once; `RUST_LOG` still overrides the given level.

use log::LevelFilter;
use std::sync::OnceLock;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install `env_logger` with `level` as the default filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init()?;
    let _ = INSTALLED.set(());
    Ok(())
}
