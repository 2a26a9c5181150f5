//! Configuration loading for the control binary.
//!
//! A single TOML file with optional `[shared]`, `[motor]`, `[sma]`,
//! `[brake]`, `[charge]` and `[maneuver]` sections. Without a file the
//! compiled-in defaults are used.

use std::path::Path;

use mblocks_common::config::{ConfigError, ConfigLoader, ModuleConfig};
use tracing::{debug, info};

/// Load and validate the module configuration.
///
/// `None` selects the defaults; a path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<ModuleConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ModuleConfig::load(path)?
        }
        None => {
            debug!("No configuration file given, using defaults");
            ModuleConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_without_path() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.motor.gear_poles, 42);
    }

    #[test]
    fn missing_file_is_error() {
        let result = load_config(Some(Path::new("/nonexistent/mblocks.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn invalid_values_rejected_after_parse() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[motor]\nmax_current_ma = 999999\n").unwrap();
        file.flush().unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/mblocks.toml");
        let cfg = load_config(Some(&path)).unwrap();
        let defaults = ModuleConfig::default();
        assert_eq!(cfg.motor.kp, defaults.motor.kp);
        assert_eq!(cfg.motor.ki, defaults.motor.ki);
        assert_eq!(cfg.sma.hold_current_ma, defaults.sma.hold_current_ma);
        assert_eq!(cfg.maneuver.hold_ms, defaults.maneuver.hold_ms);
    }

    #[test]
    fn loads_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[sma]\nretract_time_ms = 750\n").unwrap();
        file.flush().unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.sma.retract_time_ms, 750);
    }
}
