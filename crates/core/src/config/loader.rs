use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of every environment variable read into the configuration.
///
/// Sections are separated with a double underscore, so
/// `MEDIADROP_GENERAL__MAX_WORKERS=8` sets `general.max_workers`.
pub const ENV_PREFIX: &str = "MEDIADROP_";

/// Load configuration from an optional TOML file with environment variable overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[general]
upload_dir = "/srv/uploads"
max_workers = 6
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.general.max_workers, 6);
    }

    #[test]
    fn test_load_config_from_str_missing_general() {
        let toml = r#"
[media]
max_video_size = 10
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Some(Path::new("/nonexistent/mediadrop.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_env_only() {
        Jail::expect_with(|jail| {
            jail.set_env("MEDIADROP_GENERAL__UPLOAD_DIR", "/srv/uploads");
            jail.set_env("MEDIADROP_GENERAL__MAX_WORKERS", "3");
            jail.set_env("MEDIADROP_TELEGRAM__ENABLED", "true");
            jail.set_env("MEDIADROP_TELEGRAM__CHAT_ID", "-100777");

            let config = load_config(None).map_err(|e| e.to_string())?;
            assert_eq!(config.general.max_workers, 3);
            assert_eq!(config.general.upload_dir.to_str(), Some("/srv/uploads"));
            assert!(config.telegram.enabled);
            assert_eq!(config.telegram.chat_id.as_deref(), Some("-100777"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mediadrop.toml",
                r#"
[general]
upload_dir = "/srv/uploads"
max_workers = 2

[media]
max_video_size = 1024
"#,
            )?;
            jail.set_env("MEDIADROP_GENERAL__MAX_WORKERS", "8");

            let config =
                load_config(Some(Path::new("mediadrop.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.general.max_workers, 8);
            assert_eq!(config.media.max_video_size, 1024);
            Ok(())
        });
    }
}
