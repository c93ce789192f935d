pub mod config;
pub mod media;
pub mod metrics;
pub mod notification;
pub mod secrets;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    Settings,
};
pub use media::{
    BatchResult, MediaFile, MediaKind, MediaProcessor, ProcessingError, TransformError,
    Transformer,
};
pub use notification::{NotificationChannel, NotificationError, NotificationService};
pub use secrets::{EnvSecretProvider, SecretProvider, StaticSecretProvider};
