mod settings;

pub use settings::{
    save_api_url, ApiConfig, Config, ConfigError, DocumentConfig, RecoveryConfig,
    DEFAULT_API_URL, EXAMPLE_CONFIG,
};
