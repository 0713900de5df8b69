mod background_tasks;
mod config;
mod error;

pub use background_tasks::BackgroundTasks;
pub use config::{AppConfig, AppConfigExt, DEFINITIONS_FILE};
pub use error::ConfigError;
