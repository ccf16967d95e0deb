//! Canopy's application layer: configuration, secrets, naming, project
//! scaffolding, and the lifecycle operations the CLI dispatches to.

pub mod config;
pub mod lifecycle;
pub mod names;
pub mod prompt;
pub mod scaffold;
pub mod secrets;
pub mod spawn;

pub use config::{Config, ConfigError};
pub use lifecycle::StartOpts;
pub use scaffold::Language;
pub use spawn::SpawnArgs;
