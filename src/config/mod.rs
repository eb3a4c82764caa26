//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (DOCKERCLOUD_USER, DOCKERCLOUD_APIKEY, STACK_ENV)
//!     → validation.rs (semantic checks)
//!     → SyncConfig (validated, immutable)
//!     → sections handed to each subsystem at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_store_config, ConfigError};
pub use schema::SyncConfig;
pub use schema::{
    EventsConfig, ListenerConfig, MiddlewareConfig, ObservabilityConfig, OrchestrationConfig,
    RoutingConfig, StoreConfig,
};
