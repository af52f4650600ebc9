//! ---
//! lvnet_section: "01-core-functionality"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Shared configuration and logging for lvnet binaries."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
//! Shared primitives for the lvnet workspace: TOML configuration loading and
//! tracing initialisation used by the CLI and any hosting service.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, MonteCarloConfig, ReportsConfig};
pub use logging::{init_tracing, LogFormat};
