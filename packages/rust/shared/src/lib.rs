//! Shared types, error model, and configuration for docbuild.
//!
//! This crate is the foundation depended on by all other docbuild crates.
//! It provides:
//! - [`DocBuildError`], the unified error type
//! - Domain types ([`DocumentPair`], [`RunId`], [`RunReport`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BehaviorConfig, PauseMode, ProjectConfig, ToolConfig, ToolsConfig, config_dir,
    config_file_path, find_config, init_config, load_config, load_config_from, validate_config,
};
pub use error::{DocBuildError, Result};
pub use types::{DocumentPair, DocumentReport, RunId, RunReport, StepReport, StepStatus};
