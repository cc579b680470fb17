// src/config/mod.rs

//! Loading and validation of `autorunner.toml`.

pub mod loader;
pub mod model;
mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, resolve};
pub use model::{ConfigFile, ProjectSection, RawConfigFile, WatchSection};
