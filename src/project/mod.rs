// src/project/mod.rs

//! Project-level collaborators: which package manager a project uses and
//! what its manifest declares.

pub mod manifest;
pub mod package_manager;

pub use manifest::{
    has_dependency_dir, has_package_manifest, load_package_info, load_scripts,
    remove_dependency_dir, PackageInfo, DEFAULT_DEPENDENCY_DIR, MANIFEST_FILE,
};
pub use package_manager::PackageManager;
