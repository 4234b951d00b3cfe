//! Laravel project configuration utilities
//!
//! This module discovers Laravel project roots and holds the settings that
//! control where route files and controllers are searched for.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

/// Default directory holding route files, relative to the project root
pub const DEFAULT_ROUTES_DIRECTORY: &str = "routes";

/// Default exclusion applied to every candidate pattern
pub const DEFAULT_EXCLUDE: &str = "**/vendor/**";

/// Where the resolver looks for declarations
///
/// Configured via: { "lsp": { "laravel-goto-route": { "settings": { "laravel": { ... } } } } }
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Directory holding route files (default: "routes")
    pub routes_directory: String,

    /// Directories searched recursively for controller classes, in priority order
    pub controller_directories: Vec<String>,

    /// Glob excluded from every search (default: "**/vendor/**")
    pub exclude: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            routes_directory: DEFAULT_ROUTES_DIRECTORY.to_string(),
            controller_directories: vec![
                "app/Http/Controllers".to_string(),
                "app/Controllers".to_string(),
            ],
            exclude: DEFAULT_EXCLUDE.to_string(),
        }
    }
}

impl ResolverConfig {
    /// The routes directory without surrounding slashes
    pub fn routes_dir(&self) -> &str {
        trim_slashes(&self.routes_directory)
    }

    /// Controller directories without surrounding slashes, empty entries dropped
    pub fn controller_dirs(&self) -> impl Iterator<Item = &str> {
        self.controller_directories
            .iter()
            .map(|dir| trim_slashes(dir))
            .filter(|dir| !dir.is_empty())
    }
}

fn trim_slashes(dir: &str) -> &str {
    dir.trim_matches('/')
}

/// Wrapper for the full settings object sent by the editor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LspSettings {
    #[serde(default)]
    pub laravel: ResolverConfig,
}

/// Find the Laravel project root by walking up from a file path
///
/// Looks for Laravel-specific markers:
/// - composer.json + artisan
/// - composer.json + routes/ directory
///
/// Returns None if no Laravel project root is found.
pub fn find_project_root(file_path: &Path) -> Option<PathBuf> {
    let mut current = file_path;

    // If it's a file, start from its parent directory
    if current.is_file() {
        current = current.parent()?;
    }

    loop {
        let has_composer = current.join("composer.json").exists();
        let has_artisan = current.join("artisan").exists();
        let has_routes = current.join(DEFAULT_ROUTES_DIRECTORY).is_dir();

        if has_composer && has_artisan {
            info!("Found Laravel project root at {:?} (composer.json + artisan)", current);
            return Some(current.to_path_buf());
        }

        if has_composer && has_routes {
            info!("Found Laravel project root at {:?} (composer.json + routes)", current);
            return Some(current.to_path_buf());
        }

        current = current.parent()?;
    }
}
