//! Workspace package discovery (C6 §4.6 "Workspace discovery").
//!
//! Starting from the project root, reads the root `package.json`'s
//! `workspaces` field (array form, or `{packages: [...]}`), falling back to
//! `["packages/*", "apps/*"]` when absent. Each glob pattern expands to
//! directories containing their own `package.json`, indexed by the
//! `name` field declared there.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

/// Caps glob expansion so a misconfigured pattern (e.g. a bare `**`) cannot
/// walk an entire disk.
const MAX_WORKSPACE_RESULTS: usize = 2000;

const DEFAULT_WORKSPACE_PATTERNS: &[&str] = &["packages/*", "apps/*"];

#[derive(Debug, Deserialize)]
struct RootManifest {
    #[serde(default)]
    workspaces: Option<WorkspacesField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    List(Vec<String>),
    Object { packages: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    name: Option<String>,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    types: Option<String>,
    #[serde(default)]
    exports: Option<Value>,
}

/// A discovered workspace package: its directory and parsed manifest fields
/// needed for resolution (`main`/`module`/`types`/`exports`).
#[derive(Debug, Clone)]
pub struct WorkspacePackage {
    pub dir: PathBuf,
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
    pub exports: Option<Value>,
}

/// Discover workspace packages under `project_root`, indexed by declared name.
pub fn discover(project_root: &Path) -> HashMap<String, WorkspacePackage> {
    let patterns = read_workspace_patterns(project_root);
    let mut found = 0usize;
    let mut index = HashMap::new();

    for pattern in patterns {
        for dir in expand_pattern(project_root, &pattern) {
            if found >= MAX_WORKSPACE_RESULTS {
                return index;
            }
            let manifest_path = dir.join("package.json");
            let Ok(content) = fs::read_to_string(&manifest_path) else {
                continue;
            };
            let Ok(manifest) = serde_json::from_str::<PackageManifest>(&content) else {
                continue;
            };
            let Some(name) = manifest.name else {
                continue;
            };
            found += 1;
            index.insert(
                name,
                WorkspacePackage {
                    dir,
                    main: manifest.main,
                    module: manifest.module,
                    types: manifest.types,
                    exports: manifest.exports,
                },
            );
        }
    }

    index
}

fn read_workspace_patterns(project_root: &Path) -> Vec<String> {
    let manifest_path = project_root.join("package.json");
    let Ok(content) = fs::read_to_string(&manifest_path) else {
        return default_patterns();
    };
    let Ok(manifest) = serde_json::from_str::<RootManifest>(&content) else {
        return default_patterns();
    };
    match manifest.workspaces {
        Some(WorkspacesField::List(patterns)) if !patterns.is_empty() => patterns,
        Some(WorkspacesField::Object { packages }) if !packages.is_empty() => packages,
        _ => default_patterns(),
    }
}

fn default_patterns() -> Vec<String> {
    DEFAULT_WORKSPACE_PATTERNS.iter().map(|s| s.to_string()).collect()
}

/// Expand a `*`/`**` glob pattern (relative to `root`) into directories.
fn expand_pattern(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let full_pattern = root.join(pattern);
    let Some(pattern_str) = full_pattern.to_str() else {
        return Vec::new();
    };
    match glob::glob(pattern_str) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .take(MAX_WORKSPACE_RESULTS)
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovers_default_pattern_packages() {
        let dir = tempdir().unwrap();
        let pkg_dir = dir.path().join("packages").join("core");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("package.json"), r#"{"name": "@acme/core", "main": "index.js"}"#).unwrap();

        let index = discover(dir.path());
        assert!(index.contains_key("@acme/core"));
        assert_eq!(index["@acme/core"].dir, pkg_dir);
    }

    #[test]
    fn honours_declared_workspaces_field() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"workspaces": ["libs/*"]}"#).unwrap();
        let pkg_dir = dir.path().join("libs").join("utils");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("package.json"), r#"{"name": "utils"}"#).unwrap();

        let index = discover(dir.path());
        assert!(index.contains_key("utils"));
    }

    #[test]
    fn missing_manifest_falls_back_to_defaults_and_finds_nothing() {
        let dir = tempdir().unwrap();
        let index = discover(dir.path());
        assert!(index.is_empty());
    }
}
