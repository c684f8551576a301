//! Module resolver (C6) — `spec.md` §4.6.
//!
//! Resolves an import specifier to an on-disk file given the importing
//! file's location, a project root, and the discovered tsconfig/workspace
//! state. One `Resolver` is built per scan and shared (read-mostly, behind
//! locks) across every worker, since its caches are pure functions of
//! filesystem state observed during the scan (`spec.md` §3's ownership note).

pub mod tsconfig;
pub mod workspace;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use tsconfig::TsConfig;
use workspace::WorkspacePackage;

/// Extensions tried, in order, when a relative/alias specifier names a file
/// without its extension. Distinct from the scan's "scannable extensions"
/// (`.ts`/`.tsx`/`.js`/`.jsx`) because modules may resolve through a
/// `.mjs`/`.cjs` file that is never itself a scan candidate.
const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Which resolution path produced a result — `no-circular-dependencies`
/// seeds its search only from `Relative`/`Alias` targets (`spec.md` §4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    Relative,
    Alias,
    BaseUrl,
    Workspace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub resolved: Option<PathBuf>,
    pub should_warn: bool,
    pub kind: Option<ResolvedKind>,
}

impl ResolveOutcome {
    fn unresolved(should_warn: bool) -> Self {
        Self {
            resolved: None,
            should_warn,
            kind: None,
        }
    }

    fn found(path: PathBuf, kind: ResolvedKind) -> Self {
        Self {
            resolved: Some(path),
            should_warn: false,
            kind: Some(kind),
        }
    }
}

pub struct Resolver {
    project_root: PathBuf,
    explicit_tsconfig: Option<TsConfig>,
    tsconfig_cache: Mutex<HashMap<PathBuf, Option<TsConfig>>>,
    workspace_packages: HashMap<String, WorkspacePackage>,
    resolved_cache: Mutex<HashMap<(PathBuf, String), ResolveOutcome>>,
}

impl Resolver {
    pub fn new(project_root: PathBuf, tsconfig_path: Option<&Path>) -> Self {
        let explicit_tsconfig = tsconfig_path.and_then(tsconfig::load_tsconfig_at);
        let workspace_packages = workspace::discover(&project_root);
        Self {
            project_root,
            explicit_tsconfig,
            tsconfig_cache: Mutex::new(HashMap::new()),
            workspace_packages,
            resolved_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve `specifier` as imported from `from_file`. Memoised by
    /// `(from_file, specifier)` for the lifetime of this `Resolver`.
    pub fn resolve(&self, from_file: &Path, specifier: &str) -> ResolveOutcome {
        let key = (from_file.to_path_buf(), specifier.to_string());
        if let Some(cached) = self.resolved_cache.lock().unwrap().get(&key) {
            return cached.clone();
        }
        let outcome = self.resolve_uncached(from_file, specifier);
        self.resolved_cache.lock().unwrap().insert(key, outcome.clone());
        outcome
    }

    fn resolve_uncached(&self, from_file: &Path, specifier: &str) -> ResolveOutcome {
        let specifier = strip_query_and_hash(specifier);
        if specifier.starts_with('.') {
            return self.resolve_relative(from_file, specifier);
        }
        self.resolve_bare(from_file, specifier)
    }

    fn tsconfig_for(&self, from_file: &Path) -> Option<TsConfig> {
        if self.explicit_tsconfig.is_some() {
            return self.explicit_tsconfig.clone();
        }
        let dir = from_file.parent().unwrap_or(&self.project_root).to_path_buf();
        let mut cache = self.tsconfig_cache.lock().unwrap();
        if let Some(cached) = cache.get(&dir) {
            return cached.clone();
        }
        let found = tsconfig::find_tsconfig(&dir);
        cache.insert(dir, found.clone());
        found
    }

    // --- Step 2: relative specifiers -----------------------------------

    fn resolve_relative(&self, from_file: &Path, specifier: &str) -> ResolveOutcome {
        let dir = from_file.parent().unwrap_or(Path::new("."));
        let base = normalize(&dir.join(specifier));

        if let Some(found) = resolve_path_candidate(&base) {
            if self.within_project_root(&found) {
                return ResolveOutcome::found(found, ResolvedKind::Relative);
            }
            return ResolveOutcome::unresolved(false);
        }

        if let Some(config) = self.tsconfig_for(from_file) {
            if !config.root_dirs.is_empty() {
                if let Some(owning) = config.root_dirs.iter().find(|r| dir.starts_with(r)) {
                    let suffix = base.strip_prefix(owning).unwrap_or(&base);
                    for root_dir in &config.root_dirs {
                        if root_dir == owning {
                            continue;
                        }
                        let candidate = normalize(&root_dir.join(suffix));
                        if let Some(found) = resolve_path_candidate(&candidate) {
                            if self.within_project_root(&found) {
                                return ResolveOutcome::found(found, ResolvedKind::Relative);
                            }
                        }
                    }
                }
            }
        }

        ResolveOutcome::unresolved(false)
    }

    fn within_project_root(&self, path: &Path) -> bool {
        if path.ends_with_dts() {
            return false;
        }
        path.strip_prefix(&self.project_root).is_ok()
    }

    // --- Steps 3-5: bare / alias specifiers -----------------------------

    fn resolve_bare(&self, from_file: &Path, specifier: &str) -> ResolveOutcome {
        let mut attempted = false;
        let config = self.tsconfig_for(from_file);

        if let Some(config) = &config {
            if !config.paths.is_empty() {
                for (pattern, targets) in &config.paths {
                    let Some(captured) = tsconfig::match_paths_key(pattern, specifier) else {
                        continue;
                    };
                    attempted = true;
                    let base_dir = config.base_url.clone().unwrap_or_else(|| config.config_dir.clone());
                    for target in targets {
                        let substituted = tsconfig::substitute_wildcard(target, captured);
                        let candidate = normalize(&base_dir.join(&substituted));
                        if let Some(found) = resolve_path_candidate(&candidate) {
                            return ResolveOutcome::found(found, ResolvedKind::Alias);
                        }
                    }
                }
            }
        }

        if let Some(config) = &config {
            if let Some(base_url) = &config.base_url {
                let looks_path_like = specifier.contains('/') || specifier.starts_with('@');
                if looks_path_like && !self.names_known_package(from_file, specifier) {
                    attempted = true;
                    let candidate = normalize(&base_url.join(specifier));
                    if let Some(found) = resolve_path_candidate(&candidate) {
                        return ResolveOutcome::found(found, ResolvedKind::BaseUrl);
                    }
                }
            }
        }

        let (package_name, subpath) = split_package_specifier(specifier);
        if let Some(package) = self.workspace_packages.get(package_name) {
            attempted = true;
            if let Some(found) = self.resolve_workspace_subpath(package, subpath) {
                return ResolveOutcome::found(found, ResolvedKind::Workspace);
            }
        }

        ResolveOutcome::unresolved(attempted)
    }

    fn names_known_package(&self, from_file: &Path, specifier: &str) -> bool {
        let (package_name, _) = split_package_specifier(specifier);
        if self.workspace_packages.contains_key(package_name) {
            return true;
        }
        let mut dir = from_file.parent().map(Path::to_path_buf);
        while let Some(current) = dir {
            if current.join("node_modules").join(package_name).is_dir() {
                return true;
            }
            if current == self.project_root {
                break;
            }
            dir = current.parent().map(Path::to_path_buf);
        }
        false
    }

    fn resolve_workspace_subpath(&self, package: &WorkspacePackage, subpath: &str) -> Option<PathBuf> {
        if let Some(exports) = &package.exports {
            if let Some(found) = resolve_exports_map(exports, subpath, &package.dir) {
                return Some(found);
            }
        }

        if subpath == "." {
            for field in [&package.module, &package.main, &package.types] {
                if let Some(entry) = field {
                    let candidate = normalize(&package.dir.join(entry));
                    if let Some(found) = resolve_path_candidate(&candidate) {
                        return Some(found);
                    }
                }
            }
            return resolve_path_candidate(&package.dir.join("index"));
        }

        let relative = subpath.trim_start_matches('/');
        resolve_path_candidate(&normalize(&package.dir.join(relative)))
    }
}

trait EndsWithDts {
    fn ends_with_dts(&self) -> bool;
}

impl EndsWithDts for Path {
    fn ends_with_dts(&self) -> bool {
        self.to_string_lossy().ends_with(".d.ts")
    }
}

fn strip_query_and_hash(specifier: &str) -> &str {
    let end = specifier
        .find(['?', '#'])
        .unwrap_or(specifier.len());
    &specifier[..end]
}

/// `packageName` (one or two segments for a scoped `@scope/name`) and the
/// remaining `subpath`: `"."` when there is none, otherwise a leading-`/`
/// remainder (e.g. `"/debounce"`) so callers can build `"./debounce"`.
fn split_package_specifier(specifier: &str) -> (&str, &str) {
    let after_scope = if specifier.starts_with('@') {
        match specifier.find('/') {
            Some(first_slash) => specifier[first_slash + 1..].find('/').map(|i| first_slash + 1 + i),
            None => None,
        }
    } else {
        specifier.find('/')
    };

    match after_scope {
        Some(split_at) => (&specifier[..split_at], &specifier[split_at..]),
        None => (specifier, "."),
    }
}

/// Conditional resolution through a `package.json` `exports` map, preferring
/// `import > require > default > types` and supporting a single `*` subpath
/// pattern per key, per `spec.md` §4.6 step 5.
fn resolve_exports_map(exports: &Value, subpath: &str, package_dir: &Path) -> Option<PathBuf> {
    let owned_key;
    let key: &str = if subpath == "." {
        "."
    } else {
        owned_key = format!(".{subpath}");
        &owned_key
    };

    match exports {
        Value::String(s) if key == "." => resolve_path_candidate(&normalize(&package_dir.join(s))),
        Value::Object(map) => {
            if let Some(value) = map.get(key) {
                return resolve_export_value(value, package_dir);
            }
            for (pattern, value) in map {
                if let Some(captured) = tsconfig::match_paths_key(pattern, key) {
                    let substituted = tsconfig::substitute_wildcard(&export_value_as_pattern(value)?, captured);
                    return resolve_path_candidate(&normalize(&package_dir.join(substituted)));
                }
            }
            // Conditions object directly at the top level (no subpath keys).
            if key == "." {
                return resolve_export_value(exports, package_dir);
            }
            None
        }
        _ => None,
    }
}

fn export_value_as_pattern(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            for cond in ["import", "require", "default"] {
                if let Some(Value::String(s)) = map.get(cond) {
                    return Some(s.clone());
                }
            }
            None
        }
        _ => None,
    }
}

fn resolve_export_value(value: &Value, package_dir: &Path) -> Option<PathBuf> {
    match value {
        Value::String(s) => resolve_path_candidate(&normalize(&package_dir.join(s))),
        Value::Object(map) => {
            for cond in ["import", "require", "default", "types"] {
                if let Some(inner) = map.get(cond) {
                    if let Some(found) = resolve_export_value(inner, package_dir) {
                        return Some(found);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// Try, in order: the exact path as a file; the path with each resolve
/// extension appended; `index.<ext>` inside the path treated as a
/// directory. Rejects any result ending in `.d.ts`.
fn resolve_path_candidate(base: &Path) -> Option<PathBuf> {
    if base.is_file() && !base.ends_with_dts() {
        return Some(base.to_path_buf());
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = append_extension(base, ext);
        if candidate.is_file() && !candidate.ends_with_dts() {
            return Some(candidate);
        }
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = base.join(format!("index.{ext}"));
        if candidate.is_file() && !candidate.ends_with_dts() {
            return Some(candidate);
        }
    }
    None
}

fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(ext);
    match base.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Collapse `.`/`..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_relative_import_with_extension_inference() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/a.ts"), "export const a = 1;");
        write(&dir.path().join("src/b.ts"), "import { a } from './a';");

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/b.ts"), "./a");
        assert_eq!(outcome.resolved, Some(dir.path().join("src/a.ts")));
        assert_eq!(outcome.kind, Some(ResolvedKind::Relative));
    }

    #[test]
    fn resolves_relative_directory_index() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/utils/index.ts"), "export const u = 1;");
        write(&dir.path().join("src/b.ts"), "import { u } from './utils';");

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/b.ts"), "./utils");
        assert_eq!(outcome.resolved, Some(dir.path().join("src/utils/index.ts")));
    }

    #[test]
    fn rejects_relative_import_escaping_project_root() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        write(&project.join("src/a.ts"), "x");
        write(&dir.path().join("outside.ts"), "x");

        let resolver = Resolver::new(project.clone(), None);
        let outcome = resolver.resolve(&project.join("src/a.ts"), "../../outside");
        assert_eq!(outcome.resolved, None);
    }

    #[test]
    fn rejects_d_ts_targets() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/a.d.ts"), "declare const a: number;");
        write(&dir.path().join("src/b.ts"), "x");

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/b.ts"), "./a");
        assert_eq!(outcome.resolved, None);
    }

    #[test]
    fn resolves_tsconfig_path_alias() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/shared/thing.ts"), "export const t = 1;");
        write(&dir.path().join("src/app.ts"), "import { t } from '@shared/thing';");
        write(
            &dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "@shared/*": ["src/shared/*"] } } }"#,
        );

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/app.ts"), "@shared/thing");
        assert_eq!(outcome.resolved, Some(dir.path().join("src/shared/thing.ts")));
        assert_eq!(outcome.kind, Some(ResolvedKind::Alias));
    }

    #[test]
    fn resolves_workspace_package_via_main_field() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("packages/core/index.js"), "module.exports = {};");
        write(
            &dir.path().join("packages/core/package.json"),
            r#"{"name": "@acme/core", "main": "index.js"}"#,
        );
        write(&dir.path().join("src/app.ts"), "import x from '@acme/core';");

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/app.ts"), "@acme/core");
        assert_eq!(outcome.resolved, Some(dir.path().join("packages/core/index.js")));
        assert_eq!(outcome.kind, Some(ResolvedKind::Workspace));
    }

    #[test]
    fn unresolved_bare_specifier_with_no_match_does_not_warn() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("src/app.ts"), "import x from 'react';");

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/app.ts"), "react");
        assert_eq!(outcome.resolved, None);
        assert!(!outcome.should_warn);
    }

    #[test]
    fn unresolved_alias_match_with_no_file_warns() {
        let dir = tempdir().unwrap();
        write(
            &dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "@shared/*": ["src/shared/*"] } } }"#,
        );
        write(&dir.path().join("src/app.ts"), "x");

        let resolver = Resolver::new(dir.path().to_path_buf(), None);
        let outcome = resolver.resolve(&dir.path().join("src/app.ts"), "@shared/missing");
        assert_eq!(outcome.resolved, None);
        assert!(outcome.should_warn);
    }
}
