//! tsconfig chain loading: `extends`, `compilerOptions.{baseUrl,paths,rootDirs}`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct TsConfig {
    pub base_url: Option<PathBuf>,
    pub paths: HashMap<String, Vec<String>>,
    pub root_dirs: Vec<PathBuf>,
    /// Directory containing the tsconfig that was actually loaded (the
    /// innermost one in the `extends` chain), used as the fallback base for
    /// resolving `paths` targets when `baseUrl` is absent.
    pub config_dir: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
struct RawTsConfig {
    #[serde(default)]
    extends: Option<String>,
    #[serde(default, rename = "compilerOptions")]
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Deserialize, Default)]
struct RawCompilerOptions {
    #[serde(default, rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    paths: Option<HashMap<String, Vec<String>>>,
    #[serde(default, rename = "rootDirs")]
    root_dirs: Option<Vec<String>>,
}

/// Search `dir` and its ancestors for a `tsconfig.json`, load its
/// `extends` chain, and merge `compilerOptions.{baseUrl,paths,rootDirs}`
/// with the child overriding the parent. Returns `None` if no tsconfig is
/// found before the filesystem root.
pub fn find_tsconfig(dir: &Path) -> Option<TsConfig> {
    let mut current = dir.to_path_buf();
    loop {
        let candidate = current.join("tsconfig.json");
        if candidate.is_file() {
            return load_tsconfig_at(&candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load a specific tsconfig file (e.g. the CLI's `--tsconfig` override)
/// rather than searching ancestors for one.
pub fn load_tsconfig_at(path: &Path) -> Option<TsConfig> {
    let mut guard = std::collections::HashSet::new();
    load_chain(path, &mut guard)
}

fn load_chain(path: &Path, visited: &mut std::collections::HashSet<PathBuf>) -> Option<TsConfig> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        // extends cycle: stop recursing, use what we have so far.
        return Some(TsConfig::default());
    }

    let content = fs::read_to_string(path).ok()?;
    let stripped = strip_json_comments_and_trailing_commas(&content);
    let raw: RawTsConfig = serde_json::from_str(&stripped).ok()?;

    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut merged = if let Some(extends) = &raw.extends {
        resolve_extends_path(config_dir, extends)
            .and_then(|parent_path| load_chain(&parent_path, visited))
            .unwrap_or_default()
    } else {
        TsConfig::default()
    };

    if let Some(options) = raw.compiler_options {
        if let Some(base_url) = options.base_url {
            merged.base_url = Some(config_dir.join(base_url));
        }
        if let Some(paths) = options.paths {
            // Resolved relative to baseUrl (falling back to config_dir) at use-site.
            merged.paths = paths;
        }
        if let Some(root_dirs) = options.root_dirs {
            merged.root_dirs = root_dirs.into_iter().map(|r| config_dir.join(r)).collect();
        }
    }

    merged.config_dir = config_dir.to_path_buf();
    Some(merged)
}

fn resolve_extends_path(config_dir: &Path, extends: &str) -> Option<PathBuf> {
    if extends.starts_with('.') || extends.starts_with('/') {
        let candidate = config_dir.join(extends);
        return with_json_extension(&candidate);
    }

    // Module-style reference: look for it under the nearest ancestor's
    // node_modules, the way Node resolves bare specifiers.
    let mut dir = config_dir.to_path_buf();
    loop {
        let node_modules = dir.join("node_modules").join(extends);
        if let Some(resolved) = with_json_extension(&node_modules) {
            return Some(resolved);
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn with_json_extension(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    let with_ext = candidate.with_extension("json");
    if with_ext.is_file() {
        return Some(with_ext);
    }
    let as_dir_default = candidate.join("tsconfig.json");
    if as_dir_default.is_file() {
        return Some(as_dir_default);
    }
    None
}

/// Strips `//` and `/* */` comments and trailing commas before `}`/`]`,
/// outside of string literals, so tsconfig's JSON-with-comments parses as
/// plain JSON.
fn strip_json_comments_and_trailing_commas(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev_star = false;
                for next in chars.by_ref() {
                    if prev_star && next == '/' {
                        break;
                    }
                    prev_star = next == '*';
                }
            }
            ',' => {
                let mut lookahead = chars.clone();
                let mut found_close = false;
                while let Some(&peeked) = lookahead.peek() {
                    if peeked.is_whitespace() {
                        lookahead.next();
                        continue;
                    }
                    found_close = peeked == '}' || peeked == ']';
                    break;
                }
                if !found_close {
                    out.push(c);
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Resolve a `paths` target pattern against the captured wildcard segment.
pub fn substitute_wildcard(target: &str, captured: &str) -> String {
    target.replacen('*', captured, 1)
}

/// A `paths` key matches `specifier` either exactly (no `*`) or as a
/// `prefix*suffix` pattern, returning the captured wildcard segment.
pub fn match_paths_key<'a>(key: &str, specifier: &'a str) -> Option<&'a str> {
    match key.find('*') {
        None => {
            if key == specifier {
                Some("")
            } else {
                None
            }
        }
        Some(star_index) => {
            let prefix = &key[..star_index];
            let suffix = &key[star_index + 1..];
            if specifier.starts_with(prefix) && specifier.ends_with(suffix) {
                let captured_end = specifier.len() - suffix.len();
                if captured_end >= prefix.len() {
                    return Some(&specifier[prefix.len()..captured_end]);
                }
                None
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        let input = "{\n  // comment\n  \"a\": 1, /* inline */ \"b\": 2\n}";
        let stripped = strip_json_comments_and_trailing_commas(input);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn strips_trailing_commas() {
        let input = r#"{ "a": [1, 2,], "b": 3, }"#;
        let stripped = strip_json_comments_and_trailing_commas(input);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"][1], 2);
        assert_eq!(value["b"], 3);
    }

    #[test]
    fn preserves_commas_and_slashes_inside_strings() {
        let input = r#"{ "path": "a/b,c" }"#;
        let stripped = strip_json_comments_and_trailing_commas(input);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["path"], "a/b,c");
    }

    #[test]
    fn matches_exact_paths_key() {
        assert_eq!(match_paths_key("@app", "@app"), Some(""));
        assert_eq!(match_paths_key("@app", "@app/x"), None);
    }

    #[test]
    fn matches_wildcard_paths_key() {
        assert_eq!(match_paths_key("@app/*", "@app/utils/string"), Some("utils/string"));
        assert_eq!(match_paths_key("@app/*", "@other/utils"), None);
    }

    #[test]
    fn substitutes_wildcard_into_target() {
        assert_eq!(substitute_wildcard("src/*", "utils/string"), "src/utils/string");
    }
}
