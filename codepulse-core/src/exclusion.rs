//! Exclusion rules applied while walking a repository.
//!
//! Mirrors `ExclusionManager` from the original chunker: gitignore
//! patterns, hidden-path components, and fixed directory/file patterns are
//! each checked in turn, and any one of them can exclude a path.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Directory names (no trailing slash here; matched as a path component)
/// excluded everywhere in the tree.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    "venv",
    ".venv",
    "dist",
    "build",
    ".idea",
    ".vscode",
    ".pytest_cache",
    ".tox",
];

/// Glob-style file patterns excluded everywhere in the tree.
pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "Podfile.lock",
    "*.pyc",
    "*.pyo",
    "*.so",
    "*.dll",
    "*.exe",
    "*.class",
];

/// Hard cap on the number of files a single acquisition/extraction pass
/// will walk, regardless of exclusion outcome.
pub const MAX_WALKED_FILES: usize = 10_000;

/// Decides whether a repo-relative path should be excluded from analysis.
///
/// Check order matches the original: gitignore, then hidden-path
/// components, then directory patterns, then file patterns.
pub struct ExclusionManager {
    gitignore: Option<Gitignore>,
    excluded_dirs: Vec<String>,
    excluded_files: Vec<String>,
}

impl ExclusionManager {
    /// Build an exclusion manager for `repo_root`, loading `.gitignore` at
    /// its root if present.
    pub fn for_repo(repo_root: &Path) -> Self {
        let gitignore = Self::load_gitignore(repo_root);
        Self {
            gitignore,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_files: DEFAULT_EXCLUDED_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn load_gitignore(repo_root: &Path) -> Option<Gitignore> {
        let gitignore_path = repo_root.join(".gitignore");
        if !gitignore_path.is_file() {
            return None;
        }
        let mut builder = GitignoreBuilder::new(repo_root);
        if builder.add(&gitignore_path).is_some() {
            tracing::warn!("failed to read {}", gitignore_path.display());
        }
        builder.build().ok()
    }

    /// `rel_path` must be relative to the repository root. `is_dir` tells
    /// the gitignore matcher whether to apply directory-only patterns.
    pub fn should_exclude(&self, rel_path: &Path, is_dir: bool) -> bool {
        if self.is_gitignored(rel_path, is_dir) {
            return true;
        }
        if Self::is_hidden_path(rel_path) {
            return true;
        }
        if self.matches_directory_pattern(rel_path) {
            return true;
        }
        if self.matches_file_pattern(rel_path) {
            return true;
        }
        false
    }

    fn is_gitignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        match &self.gitignore {
            Some(spec) => spec.matched(rel_path, is_dir).is_ignore(),
            None => false,
        }
    }

    fn is_hidden_path(rel_path: &Path) -> bool {
        rel_path.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            s.starts_with('.') && s != "." && s != ".."
        })
    }

    fn matches_directory_pattern(&self, rel_path: &Path) -> bool {
        rel_path.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            self.excluded_dirs.iter().any(|d| d == s.as_ref())
        })
    }

    fn matches_file_pattern(&self, rel_path: &Path) -> bool {
        let basename = rel_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.excluded_files
            .iter()
            .any(|pattern| fnmatch(pattern, &basename))
    }
}

/// A minimal shell-style glob matcher for a single path component, enough
/// to honor `*.pyc`-style file patterns without pulling in a full glob
/// engine for this single use.
fn fnmatch(pattern: &str, name: &str) -> bool {
    glob_match(pattern.as_bytes(), name.as_bytes())
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

/// Walk `repo_root`, returning repo-relative paths of regular files that
/// survive the exclusion predicate, capped at [`MAX_WALKED_FILES`].
pub fn walk_included_files(repo_root: &Path) -> Vec<PathBuf> {
    let exclusion = ExclusionManager::for_repo(repo_root);
    let mut out = Vec::new();

    for entry in walkdir::WalkDir::new(repo_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.path() == repo_root {
                return true;
            }
            let rel = e.path().strip_prefix(repo_root).unwrap_or(e.path());
            !exclusion.should_exclude(rel, e.file_type().is_dir())
        })
    {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(repo_root)
                .unwrap_or(entry.path())
                .to_path_buf();
            out.push(rel);
            if out.len() >= MAX_WALKED_FILES {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn excludes_hidden_and_default_dirs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/x.py"), "pass").unwrap();
        std::fs::write(dir.path().join("src/x.pyc"), "bin").unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();

        let mut files: Vec<_> = walk_included_files(dir.path())
            .into_iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        files.sort();
        assert_eq!(files, vec!["src/x.py".to_string()]);
    }

    #[test]
    fn honors_gitignore() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "ignored.py\n").unwrap();
        std::fs::write(dir.path().join("ignored.py"), "pass").unwrap();
        std::fs::write(dir.path().join("kept.py"), "pass").unwrap();

        let mut files: Vec<_> = walk_included_files(dir.path())
            .into_iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["kept.py".to_string()]);
    }
}
