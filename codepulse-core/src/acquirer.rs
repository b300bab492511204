//! Repository Acquirer (component C1).
//!
//! Obtains a local, shallow copy of a repository (remote URL or existing
//! local path), builds the textual file-structure tree used later in the
//! chunker's planning prompt, and detects the languages present. Mirrors
//! the subprocess-driven `clone_repository` in the original chunker rather
//! than linking a git library, matching `external_tools::git`'s existing
//! "shell out to the real tool" convention.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::exclusion::walk_included_files;
use crate::{Error, Result};

const RETRY_ATTEMPTS: u32 = 3;
const CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Extension -> language name table used for both language detection and
/// (indirectly) which structural extractor handles a file.
const LANGUAGE_TABLE: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".cs", "csharp"),
    (".java", "java"),
    (".scala", "scala"),
];

pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    LANGUAGE_TABLE
        .iter()
        .find(|(e, _)| e.trim_start_matches('.') == ext.trim_start_matches('.'))
        .map(|(_, lang)| *lang)
}

/// Result of acquiring a repository: its local working root, the rendered
/// file-structure tree, and the detected language set.
pub struct AcquiredRepository {
    pub root: PathBuf,
    pub file_structure: String,
    pub languages_used: BTreeSet<String>,
}

pub struct RepositoryAcquirer;

impl RepositoryAcquirer {
    fn url_pattern() -> Regex {
        Regex::new(r"^(https?://[\w.-]+(/[\w.\-~%/]*)?|git@[\w.-]+:[\w.\-~%/]+(\.git)?)$")
            .expect("static url pattern")
    }

    /// Acquire a repository from either a remote URL or an existing local
    /// path, into a fresh temporary working directory.
    pub async fn acquire(repo_url_or_path: &str) -> Result<AcquiredRepository> {
        let is_local = Path::new(repo_url_or_path).exists();
        let work_dir = tempfile::Builder::new()
            .prefix("codepulse-repo-")
            .tempdir()
            .map_err(Error::Io)?
            .into_path();

        if is_local {
            Self::copy_local(Path::new(repo_url_or_path), &work_dir)?;
        } else {
            if !Self::url_pattern().is_match(repo_url_or_path) {
                return Err(Error::Analysis(format!(
                    "invalid repository URL: {repo_url_or_path}"
                )));
            }
            Self::clone_remote(repo_url_or_path, &work_dir).await?;
        }

        let file_structure = generate_file_structure(&work_dir);
        let languages_used = detect_languages(&work_dir);

        Ok(AcquiredRepository {
            root: work_dir,
            file_structure,
            languages_used,
        })
    }

    fn copy_local(source: &Path, dest: &Path) -> Result<()> {
        for rel in walk_included_files(source) {
            let from = source.join(&rel);
            let to = dest.join(&rel);
            if let Some(parent) = to.parent() {
                std::fs::create_dir_all(parent).map_err(Error::Io)?;
            }
            std::fs::copy(&from, &to).map_err(Error::Io)?;
        }
        Ok(())
    }

    async fn clone_remote(url: &str, work_dir: &Path) -> Result<()> {
        let mut attempt = 0;
        let mut backoff = Duration::from_secs(1);
        loop {
            attempt += 1;
            match Self::try_clone(url, work_dir).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < RETRY_ATTEMPTS => {
                    warn!("clone attempt {attempt} failed: {e}; retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    let _ = std::fs::remove_dir_all(work_dir);
                    std::fs::create_dir_all(work_dir).map_err(Error::Io)?;
                }
                Err(e) => {
                    let _ = std::fs::remove_dir_all(work_dir);
                    return Err(e);
                }
            }
        }
    }

    async fn try_clone(url: &str, work_dir: &Path) -> Result<()> {
        run_git(work_dir, &["init"]).await?;
        run_git(work_dir, &["remote", "add", "origin", url]).await?;
        run_git(work_dir, &["fetch", "--depth", "1", "origin"]).await?;

        let branch = Self::select_branch(work_dir).await?;
        run_git(
            work_dir,
            &["checkout", "-b", &branch, &format!("origin/{branch}")],
        )
        .await?;
        Ok(())
    }

    /// Branch preference: `main`, then `master`, then the first non-HEAD
    /// remote branch advertised by the fetch.
    async fn select_branch(work_dir: &Path) -> Result<String> {
        let output = run_git(work_dir, &["branch", "-r"]).await?;
        let remote_branches: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.contains("HEAD"))
            .map(|l| l.trim_start_matches("origin/").to_string())
            .collect();

        if remote_branches.iter().any(|b| b == "main") {
            return Ok("main".to_string());
        }
        if remote_branches.iter().any(|b| b == "master") {
            return Ok("master".to_string());
        }
        remote_branches.into_iter().next().ok_or_else(|| {
            Error::Analysis("repository has no branches to check out".to_string())
        })
    }
}

async fn run_git(work_dir: &Path, args: &[&str]) -> Result<String> {
    let fut = Command::new("git").args(args).current_dir(work_dir).output();
    let output = tokio::time::timeout(CLONE_TIMEOUT, fut)
        .await
        .map_err(|_| Error::Timeout {
            seconds: CLONE_TIMEOUT.as_secs(),
        })?
        .map_err(Error::Io)?;

    if !output.status.success() {
        return Err(Error::ExternalTool {
            tool: "git".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Render an indented ASCII tree of `root`, entries at each level sorted
/// purely lexicographically by name (directories suffixed `/`), per S1.
pub fn generate_file_structure(root: &Path) -> String {
    let exclusion = crate::exclusion::ExclusionManager::for_repo(root);
    let mut lines = Vec::new();
    render_dir(root, root, &exclusion, "", &mut lines);
    lines.join("\n")
}

fn render_dir(
    repo_root: &Path,
    dir: &Path,
    exclusion: &crate::exclusion::ExclusionManager,
    prefix: &str,
    lines: &mut Vec<String>,
) {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => return,
    };
    entries.retain(|p| {
        let rel = p.strip_prefix(repo_root).unwrap_or(p);
        !exclusion.should_exclude(rel, p.is_dir())
    });
    // Purely lexicographic by name: S1 (§8) renders `README.md` before
    // `src/`, so entries are not grouped directories-first.
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let count = entries.len();
    for (i, entry) in entries.iter().enumerate() {
        let is_last = i == count - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let name = entry.file_name().unwrap_or_default().to_string_lossy().to_string();
        if entry.is_dir() {
            lines.push(format!("{prefix}{connector}{name}/"));
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            render_dir(repo_root, entry, exclusion, &child_prefix, lines);
        } else {
            lines.push(format!("{prefix}{connector}{name}"));
        }
    }
}

/// Detect the set of languages present by file extension.
pub fn detect_languages(root: &Path) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for rel in walk_included_files(root) {
        if let Some(ext) = rel.extension().and_then(|e| e.to_str()) {
            if let Some(lang) = language_for_extension(ext) {
                found.insert(lang.to_string());
            }
        }
    }
    debug!("detected languages: {found:?}");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn renders_sorted_tree_dirs_before_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.py"), "").unwrap();
        std::fs::write(dir.path().join("src/b.py"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let tree = generate_file_structure(dir.path());
        assert_eq!(
            tree,
            "├── README.md\n└── src/\n    ├── a.py\n    └── b.py"
        );
    }

    #[test]
    fn detects_python_language() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        let langs = detect_languages(dir.path());
        assert!(langs.contains("python"));
    }
}
