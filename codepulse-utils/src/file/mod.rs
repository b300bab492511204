//! Small path helpers shared by the crates that touch the filesystem
//! directly (the checkpoint store's on-disk database, the acquirer's
//! per-thread working directories).

use std::path::{Path, PathBuf};

/// Join `base` and `relative`, normalizing away any `.`/`..` components the
/// way `path_clean` does, so the result never escapes `base` through a
/// `..`-laden relative path.
pub fn safe_path_join(base: &Path, relative: &Path) -> PathBuf {
    path_clean::clean(base.join(relative))
}

/// Create `dir` and all of its ancestors if they do not already exist.
pub fn ensure_dir(dir: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_path_join_normalizes_dotdot() {
        let joined = safe_path_join(Path::new("/tmp/repo"), Path::new("../etc/passwd"));
        assert_eq!(joined, PathBuf::from("/tmp/etc/passwd"));
    }
}
