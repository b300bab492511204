//! Chunker (component C3) — the non-LLM half.
//!
//! Builds the "simplified structure" used in the chunking planning prompt
//! under the same two-cap budget as the original (`chunk_processor.py`'s
//! `create_simplified_structure`: 300 files, 180,000 estimated tokens), and
//! realizes a planner-produced chunk (glob expansion + file concatenation)
//! exactly as `process_chunk` does, including its `\n\n--- <path> ---\n`
//! separator. The LLM call itself (building/issuing the planning prompt)
//! lives in `codepulse-llm`, which calls back into this module.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSetBuilder};
use once_cell::sync::OnceCell;

use crate::model::{CodeChunk, SimplifiedFileEntry, SimplifiedStructure};
use crate::{Error, Result};

pub const MAX_SIMPLIFIED_FILES: usize = 300;
pub const MAX_SIMPLIFIED_TOKENS: usize = 180_000;

static ENCODING: OnceCell<tiktoken_rs::CoreBPE> = OnceCell::new();

/// The single fixed tokenizer encoding used for the lifetime of the
/// process, per the "fixed tokenizer" design note.
fn encoding() -> &'static tiktoken_rs::CoreBPE {
    ENCODING.get_or_init(|| tiktoken_rs::cl100k_base().expect("cl100k_base is always available"))
}

/// Real token count via the fixed encoding, used for the hard prompt-size
/// gate (not for the cheap per-file cutoff below).
pub fn count_tokens(text: &str) -> usize {
    encoding().encode_with_special_tokens(text).len()
}

/// Cheap length-based estimate mirroring the original's per-file heuristic:
/// `len(path) * 2 + sum(len(str(func))) + sum(len(str(cls))) [+ comments]`.
fn estimate_file_tokens(path: &str, entry: &SimplifiedFileEntry) -> usize {
    let mut total = path.len() * 2;
    total += entry.functions.iter().map(String::len).sum::<usize>();
    total += entry.classes.iter().map(String::len).sum::<usize>();
    if let Some(comments) = &entry.comments {
        total += comments.iter().map(String::len).sum::<usize>();
    }
    total
}

/// Build the simplified structure from per-file structural records, in
/// lexicographic path order, stopping at the 300-file or 180,000-estimated-
/// token cap, whichever comes first. When `include_comments` is false
/// (the retry path after an over-budget prompt) comment fields are omitted.
pub fn build_simplified_structure(
    records: &[(String, crate::extractor::StructuralRecord)],
    include_comments: bool,
) -> SimplifiedStructure {
    let mut sorted: Vec<&(String, crate::extractor::StructuralRecord)> = records.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut structure = SimplifiedStructure::new();
    let mut running_tokens = 0usize;

    for (path, record) in sorted {
        if structure.len() >= MAX_SIMPLIFIED_FILES {
            tracing::debug!("simplified structure hit {MAX_SIMPLIFIED_FILES}-file cap");
            break;
        }

        let entry = SimplifiedFileEntry {
            path: path.clone(),
            functions: record.functions.iter().map(|f| f.name.clone()).collect(),
            classes: record.classes.iter().map(|c| c.name.clone()).collect(),
            comments: if include_comments && !record.comments.is_empty() {
                Some(record.comments.iter().map(|c| c.text.clone()).collect())
            } else {
                None
            },
        };

        let estimate = estimate_file_tokens(path, &entry);
        if running_tokens + estimate > MAX_SIMPLIFIED_TOKENS && !structure.is_empty() {
            tracing::debug!("simplified structure hit {MAX_SIMPLIFIED_TOKENS}-token cap");
            break;
        }
        running_tokens += estimate;
        structure.insert(path.clone(), entry);
    }

    structure
}

/// Expand a chunk's glob-or-literal file entries against `repo_root`,
/// keeping only regular files, preserving discovery order, deduplicated.
pub fn expand_globs(repo_root: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for pattern in patterns {
        if !has_glob_metachars(pattern) {
            // Planner-supplied paths are LLM output, not trusted input;
            // clean away any `..` before checking it stays under the repo
            // root so a planned chunk can't read outside the working copy.
            let candidate = codepulse_utils::file::safe_path_join(repo_root, Path::new(pattern));
            if candidate.starts_with(repo_root) && candidate.is_file() && seen.insert(pattern.clone()) {
                out.push(pattern.clone());
            }
            continue;
        }

        let mut builder = GlobSetBuilder::new();
        let glob = Glob::new(pattern)
            .map_err(|e| Error::Parse(format!("invalid glob pattern '{pattern}': {e}")))?;
        builder.add(glob);
        let set = builder
            .build()
            .map_err(|e| Error::Parse(format!("invalid glob pattern '{pattern}': {e}")))?;

        let mut matches: Vec<String> = crate::exclusion::walk_included_files(repo_root)
            .into_iter()
            .filter(|rel| set.is_match(rel))
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            .collect();
        matches.sort();
        for m in matches {
            if seen.insert(m.clone()) {
                out.push(m);
            }
        }
    }

    Ok(out)
}

fn has_glob_metachars(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', ']'])
}

/// Read a file's UTF-8 content, ignoring invalid bytes, as the original's
/// `read_file_content` does.
fn read_file_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(Error::Io)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Realize one planner-produced chunk: expand its file patterns, read and
/// concatenate content with the `\n\n--- <path> ---\n` separator.
pub fn realize_chunk(
    repo_root: &Path,
    chunk_id: String,
    description: String,
    file_patterns: &[String],
) -> Result<CodeChunk> {
    let files = expand_globs(repo_root, file_patterns)?;
    if files.is_empty() {
        tracing::warn!("chunk {chunk_id} expanded to zero files");
    }

    let mut content = String::new();
    for rel in &files {
        let full = repo_root.join(rel);
        match read_file_lossy(&full) {
            Ok(text) => {
                content.push_str(&format!("\n\n--- {rel} ---\n"));
                content.push_str(&text);
            }
            Err(e) => {
                tracing::warn!("skipping unreadable chunk file {rel}: {e}");
            }
        }
    }

    Ok(CodeChunk {
        chunk_id,
        description,
        files,
        content,
    })
}

/// Index structural records by repo-relative path for later chunk lookups.
/// Dispatches extraction over the bounded Rayon pool (see
/// [`crate::extractor::extract_all`]) rather than walking files one at a
/// time.
pub fn index_by_path(
    root: &Path,
    files: &[PathBuf],
) -> Vec<(String, crate::extractor::StructuralRecord)> {
    crate::extractor::extract_all(root, files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn expands_recursive_glob_sorted() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("dir1")).unwrap();
        std::fs::write(dir.path().join("dir1/t1.py"), "").unwrap();
        std::fs::write(dir.path().join("dir1/t2.py"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("dir2/sub")).unwrap();
        std::fs::write(dir.path().join("dir2/sub/t4.py"), "").unwrap();

        let files = expand_globs(dir.path(), &["**/*.py".to_string()]).unwrap();
        assert_eq!(
            files,
            vec![
                "a.py".to_string(),
                "dir1/t1.py".to_string(),
                "dir1/t2.py".to_string(),
                "dir2/sub/t4.py".to_string(),
            ]
        );
    }

    #[test]
    fn rejects_literal_path_traversal_outside_repo_root() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        let outside = tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
        let traversal = format!("../{}/secret.txt", outside.path().file_name().unwrap().to_string_lossy());

        let files = expand_globs(dir.path(), &[traversal]).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn realize_chunk_concatenates_with_header() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "print(1)").unwrap();
        let chunk = realize_chunk(
            dir.path(),
            "c1".to_string(),
            "desc".to_string(),
            &["a.py".to_string()],
        )
        .unwrap();
        assert_eq!(chunk.content, "\n\n--- a.py ---\nprint(1)");
    }

    #[test]
    fn simplified_structure_respects_file_cap() {
        let mut records = Vec::new();
        for i in 0..400 {
            records.push((
                format!("file{i:04}.py"),
                crate::extractor::StructuralRecord::default(),
            ));
        }
        let structure = build_simplified_structure(&records, true);
        assert_eq!(structure.len(), MAX_SIMPLIFIED_FILES);
    }
}
