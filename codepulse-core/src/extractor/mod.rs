//! Structural Extractor (component C2).
//!
//! Produces a flat `{functions, classes, imports, comments}` record per
//! source file. Python, JavaScript, TypeScript and Java are parsed with
//! `tree-sitter` grammars already vendored by the workspace; C# and Scala
//! (for which the workspace carries no grammar) fall back to the regex
//! extractor in [`generic`]. Parse failures never abort the pipeline: a
//! file that fails to parse yields an empty record.

pub mod generic;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tree_sitter::{Language, Node, Parser};

use crate::acquirer::language_for_extension;

/// One MiB; content beyond this is truncated before parsing.
pub const MAX_FILE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentKind {
    Line,
    Block,
    Doc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub text: String,
    pub kind: CommentKind,
    /// Name of the declaration this comment immediately precedes, if any.
    pub associated_with: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub parent_class: Option<String>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralRecord {
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub imports: Vec<String>,
    pub comments: Vec<CommentRecord>,
}

/// How a grammar expresses documentation, per §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocStyle {
    /// `//`/`/* ... */` comment nodes; a leading `/**` marks a doc comment
    /// (JSDoc/Javadoc), any other `/*` is a plain block comment.
    CStyleBlock,
    /// Docstrings are `expression_statement > string` nodes, not comments
    /// (the original's `python_parser.py` walks the same shape); `#`
    /// comments are always classified as `Line`.
    PythonDocstring,
}

struct GrammarConfig {
    language: fn() -> Language,
    function_kinds: &'static [&'static str],
    class_kinds: &'static [&'static str],
    import_kinds: &'static [&'static str],
    comment_kinds: &'static [&'static str],
    doc_style: DocStyle,
}

fn grammar_for(language: &str) -> Option<GrammarConfig> {
    match language {
        "python" => Some(GrammarConfig {
            language: || tree_sitter_python::language(),
            function_kinds: &["function_definition"],
            class_kinds: &["class_definition"],
            import_kinds: &["import_statement", "import_from_statement"],
            comment_kinds: &["comment"],
            doc_style: DocStyle::PythonDocstring,
        }),
        "javascript" => Some(GrammarConfig {
            language: || tree_sitter_javascript::language(),
            function_kinds: &["function_declaration", "method_definition"],
            class_kinds: &["class_declaration"],
            import_kinds: &["import_statement"],
            comment_kinds: &["comment"],
            doc_style: DocStyle::CStyleBlock,
        }),
        "typescript" => Some(GrammarConfig {
            language: || tree_sitter_typescript::language_typescript(),
            function_kinds: &["function_declaration", "method_definition"],
            class_kinds: &["class_declaration", "interface_declaration"],
            import_kinds: &["import_statement"],
            comment_kinds: &["comment"],
            doc_style: DocStyle::CStyleBlock,
        }),
        "java" => Some(GrammarConfig {
            language: || tree_sitter_java::language(),
            function_kinds: &["method_declaration", "constructor_declaration"],
            class_kinds: &["class_declaration", "interface_declaration"],
            import_kinds: &["import_declaration"],
            comment_kinds: &["line_comment", "block_comment"],
            doc_style: DocStyle::CStyleBlock,
        }),
        _ => None,
    }
}

/// Read, (possibly truncate), and structurally extract `path`, whose
/// language was already detected from its extension. Returns an empty
/// record on any read/parse failure.
pub fn extract_file(path: &Path) -> StructuralRecord {
    let Some(language) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(language_for_extension)
    else {
        return StructuralRecord::default();
    };

    let content = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            return StructuralRecord::default();
        }
    };
    let truncated = if content.len() > MAX_FILE_BYTES {
        tracing::debug!("truncating {} to {} bytes", path.display(), MAX_FILE_BYTES);
        &content[..MAX_FILE_BYTES]
    } else {
        &content[..]
    };
    let Ok(source) = std::str::from_utf8(truncated) else {
        return StructuralRecord::default();
    };

    match grammar_for(language) {
        Some(config) => extract_with_tree_sitter(source, &config)
            .unwrap_or_else(|| generic::extract(source, language)),
        None => generic::extract(source, language),
    }
}

/// Extract every file in `files` (repo-relative to `root`), dispatched over
/// Rayon's global thread pool so this CPU-bound pass does not monopolize a
/// single OS thread while other analysis threads' I/O- and LLM-bound work
/// is in flight (per the concurrency model's bounded-worker-pool note).
/// `files` is already capped at [`crate::exclusion::MAX_WALKED_FILES`] by
/// the caller's walk.
pub fn extract_all(root: &Path, files: &[PathBuf]) -> Vec<(String, StructuralRecord)> {
    files
        .par_iter()
        .map(|rel| {
            let record = extract_file(&root.join(rel));
            (rel.to_string_lossy().replace('\\', "/"), record)
        })
        .collect()
}

fn extract_with_tree_sitter(source: &str, config: &GrammarConfig) -> Option<StructuralRecord> {
    let mut parser = Parser::new();
    parser.set_language((config.language)()).ok()?;
    let tree = parser.parse(source, None)?;
    let src = source.as_bytes();

    let mut record = StructuralRecord::default();
    if config.doc_style == DocStyle::PythonDocstring {
        if let Some(text) = leading_docstring(tree.root_node(), src) {
            record.comments.push(CommentRecord {
                text,
                kind: CommentKind::Doc,
                associated_with: None,
            });
        }
    }
    walk(tree.root_node(), None, src, config, &mut record);
    Some(record)
}

/// The docstring convention (§4.2): a module, class or function body whose
/// first statement is a bare string-literal expression. Not a comment node,
/// so it is detected structurally rather than via [`DocStyle::CStyleBlock`]'s
/// text-prefix check.
fn leading_docstring(body: Node, src: &[u8]) -> Option<String> {
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut inner = first.walk();
    let string_node = first.named_children(&mut inner).next()?;
    if string_node.kind() != "string" {
        return None;
    }
    string_node.utf8_text(src).ok().map(str::to_string)
}

/// Classify a C-style comment's text: `/**` is a doc comment, any other
/// `/*` is a plain block comment, everything else (`//`) is a line comment.
fn classify_comment_text(text: &str) -> CommentKind {
    let trimmed = text.trim_start();
    if trimmed.starts_with("/**") {
        CommentKind::Doc
    } else if trimmed.starts_with("/*") {
        CommentKind::Block
    } else {
        CommentKind::Line
    }
}

fn node_name(node: Node, src: &[u8]) -> Option<String> {
    node.child_by_field_name("name")
        .and_then(|n| n.utf8_text(src).ok())
        .map(str::to_string)
}

fn preceding_comment<'a>(node: Node<'a>) -> Option<Node<'a>> {
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.is_extra() || s.kind() == "comment" || s.kind().ends_with("_comment") {
            return Some(s);
        }
        if !s.kind().trim().is_empty() {
            break;
        }
        sibling = s.prev_sibling();
    }
    None
}

fn walk(
    node: Node,
    current_class: Option<&str>,
    src: &[u8],
    config: &GrammarConfig,
    record: &mut StructuralRecord,
) {
    let kind = node.kind();

    if config.comment_kinds.contains(&kind) {
        let text = node.utf8_text(src).unwrap_or("").to_string();
        let comment_kind = match config.doc_style {
            DocStyle::CStyleBlock => classify_comment_text(&text),
            DocStyle::PythonDocstring => CommentKind::Line,
        };
        record.comments.push(CommentRecord {
            text,
            kind: comment_kind,
            associated_with: None,
        });
    } else if config.import_kinds.contains(&kind) {
        if let Ok(text) = node.utf8_text(src) {
            record.imports.push(text.trim().to_string());
        }
    } else if config.class_kinds.contains(&kind) {
        if let Some(name) = node_name(node, src) {
            record.classes.push(ClassRecord {
                name: name.clone(),
                line_start: node.start_position().row + 1,
                line_end: node.end_position().row + 1,
            });
            annotate_preceding_comment(node, &name, src, record);
            annotate_docstring(node, &name, config, src, record);
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                walk(child, Some(&name), src, config, record);
            }
            return;
        }
    } else if config.function_kinds.contains(&kind) {
        if let Some(name) = node_name(node, src) {
            record.functions.push(FunctionRecord {
                name: name.clone(),
                parent_class: current_class.map(str::to_string),
                line_start: node.start_position().row + 1,
                line_end: node.end_position().row + 1,
            });
            annotate_preceding_comment(node, &name, src, record);
            annotate_docstring(node, &name, config, src, record);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, current_class, src, config, record);
    }
}

/// For [`DocStyle::PythonDocstring`] grammars, record `node`'s body-leading
/// docstring (if any) as a `Doc` comment associated with `name`.
fn annotate_docstring(node: Node, name: &str, config: &GrammarConfig, src: &[u8], record: &mut StructuralRecord) {
    if config.doc_style != DocStyle::PythonDocstring {
        return;
    }
    if let Some(body) = node.child_by_field_name("body") {
        if let Some(text) = leading_docstring(body, src) {
            record.comments.push(CommentRecord {
                text,
                kind: CommentKind::Doc,
                associated_with: Some(name.to_string()),
            });
        }
    }
}

fn annotate_preceding_comment(node: Node, name: &str, src: &[u8], record: &mut StructuralRecord) {
    if let Some(comment_node) = preceding_comment(node) {
        if let Ok(text) = comment_node.utf8_text(src) {
            if let Some(existing) = record
                .comments
                .iter_mut()
                .rev()
                .find(|c| c.text == text && c.associated_with.is_none())
            {
                existing.associated_with = Some(name.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extracts_python_function_and_class() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("mod.py");
        std::fs::write(
            &file,
            "import os\n\nclass Foo:\n    def bar(self):\n        pass\n",
        )
        .unwrap();

        let record = extract_file(&file);
        assert_eq!(record.classes.len(), 1);
        assert_eq!(record.classes[0].name, "Foo");
        assert_eq!(record.functions.len(), 1);
        assert_eq!(record.functions[0].name, "bar");
        assert_eq!(record.functions[0].parent_class.as_deref(), Some("Foo"));
        assert_eq!(record.imports, vec!["import os".to_string()]);
    }

    #[test]
    fn captures_python_module_class_and_function_docstrings() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("mod.py");
        std::fs::write(
            &file,
            "\"\"\"module doc\"\"\"\n\nclass Foo:\n    \"\"\"class doc\"\"\"\n\n    def bar(self):\n        \"\"\"function doc\"\"\"\n        pass\n",
        )
        .unwrap();

        let record = extract_file(&file);
        let docs: Vec<&CommentRecord> = record
            .comments
            .iter()
            .filter(|c| c.kind == CommentKind::Doc)
            .collect();
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().any(|c| c.text.contains("module doc") && c.associated_with.is_none()));
        assert!(docs.iter().any(|c| c.text.contains("class doc") && c.associated_with.as_deref() == Some("Foo")));
        assert!(docs.iter().any(|c| c.text.contains("function doc") && c.associated_with.as_deref() == Some("bar")));
    }

    #[test]
    fn classifies_js_block_vs_doc_comments() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("mod.js");
        std::fs::write(
            &file,
            "/** jsdoc */\nfunction foo() {}\n\n/* plain block */\nfunction bar() {}\n",
        )
        .unwrap();

        let record = extract_file(&file);
        let doc = record.comments.iter().find(|c| c.text.contains("jsdoc")).unwrap();
        assert_eq!(doc.kind, CommentKind::Doc);
        let block = record.comments.iter().find(|c| c.text.contains("plain block")).unwrap();
        assert_eq!(block.kind, CommentKind::Block);
    }

    #[test]
    fn unparsable_file_yields_empty_record() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("weird.py");
        std::fs::write(&file, "def (((( broken").unwrap();
        // tree-sitter still returns a (partial/error) tree, so this mainly
        // exercises the "no crash on malformed input" path.
        let _ = extract_file(&file);
    }

    #[test]
    fn unsupported_extension_yields_empty_record() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();
        let record = extract_file(&file);
        assert!(record.functions.is_empty() && record.classes.is_empty());
    }
}
