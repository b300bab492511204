//! Regex-based structural extraction for languages with no vendored
//! tree-sitter grammar (C#, Scala), grounded in the original's hand-rolled
//! per-language parsers that never depended on a grammar library either.

use regex::Regex;

use super::{ClassRecord, CommentKind, CommentRecord, FunctionRecord, StructuralRecord};

pub fn extract(source: &str, language: &str) -> StructuralRecord {
    match language {
        "csharp" => extract_csharp(source),
        "scala" => extract_scala(source),
        _ => extract_fallback(source),
    }
}

fn extract_csharp(source: &str) -> StructuralRecord {
    let class_re = Regex::new(r"(?m)^\s*(?:public|private|internal|protected)?\s*(?:static|sealed|abstract)?\s*class\s+(\w+)").expect("static regex");
    let method_re = Regex::new(r"(?m)^\s*(?:public|private|internal|protected)?\s*(?:static|virtual|override|async)?\s*[\w<>\[\],\s]+\s+(\w+)\s*\([^;{]*\)\s*\{").expect("static regex");
    let using_re = Regex::new(r"(?m)^\s*using\s+([\w.]+)\s*;").expect("static regex");
    extract_with_regexes(source, &class_re, &method_re, &using_re, "//", "///")
}

fn extract_scala(source: &str) -> StructuralRecord {
    let class_re = Regex::new(r"(?m)^\s*(?:case\s+)?(?:class|object|trait)\s+(\w+)").expect("static regex");
    let method_re = Regex::new(r"(?m)^\s*(?:private|protected)?\s*def\s+(\w+)\s*[\(:]").expect("static regex");
    let import_re = Regex::new(r"(?m)^\s*import\s+([\w.{}, ]+)").expect("static regex");
    extract_with_regexes(source, &class_re, &method_re, &import_re, "//", "/**")
}

fn extract_fallback(source: &str) -> StructuralRecord {
    let mut record = StructuralRecord::default();
    for (i, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with('#') {
            record.comments.push(CommentRecord {
                text: trimmed.to_string(),
                kind: CommentKind::Line,
                associated_with: None,
            });
        }
        let _ = i;
    }
    record
}

fn extract_with_regexes(
    source: &str,
    class_re: &regex::Regex,
    method_re: &regex::Regex,
    import_re: &regex::Regex,
    line_comment_prefix: &str,
    doc_comment_prefix: &str,
) -> StructuralRecord {
    let mut record = StructuralRecord::default();

    for cap in class_re.captures_iter(source) {
        if let Some(name) = cap.get(1) {
            record.classes.push(ClassRecord {
                name: name.as_str().to_string(),
                line_start: line_of(source, name.start()),
                line_end: line_of(source, name.start()),
            });
        }
    }
    for cap in method_re.captures_iter(source) {
        if let Some(name) = cap.get(1) {
            record.functions.push(FunctionRecord {
                name: name.as_str().to_string(),
                parent_class: None,
                line_start: line_of(source, name.start()),
                line_end: line_of(source, name.start()),
            });
        }
    }
    for cap in import_re.captures_iter(source) {
        if let Some(name) = cap.get(1) {
            record.imports.push(name.as_str().trim().to_string());
        }
    }
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(doc_comment_prefix) {
            record.comments.push(CommentRecord {
                text: trimmed.to_string(),
                kind: CommentKind::Doc,
                associated_with: None,
            });
        } else if trimmed.starts_with(line_comment_prefix) {
            record.comments.push(CommentRecord {
                text: trimmed.to_string(),
                kind: CommentKind::Line,
                associated_with: None,
            });
        }
    }

    record
}

fn line_of(source: &str, byte_offset: usize) -> usize {
    source[..byte_offset.min(source.len())].matches('\n').count() + 1
}
