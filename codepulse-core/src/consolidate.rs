//! Consolidator (component C6) — the non-LLM half: heading renumbering and
//! document assembly. The LLM call that derives the product-requirements
//! document from the assembled text lives in `codepulse-llm`, which calls
//! back into `renumber_section` and `assemble` here.

use crate::model::ReportSections;

/// Renumber one section's markdown headings in place, per §4.6:
/// - `# X` -> `## N. X` (the section's own, already-known index)
/// - `## X` -> `### N.M. X`, M counting sub-headings within this section
/// - `###` and deeper are deepened by one level with no numbering added
///
/// Non-heading lines are passed through verbatim.
pub fn renumber_section(markdown: &str, section_index: usize) -> String {
    let mut out = String::new();
    let mut sub_index = 0usize;

    for line in markdown.lines() {
        let level = heading_level(line);
        match level {
            Some(1) => {
                let title = line.trim_start_matches('#').trim_start();
                out.push_str(&format!("## {section_index}. {title}\n"));
            }
            Some(2) => {
                sub_index += 1;
                let title = line.trim_start_matches('#').trim_start();
                out.push_str(&format!("### {section_index}.{sub_index}. {title}\n"));
            }
            Some(n) => {
                let title = line.trim_start_matches('#').trim_start();
                let hashes = "#".repeat(n + 1);
                out.push_str(&format!("{hashes} {title}\n"));
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    // Drop the single trailing newline added by the loop so callers can
    // freely join sections with their own separators.
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Returns `Some(n)` when `line` is an ATX heading of level `n` (count of
/// leading `#`s), `None` otherwise.
fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if rest.is_empty() || rest.starts_with(' ') {
        Some(hashes)
    } else {
        None
    }
}

/// Build the prologue header required by invariant I4: repository URL and
/// the sorted set of detected languages, preceding the renumbered sections.
pub fn prologue(repo_url: &str, languages_used: &std::collections::HashSet<String>) -> String {
    let mut sorted: Vec<&String> = languages_used.iter().collect();
    sorted.sort();
    let langs = if sorted.is_empty() {
        "none detected".to_string()
    } else {
        sorted
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("# Code Analysis Report\n\n**Repository:** {repo_url}\n**Languages used:** {langs}\n")
}

/// Assemble the final consolidated report: the prologue header followed by
/// each populated section, renumbered in `ReportSections`' declaration
/// order (invariant I4).
pub fn assemble(
    repo_url: &str,
    languages_used: &std::collections::HashSet<String>,
    sections: &ReportSections,
) -> String {
    let mut doc = prologue(repo_url, languages_used);

    for (index, content) in sections.populated() {
        doc.push('\n');
        doc.push_str(&renumber_section(content, index));
        doc.push('\n');
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbers_headings_per_section() {
        let data_model = renumber_section("# Data Model\n## Entities\n### Detail", 1);
        assert_eq!(data_model, "## 1. Data Model\n### 1.1. Entities\n#### Detail");

        let interfaces = renumber_section("# Interfaces\n## REST", 2);
        assert_eq!(interfaces, "## 2. Interfaces\n### 2.1. REST");
    }

    #[test]
    fn empty_sections_yield_prologue_only() {
        let sections = ReportSections::default();
        let mut langs = std::collections::HashSet::new();
        langs.insert("python".to_string());
        let doc = assemble("https://example.com/repo.git", &langs, &sections);
        assert_eq!(
            doc,
            "# Code Analysis Report\n\n**Repository:** https://example.com/repo.git\n**Languages used:** python\n"
        );
    }

    #[test]
    fn deepens_h3_without_numbering() {
        let out = renumber_section("### Already Deep", 1);
        assert_eq!(out, "#### Already Deep");
    }
}
