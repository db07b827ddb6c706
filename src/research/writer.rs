use crate::llm::client::LLMClient;
use crate::llm::structured::generate_structured;
use crate::research::prompts::{writer_prompt, WRITER_INSTRUCTIONS};
use crate::research::types::{AggregatedFindings, GlobalSource, Report};
use crate::types::ResearchError;
use std::sync::Arc;

pub const CONTENT_SEPARATOR: &str = "\n\n---\n\n";
pub const TRUNCATION_MARKER: &str = "\n\n[... research content truncated ...]";

const REFERENCE_WORDS: [&str; 5] = ["references", "reference", "sources", "citations", "bibliography"];

/// Synthesizes the final report from aggregated findings.
pub struct ReportWriter {
    llm: Arc<dyn LLMClient>,
    content_budget: usize,
}

impl ReportWriter {
    pub fn new(llm: Arc<dyn LLMClient>, content_budget: usize) -> Self {
        Self {
            llm,
            content_budget,
        }
    }

    pub async fn write(
        &self,
        query: &str,
        findings: &AggregatedFindings,
    ) -> Result<Report, ResearchError> {
        let research = truncate_content(
            &findings.contents.join(CONTENT_SEPARATOR),
            self.content_budget,
        );

        let mut report: Report = generate_structured(
            self.llm.as_ref(),
            WRITER_INSTRUCTIONS,
            &writer_prompt(query, &research, &findings.sources),
        )
        .await
        .map_err(|e| ResearchError::Writing(e.to_string()))?;

        if report.markdown_report.trim().is_empty() {
            return Err(ResearchError::Writing(
                "Writer returned an empty report".to_string(),
            ));
        }

        report.markdown_report = ensure_references(report.markdown_report, &findings.sources);
        Ok(report)
    }
}

/// Cut `text` to `budget` characters and mark the cut.
///
/// Text already cut by this function comes back unchanged.
pub fn truncate_content(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }

    if let Some(kept) = text.strip_suffix(TRUNCATION_MARKER) {
        if kept.chars().count() <= budget {
            return text.to_string();
        }
    }

    let mut cut: String = text.chars().take(budget).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Whether the markdown already has a references-style section title.
///
/// Counts Markdown headings (`## 5. References`, `### Sources and Further
/// Reading`), bold lines (`**References**`) and bare title lines
/// (`References:`).
pub fn has_references_section(markdown: &str) -> bool {
    markdown.lines().any(is_references_title)
}

fn is_references_title(line: &str) -> bool {
    let line = line.trim().trim_end_matches(':').trim_end();

    let level = line.chars().take_while(|c| *c == '#').count();
    if level > 0 {
        let rest = &line[level..];
        return level <= 6
            && rest.starts_with(char::is_whitespace)
            && names_references(rest.trim_end_matches('#'), false);
    }

    for marker in ["**", "__"] {
        if line.len() > 2 * marker.len() && line.starts_with(marker) && line.ends_with(marker) {
            let inner = &line[marker.len()..line.len() - marker.len()];
            return names_references(inner, false);
        }
    }

    names_references(line, true)
}

/// Heading and bold titles match on their first or last word, bare lines
/// only when the keyword is the whole line.
fn names_references(title: &str, whole_line: bool) -> bool {
    let words: Vec<String> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .skip_while(|w| w.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .collect();

    let is_keyword = |word: &String| REFERENCE_WORDS.contains(&word.as_str());

    match words.as_slice() {
        [] => false,
        [only] => is_keyword(only),
        _ if whole_line => false,
        [first, .., last] => is_keyword(first) || is_keyword(last),
    }
}

/// Append a `## References` section unless one is present or there is
/// nothing to cite.
pub fn ensure_references(markdown: String, sources: &[GlobalSource]) -> String {
    if sources.is_empty() || has_references_section(&markdown) {
        return markdown;
    }

    let mut sorted: Vec<&GlobalSource> = sources.iter().collect();
    sorted.sort_by_key(|s| s.global_id);

    let mut out = markdown.trim_end().to_string();
    out.push_str("\n\n## References\n\n");
    for source in sorted {
        out.push_str(&format!(
            "{}. {} - {}\n",
            source.global_id, source.title, source.url
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn source(id: usize) -> GlobalSource {
        GlobalSource {
            global_id: id,
            title: format!("Title {}", id),
            url: format!("https://example.com/{}", id),
            local_id: 1,
        }
    }

    #[test]
    fn test_truncates_to_budget_plus_marker() {
        let text = "a".repeat(5000);
        let cut = truncate_content(&text, 3000);
        assert_eq!(cut.chars().count(), 3000 + TRUNCATION_MARKER.chars().count());
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncate_content(&text, 3000), cut);
    }

    #[test]
    fn test_truncation_idempotent() {
        let text = "word ".repeat(1000);
        let once = truncate_content(&text, 3000);
        assert_eq!(truncate_content(&once, 3000), once);
    }

    #[test]
    fn test_short_content_untouched() {
        assert_eq!(truncate_content("short", 3000), "short");
    }

    #[test]
    fn test_truncation_counts_chars() {
        let text = "ß".repeat(10);
        let cut = truncate_content(&text, 4);
        assert!(cut.starts_with("ßßßß\n"));
    }

    #[rstest]
    #[case("# Report\n\n## References\n1. x", true)]
    #[case("## sources:\n- a", true)]
    #[case("### Citations ###", true)]
    #[case("  #### REFERENCES", true)]
    #[case("# Report\n\nSee the references below.", false)]
    #[case("#References", false)]
    #[case("## Further sources of confusion", false)]
    #[case("## 5. References", true)]
    #[case("### 2.1 Sources", true)]
    #[case("## References and Further Reading", true)]
    #[case("## Further Reading and Citations", true)]
    #[case("**References**", true)]
    #[case("**Sources:**", true)]
    #[case("__Bibliography__", true)]
    #[case("References:", true)]
    #[case("Sources", true)]
    #[case("**Note**: the sources disagree", false)]
    #[case("Our sources disagree on this point.", false)]
    fn test_has_references_section(#[case] markdown: &str, #[case] expected: bool) {
        assert_eq!(has_references_section(markdown), expected);
    }

    #[test]
    fn test_appends_references_sorted() {
        let out = ensure_references("# Report\n\nBody [2].\n".to_string(), &[source(2), source(1)]);
        assert!(out.ends_with(
            "## References\n\n1. Title 1 - https://example.com/1\n2. Title 2 - https://example.com/2\n"
        ));
    }

    #[test]
    fn test_existing_section_not_duplicated() {
        let markdown = "# Report\n\n## Sources\n\n1. x".to_string();
        let out = ensure_references(markdown.clone(), &[source(1)]);
        assert_eq!(out, markdown);
        let again = ensure_references(ensure_references("# R".to_string(), &[source(1)]), &[source(1)]);
        assert_eq!(again.matches("## References").count(), 1);
    }

    #[rstest]
    #[case("## 5. References")]
    #[case("**References**")]
    #[case("## References and Further Reading")]
    #[case("References:")]
    fn test_existing_section_variants_not_duplicated(#[case] heading: &str) {
        let markdown = format!("# Report\n\nBody [1].\n\n{}\n\n1. A - https://a\n", heading);
        let out = ensure_references(markdown.clone(), &[source(1)]);
        assert_eq!(out, markdown);
    }

    #[test]
    fn test_no_sources_no_section() {
        let out = ensure_references("# Report".to_string(), &[]);
        assert_eq!(out, "# Report");
    }
}
