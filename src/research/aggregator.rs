use crate::research::types::{AggregatedFindings, GlobalSource, SearchOutcome};

/// Merge search outcomes under one citation numbering.
///
/// Outcomes are taken in the order given (arrival order) and each outcome's
/// sources keep their local order, so sources from one search always get
/// consecutive ids. Duplicated URLs across searches are kept as distinct
/// entries.
pub fn aggregate(outcomes: Vec<SearchOutcome>) -> AggregatedFindings {
    let mut findings = AggregatedFindings::default();
    let mut next_id = 1;

    for outcome in outcomes {
        for source in outcome.sources {
            findings.sources.push(GlobalSource {
                global_id: next_id,
                title: source.title,
                url: source.url,
                local_id: source.local_id,
            });
            next_id += 1;
        }
        findings.contents.push(outcome.content);
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::types::SourceRef;

    fn outcome(content: &str, urls: &[&str]) -> SearchOutcome {
        SearchOutcome {
            content: content.to_string(),
            sources: urls
                .iter()
                .enumerate()
                .map(|(i, url)| SourceRef {
                    title: format!("title {}", url),
                    url: url.to_string(),
                    local_id: i + 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_ids_contiguous_across_outcomes() {
        let findings = aggregate(vec![
            outcome("first", &["https://a", "https://b"]),
            outcome("second", &["https://c"]),
        ]);

        assert_eq!(findings.contents, vec!["first", "second"]);
        let ids: Vec<(usize, usize)> = findings
            .sources
            .iter()
            .map(|s| (s.global_id, s.local_id))
            .collect();
        assert_eq!(ids, vec![(1, 1), (2, 2), (3, 1)]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let findings = aggregate(vec![
            outcome("x", &["https://same"]),
            outcome("y", &["https://same"]),
        ]);
        assert_eq!(findings.sources.len(), 2);
        assert_eq!(findings.sources[1].global_id, 2);
    }

    #[test]
    fn test_outcome_without_sources_still_contributes_content() {
        let findings = aggregate(vec![outcome("no links", &[]), outcome("links", &["https://a"])]);
        assert_eq!(findings.contents.len(), 2);
        assert_eq!(findings.sources[0].global_id, 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(aggregate(Vec::new()), AggregatedFindings::default());
    }
}
