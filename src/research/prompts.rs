//! Instructions and prompt builders for the three model-backed stages.

use crate::research::types::{GlobalSource, SearchPlanItem};
use serde_json::Value;

pub fn planner_instructions(count: usize) -> String {
    format!(
        "You are a helpful research assistant. Given a query, come up with a set of web searches \
         to perform to best answer the query. Output {} terms to query for. Each search needs a \
         short reason explaining what it should find.",
        count
    )
}

pub fn planner_prompt(query: &str) -> String {
    format!("Query: {}", query)
}

pub fn search_instructions(site_filter: Option<&str>) -> String {
    let scope = match site_filter {
        Some(site) => format!(
            " Search only on {site}; the way to do that is to put \"site:{site}\" in the search term.",
            site = site
        ),
        None => String::new(),
    };

    format!(
        "You are a research assistant. Given a search term, you search the web for that term and \
         produce a concise summary of the results.{} The summary must be 2-3 paragraphs and less \
         than 300 words. Capture the main points. Write succinctly, no need to have complete \
         sentences or good grammar. This will be consumed by someone synthesizing a report, so it \
         is vital you capture the essence and ignore any fluff. Do not include any commentary \
         other than the summary itself. List the pages you used in `sources` with their title and \
         url, and do not number citations inside the summary text.",
        scope
    )
}

pub fn search_prompt(item: &SearchPlanItem) -> String {
    format!(
        "Search term: {}\nReason for searching: {}",
        item.query, item.reason
    )
}

/// Search prompt with results already fetched, for providers without tools.
pub fn prefetched_search_prompt(item: &SearchPlanItem, results: &Value) -> String {
    let mut prompt = search_prompt(item);
    prompt.push_str("\n\nSearch results:\n");

    let entries = results
        .get("results")
        .and_then(|r| r.as_array())
        .map(|r| r.as_slice())
        .unwrap_or_default();

    if entries.is_empty() {
        prompt.push_str("(no results)\n");
    }
    for (i, entry) in entries.iter().enumerate() {
        let field = |name: &str| {
            entry
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        prompt.push_str(&format!(
            "{}. {}\n   {}\n   {}\n",
            i + 1,
            field("title"),
            field("url"),
            field("description")
        ));
    }

    prompt
}

pub const WRITER_INSTRUCTIONS: &str = "You are a senior researcher tasked with writing a cohesive \
report for a research query. You will be provided with the original query, some initial research \
done by a research assistant, and a numbered list of sources.\n\
You should first come up with an outline for the report that describes its structure and flow, \
highlighting the topics the research uncovered. Then write the report and return it as your final \
output. Cite sources inline with their bracketed number, e.g. [2], and end the report with a \
References section listing the sources you cited.\n\
The report must be markdown, cover the research briefly, stay under 500 words and be concise and \
to the point.";

pub fn writer_prompt(query: &str, research: &str, sources: &[GlobalSource]) -> String {
    let mut prompt = format!(
        "Original query: {}\n\nSummarized search results:\n{}\n\nSources:\n",
        query, research
    );

    if sources.is_empty() {
        prompt.push_str("(none)\n");
    }
    for source in sources {
        prompt.push_str(&format!(
            "[{}] {} - {}\n",
            source.global_id, source.title, source.url
        ));
    }

    prompt
}
