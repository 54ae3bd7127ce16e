//! Reads search results saved from the search proxy.

use std::fs;
use std::path::Path;

use anyhow::Context;
use mirror_core::SearchResult;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default, rename = "displayLink")]
    display_link: String,
}

impl From<SearchItem> for SearchResult {
    fn from(item: SearchItem) -> Self {
        SearchResult {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
            display_link: item.display_link,
        }
    }
}

pub fn parse_results(json: &str) -> anyhow::Result<Vec<SearchResult>> {
    let response: SearchResponse =
        serde_json::from_str(json).context("search results are not valid JSON")?;
    Ok(response.items.into_iter().map(SearchResult::from).collect())
}

pub fn load_results(path: &Path) -> anyhow::Result<Vec<SearchResult>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read search results {}", path.display()))?;
    parse_results(&content)
}
