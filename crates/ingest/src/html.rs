use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("whitespace pattern is valid"));

const ROOT_CANDIDATES: [&str; 3] = ["article", "main", "body"];
const TEXT_BLOCKS: &str = "p, h1, h2, h3, h4, h5, h6, li, article, section";

/// Best-effort readable text from an HTML page.
///
/// Picks the first `article`, then `main`, then `body` as the root and joins the
/// text of its block elements. When no block yields text the root's full text is
/// used instead. Runs of whitespace collapse to a single space.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = ROOT_CANDIDATES.iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document.select(&selector).next()
    });
    let root = root.unwrap_or_else(|| document.root_element());

    let mut extracted = String::new();
    if let Ok(blocks) = Selector::parse(TEXT_BLOCKS) {
        for block in root.select(&blocks) {
            extracted.push_str(&element_text(block));
            extracted.push('\n');
        }
    }

    if extracted.trim().is_empty() {
        extracted = element_text(root);
    }

    WHITESPACE_RUN.replace_all(&extracted, " ").trim().to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
