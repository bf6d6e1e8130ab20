use leadpipe_core::SearchSnippet;

const RESULT_CONTAINER: &str = "div.g";
const TITLE: &str = "h3";
const DESCRIPTION: &str = ".VwiC3b";
const DESCRIPTION_FALLBACK: &str = ".st";
const LINK: &str = "a[href]";

/// Parse raw search-result HTML into snippets, in document order.
///
/// Pure and infallible: malformed or empty markup yields an empty vec, which
/// callers surface as "no results". Elements without both a title and some
/// description text are ad slots or widgets, not results, and are dropped.
pub fn parse_results(html: &str) -> Vec<SearchSnippet> {
    let doc = html_scraper::Html::parse_document(html);
    let (container, title_sel, desc_sel, fallback_sel, link_sel) = match (
        html_scraper::Selector::parse(RESULT_CONTAINER),
        html_scraper::Selector::parse(TITLE),
        html_scraper::Selector::parse(DESCRIPTION),
        html_scraper::Selector::parse(DESCRIPTION_FALLBACK),
        html_scraper::Selector::parse(LINK),
    ) {
        (Ok(a), Ok(b), Ok(c), Ok(d), Ok(e)) => (a, b, c, d, e),
        _ => return Vec::new(),
    };

    let mut out = Vec::new();
    for el in doc.select(&container) {
        let title = el
            .select(&title_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let mut description = join_text(el.select(&desc_sel).map(element_text));
        if description.is_empty() {
            description = join_text(el.select(&fallback_sel).map(element_text));
        }
        if title.is_empty() || description.is_empty() {
            continue;
        }
        let link = el
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(unwrap_redirect);
        out.push(SearchSnippet {
            title,
            description,
            link,
        });
    }
    out
}

/// Unwrap the engine's `/url?q=<target>&...` redirect wrapper to the bare
/// target, discarding tracking parameters. Anything else passes through.
fn unwrap_redirect(href: &str) -> String {
    match href.strip_prefix("/url?q=") {
        Some(rest) => rest.split('&').next().unwrap_or(rest).to_string(),
        None => href.to_string(),
    }
}

fn element_text(el: html_scraper::ElementRef<'_>) -> String {
    // Collapse runs of whitespace; nested markup otherwise leaks stray
    // newlines and indentation into titles.
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_text(parts: impl Iterator<Item = String>) -> String {
    let joined = parts
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined.trim().to_string()
}
