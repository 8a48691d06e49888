//! Same-tree link harvesting from HTML documents.

use idfdocs_core::{DocLink, DocRoot};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector"));

/// Extract same-tree links from a parsed document.
///
/// Every `<a href>` is resolved against `page_url` (the final URL after
/// redirects), its fragment is dropped, and it is kept only if `root` can
/// locate it. Duplicates (by path) are removed, keeping the first occurrence;
/// a duplicate only contributes its anchor text when the first had none.
pub fn extract_links(document: &Html, page_url: &Url, root: &DocRoot) -> Vec<DocLink> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut links: Vec<DocLink> = Vec::new();

    for element in document.select(&ANCHORS) {
        let Some(href) = element.value().attr("href") else { continue };
        let href = href.trim();

        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let Ok(mut resolved) = page_url.join(href) else { continue };
        resolved.set_fragment(None);

        let Some(location) = root.locate(&resolved) else { continue };
        let text = element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");

        match seen.get(location.path()) {
            Some(&i) if links[i].text.is_empty() => links[i].text = text,
            Some(_) => {}
            None => {
                seen.insert(location.path().to_string(), links.len());
                links.push(DocLink::new(location, text));
            }
        }
    }

    links
}
