//! API-reference region detection for Sphinx-generated pages.

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

use super::text::visible_text;

/// Sphinx/Breathe markup for documented C declarations, plus the
/// "API Reference" section every component page carries.
const API_REGIONS: &str = "dl.function, dl.struct, dl.type, dl.enum, dl.macro, dl.var, dl.member, dl.union, \
                           dl.enumerator, dt.sig, [id=\"api-reference\"]";

static API_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse(API_REGIONS).expect("invalid selector"));

/// Text of every API-reference region, outermost regions only, in document order.
pub fn api_text(document: &Html) -> String {
    let matched: Vec<_> = document.select(&API_SELECTOR).collect();
    let ids: HashSet<_> = matched.iter().map(|element| element.id()).collect();

    matched
        .into_iter()
        .filter(|element| !element.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
        .map(visible_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
