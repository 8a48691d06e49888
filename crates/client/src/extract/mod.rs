//! HTML to searchable text, links and title.
//!
//! ### Text
//! - Scripts, styles, templates and permalink decorations are dropped.
//! - Visible text in document order, one line per block element.
//! - Taken from the main content region (`div.document`, `[role=main]`,
//!   `<main>`, then `<body>`) so navigation chrome stays out of search.
//!
//! ### Links
//! - Harvested from the whole page, navigation included, since the sidebar
//!   toctree is how the structure crawl discovers pages.
//! - Same-tree only; see [`links::extract_links`].
//!
//! ### Failure Policy
//! - Non-HTML content passes through as raw text with no links.
//! - Markup is parsed best-effort. If the body carries no markup, or the parser
//!   panics, the raw body becomes the text with an empty title and no links.

pub mod links;
pub mod sections;
pub mod text;

pub use links::extract_links;
pub use sections::api_text;
pub use text::visible_text;

use chrono::{DateTime, Utc};
use idfdocs_core::{DocLink, DocLocation, DocRoot, ParsedPage};
use scraper::{ElementRef, Html, Selector};
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;
use url::Url;

use crate::fetch::FetchedPage;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("invalid selector"));

/// Main-content candidates, most specific first.
static CONTENT: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["div.document", "[role=\"main\"]", "main", "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("invalid selector"))
        .collect()
});

/// The derived parts of one fetched page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// Page title, empty when the page has none
    pub title: String,
    /// Visible text of the main content
    pub text: String,
    /// Same-tree links in document order
    pub links: Vec<DocLink>,
    /// Text of API-reference regions
    pub api_text: String,
}

impl Extraction {
    /// The degraded form: the body verbatim, nothing else.
    fn raw(body: String) -> Self {
        Self { text: body, ..Self::default() }
    }

    /// Attach location and provenance to produce the cached page.
    pub fn into_page(self, location: DocLocation, size: usize, derived_at: DateTime<Utc>) -> ParsedPage {
        ParsedPage {
            location,
            title: self.title,
            text: self.text,
            links: self.links,
            api_text: self.api_text,
            size,
            derived_at,
        }
    }
}

/// Extract title, text, links and API regions from a fetched page.
///
/// Never fails; see the module docs for how bad input degrades.
pub fn extract(page: &FetchedPage, root: &DocRoot) -> Extraction {
    let body = page.text();

    if !page.is_html() || !body.contains('<') {
        return Extraction::raw(body);
    }

    match panic::catch_unwind(AssertUnwindSafe(|| extract_html(&body, &page.final_url, root))) {
        Ok(extraction) => extraction,
        Err(_) => {
            tracing::warn!("HTML parsing of {} panicked; falling back to raw body", page.final_url);
            Extraction::raw(body)
        }
    }
}

/// Extract from an HTML string whose links resolve against `page_url`.
pub fn extract_html(html: &str, page_url: &Url, root: &DocRoot) -> Extraction {
    let document = Html::parse_document(html);

    Extraction {
        title: title(&document),
        text: visible_text(content_root(&document)),
        links: extract_links(&document, page_url, root),
        api_text: api_text(&document),
    }
}

fn title(document: &Html) -> String {
    let from = |selector: &Selector| {
        document.select(selector).map(visible_text).find(|text| !text.is_empty())
    };

    from(&TITLE).or_else(|| from(&H1)).unwrap_or_default()
}

fn content_root(document: &Html) -> ElementRef<'_> {
    CONTENT
        .iter()
        .find_map(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element())
}
