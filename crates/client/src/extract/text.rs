//! Visible-text extraction in document order.

use scraper::{ElementRef, Node};

/// Elements whose content is never visible text.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template", "head", "svg", "iframe"];

/// Elements that start a new line of text.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "summary", "table", "td", "th", "tr", "ul",
];

/// Sphinx decorations that carry no content (the `¶` permalink anchors).
const DECORATION_CLASSES: &[&str] = &["headerlink"];

fn is_hidden(element: &scraper::node::Element) -> bool {
    HIDDEN.contains(&element.name()) || element.classes().any(|c| DECORATION_CLASSES.contains(&c))
}

/// Visible text under `root`, one line per block element, whitespace collapsed.
///
/// Text nodes inside hidden elements are skipped. A line break is emitted
/// whenever the nearest enclosing block element changes, so inline markup
/// (`<code>`, `<a>`, `<em>`, ...) never splits a sentence.
pub fn visible_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();
    let mut current_block = None;

    for node in root.descendants() {
        let Node::Text(text) = node.value() else { continue };

        let mut hidden = false;
        let mut block = None;
        for ancestor in node.ancestors() {
            if let Node::Element(element) = ancestor.value() {
                if is_hidden(element) {
                    hidden = true;
                    break;
                }
                if block.is_none() && BLOCKS.contains(&element.name()) {
                    block = Some(ancestor.id());
                }
            }
            if ancestor.id() == root.id() {
                break;
            }
        }
        if hidden {
            continue;
        }

        if block != current_block {
            raw.push('\n');
            current_block = block;
        }
        // source line breaks inside a block are not line breaks in the text
        raw.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
    }

    collapse_lines(&raw)
}

/// Collapse runs of whitespace inside each line and drop blank lines.
pub fn collapse_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
