// Stable page-identity hashing over visible text. Immune to markup and
// chrome churn (scripts, styles, nav, whitespace, letter case) while still
// catching content changes. The URL mixin makes identical text on two URLs
// hash differently, so a hash identifies a page, not just its content.

use scraper::{Html, Node};
use sha2::{Digest, Sha256};

/// Subtrees removed before text extraction.
const STRIPPED_TAGS: [&str; 8] = [
    "script", "style", "meta", "link", "noscript", "header", "footer", "nav",
];

/// SHA-256 hex digest over `"{url}|{visible text}"`.
/// Malformed HTML parses best-effort; an empty body hashes over `"{url}|"`.
pub fn content_hash(html: &str, url: &str) -> String {
    let text = visible_text(html);
    hex::encode(Sha256::digest(format!("{url}|{text}").as_bytes()))
}

/// Change contract: new content (no previous hash) always counts as changed.
pub fn has_changed(current: &str, previous: Option<&str>) -> bool {
    match previous {
        None => true,
        Some(prev) => current != prev,
    }
}

/// Visible text of a page: DOM text with stripped subtrees removed,
/// whitespace collapsed to single spaces, trimmed, lowercased.
fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(doc.tree.root(), &mut raw);

    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn collect_text(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Element(el) => {
            if STRIPPED_TAGS.contains(&el.name()) {
                return;
            }
        }
        Node::Text(text) => {
            out.push(' ');
            out.push_str(text);
            return;
        }
        _ => {}
    }

    for child in node.children() {
        collect_text(child, out);
    }
}
