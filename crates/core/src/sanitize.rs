//! XSS stripping for untrusted text fields.
//!
//! Not applied by the save pipeline; callers rendering user-supplied text fetch it
//! through [`strip_xss`] (or `Record::sanitize`).

use std::sync::LazyLock;

use regex::{Captures, Regex};

const REMOVED: &str = "[removed]";

static DANGEROUS_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "iframe", "object", "embed", "applet"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("valid regex"))
        .collect()
});

static DANGEROUS_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(script|style|iframe|object|embed|applet|link|meta|base|form)\b[^>]*>")
        .expect("valid regex")
});

static MARKUP_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][^<>]*>").expect("valid regex"));

/// Applied only inside a tag matched by [`MARKUP_TAGS`].
static EVENT_HANDLERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});

static SCRIPT_URLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(javascript|vbscript|livescript)\s*:").expect("valid regex")
});

static CSS_EXPRESSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)expression\s*\(").expect("valid regex"));

/// Remove script-capable markup from `input`.
pub fn strip_xss(input: &str) -> String {
    let mut out = input.to_string();
    for block in DANGEROUS_BLOCKS.iter() {
        out = block.replace_all(&out, REMOVED).into_owned();
    }
    out = DANGEROUS_TAGS.replace_all(&out, REMOVED).into_owned();
    out = MARKUP_TAGS
        .replace_all(&out, |tag: &Captures<'_>| EVENT_HANDLERS.replace_all(&tag[0], "").into_owned())
        .into_owned();
    out = SCRIPT_URLS.replace_all(&out, format!("{REMOVED}:")).into_owned();
    CSS_EXPRESSIONS
        .replace_all(&out, format!("{REMOVED}("))
        .into_owned()
}
