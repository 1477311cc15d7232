//! Slug normalization and the collision candidate sequence.
//!
//! This module is pure: it turns free text into a URL-safe base slug and yields
//! the candidates to try (`base`, `base-2`, `base-3`, ...). The storage lookups
//! that pick among them live with the models.

use std::sync::LazyLock;

use regex::Regex;

/// Words a slug may never equal on its own.
pub const RESERVED_SLUGS: &[&str] = &[
    "ghost",
    "ghost-admin",
    "admin",
    "wp-admin",
    "wp-login",
    "dashboard",
    "logout",
    "login",
    "signin",
    "signup",
    "signout",
    "register",
    "archive",
    "archives",
    "category",
    "categories",
    "tag",
    "tags",
    "page",
    "pages",
    "post",
    "posts",
    "user",
    "users",
    "rss",
    "feed",
];

/// URL-reserved and unsafe characters removed from slugs.
pub const UNSAFE_CHARS: &[char] = &[
    ':', '/', '?', '#', '[', ']', '@', '!', '$', '&', '\'', '(', ')', '*', '+', ',', ';', '=',
    '\\', '%', '<', '>', '|', '^', '~', '£', '"',
];

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s.]").expect("valid regex"));
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Normalize free text into a base slug.
///
/// `singular` is the owning entity type's singular name. It disambiguates
/// reserved words (`admin` → `admin-post`) and replaces text that normalizes
/// to nothing.
pub fn normalize(base: &str, singular: &str) -> String {
    let ascii = deunicode::deunicode(base.trim());
    let stripped: String = ascii.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect();
    let dashed = SEPARATORS.replace_all(&stripped, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-").to_lowercase();

    let mut slug = collapsed.as_str();
    slug = slug.strip_suffix('-').unwrap_or(slug);
    slug = slug.strip_prefix('-').unwrap_or(slug);

    if slug.is_empty() {
        return singular.to_string();
    }
    if is_reserved(slug) {
        return format!("{slug}-{singular}");
    }
    slug.to_string()
}

/// Candidate slugs for collision resolution: `base`, `base-2`, `base-3`, ...
///
/// Each step trims the previous numeric suffix by the character length of the
/// previous counter and appends the next one, so the base is never rescanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugCandidates {
    current: String,
    attempt: u32,
}

impl SlugCandidates {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            current: base.into(),
            attempt: 1,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Number of candidates produced so far (1 for the bare base).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Move to the next candidate after a collision.
    pub fn advance(&mut self) -> &str {
        self.attempt += 1;
        if self.attempt == 2 {
            self.current.push('-');
        } else {
            let previous_len = (self.attempt - 1).to_string().len();
            let keep = self.current.len() - previous_len;
            self.current.truncate(keep);
        }
        self.current.push_str(&self.attempt.to_string());
        &self.current
    }

    pub fn into_inner(self) -> String {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_and_case_are_normalized() {
        assert_eq!(normalize("Hello World!", "post"), "hello-world");
        assert_eq!(normalize("  What's new?  ", "post"), "whats-new");
        assert_eq!(normalize("v1.2 release notes", "post"), "v1-2-release-notes");
    }

    #[test]
    fn non_ascii_is_transliterated() {
        assert_eq!(normalize("Ærøskøbing café", "post"), "aeroskobing-cafe");
        assert_eq!(normalize("Über Größe", "post"), "uber-grosse");
    }

    #[test]
    fn separators_collapse_and_edges_are_trimmed() {
        assert_eq!(normalize("a -- b...c", "post"), "a-b-c");
        assert_eq!(normalize("trailing.", "post"), "trailing");
        assert_eq!(normalize("(-leading)", "post"), "leading");
    }

    #[test]
    fn every_unsafe_character_is_removed() {
        // `£` is transliterated before stripping, so it is checked on its own.
        let ascii: String = UNSAFE_CHARS.iter().filter(|c| c.is_ascii()).collect();
        assert_eq!(normalize(&format!("x{ascii}y"), "post"), "xy");
        assert!(normalize("£5 deal", "post").is_ascii());
    }

    #[test]
    fn reserved_words_get_the_singular_suffix() {
        assert_eq!(normalize("admin", "post"), "admin-post");
        assert_eq!(normalize("RSS", "tag"), "rss-tag");
        assert_eq!(normalize("wp admin", "post"), "wp-admin-post");
        assert_eq!(normalize("administrator", "post"), "administrator");
    }

    #[test]
    fn empty_result_falls_back_to_singular() {
        assert_eq!(normalize("!!!", "post"), "post");
        assert_eq!(normalize("   ", "tag"), "tag");
    }

    #[test]
    fn candidates_skip_one_and_count_up() {
        let mut c = SlugCandidates::new("hello-world");
        assert_eq!(c.current(), "hello-world");
        assert_eq!(c.advance(), "hello-world-2");
        assert_eq!(c.advance(), "hello-world-3");
        assert_eq!(c.attempt(), 3);
    }

    #[test]
    fn candidates_trim_multi_digit_suffixes() {
        let mut c = SlugCandidates::new("draft");
        for _ in 0..9 {
            c.advance();
        }
        assert_eq!(c.current(), "draft-10");
        assert_eq!(c.advance(), "draft-11");
        for _ in 0..88 {
            c.advance();
        }
        assert_eq!(c.current(), "draft-99");
        assert_eq!(c.advance(), "draft-100");
    }

    #[test]
    fn base_ending_in_digits_is_preserved() {
        let mut c = SlugCandidates::new("route-66");
        assert_eq!(c.advance(), "route-66-2");
        assert_eq!(c.advance(), "route-66-3");
    }
}
