//! Supported locales and locale-fallback content selection
//!
//! Every article carries one content block per language. Rendering a request
//! means picking exactly one of those blocks; `resolve_content` implements
//! the fallback chain used everywhere a block is selected.

use crate::orm::article_contents;

/// Languages an article content block may be written in.
///
/// `hreflang` values outside this set are rejected at the validation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
}

impl Locale {
    pub const ALL: [Locale; 6] = [
        Locale::En,
        Locale::Es,
        Locale::Fr,
        Locale::De,
        Locale::It,
        Locale::Pt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::It => "it",
            Locale::Pt => "pt",
        }
    }

    /// Parse an hreflang value. Region subtags ("pt-BR") resolve to their
    /// language.
    pub fn parse(value: &str) -> Option<Self> {
        let lang = value.split(|c| c == '-' || c == '_').next().unwrap_or(value);
        match lang.to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "es" => Some(Locale::Es),
            "fr" => Some(Locale::Fr),
            "de" => Some(Locale::De),
            "it" => Some(Locale::It),
            "pt" => Some(Locale::Pt),
            _ => None,
        }
    }

    /// Lenient parse for request parameters: unknown locales read as English.
    pub fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::En
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select the single content block to present for a request.
///
/// Chain, first match wins:
/// 1. block whose slug equals the requested slug
/// 2. block whose hreflang equals the requested locale
/// 3. the English block, when the requested locale is not English
/// 4. the first block
///
/// Returns `None` only when the article has no blocks at all; the caller
/// turns that into a 404. No partial content is ever synthesized.
pub fn resolve_content<'a>(
    blocks: &'a [article_contents::Model],
    requested_slug: Option<&str>,
    locale: Locale,
) -> Option<&'a article_contents::Model> {
    if let Some(slug) = requested_slug {
        if let Some(block) = blocks.iter().find(|b| b.slug == slug) {
            return Some(block);
        }
    }

    if let Some(block) = blocks.iter().find(|b| b.hreflang == locale.as_str()) {
        return Some(block);
    }

    if locale != Locale::En {
        if let Some(block) = blocks.iter().find(|b| b.hreflang == Locale::En.as_str()) {
            return Some(block);
        }
    }

    blocks.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn block(hreflang: &str, slug: &str) -> article_contents::Model {
        article_contents::Model {
            id: 0,
            article_id: 1,
            position: 0,
            hreflang: hreflang.to_string(),
            main_title: format!("title-{}", slug),
            sections: serde_json::json!([]),
            meta_title: String::new(),
            meta_description: String::new(),
            keywords: serde_json::json!([]),
            slug: slug.to_string(),
            url_pattern: String::new(),
            canonical_url: String::new(),
            seo_type: "article".to_string(),
        }
    }

    #[test]
    fn no_blocks_is_not_found() {
        assert!(resolve_content(&[], None, Locale::En).is_none());
        assert!(resolve_content(&[], Some("intro"), Locale::Fr).is_none());
    }

    #[test]
    fn exact_slug_match_wins_over_locale() {
        let blocks = vec![block("en", "intro"), block("es", "introduccion")];
        let found = resolve_content(&blocks, Some("introduccion"), Locale::Fr)
            .expect("block should resolve");
        assert_eq!(found.hreflang, "es");
    }

    #[test]
    fn locale_match_when_slug_absent() {
        let blocks = vec![block("en", "intro"), block("es", "introduccion")];
        let found = resolve_content(&blocks, None, Locale::Es).expect("block should resolve");
        assert_eq!(found.slug, "introduccion");
    }

    #[test]
    fn unmatched_locale_falls_back_to_english() {
        let blocks = vec![block("es", "introduccion"), block("en", "intro")];
        let found = resolve_content(&blocks, None, Locale::Fr).expect("block should resolve");
        assert_eq!(found.hreflang, "en");
    }

    #[test]
    fn no_english_block_falls_back_to_first() {
        let blocks = vec![block("es", "introduccion"), block("pt", "introducao")];
        let found = resolve_content(&blocks, None, Locale::Fr).expect("block should resolve");
        assert_eq!(found.hreflang, "es");
    }

    #[test]
    fn single_block_always_resolves() {
        for locale in Locale::ALL {
            let blocks = vec![block("it", "introduzione")];
            assert!(resolve_content(&blocks, None, locale).is_some());
        }
    }

    #[test]
    fn parse_accepts_region_subtags() {
        assert_eq!(Locale::parse("pt-BR"), Some(Locale::Pt));
        assert_eq!(Locale::parse("en_US"), Some(Locale::En));
        assert_eq!(Locale::parse("ja"), None);
        assert_eq!(Locale::parse_or_default("ja"), Locale::En);
    }
}
