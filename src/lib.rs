//! Profanity detection, sentence rewriting, censoring and site blocking for content filters.
//!
//! See [`Filter`] for text, [`Blocklist`] for sites and [`classify_image`] for images.

mod censor;
mod config;
mod context;
mod error;
mod filter;
mod lexicon;
mod media;
mod mtch;
mod rewrite;
mod tier;

#[cfg(feature = "blocklist")]
mod blocklist;
#[cfg(feature = "lang")]
mod lang;

pub use censor::censor_profanity;
pub use config::{FilterConfig, Profile, ProfileSettings};
pub use context::{
    has_been_filtered, FilterMode, FilterReport, TextFilter, TextNode, SKIPPED_TAGS,
};
pub use error::{Error, Result};
pub use filter::{contains_profanity, find_profanity, Filter, FilterStr};
pub use lexicon::{LanguageCode, Lexicon, LexiconBuilder};
pub use media::{
    classify_image, Classification, ClassificationMethod, ImageClassifier, ImageMetadata,
    KeywordClassifier,
};
pub use rewrite::{rewrite_sentence, rewrite_text, split_into_sentences, RewriteRule};
pub use tier::{Level, Tier};

#[cfg(feature = "blocklist")]
pub use blocklist::{
    add_custom_domain, normalize_domain, remove_custom_domain, BlockReason, BlockStatus,
    Blocklist, Category, CategorySummary, CustomBlocklist, CustomBlocklistStore, MemoryStore,
};
#[cfg(feature = "lang")]
pub use lang::{DocumentMetadata, LanguageCache, LanguageInfo, LanguageRouter};

/// Trims whitespace characters from both ends of a string, according to the definition of
/// `crate::is_whitespace`.
pub fn trim_whitespace(s: &str) -> &str {
    s.trim_matches(is_whitespace)
}

/// Returns true iff the character is effectively whitespace. The definition of whitespace is broader
/// than that of Unicode, because it includes control characters and a few additional blank characters.
pub fn is_whitespace(c: char) -> bool {
    use finl_unicode::categories::CharacterCategories;
    // NOTE: The following characters are not detected by standard means but show up as blank.
    // https://www.compart.com/en/unicode/U+2800
    // https://www.compart.com/en/unicode/U+3164
    c.is_whitespace() || c.is_other() || c == '\u{2800}' || c == '\u{3164}'
}


use doc_comment::doctest;
doctest!("../README.md");
