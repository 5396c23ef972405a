use crate::lexicon::{compile, data_lines};
use crate::{Filter, LanguageCode, Level, Lexicon};
use finl_unicode::categories::CharacterCategories;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use lru::LruCache;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;
use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;

/// What the router needs to know about a document. Implemented by the DOM layer.
pub trait DocumentMetadata {
    /// Host the document was loaded from, which keys the [`LanguageCache`].
    fn hostname(&self) -> &str;

    /// The root element's `lang` attribute, e.g. `"pt-BR"`.
    fn lang_attribute(&self) -> Option<&str>;

    /// Content of `<meta http-equiv="content-language">`.
    fn content_language(&self) -> Option<&str> {
        None
    }

    /// Content of `<meta property="og:locale">`, e.g. `"fr_FR"`.
    fn og_locale(&self) -> Option<&str> {
        None
    }

    /// Visible text of the document body.
    fn body_text(&self) -> &str;
}

/// Detected languages by hostname. Holds at most `capacity` hosts, evicting the oldest entry
/// first. Lookups and updates don't refresh an entry's age.
#[derive(Debug)]
pub struct LanguageCache {
    languages: LruCache<String, LanguageCode, BuildHasherDefault<FxHasher>>,
}

impl LanguageCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// A `capacity` of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            languages: LruCache::with_hasher(capacity, BuildHasherDefault::default()),
        }
    }

    pub fn get(&self, hostname: &str) -> Option<LanguageCode> {
        self.languages.peek(hostname).copied()
    }

    pub fn insert(&mut self, hostname: &str, language: LanguageCode) {
        if let Some(existing) = self.languages.peek_mut(hostname) {
            *existing = language;
            return;
        }
        if let Some((evicted, _)) = self.languages.push(hostname.to_owned(), language) {
            debug!(hostname = %evicted, "evicting cached language");
        }
    }

    pub fn capacity(&self) -> usize {
        self.languages.cap().get()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn clear(&mut self) {
        self.languages.clear();
    }
}

impl Default for LanguageCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Display information about a language code.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: &'static str,
    pub supported: bool,
}

/// LanguageRouter picks the lexicon to filter a document with, based on its detected language.
#[derive(Debug, Default)]
pub struct LanguageRouter {
    cache: LanguageCache,
}

impl LanguageRouter {
    /// Samples longer than this are truncated before analysis.
    pub const SAMPLE_CHARS: usize = 5000;
    /// Text analysis needs strictly more indicator words than this.
    pub const MIN_SCORE: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: LanguageCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &LanguageCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LanguageCache {
        &mut self.cache
    }

    /// Detects the language of a document, returning the cached language of its host if any.
    ///
    /// The `lang` attribute, content-language, og:locale and body text are tried in that order,
    /// and the first to yield a supported language wins. Falls back to the base language.
    pub fn detect_page_language<D: DocumentMetadata + ?Sized>(&mut self, document: &D) -> LanguageCode {
        let hostname = document.hostname();
        if let Some(language) = self.cache.get(hostname) {
            trace!(hostname, %language, "cached language");
            return language;
        }

        let declared = [
            ("lang", document.lang_attribute()),
            ("content-language", document.content_language()),
            ("og:locale", document.og_locale()),
        ];
        let (language, method) = declared
            .into_iter()
            .find_map(|(method, tag)| {
                tag.and_then(LanguageCode::parse)
                    .filter(LanguageCode::is_supported)
                    .map(|language| (language, method))
            })
            .or_else(|| {
                Self::analyze_text_language(document.body_text())
                    .map(|language| (language, "text"))
            })
            .unwrap_or((LanguageCode::base(), "default"));

        debug!(hostname, %language, method, "detected page language");
        self.cache.insert(hostname, language);
        language
    }

    /// Guesses the language of a text sample by counting common words of each supported
    /// language, ignoring case and diacritics. Returns `None` unless some language scores above
    /// [`Self::MIN_SCORE`]; on a tie, the first language in [`LanguageCode::SUPPORTED`] order
    /// wins.
    pub fn analyze_text_language(sample: &str) -> Option<LanguageCode> {
        let folded: String = sample
            .chars()
            .take(Self::SAMPLE_CHARS)
            .flat_map(char::to_lowercase)
            .nfd()
            .filter(|c| !c.is_mark_nonspacing())
            .collect();

        let mut best: Option<(LanguageCode, usize)> = None;
        for (language, indicators) in INDICATORS.iter() {
            let score = indicators.find_iter(&folded).count();
            trace!(%language, score, "language score");
            if score > Self::MIN_SCORE && best.map_or(true, |(_, max)| score > max) {
                best = Some((*language, score));
            }
        }
        best.map(|(language, _)| language)
    }

    /// The compiled lexicon of a language, optionally merged with the base lexicon. Unsupported
    /// languages get the base lexicon.
    pub fn lexicon(language: LanguageCode, include_base: bool) -> &'static Lexicon {
        let lexicon = if include_base {
            Lexicon::builtin_with_base(language)
        } else {
            Lexicon::builtin(language)
        };
        lexicon.unwrap_or_else(Lexicon::english)
    }

    /// Words checked at `level` for a language, without duplicates.
    pub fn filter_words(language: LanguageCode, level: Level, include_base: bool) -> Vec<&'static str> {
        Self::lexicon(language, include_base)
            .words(level.tiers())
            .collect()
    }

    pub fn filter_patterns(language: LanguageCode, include_base: bool) -> Vec<&'static str> {
        Self::lexicon(language, include_base)
            .patterns()
            .iter()
            .map(Regex::as_str)
            .unique()
            .collect()
    }

    pub fn exceptions(language: LanguageCode, include_base: bool) -> Vec<&'static str> {
        Self::lexicon(language, include_base)
            .exceptions()
            .iter()
            .map(String::as_str)
            .collect()
    }

    /// Display name and support flag of a language code or tag.
    pub fn language_info(code: &str) -> LanguageInfo {
        let language = LanguageCode::parse(code);
        let name = match language.as_ref().map(LanguageCode::as_str) {
            Some("en") => "English",
            Some("es") => "Spanish",
            Some("fr") => "French",
            Some("de") => "German",
            Some("pt") => "Portuguese",
            _ => "Unknown",
        };
        LanguageInfo {
            code: language.map_or_else(|| code.trim().to_ascii_lowercase(), |l| l.to_string()),
            name,
            supported: language.map_or(false, |l| l.is_supported()),
        }
    }

    /// A filter at `level` over the lexicon of the document's language, merged with the base.
    pub fn filter<D: DocumentMetadata + ?Sized>(&mut self, document: &D, level: Level) -> Filter<'static> {
        let language = self.detect_page_language(document);
        let mut filter = Filter::with_lexicon(Self::lexicon(language, true));
        filter.with_level(level);
        filter
    }
}

fn indicators(code: &str, asset: &str) -> (LanguageCode, Regex) {
    let language =
        LanguageCode::parse(code).unwrap_or_else(|| panic!("invalid language code {:?}", code));
    let source = format!(
        r"\b(?:{})\b",
        data_lines(asset).map(regex::escape).join("|")
    );
    let regex = compile(&source).unwrap_or_else(|e| panic!("{}/indicators.txt: {}", code, e));
    (language, regex)
}

lazy_static! {
    /// In tie-breaking order.
    static ref INDICATORS: Vec<(LanguageCode, Regex)> = vec![
        indicators("es", include_str!("lang/es/indicators.txt")),
        indicators("fr", include_str!("lang/fr/indicators.txt")),
        indicators("de", include_str!("lang/de/indicators.txt")),
        indicators("pt", include_str!("lang/pt/indicators.txt")),
    ];
}
