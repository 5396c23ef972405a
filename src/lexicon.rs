use crate::mtch::{Match, WorkingCopy};
use crate::{Error, Result, Tier};
use arrayvec::ArrayString;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::Deserialize;
use std::fmt::{self, Debug, Display, Formatter};

/// Two letter, lowercase, primary language subtag e.g. `en`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LanguageCode(ArrayString<2>);

impl LanguageCode {
    /// Languages with a built-in lexicon.
    pub const SUPPORTED: [&'static str; 5] = ["en", "es", "fr", "de", "pt"];

    /// Reduces a language tag such as `pt-BR`, `en_US` or `fr` to its first two letters.
    ///
    /// Returns `None` if the primary subtag doesn't start with two ASCII letters.
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?;
        let mut code = ArrayString::new();
        for c in primary.chars().take(2) {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            code.push(c.to_ascii_lowercase());
        }
        if code.len() == 2 {
            Some(Self(code))
        } else {
            None
        }
    }

    /// The base language, whose lexicon is merged into every other.
    pub fn base() -> Self {
        Self::english()
    }

    pub fn english() -> Self {
        Self::known("en")
    }

    pub fn spanish() -> Self {
        Self::known("es")
    }

    pub fn french() -> Self {
        Self::known("fr")
    }

    pub fn german() -> Self {
        Self::known("de")
    }

    pub fn portuguese() -> Self {
        Self::known("pt")
    }

    fn known(code: &'static str) -> Self {
        let mut s = ArrayString::new();
        s.push_str(code);
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether a built-in lexicon exists for this language.
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(&self.as_str())
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Debug for LanguageCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self.as_str(), f)
    }
}

/// The words of a single tier, each compiled as a case-insensitive, word-bounded matcher.
struct TierWords {
    words: Vec<String>,
    set: RegexSet,
    regexes: Vec<Regex>,
}

impl TierWords {
    fn new(words: Vec<String>) -> Result<Self> {
        let sources: Vec<String> = words.iter().map(|w| bounded(w)).collect();
        let set = RegexSetBuilder::new(&sources)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::pattern(sources.join("|"), e))?;
        let regexes = sources
            .iter()
            .map(|source| compile(source))
            .collect::<Result<_>>()?;
        Ok(Self {
            words,
            set,
            regexes,
        })
    }
}

/// `\b<word>\b`, with the word's metacharacters escaped.
pub(crate) fn bounded(word: &str) -> String {
    format!(r"\b{}\b", regex::escape(word))
}

/// Compiles a case-insensitive regex.
pub(crate) fn compile(source: &str) -> Result<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::pattern(source, e))
}

/// Lexicon is the data bundle of a language: words by tier, obfuscation patterns and exceptions.
///
/// Build one with [`LexiconBuilder`], or use a built-in one via [`Lexicon::builtin`].
pub struct Lexicon {
    language: Option<LanguageCode>,
    /// Indexed in the order of `Tier::EACH`.
    tiers: Vec<TierWords>,
    patterns: Vec<Regex>,
    exceptions: Vec<String>,
    /// Alternation of every exception, longest first.
    exception_regex: Option<Regex>,
}

impl Lexicon {
    /// The built-in English lexicon, also the base lexicon.
    pub fn english() -> &'static Self {
        &ENGLISH
    }

    /// Returns the built-in lexicon of a supported language.
    pub fn builtin(language: LanguageCode) -> Option<&'static Self> {
        let lexicon: &'static Self = match language.as_str() {
            "en" => &ENGLISH,
            "es" => &SPANISH,
            "fr" => &FRENCH,
            "de" => &GERMAN,
            "pt" => &PORTUGUESE,
            _ => return None,
        };
        Some(lexicon)
    }

    /// Returns the built-in lexicon of a supported language merged with the base lexicon.
    pub fn builtin_with_base(language: LanguageCode) -> Option<&'static Self> {
        let lexicon: &'static Self = match language.as_str() {
            "en" => &ENGLISH,
            "es" => &SPANISH_WITH_BASE,
            "fr" => &FRENCH_WITH_BASE,
            "de" => &GERMAN_WITH_BASE,
            "pt" => &PORTUGUESE_WITH_BASE,
            _ => return None,
        };
        Some(lexicon)
    }

    pub fn language(&self) -> Option<LanguageCode> {
        self.language
    }

    /// Iterates the words of the given tiers, in tier order, without duplicates.
    pub fn words(&self, tiers: Tier) -> impl Iterator<Item = &str> + '_ {
        self.tier_words(tiers)
            .flat_map(|(_, words)| words.words.iter().map(String::as_str))
            .unique()
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn exceptions(&self) -> &[String] {
        &self.exceptions
    }

    fn tier_words(&self, tiers: Tier) -> impl Iterator<Item = (Tier, &TierWords)> + '_ {
        Tier::EACH
            .into_iter()
            .zip(self.tiers.iter())
            .filter(move |(tier, _)| tiers.contains(*tier))
    }

    /// A copy of `text` with every exception removed, for word matching.
    pub(crate) fn working_copy<'a>(&self, text: &'a str) -> WorkingCopy<'a> {
        WorkingCopy::new(text, self.exception_regex.as_ref())
    }

    /// Returns `true` if any word of the given tiers occurs in the working copy.
    pub(crate) fn is_word_match(&self, working: &str, tiers: Tier) -> bool {
        self.tier_words(tiers)
            .any(|(_, words)| words.set.is_match(working))
    }

    /// Returns the matches of every word of the given tiers in the working copy, ordered by tier,
    /// then by word, then by position.
    pub(crate) fn word_matches(&self, working: &str, tiers: Tier) -> Vec<Match> {
        let mut ret = Vec::new();
        for (_, words) in self.tier_words(tiers) {
            for i in words.set.matches(working).iter() {
                ret.extend(words.regexes[i].find_iter(working).map(Match::from_regex));
            }
        }
        ret
    }

    /// Returns `true` if any obfuscation pattern occurs in the text.
    pub(crate) fn is_pattern_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }

    pub(crate) fn pattern_matches(&self, text: &str) -> Vec<Match> {
        self.patterns
            .iter()
            .flat_map(|pattern| pattern.find_iter(text).map(Match::from_regex))
            .collect()
    }

    /// Finds the tier a single word is listed under at the lowest severity, if any.
    pub fn tier_of(&self, word: &str) -> Option<Tier> {
        let word = word.trim().to_lowercase();
        self.tier_words(Tier::all())
            .find(|(_, words)| words.words.iter().any(|w| *w == word))
            .map(|(tier, _)| tier)
    }
}

impl Debug for Lexicon {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexicon")
            .field("language", &self.language)
            .field("words", &self.tiers.iter().map(|t| t.words.len()).sum::<usize>())
            .field("patterns", &self.patterns.len())
            .field("exceptions", &self.exceptions.len())
            .finish()
    }
}

#[derive(Deserialize)]
struct WordRecord {
    word: String,
    tier: String,
}

/// Accumulates words, patterns and exceptions, then validates and compiles them into a
/// [`Lexicon`].
#[derive(Clone, Default, Debug)]
pub struct LexiconBuilder {
    language: Option<LanguageCode>,
    words: [Vec<String>; 5],
    patterns: Vec<String>,
    exceptions: Vec<String>,
}

impl LexiconBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(&mut self, language: LanguageCode) -> &mut Self {
        self.language = Some(language);
        self
    }

    /// Lists a word or phrase under every single tier contained in `tier`.
    ///
    /// Words are matched case-insensitively and only as whole words, so "ass" doesn't match
    /// "classic".
    pub fn with_word(&mut self, word: &str, tier: Tier) -> &mut Self {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return self;
        }
        for (i, single) in Tier::EACH.iter().enumerate() {
            if tier.contains(*single) {
                self.words[i].push(word.clone());
            }
        }
        self
    }

    pub fn with_words<'w>(
        &mut self,
        words: impl IntoIterator<Item = &'w str>,
        tier: Tier,
    ) -> &mut Self {
        for word in words {
            self.with_word(word, tier);
        }
        self
    }

    /// Adds a regular expression, matched case-insensitively against the original text at every
    /// level. It is validated by [`LexiconBuilder::build`].
    pub fn with_pattern(&mut self, pattern: &str) -> &mut Self {
        self.patterns.push(pattern.to_owned());
        self
    }

    /// Adds a legitimate string that is removed from text before words are matched.
    pub fn with_exception(&mut self, exception: &str) -> &mut Self {
        let exception = exception.trim().to_lowercase();
        if !exception.is_empty() {
            self.exceptions.push(exception);
        }
        self
    }

    /// Merges in the contents of another lexicon. Words and exceptions are deduplicated when
    /// building, and patterns are appended.
    pub fn with_lexicon(&mut self, other: &Lexicon) -> &mut Self {
        for (i, words) in other.tiers.iter().enumerate() {
            self.words[i].extend(words.words.iter().cloned());
        }
        self.patterns
            .extend(other.patterns.iter().map(|p| p.as_str().to_owned()));
        self.exceptions.extend(other.exceptions.iter().cloned());
        self
    }

    /// Reads the data assets of a language:
    /// - `profanity`, a CSV with a `word,tier` header.
    /// - `patterns`, one regular expression per line.
    /// - `exceptions`, one string per line.
    ///
    /// Blank lines and lines starting with `#` are ignored in the latter two.
    pub fn with_assets(
        &mut self,
        name: &str,
        profanity: &str,
        patterns: &str,
        exceptions: &str,
    ) -> Result<&mut Self> {
        let mut reader = csv::Reader::from_reader(profanity.as_bytes());
        let headers = reader.headers()?.clone();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let WordRecord { word, tier } = record.deserialize(Some(&headers))?;
            let tier = Tier::from_name(&tier).ok_or_else(|| Error::Asset {
                asset: format!("{}/profanity.csv", name),
                line,
                reason: format!("unknown tier {:?}", tier),
            })?;
            self.with_word(&word, tier);
        }

        for line in data_lines(patterns) {
            self.with_pattern(line);
        }
        for line in data_lines(exceptions) {
            self.with_exception(line);
        }
        Ok(self)
    }

    /// Validates every pattern and compiles the lexicon.
    pub fn build(&self) -> Result<Lexicon> {
        let tiers = self
            .words
            .iter()
            .map(|words| TierWords::new(words.iter().unique().cloned().collect()))
            .collect::<Result<Vec<_>>>()?;

        let patterns = self
            .patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        let exceptions: Vec<String> = self.exceptions.iter().unique().cloned().collect();
        let exception_regex = if exceptions.is_empty() {
            None
        } else {
            // Longest first, so that "assessment" is removed rather than just "assess".
            let source = exceptions
                .iter()
                .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
                .map(|e| regex::escape(e))
                .join("|");
            Some(compile(&source)?)
        };

        Ok(Lexicon {
            language: self.language,
            tiers,
            patterns,
            exceptions,
            exception_regex,
        })
    }
}

pub(crate) fn data_lines(asset: &str) -> impl Iterator<Item = &str> {
    asset
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn load(code: &str, profanity: &str, patterns: &str, exceptions: &str) -> Lexicon {
    let language = LanguageCode::parse(code);
    let mut builder = LexiconBuilder::new();
    if let Some(language) = language {
        builder.with_language(language);
    }
    builder
        .with_assets(code, profanity, patterns, exceptions)
        .and_then(|builder| builder.build())
        .unwrap_or_else(|e| panic!("built-in {} lexicon: {}", code, e))
}

fn merged(language: &Lexicon) -> Lexicon {
    let mut builder = LexiconBuilder::new();
    if let Some(code) = language.language() {
        builder.with_language(code);
    }
    builder
        .with_lexicon(language)
        .with_lexicon(&ENGLISH)
        .build()
        .unwrap_or_else(|e| panic!("merging {:?} with base: {}", language.language(), e))
}

lazy_static! {
    static ref ENGLISH: Lexicon = load(
        "en",
        include_str!("lang/en/profanity.csv"),
        include_str!("lang/en/patterns.txt"),
        include_str!("lang/en/exceptions.txt"),
    );
    static ref SPANISH: Lexicon = load(
        "es",
        include_str!("lang/es/profanity.csv"),
        include_str!("lang/es/patterns.txt"),
        include_str!("lang/es/exceptions.txt"),
    );
    static ref FRENCH: Lexicon = load(
        "fr",
        include_str!("lang/fr/profanity.csv"),
        include_str!("lang/fr/patterns.txt"),
        include_str!("lang/fr/exceptions.txt"),
    );
    static ref GERMAN: Lexicon = load(
        "de",
        include_str!("lang/de/profanity.csv"),
        include_str!("lang/de/patterns.txt"),
        include_str!("lang/de/exceptions.txt"),
    );
    static ref PORTUGUESE: Lexicon = load(
        "pt",
        include_str!("lang/pt/profanity.csv"),
        include_str!("lang/pt/patterns.txt"),
        include_str!("lang/pt/exceptions.txt"),
    );
    static ref SPANISH_WITH_BASE: Lexicon = merged(&SPANISH);
    static ref FRENCH_WITH_BASE: Lexicon = merged(&FRENCH);
    static ref GERMAN_WITH_BASE: Lexicon = merged(&GERMAN);
    static ref PORTUGUESE_WITH_BASE: Lexicon = merged(&PORTUGUESE);
}
