use crate::lexicon::compile;
use crate::{trim_whitespace, Error, Filter, Level, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt::{self, Debug, Formatter};
use tracing::trace;

lazy_static! {
    static ref RULES: Vec<RewriteRule> = RewriteRule::parse_csv(include_str!("rewrite_rules.csv"))
        .unwrap_or_else(|e| panic!("built-in rewrite rules: {}", e));
    /// Punctuation followed by whitespace, or newlines.
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]+\s+|\n+").unwrap();
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// RewriteRule replaces a phrase with a more palatable one e.g. "what the hell" with "what on
/// earth". Rules are applied in order, each to every (case-insensitive) occurrence.
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

#[derive(Deserialize)]
struct RuleRecord {
    pattern: String,
    replacement: String,
}

impl RewriteRule {
    /// `replacement` may refer to groups of `pattern` as `${1}`, `${2}`, etc.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            replacement: replacement.to_owned(),
        })
    }

    /// The built-in rules, most specific first.
    pub fn builtin() -> &'static [Self] {
        &RULES
    }

    /// Parses rules from a CSV with a `pattern,replacement` header.
    pub fn parse_csv(csv: &str) -> Result<Vec<Self>> {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let mut ret = Vec::new();
        for record in reader.deserialize() {
            let RuleRecord {
                pattern,
                replacement,
            } = record?;
            ret.push(Self::new(&pattern, &replacement)?);
        }
        if ret.is_empty() {
            return Err(Error::Asset {
                asset: "rewrite rules".to_owned(),
                line: 1,
                reason: "no rules".to_owned(),
            });
        }
        Ok(ret)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replaces every occurrence, borrowing if there are none.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replacement.as_str())
    }
}

impl Debug for RewriteRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.pattern.as_str(), self.replacement)
    }
}

/// Splits text after every run of `.`, `!` or `?` followed by whitespace, and after every run of
/// newlines. Each sentence keeps its delimiter, and the sentences concatenate to the input.
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let ends = SENTENCE_BOUNDARY
        .find_iter(text)
        .map(|m| m.end())
        .chain(std::iter::once(text.len()));

    let mut sentences: Vec<&str> = Vec::new();
    let mut start = 0;
    for end in ends {
        if end <= start {
            continue;
        }
        let sentence = &text[start..end];
        if trim_whitespace(sentence).is_empty() {
            // Blank fragments join the preceding sentence, or else the following one.
            match sentences.last_mut() {
                Some(last) => *last = &text[start - last.len()..end],
                None => continue,
            }
        } else {
            sentences.push(sentence);
        }
        start = end;
    }

    if sentences.is_empty() {
        sentences.push(text);
    }
    sentences
}

impl Filter<'_> {
    /// Rewrites a profane sentence into a clean one:
    /// 1. Applies every rewrite rule in order.
    /// 2. If profanity remains, removes each word that is profane by itself.
    /// 3. If anything changed, collapses whitespace, trims, and capitalizes the first letter.
    ///
    /// Clean or blank sentences are returned unchanged.
    pub fn rewrite_sentence(&self, sentence: &str) -> String {
        if !self.is_profane(sentence) {
            return sentence.to_owned();
        }

        let mut rewritten = sentence.to_owned();
        let mut modified = false;

        for rule in self.rules() {
            let replaced = match rule.apply(&rewritten) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(replaced) => replaced,
            };
            if replaced != rewritten {
                modified = true;
            }
            rewritten = replaced;
        }

        if self.is_profane(&rewritten) {
            trace!(sentence = %rewritten, "rules left profanity, removing words");
            rewritten = self.remove_profane_words(&rewritten);
            modified = true;
        }

        if modified {
            normalize(&rewritten)
        } else {
            rewritten
        }
    }

    /// Splits text into sentences, rewrites each, and joins them again. Whitespace that followed
    /// a sentence is kept even if rewriting trimmed it.
    pub fn rewrite(&self, text: &str) -> String {
        let mut ret = String::with_capacity(text.len());
        for sentence in split_into_sentences(text) {
            let rewritten = self.rewrite_sentence(sentence);
            ret.push_str(&rewritten);
            let trailing = &sentence[sentence.trim_end().len()..];
            if !trailing.is_empty() && !rewritten.ends_with(trailing) {
                ret.push_str(trailing);
            }
        }
        ret
    }

    /// Blanks out every word and non-word run that is profane by itself.
    fn remove_profane_words(&self, text: &str) -> String {
        let mut ret = String::with_capacity(text.len());
        let keep = |token: &str, ret: &mut String| {
            if trim_whitespace(token).is_empty() || !self.is_profane(token) {
                ret.push_str(token);
            }
        };

        let mut last = 0;
        for word in WORD.find_iter(text) {
            keep(&text[last..word.start()], &mut ret);
            keep(word.as_str(), &mut ret);
            last = word.end();
        }
        keep(&text[last..], &mut ret);
        ret
    }
}

/// Collapses runs of whitespace, trims, and capitalizes a leading lowercase letter.
fn normalize(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let trimmed = collapsed.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => trimmed.to_owned(),
    }
}

/// Rewrites a sentence at the given level, according to the built-in English lexicon and
/// rewrite rules, and the custom words.
///
/// # Errors
///
/// If the custom words can't be compiled.
pub fn rewrite_sentence(sentence: &str, level: Level, custom_words: &[&str]) -> Result<String> {
    Ok(Filter::new()
        .with_level(level)
        .with_custom_words(custom_words)?
        .rewrite_sentence(sentence))
}

/// Rewrites every sentence of the text. See [`rewrite_sentence`].
///
/// # Errors
///
/// If the custom words can't be compiled.
pub fn rewrite_text(text: &str, level: Level, custom_words: &[&str]) -> Result<String> {
    Ok(Filter::new()
        .with_level(level)
        .with_custom_words(custom_words)?
        .rewrite(text))
}
