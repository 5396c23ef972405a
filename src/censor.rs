use crate::mtch::Match;
use crate::{Filter, Level, Result};

impl Filter<'_> {
    /// Produces a censored string, in which every character of every match is replaced with the
    /// censor replacement (see [`Filter::with_replacement`]). Overlapping matches are censored as
    /// one, so the output always has as many characters as the input.
    pub fn censor(&self, text: &str) -> String {
        let spans = Match::union(self.spans(text));
        if spans.is_empty() {
            return text.to_owned();
        }

        let mut censored = String::with_capacity(text.len());
        let mut last = 0;
        for span in spans {
            censored.push_str(&text[last..span.start]);
            let len = span.as_str(text).chars().count();
            censored.extend(std::iter::repeat(self.replacement()).take(len));
            last = span.end;
        }
        censored.push_str(&text[last..]);
        censored
    }
}

/// Censors profanity at the given level, according to the built-in English lexicon and the custom
/// words, with `replacement` repeated once per character of each match.
///
/// # Errors
///
/// If the custom words can't be compiled.
pub fn censor_profanity(
    text: &str,
    level: Level,
    replacement: char,
    custom_words: &[&str],
) -> Result<String> {
    Ok(Filter::new()
        .with_level(level)
        .with_replacement(replacement)
        .with_custom_words(custom_words)?
        .censor(text))
}
