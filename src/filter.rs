use crate::lexicon::{bounded, compile};
use crate::mtch::Match;
use crate::rewrite::RewriteRule;
use crate::{trim_whitespace, Error, Level, Lexicon, Result};
use itertools::Itertools;
use regex::{Regex, RegexSet, RegexSetBuilder};

/// Caller-supplied words, matched against the original text regardless of exceptions.
struct CustomWords {
    set: RegexSet,
    regexes: Vec<Regex>,
}

impl CustomWords {
    fn new<I: IntoIterator<Item = S>, S: AsRef<str>>(words: I) -> Result<Option<Self>> {
        let sources: Vec<String> = words
            .into_iter()
            .filter_map(|w| {
                let w = trim_whitespace(w.as_ref());
                (!w.is_empty()).then(|| bounded(w))
            })
            .unique()
            .collect();
        if sources.is_empty() {
            return Ok(None);
        }
        let set = RegexSetBuilder::new(&sources)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::pattern(sources.join("|"), e))?;
        let regexes = sources
            .iter()
            .map(|source| compile(source))
            .collect::<Result<_>>()?;
        Ok(Some(Self { set, regexes }))
    }
}

/// Filter detects, finds, censors and rewrites profanity according to a [`Lexicon`], a [`Level`]
/// and optional custom words.
///
/// Checking a text works in three passes, any of which may flag it:
/// 1. Every word of the level's tiers, matched as a whole word against a copy of the text from
///    which the lexicon's exceptions were removed.
/// 2. Every custom word, matched as a whole word against the original text.
/// 3. Every pattern of the lexicon, matched against the original text at any level.
///
/// ```
/// use decorum::{Filter, Level};
///
/// let mut filter = Filter::new();
/// filter.with_level(Level::Strong);
///
/// assert!(filter.is_profane("What the fuck"));
/// assert!(!filter.is_profane("An assumption about the classics"));
/// assert_eq!(filter.censor("Shit happens"), "**** happens");
/// ```
pub struct Filter<'a> {
    lexicon: &'a Lexicon,
    level: Level,
    custom: Option<CustomWords>,
    rules: &'a [RewriteRule],
    replacement: char,
}

impl Default for Filter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter<'static> {
    /// Creates a filter over the built-in English lexicon at the default level.
    pub fn new() -> Self {
        Self::with_lexicon(Lexicon::english())
    }
}

impl<'a> Filter<'a> {
    pub fn with_lexicon(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            level: Level::default(),
            custom: None,
            rules: RewriteRule::builtin(),
            replacement: '*',
        }
    }

    /// Selects which tiers of words are checked.
    ///
    /// The default is [`Level::Moderate`].
    pub fn with_level(&mut self, level: Level) -> &mut Self {
        self.level = level;
        self
    }

    /// Checks the given words in addition to the lexicon, at any level. Words are matched
    /// literally (metacharacters such as `.` have no special meaning), case-insensitively and
    /// only as whole words. Replaces any previously set custom words.
    ///
    /// # Errors
    ///
    /// If the words exceed the size limits of the regex engine.
    pub fn with_custom_words<I: IntoIterator<Item = S>, S: AsRef<str>>(
        &mut self,
        words: I,
    ) -> Result<&mut Self> {
        self.custom = CustomWords::new(words)?;
        Ok(self)
    }

    /// Uses different rewrite rules, applied in order by [`Filter::rewrite_sentence`].
    ///
    /// The default is [`RewriteRule::builtin`].
    pub fn with_rules(&mut self, rules: &'a [RewriteRule]) -> &mut Self {
        self.rules = rules;
        self
    }

    /// Sets the character used to censor detected words.
    ///
    /// The default is `'*'`.
    pub fn with_replacement(&mut self, replacement: char) -> &mut Self {
        self.replacement = replacement;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn lexicon(&self) -> &'a Lexicon {
        self.lexicon
    }

    pub(crate) fn rules(&self) -> &'a [RewriteRule] {
        self.rules
    }

    pub(crate) fn replacement(&self) -> char {
        self.replacement
    }

    /// Returns `true` if the text contains profanity. Blank text never does.
    pub fn is_profane(&self, text: &str) -> bool {
        if trim_whitespace(text).is_empty() {
            return false;
        }

        let working = self.lexicon.working_copy(text);
        if self.lexicon.is_word_match(working.text(), self.level.tiers()) {
            return true;
        }

        if let Some(custom) = &self.custom {
            if custom.set.is_match(text) {
                return true;
            }
        }

        self.lexicon.is_pattern_match(text)
    }

    /// Returns every matched substring of the text, with its original casing, deduplicated in
    /// the order they were found: words by tier, then custom words, then patterns.
    pub fn find(&self, text: &str) -> Vec<String> {
        self.spans(text)
            .into_iter()
            .map(|m| m.as_str(text))
            .unique()
            .map(str::to_owned)
            .collect()
    }

    /// Every match in the original text, unsorted and possibly overlapping.
    pub(crate) fn spans(&self, text: &str) -> Vec<Match> {
        if trim_whitespace(text).is_empty() {
            return Vec::new();
        }

        let working = self.lexicon.working_copy(text);
        let mut ret: Vec<Match> = self
            .lexicon
            .word_matches(working.text(), self.level.tiers())
            .into_iter()
            .map(|m| working.to_original(m))
            .collect();

        if let Some(custom) = &self.custom {
            for i in custom.set.matches(text).iter() {
                ret.extend(custom.regexes[i].find_iter(text).map(Match::from_regex));
            }
        }

        ret.extend(self.lexicon.pattern_matches(text));
        ret
    }
}

/// Returns `true` if the text contains profanity at the given level, according to the built-in
/// English lexicon and the custom words.
///
/// # Errors
///
/// If the custom words can't be compiled.
pub fn contains_profanity(text: &str, level: Level, custom_words: &[&str]) -> Result<bool> {
    Ok(Filter::new()
        .with_level(level)
        .with_custom_words(custom_words)?
        .is_profane(text))
}

/// Returns every distinct profane substring of the text, in the order they were found.
///
/// # Errors
///
/// If the custom words can't be compiled.
pub fn find_profanity(text: &str, level: Level, custom_words: &[&str]) -> Result<Vec<String>> {
    Ok(Filter::new()
        .with_level(level)
        .with_custom_words(custom_words)?
        .find(text))
}

/// FilterStr makes it easy to check, censor and rewrite a `&str` with the built-in English lexicon.
pub trait FilterStr: Sized {
    /// The output is a newly allocated, censored string.
    fn censor(self) -> String;

    /// The output is a newly allocated string, with profane sentences rewritten.
    fn rewrite(self) -> String;

    /// Returns `true` if text contains profanity at the given level.
    fn is(self, level: Level) -> bool;

    /// Returns `true` if text **does not** contain profanity at the given level.
    fn isnt(self, level: Level) -> bool {
        !self.is(level)
    }

    /// Returns `true` if text contains profanity at the default level.
    fn is_profane(self) -> bool {
        self.is(Level::default())
    }
}

impl FilterStr for &str {
    fn censor(self) -> String {
        Filter::new().censor(self)
    }

    fn rewrite(self) -> String {
        Filter::new().rewrite(self)
    }

    fn is(self, level: Level) -> bool {
        Filter::new().with_level(level).is_profane(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{contains_profanity, find_profanity, Filter, FilterStr, Level};
    use rand::prelude::ThreadRng;
    use rand::{thread_rng, Rng};

    #[test]
    fn blank() {
        for text in ["", " ", "\n\t", "\u{2800}"] {
            for level in Level::EACH {
                assert!(!contains_profanity(text, level, &["foo"]).unwrap());
                assert!(find_profanity(text, level, &["foo"]).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn exception_precedence() {
        assert!(!contains_profanity("assumption", Level::All, &[]).unwrap());
        assert!(!"Our assessment of the brass section".is(Level::All));
        assert!("An assumption made by an ass".is(Level::Moderate));
    }

    #[test]
    fn word_boundaries() {
        assert!(!contains_profanity("classic", Level::Moderate, &[]).unwrap());
        assert!(contains_profanity("ass", Level::Moderate, &[]).unwrap());
        assert!(!"Scunthorpe".is(Level::All));
        assert!(!"Charles Dickens".is(Level::All));
        assert!(!"the Middlesex hospital".is(Level::All));
    }

    #[test]
    fn levels() {
        assert!("damn".is(Level::Mild));
        assert!("bastard".isnt(Level::Mild));
        assert!("bastard".is(Level::Moderate));
        assert!("cunt".isnt(Level::Moderate));
        assert!("cunt".is(Level::Strong));
        assert!("orgasm".isnt(Level::Strong));
        assert!("orgasm".is(Level::Nsfw));
        assert!("orgasm".isnt(Level::Slurs));
        assert!("orgasm".is(Level::All));
        assert!("faggot".is(Level::Slurs));
        assert!("faggot".is(Level::All));
        assert!("faggot".isnt(Level::Strong));
        assert!("damn".isnt(Level::Nsfw));
    }

    #[test]
    fn patterns() {
        // Obfuscations are caught at every level.
        for level in Level::EACH {
            assert!("f*ck this".is(level), "{}", level);
            assert!("sh1t".is(level), "{}", level);
            assert!("f u c k".is(level), "{}", level);
            assert!("b1tch".is(level), "{}", level);
        }
        assert!("what a pu55y".isnt(Level::Mild));
    }

    #[test]
    fn monotonicity() {
        let samples = include_str!("test_positive.txt")
            .lines()
            .chain(include_str!("test_negative.txt").lines());
        for sample in samples {
            for lower in Level::EACH {
                if !sample.is(lower) {
                    continue;
                }
                for higher in Level::EACH {
                    if higher.includes(lower) {
                        assert!(sample.is(higher), "{} at {} but not {}", sample, lower, higher);
                    }
                }
            }
        }
    }

    #[test]
    fn curated() {
        let mut filter = Filter::new();
        filter.with_level(Level::All);

        for case in include_str!("test_positive.txt").lines() {
            assert!(case.is(Level::All), "false negative: {}", case);
            assert_ne!(filter.censor(case), case, "uncensored: {}", case);
        }
        for case in include_str!("test_negative.txt").lines() {
            assert!(case.isnt(Level::All), "false positive: {}", case);
            assert_eq!(filter.censor(case), case);
            assert_eq!(filter.rewrite(case), case);
        }
    }

    #[test]
    fn custom_words() {
        let mut filter = Filter::new();
        filter
            .with_level(Level::Mild)
            .with_custom_words(["a.b", "f*ck*r", "c++", "smile (", "  "])
            .unwrap();

        assert!(filter.is_profane("see a.b here"));
        assert!(!filter.is_profane("see aXb here"));
        assert!(filter.is_profane("you f*ck*r"));
        assert!(!filter.is_profane("you fuckar"));
        assert!(!filter.is_profane("cc"));
        assert!(!filter.is_profane("smile"));
        assert!(!filter.is_profane("smiles"));
        assert!(!filter.is_profane("   "));

        // Custom words ignore exceptions.
        filter.with_custom_words(["grass"]).unwrap();
        assert!(filter.is_profane("touch grass"));
        assert_eq!(filter.find("Touch GRASS, grass"), ["GRASS", "grass"]);
        assert!(!filter.is_profane("grasshopper"));

        assert!(contains_profanity("a+b=c", Level::Mild, &["a+b"]).unwrap());
        assert!(!contains_profanity("aab=c", Level::Mild, &["a+b"]).unwrap());
    }

    #[test]
    fn find() {
        assert_eq!(
            find_profanity("Damn, SHIT and shit and damn!", Level::Moderate, &[]).unwrap(),
            ["Damn", "damn", "SHIT", "shit"]
        );
        assert_eq!(
            find_profanity("What an ASSUMPTION, you ass", Level::All, &[]).unwrap(),
            ["ass"]
        );
        assert_eq!(
            find_profanity("stupid sh1t", Level::Strong, &["bogus"]).unwrap(),
            ["stupid", "sh1t"]
        );
        assert!(find_profanity("hello world", Level::All, &[]).unwrap().is_empty());
    }

    #[test]
    fn unicode_abuse() {
        let mut rng = thread_rng();

        fn random_string(rng: &mut ThreadRng, len: usize) -> String {
            rng.sample_iter::<char, _>(rand::distributions::Standard)
                .take(len)
                .collect()
        }

        let filter = Filter::new();
        for _ in 0..10 {
            let input = random_string(&mut rng, 100);
            let censored = filter.censor(&input);
            assert_eq!(censored.chars().count(), input.chars().count());
            let _ = filter.find(&input);
            let _ = filter.rewrite(&input);
        }
    }

    /// This exists purely to ensure all the APIs keep compiling.
    #[test]
    fn apis() {
        let _ = "abcd".is_profane();
        let _ = "abcd".censor();
        let _ = "abcd".rewrite();
        let mut filter = Filter::default();
        let _ = filter
            .with_level(Level::All)
            .with_replacement('#')
            .with_custom_words(vec![String::from("abcd")])
            .unwrap()
            .find("abcd");
        assert_eq!(filter.level(), Level::All);
        assert!(filter.lexicon().language().is_some());
    }
}
