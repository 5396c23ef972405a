use regex::Regex;
use std::borrow::Cow;

/// A byte range of the text being inspected.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub(crate) fn from_regex(m: regex::Match) -> Self {
        Self {
            start: m.start(),
            end: m.end(),
        }
    }

    pub(crate) fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Sorts and combines overlapping matches, so that each byte is covered at most once.
    pub(crate) fn union(mut matches: Vec<Self>) -> Vec<Self> {
        matches.sort_unstable();
        let mut ret: Vec<Self> = Vec::with_capacity(matches.len());
        for m in matches {
            match ret.last_mut() {
                Some(last) if m.start < last.end => last.end = last.end.max(m.end),
                _ => ret.push(m),
            }
        }
        ret
    }
}

/// A kept run of the original text, at `original` in the original and `working` in the copy.
#[derive(Copy, Clone, Debug)]
struct Segment {
    working: usize,
    original: usize,
    len: usize,
}

impl Segment {
    fn working_end(&self) -> usize {
        self.working + self.len
    }
}

/// A copy of some text with every exception removed, which remembers where each of its bytes
/// came from.
pub(crate) struct WorkingCopy<'a> {
    text: Cow<'a, str>,
    segments: Vec<Segment>,
}

impl<'a> WorkingCopy<'a> {
    pub(crate) fn new(original: &'a str, exceptions: Option<&Regex>) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        let mut keep = |from: usize, to: usize, text: &mut String| {
            if to > from {
                segments.push(Segment {
                    working: text.len(),
                    original: from,
                    len: to - from,
                });
                text.push_str(&original[from..to]);
            }
        };

        if let Some(exceptions) = exceptions {
            for m in exceptions.find_iter(original) {
                keep(last, m.start(), &mut text);
                last = m.end();
            }
        }

        if last == 0 {
            // Nothing was removed.
            return Self {
                text: Cow::Borrowed(original),
                segments: vec![Segment {
                    working: 0,
                    original: 0,
                    len: original.len(),
                }],
            };
        }

        keep(last, original.len(), &mut text);

        Self {
            text: Cow::Owned(text),
            segments,
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Translates a match in the working copy into the corresponding range of the original. A
    /// match spanning a removed exception also covers that exception.
    pub(crate) fn to_original(&self, m: Match) -> Match {
        let first = self.segments.partition_point(|s| s.working_end() <= m.start);
        let last = self.segments.partition_point(|s| s.working_end() < m.end);
        let (first, last) = match (self.segments.get(first), self.segments.get(last)) {
            (Some(first), Some(last)) => (first, last),
            // Unreachable for matches of the working copy.
            _ => return m,
        };
        Match {
            start: first.original + (m.start - first.working),
            end: last.original + (m.end - last.working),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mtch::{Match, WorkingCopy};
    use regex::RegexBuilder;

    #[test]
    fn union() {
        let spans = vec![
            Match { start: 8, end: 12 },
            Match { start: 0, end: 3 },
            Match { start: 2, end: 5 },
            Match { start: 5, end: 6 },
        ];
        assert_eq!(
            Match::union(spans),
            vec![
                Match { start: 0, end: 5 },
                Match { start: 5, end: 6 },
                Match { start: 8, end: 12 }
            ]
        );
    }

    #[test]
    fn offsets() {
        let exceptions = RegexBuilder::new("assumption|class")
            .case_insensitive(true)
            .build()
            .unwrap();
        let original = "An Assumption: damn the CLASS, damn";
        let copy = WorkingCopy::new(original, Some(&exceptions));
        assert_eq!(copy.text(), "An : damn the , damn");

        let working = copy.text().find("damn").unwrap();
        let m = copy.to_original(Match {
            start: working,
            end: working + 4,
        });
        assert_eq!(m.as_str(original), "damn");
        assert_eq!(m.start, 15);

        let working = copy.text().rfind("damn").unwrap();
        let m = copy.to_original(Match {
            start: working,
            end: working + 4,
        });
        assert_eq!(m.as_str(original), "damn");
        assert_eq!(m.end, original.len());
    }

    #[test]
    fn untouched() {
        let copy = WorkingCopy::new("nothing removed", None);
        assert_eq!(copy.text(), "nothing removed");
        let m = copy.to_original(Match { start: 8, end: 15 });
        assert_eq!(m, Match { start: 8, end: 15 });
    }
}
