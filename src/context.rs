use crate::{trim_whitespace, Filter};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use tracing::debug;

/// A text node of a document, as seen by [`TextFilter`]. Implemented by the DOM layer.
pub trait TextNode {
    fn text(&self) -> &str;

    fn set_text(&mut self, text: String);

    /// Tag name of the parent element, if any, in any case e.g. `"SCRIPT"` or `"p"`.
    fn parent_tag(&self) -> Option<&str>;

    /// Whether the parent element is editable by the user.
    fn is_editable(&self) -> bool {
        false
    }

    /// Called after the text was replaced, with the text it had before.
    fn mark_filtered(&mut self, _original: &str) {}
}

/// How profane text nodes are transformed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Rewrite each profane sentence into a natural, clean one.
    #[default]
    Rewrite,
    /// Replace every character of every match with the censor replacement.
    Censor,
}

impl FilterMode {
    /// Interprets an opaque mode token. Unknown tokens fall back to `FilterMode::Rewrite`.
    pub fn from_token(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("censor") {
            Self::Censor
        } else {
            Self::Rewrite
        }
    }
}

/// Counts of a [`TextFilter`]'s work so far.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterReport {
    /// Nodes visited, including skipped ones.
    pub nodes_processed: usize,
    /// Nodes whose text was replaced.
    pub nodes_rewritten: usize,
}

impl Display for FilterReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes processed, {} rewritten",
            self.nodes_processed, self.nodes_rewritten
        )
    }
}

/// Parent elements whose text is never changed.
pub const SKIPPED_TAGS: [&str; 8] = [
    "SCRIPT", "STYLE", "INPUT", "TEXTAREA", "CODE", "PRE", "NOSCRIPT", "SVG",
];

/// TextFilter applies a [`Filter`] to the text nodes of a document, skipping nodes that mustn't
/// or needn't be changed. One is typically kept per document, across passes over new content.
pub struct TextFilter<'a> {
    filter: Filter<'a>,
    mode: FilterMode,
    report: FilterReport,
}

impl<'a> TextFilter<'a> {
    /// Rewrites beyond this many per filter aren't logged.
    const LOGGED_REWRITES: usize = 10;

    pub fn new(filter: Filter<'a>, mode: FilterMode) -> Self {
        Self {
            filter,
            mode,
            report: FilterReport::default(),
        }
    }

    pub fn filter(&self) -> &Filter<'a> {
        &self.filter
    }

    pub fn report(&self) -> FilterReport {
        self.report
    }

    /// Returns the replacement text for a profane text, or `None` if it should be left alone.
    pub fn transform(&self, text: &str) -> Option<String> {
        if has_been_filtered(text) || trim_whitespace(text).is_empty() {
            return None;
        }
        if !self.filter.is_profane(text) {
            return None;
        }
        let transformed = match self.mode {
            FilterMode::Rewrite => self.filter.rewrite(text),
            FilterMode::Censor => self.filter.censor(text),
        };
        if transformed.is_empty() || transformed == text {
            None
        } else {
            Some(transformed)
        }
    }

    /// Filters a single node, returning `true` if its text was replaced.
    pub fn filter_node<N: TextNode + ?Sized>(&mut self, node: &mut N) -> bool {
        self.report.nodes_processed += 1;

        if node.is_editable() || node.parent_tag().map_or(false, is_skipped_tag) {
            return false;
        }

        let transformed = match self.transform(node.text()) {
            Some(transformed) => transformed,
            None => return false,
        };

        if self.report.nodes_rewritten < Self::LOGGED_REWRITES {
            debug!(
                original = %preview(node.text()),
                rewritten = %preview(&transformed),
                mode = ?self.mode,
                "rewriting text node"
            );
        }

        let original = node.text().to_owned();
        node.set_text(transformed);
        node.mark_filtered(&original);
        self.report.nodes_rewritten += 1;
        true
    }

    /// Filters every node, returning the report of this filter so far.
    pub fn filter_nodes<'n, N: TextNode + ?Sized + 'n>(
        &mut self,
        nodes: impl IntoIterator<Item = &'n mut N>,
    ) -> FilterReport {
        for node in nodes {
            self.filter_node(node);
        }
        debug!(report = %self.report, "text filtering complete");
        self.report
    }
}

fn is_skipped_tag(tag: &str) -> bool {
    SKIPPED_TAGS
        .iter()
        .any(|skipped| skipped.eq_ignore_ascii_case(tag))
}

/// First 100 characters, for logging.
fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Returns `true` if text shows signs of a previous filtering pass: a filter marker, a run of
/// four asterisks, or asterisks making up more than 30% of it.
pub fn has_been_filtered(text: &str) -> bool {
    if text.contains("[Filtered") || text.contains("[Content filtered]") {
        return true;
    }

    let (asterisks, total) = text.chars().fold((0usize, 0usize), |(asterisks, total), c| {
        (asterisks + (c == '*') as usize, total + 1)
    });
    if asterisks > 0 && asterisks * 10 > total * 3 {
        return true;
    }

    text.contains("****")
}

#[cfg(test)]
mod tests {
    use crate::context::has_been_filtered;
    use crate::{Filter, FilterMode, FilterReport, Level, TextFilter, TextNode};

    struct Node {
        text: String,
        parent: Option<&'static str>,
        editable: bool,
        original: Option<String>,
    }

    impl Node {
        fn new(text: &str, parent: &'static str) -> Self {
            Self {
                text: text.to_owned(),
                parent: Some(parent),
                editable: false,
                original: None,
            }
        }
    }

    impl TextNode for Node {
        fn text(&self) -> &str {
            &self.text
        }

        fn set_text(&mut self, text: String) {
            self.text = text;
        }

        fn parent_tag(&self) -> Option<&str> {
            self.parent
        }

        fn is_editable(&self) -> bool {
            self.editable
        }

        fn mark_filtered(&mut self, original: &str) {
            self.original.get_or_insert_with(|| original.to_owned());
        }
    }

    #[test]
    fn filtered_markers() {
        assert!(has_been_filtered("[Filtered: profanity]"));
        assert!(has_been_filtered("some [Content filtered] text"));
        assert!(has_been_filtered("what the ****"));
        assert!(has_been_filtered("a***"));
        assert!(!has_been_filtered("a * b * c * d * e"));
        assert!(!has_been_filtered("2 * 3 = 6, and 4 * 5 = 20"));
        assert!(!has_been_filtered(""));
        assert!(!has_been_filtered("plain text"));
    }

    #[test]
    fn rewrite_nodes() {
        let mut nodes = vec![
            Node::new("What the hell is going on? I don't know.", "P"),
            Node::new("var hell = 1;", "script"),
            Node::new("Nothing to see here.", "span"),
            Node::new("   ", "div"),
            Node::new("what the ****", "p"),
            Node {
                editable: true,
                ..Node::new("damn it", "div")
            },
            Node {
                parent: None,
                ..Node::new("Shit happens.", "")
            },
        ];

        let mut filter = TextFilter::new(Filter::new(), FilterMode::Rewrite);
        let report = filter.filter_nodes(nodes.iter_mut());

        assert_eq!(
            report,
            FilterReport {
                nodes_processed: 7,
                nodes_rewritten: 2
            }
        );
        assert_eq!(nodes[0].text, "What on earth is going on? I don't know.");
        assert_eq!(
            nodes[0].original.as_deref(),
            Some("What the hell is going on? I don't know.")
        );
        assert_eq!(nodes[1].text, "var hell = 1;");
        assert_eq!(nodes[2].text, "Nothing to see here.");
        assert!(nodes[2].original.is_none());
        assert_eq!(nodes[4].text, "what the ****");
        assert_eq!(nodes[5].text, "damn it");
        assert_eq!(nodes[6].text, "Happens.");

        // A second pass leaves everything alone.
        let report = filter.filter_nodes(nodes.iter_mut());
        assert_eq!(report.nodes_processed, 14);
        assert_eq!(report.nodes_rewritten, 2);
    }

    #[test]
    fn censor_nodes() {
        let mut inner = Filter::new();
        inner.with_level(Level::All).with_replacement('#');
        let mut filter = TextFilter::new(inner, FilterMode::Censor);

        let mut node = Node::new("Nice tits, said nobody.", "em");
        assert!(filter.filter_node(&mut node));
        assert_eq!(node.text, "Nice ####, said nobody.");
        assert!(!filter.filter_node(&mut node));
        assert_eq!(filter.report().nodes_rewritten, 1);
    }

    #[test]
    fn transform() {
        let filter = TextFilter::new(Filter::new(), FilterMode::Rewrite);
        assert_eq!(filter.transform("Hello there."), None);
        assert_eq!(filter.transform(""), None);
        assert_eq!(filter.transform("oh hell").as_deref(), Some("Oh wow"));
    }

    #[test]
    fn modes() {
        assert_eq!(FilterMode::from_token("censor"), FilterMode::Censor);
        assert_eq!(FilterMode::from_token("CENSOR "), FilterMode::Censor);
        assert_eq!(FilterMode::from_token("rewrite"), FilterMode::Rewrite);
        assert_eq!(FilterMode::from_token("blur"), FilterMode::Rewrite);
        assert_eq!(FilterMode::default(), FilterMode::Rewrite);
    }
}
