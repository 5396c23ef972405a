use crate::lexicon::data_lines;
use crate::{Filter, Level};
use lazy_static::lazy_static;
use serde::Serialize;

/// What is known about an image without looking at its pixels.
#[derive(Clone, Debug, Default)]
pub struct ImageMetadata {
    pub src: String,
    pub alt: String,
    pub title: String,
    /// Text surrounding the image, e.g. of its parent element.
    pub parent_text: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    /// A keyword in the image's attributes.
    Keyword,
    /// Profanity in the surrounding text.
    Context,
    /// A custom [`ImageClassifier`].
    Classifier,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub safe: bool,
    pub reason: String,
    pub method: ClassificationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl Classification {
    pub fn safe(reason: impl Into<String>, method: ClassificationMethod) -> Self {
        Self {
            safe: true,
            reason: reason.into(),
            method,
            keyword: None,
        }
    }

    pub fn flagged(
        reason: impl Into<String>,
        method: ClassificationMethod,
        keyword: Option<String>,
    ) -> Self {
        Self {
            safe: false,
            reason: reason.into(),
            method,
            keyword,
        }
    }
}

/// Strategy for deciding whether an image is safe to show.
pub trait ImageClassifier {
    fn classify(&self, image: &ImageMetadata) -> Classification;
}

/// Classifies images by keywords in their `src`, `alt` and `title`, then by profanity in their
/// surrounding text.
pub struct KeywordClassifier<'a> {
    keywords: &'a [String],
    filter: Filter<'a>,
}

impl Default for KeywordClassifier<'static> {
    fn default() -> Self {
        let mut filter = Filter::new();
        filter.with_level(Level::All);
        Self::new(&KEYWORDS, filter)
    }
}

impl<'a> KeywordClassifier<'a> {
    /// Keywords must be lowercase; they are matched anywhere, even inside words.
    pub fn new(keywords: &'a [String], filter: Filter<'a>) -> Self {
        Self { keywords, filter }
    }

    /// The built-in keywords.
    pub fn builtin_keywords() -> &'static [String] {
        &KEYWORDS
    }
}

impl ImageClassifier for KeywordClassifier<'_> {
    fn classify(&self, image: &ImageMetadata) -> Classification {
        let combined = format!("{} {} {}", image.src, image.alt, image.title).to_lowercase();

        if let Some(keyword) = self.keywords.iter().find(|k| combined.contains(k.as_str())) {
            return Classification::flagged(
                format!("NSFW keyword detected: {}", keyword),
                ClassificationMethod::Keyword,
                Some(keyword.clone()),
            );
        }

        if self.filter.is_profane(&image.parent_text) {
            return Classification::flagged(
                "profanity in surrounding text",
                ClassificationMethod::Context,
                None,
            );
        }

        Classification::safe("No keywords detected", ClassificationMethod::Keyword)
    }
}

/// Classifies an image with `classifier`, or with the built-in [`KeywordClassifier`] if `None`.
pub fn classify_image(
    image: &ImageMetadata,
    classifier: Option<&dyn ImageClassifier>,
) -> Classification {
    match classifier {
        Some(classifier) => classifier.classify(image),
        None => DEFAULT_CLASSIFIER.classify(image),
    }
}

lazy_static! {
    static ref KEYWORDS: Vec<String> = data_lines(include_str!("image_keywords.txt"))
        .map(str::to_lowercase)
        .collect();
    static ref DEFAULT_CLASSIFIER: KeywordClassifier<'static> = KeywordClassifier::default();
}
