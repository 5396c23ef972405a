use crate::{Filter, FilterMode, Level, Lexicon, Result, TextFilter};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// User settings, as kept by the storage layer in camelCase JSON. Missing fields take their
/// defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub filter_text: bool,
    pub filter_images: bool,
    pub block_sites: bool,
    /// Selects [`Level::All`] over [`Level::Moderate`] when no level is set.
    pub strict_mode: bool,
    /// An opaque level token, see [`Level::from_token`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_level: Option<String>,
    pub custom_words: Vec<String>,
    pub block_categories: Vec<String>,
    pub whitelisted_domains: Vec<String>,
    pub filter_mode: FilterMode,
    pub replacement_char: char,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_text: true,
            filter_images: true,
            block_sites: true,
            strict_mode: true,
            filter_level: None,
            custom_words: Vec::new(),
            block_categories: vec!["adult".to_owned()],
            whitelisted_domains: Vec::new(),
            filter_mode: FilterMode::default(),
            replacement_char: '*',
        }
    }
}

impl FilterConfig {
    pub fn level(&self) -> Level {
        match &self.filter_level {
            Some(token) => Level::from_token(token),
            None if self.strict_mode => Level::All,
            None => Level::Moderate,
        }
    }

    /// A filter over the built-in English lexicon, see [`FilterConfig::filter_with`].
    pub fn filter(&self) -> Result<Filter<'static>> {
        self.filter_with(Lexicon::english())
    }

    /// A filter over `lexicon` with the configured level, custom words and replacement.
    ///
    /// # Errors
    ///
    /// If the custom words can't be compiled.
    pub fn filter_with<'a>(&self, lexicon: &'a Lexicon) -> Result<Filter<'a>> {
        let mut filter = Filter::with_lexicon(lexicon);
        filter
            .with_level(self.level())
            .with_replacement(self.replacement_char)
            .with_custom_words(&self.custom_words)?;
        Ok(filter)
    }

    pub fn text_filter(&self) -> Result<TextFilter<'static>> {
        Ok(TextFilter::new(self.filter()?, self.filter_mode))
    }

    /// Whether a host is exempt from filtering. Hosts are compared exactly, ignoring ASCII case.
    pub fn is_whitelisted(&self, host: &str) -> bool {
        self.whitelisted_domains
            .iter()
            .any(|domain| domain.trim().eq_ignore_ascii_case(host.trim()))
    }

    /// Whether text on `host` should be filtered at all.
    pub fn filters_text_on(&self, host: &str) -> bool {
        self.filter_text && !self.is_whitelisted(host)
    }

    /// Overwrites the settings a profile controls.
    pub fn apply(&mut self, profile: &Profile) {
        let settings = &profile.settings;
        self.filter_text = settings.filter_text;
        self.filter_images = settings.filter_images;
        self.block_sites = settings.block_sites;
        self.strict_mode = settings.strict_mode;
        self.filter_level = Some(settings.filter_level.as_str().to_owned());
        self.block_categories = settings.block_categories.clone();
    }
}

/// The settings a [`Profile`] controls.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub filter_text: bool,
    pub filter_images: bool,
    pub block_sites: bool,
    pub strict_mode: bool,
    pub filter_level: Level,
    pub block_categories: Vec<String>,
}

/// A named preset of settings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub settings: ProfileSettings,
}

impl Profile {
    /// Id of the profile used when none, or an unknown one, is selected.
    pub const DEFAULT: &'static str = "teen-safe";

    pub fn builtin(id: &str) -> Option<&'static Self> {
        PROFILES.iter().find(|p| p.id == id)
    }

    /// The built-in profile `id`, falling back to the default profile.
    pub fn builtin_or_default(id: &str) -> &'static Self {
        Self::builtin(id)
            .or_else(|| Self::builtin(Self::DEFAULT))
            .unwrap_or(&PROFILES[0])
    }

    pub fn all_builtin() -> &'static [Self] {
        &PROFILES
    }
}

fn profile(
    id: &str,
    name: &str,
    description: &str,
    filter_text: bool,
    strict_mode: bool,
    filter_level: Level,
    block_categories: &[&str],
) -> Profile {
    Profile {
        id: id.to_owned(),
        name: name.to_owned(),
        description: description.to_owned(),
        settings: ProfileSettings {
            filter_text,
            filter_images: true,
            block_sites: true,
            strict_mode,
            filter_level,
            block_categories: block_categories.iter().map(|c| (*c).to_owned()).collect(),
        },
    }
}

lazy_static! {
    static ref PROFILES: Vec<Profile> = vec![
        profile(
            "child-safe",
            "Child Safe",
            "Maximum protection - blocks all profanity, adult content, and violence",
            true,
            true,
            Level::All,
            &["adult", "violence", "drugs", "gambling", "weapons", "hate"],
        ),
        profile(
            Profile::DEFAULT,
            "Teen Safe",
            "Moderate protection - blocks adult content, allows mild language",
            true,
            false,
            Level::Moderate,
            &["adult", "drugs", "gambling", "weapons"],
        ),
        profile(
            "work-safe",
            "Work Safe",
            "Professional environment - blocks NSFW content and slurs",
            true,
            false,
            Level::Strong,
            &["adult", "gambling"],
        ),
        profile(
            "minimal",
            "Minimal",
            "Light filtering - blocks only explicit adult content",
            false,
            false,
            Level::Nsfw,
            &["adult"],
        ),
    ];
}

#[cfg(test)]
mod tests {
    use crate::{FilterConfig, FilterMode, Level, Profile};

    #[test]
    fn defaults() {
        let config: FilterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FilterConfig::default());
        assert!(config.filter_text);
        assert_eq!(config.level(), Level::All);
        assert_eq!(config.block_categories, ["adult"]);
        assert_eq!(config.filter_mode, FilterMode::Rewrite);
        assert_eq!(config.replacement_char, '*');
    }

    #[test]
    fn camel_case() {
        let config: FilterConfig = serde_json::from_str(
            r##"{
                "filterText": true,
                "strictMode": false,
                "customWords": ["heck"],
                "whitelistedDomains": ["Docs.Example.com"],
                "filterMode": "censor",
                "replacementChar": "#",
                "blurLevel": 20
            }"##,
        )
        .unwrap();
        assert_eq!(config.level(), Level::Moderate);
        assert_eq!(config.custom_words, ["heck"]);
        assert_eq!(config.filter_mode, FilterMode::Censor);
        assert!(config.is_whitelisted("docs.example.com"));
        assert!(!config.is_whitelisted("example.com"));
        assert!(!config.filters_text_on("docs.example.com"));
        assert!(config.filters_text_on("example.com"));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["replacementChar"], "#");
        assert!(json.get("filterLevel").is_none());
    }

    #[test]
    fn levels() {
        let mut config = FilterConfig {
            filter_level: Some("strong".to_owned()),
            ..Default::default()
        };
        assert_eq!(config.level(), Level::Strong);
        config.filter_level = Some("extreme".to_owned());
        assert_eq!(config.level(), Level::Moderate);
    }

    #[test]
    fn filters() {
        let config = FilterConfig {
            strict_mode: false,
            custom_words: vec!["heck".to_owned()],
            replacement_char: '#',
            filter_mode: FilterMode::Censor,
            ..Default::default()
        };
        let filter = config.filter().unwrap();
        assert_eq!(filter.level(), Level::Moderate);
        assert_eq!(filter.censor("oh heck"), "oh ####");

        let text_filter = config.text_filter().unwrap();
        assert_eq!(text_filter.transform("what the hell").as_deref(), Some("what the ####"));
        assert_eq!(text_filter.report().nodes_processed, 0);
    }

    #[test]
    fn profiles() {
        assert_eq!(Profile::all_builtin().len(), 4);
        assert_eq!(Profile::builtin_or_default("nope").id, Profile::DEFAULT);

        let child = Profile::builtin("child-safe").unwrap();
        assert_eq!(child.settings.filter_level, Level::All);
        assert!(child.settings.strict_mode);

        let minimal = Profile::builtin("minimal").unwrap();
        assert!(!minimal.settings.filter_text);

        let mut config = FilterConfig::default();
        config.apply(Profile::builtin("work-safe").unwrap());
        assert_eq!(config.level(), Level::Strong);
        assert_eq!(config.block_categories, ["adult", "gambling"]);

        let json = serde_json::to_value(child).unwrap();
        assert_eq!(json["settings"]["filterLevel"], "all");
        assert_eq!(json["settings"]["blockCategories"][5], "hate");
    }
}
