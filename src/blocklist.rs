use crate::lexicon::compile;
use crate::{Error, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

/// Why a site was blocked.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The host is a listed domain.
    Domain,
    /// The host is a subdomain of a listed domain.
    Subdomain,
    /// A category pattern matched the host.
    Pattern,
    /// A category pattern matched the host and path, or the raw URL.
    UrlPattern,
    /// The host is, or is a subdomain of, a custom domain.
    CustomDomain,
}

/// Result of a blocklist check. Serializes as `{"blocked": bool, "category"?, "reason"?}`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<BlockReason>,
}

impl BlockStatus {
    pub fn allowed() -> Self {
        Self::default()
    }

    pub fn blocked(category: impl Into<String>, reason: BlockReason) -> Self {
        Self {
            blocked: true,
            category: Some(category.into()),
            reason: Some(reason),
        }
    }
}

/// A category of blocked sites.
#[derive(Debug)]
pub struct Category {
    id: String,
    name: String,
    description: String,
    domains: Vec<String>,
    patterns: Vec<Regex>,
}

impl Category {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            domain_count: self.domains.len(),
        }
    }

    fn domain_status(&self, domain: &str) -> Option<BlockReason> {
        if self.domains.iter().any(|d| d == domain) {
            Some(BlockReason::Domain)
        } else if self.domains.iter().any(|d| is_subdomain(domain, d)) {
            Some(BlockReason::Subdomain)
        } else if self.patterns.iter().any(|p| p.is_match(domain)) {
            Some(BlockReason::Pattern)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub domain_count: usize,
}

#[derive(Deserialize)]
struct CategoryRecord {
    id: String,
    name: String,
    description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum EntryKind {
    Domain,
    Pattern,
}

#[derive(Deserialize)]
struct EntryRecord {
    category: String,
    kind: EntryKind,
    value: String,
}

/// Blocklist of site categories, each a list of domains and patterns. Categories are checked in
/// the order they were listed, so the first enabled category to match is the one reported.
#[derive(Debug)]
pub struct Blocklist {
    categories: Vec<Category>,
}

impl Blocklist {
    /// Category id reported for custom domains.
    pub const CUSTOM: &'static str = "custom";

    /// The built-in blocklist.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Reads a blocklist from:
    /// - `categories`, a CSV with an `id,name,description` header.
    /// - `entries`, a CSV with a `category,kind,value` header, where kind is `domain` or
    ///   `pattern`.
    pub fn from_csv(categories: &str, entries: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(categories.as_bytes());
        let mut parsed = Vec::new();
        for record in reader.deserialize::<CategoryRecord>() {
            let CategoryRecord {
                id,
                name,
                description,
            } = record?;
            parsed.push(Category {
                id,
                name,
                description,
                domains: Vec::new(),
                patterns: Vec::new(),
            });
        }

        let mut reader = csv::Reader::from_reader(entries.as_bytes());
        let headers = reader.headers()?.clone();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let entry: EntryRecord = record.deserialize(Some(&headers))?;
            let category = parsed
                .iter_mut()
                .find(|c| c.id == entry.category)
                .ok_or_else(|| Error::Asset {
                    asset: "blocklist.csv".to_owned(),
                    line,
                    reason: format!("unknown category {:?}", entry.category),
                })?;
            match entry.kind {
                EntryKind::Domain => category.domains.push(normalize_domain(&entry.value)),
                EntryKind::Pattern => category.patterns.push(compile(&entry.value)?),
            }
        }

        Ok(Self { categories: parsed })
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn categories(&self) -> Vec<CategorySummary> {
        self.categories.iter().map(Category::summary).collect()
    }

    fn enabled<'a, S: AsRef<str>>(&'a self, enabled: &'a [S]) -> impl Iterator<Item = &'a Category> {
        self.categories
            .iter()
            .filter(move |c| enabled.iter().any(|id| id.as_ref() == c.id))
    }

    /// Checks a host name against the enabled categories: listed domains, then their
    /// subdomains, then patterns. A leading `www.` is ignored.
    pub fn is_domain_blocked<S: AsRef<str>>(&self, domain: &str, enabled: &[S]) -> BlockStatus {
        let domain = normalize_domain(domain);
        for category in self.enabled(enabled) {
            if let Some(reason) = category.domain_status(&domain) {
                trace!(domain = %domain, category = %category.id, ?reason, "domain blocked");
                return BlockStatus::blocked(&category.id, reason);
            }
        }
        BlockStatus::allowed()
    }

    /// Checks a URL's host like [`Blocklist::is_domain_blocked`], then matches category patterns
    /// against its host and path, and against the URL as given. URLs that can't be parsed are
    /// allowed.
    pub fn is_url_blocked<S: AsRef<str>>(&self, url: &str, enabled: &[S]) -> BlockStatus {
        match parse_url(url) {
            Some(parsed) => self.parsed_url_status(url, &parsed, enabled),
            None => BlockStatus::allowed(),
        }
    }

    fn parsed_url_status<S: AsRef<str>>(&self, url: &str, parsed: &Url, enabled: &[S]) -> BlockStatus {
        let host = parsed.host_str().unwrap_or_default();

        let status = self.is_domain_blocked(host, enabled);
        if status.blocked {
            return status;
        }

        let host_and_path = format!("{}{}", host, parsed.path());
        for category in self.enabled(enabled) {
            if category
                .patterns
                .iter()
                .any(|p| p.is_match(&host_and_path) || p.is_match(url))
            {
                trace!(url, category = %category.id, "url blocked");
                return BlockStatus::blocked(&category.id, BlockReason::UrlPattern);
            }
        }
        BlockStatus::allowed()
    }

    /// Checks a URL against the enabled categories and then the custom domains of `store`.
    ///
    /// # Errors
    ///
    /// If the URL parses, isn't blocked by a category, and the store fails to load. Unparsable
    /// URLs are allowed without loading the store.
    pub async fn is_blocked<S: AsRef<str>>(
        &self,
        url: &str,
        enabled: &[S],
        store: &dyn CustomBlocklistStore,
    ) -> Result<BlockStatus> {
        let parsed = match parse_url(url) {
            Some(parsed) => parsed,
            None => return Ok(BlockStatus::allowed()),
        };
        let status = self.parsed_url_status(url, &parsed, enabled);
        if status.blocked {
            return Ok(status);
        }

        let custom = store.load().await?;
        let host = normalize_domain(parsed.host_str().unwrap_or_default());
        if custom.matches(&host) {
            trace!(host = %host, "custom domain blocked");
            return Ok(BlockStatus::blocked(Self::CUSTOM, BlockReason::CustomDomain));
        }
        Ok(BlockStatus::allowed())
    }
}

fn parse_url(url: &str) -> Option<Url> {
    match Url::parse(url) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(url, error = %e, "unparsable url, allowing");
            None
        }
    }
}

/// Domains and patterns blocked by the user.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomBlocklist {
    pub domains: Vec<String>,
    /// Stored and serialized with the list, but not used for matching. Custom entries only
    /// match by exact domain or subdomain.
    pub patterns: Vec<String>,
}

impl CustomBlocklist {
    /// Whether a normalized host is, or is a subdomain of, one of the domains.
    pub fn matches(&self, host: &str) -> bool {
        self.domains
            .iter()
            .any(|d| d == host || is_subdomain(host, d))
    }
}

/// Persistence of the [`CustomBlocklist`], e.g. extension storage.
#[async_trait]
pub trait CustomBlocklistStore: Send + Sync {
    async fn load(&self) -> Result<CustomBlocklist>;

    async fn save(&self, blocklist: &CustomBlocklist) -> Result<()>;
}

/// Keeps the custom blocklist in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocklist: RwLock<CustomBlocklist>,
}

impl MemoryStore {
    pub fn new(blocklist: CustomBlocklist) -> Self {
        Self {
            blocklist: RwLock::new(blocklist),
        }
    }

    pub fn snapshot(&self) -> CustomBlocklist {
        self.blocklist.read().clone()
    }
}

#[async_trait]
impl CustomBlocklistStore for MemoryStore {
    async fn load(&self) -> Result<CustomBlocklist> {
        Ok(self.snapshot())
    }

    async fn save(&self, blocklist: &CustomBlocklist) -> Result<()> {
        *self.blocklist.write() = blocklist.clone();
        Ok(())
    }
}

/// Adds a domain, normalized like hosts are, to the custom blocklist unless already present.
/// Returns the resulting blocklist.
pub async fn add_custom_domain(
    store: &dyn CustomBlocklistStore,
    domain: &str,
) -> Result<CustomBlocklist> {
    let mut blocklist = store.load().await?;
    let domain = normalize_domain(domain);
    if !domain.is_empty() && !blocklist.domains.contains(&domain) {
        debug!(domain = %domain, "adding custom domain");
        blocklist.domains.push(domain);
        store.save(&blocklist).await?;
    }
    Ok(blocklist)
}

/// Removes a domain from the custom blocklist. Returns the resulting blocklist.
pub async fn remove_custom_domain(
    store: &dyn CustomBlocklistStore,
    domain: &str,
) -> Result<CustomBlocklist> {
    let mut blocklist = store.load().await?;
    let domain = normalize_domain(domain);
    let before = blocklist.domains.len();
    blocklist.domains.retain(|d| *d != domain);
    if blocklist.domains.len() != before {
        debug!(domain = %domain, "removing custom domain");
        store.save(&blocklist).await?;
    }
    Ok(blocklist)
}

/// Lowercases and strips a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    match domain.strip_prefix("www.") {
        Some(stripped) => stripped.to_owned(),
        None => domain,
    }
}

fn is_subdomain(host: &str, domain: &str) -> bool {
    host.len() > domain.len() + 1
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

lazy_static! {
    static ref BUILTIN: Blocklist = Blocklist::from_csv(
        include_str!("blocklist_categories.csv"),
        include_str!("blocklist.csv"),
    )
    .unwrap_or_else(|e| panic!("built-in blocklist: {}", e));
}

#[cfg(test)]
mod tests {
    use crate::blocklist::{add_custom_domain, normalize_domain, remove_custom_domain};
    use crate::{
        BlockReason, BlockStatus, Blocklist, CustomBlocklist, CustomBlocklistStore, Error,
        MemoryStore, Result,
    };
    use async_trait::async_trait;

    const ADULT: &[&str] = &["adult"];

    #[test]
    fn builtin() {
        let blocklist = Blocklist::builtin();
        let categories = blocklist.categories();
        assert_eq!(categories.len(), 11);
        assert_eq!(categories[0].id, "adult");
        assert!(categories[0].domain_count > 0);
        assert_eq!(categories.last().unwrap().id, "streaming");

        let gambling = blocklist.category("gambling").unwrap();
        assert_eq!(gambling.name(), "Gambling");
        assert!(!gambling.patterns().is_empty());
        assert!(blocklist.category("custom").is_none());
    }

    #[test]
    fn domains() {
        let blocklist = Blocklist::builtin();
        assert_eq!(
            blocklist.is_domain_blocked("pornhub.com", ADULT),
            BlockStatus::blocked("adult", BlockReason::Domain)
        );
        assert_eq!(
            blocklist.is_domain_blocked("WWW.PornHub.com", ADULT).reason,
            Some(BlockReason::Domain)
        );
        assert_eq!(
            blocklist.is_domain_blocked("videos.pornhub.com", ADULT),
            BlockStatus::blocked("adult", BlockReason::Subdomain)
        );
        assert_eq!(
            blocklist.is_domain_blocked("free-porn.example", ADULT).reason,
            Some(BlockReason::Pattern)
        );
        assert!(!blocklist.is_domain_blocked("notpornhub.com", ADULT).blocked);
        assert!(!blocklist.is_domain_blocked("example.com", ADULT).blocked);
        assert!(!blocklist.is_domain_blocked("", ADULT).blocked);

        // Disabled categories don't count.
        assert!(!blocklist.is_domain_blocked("pornhub.com", &["gambling"]).blocked);
        assert!(!blocklist.is_domain_blocked("pornhub.com", &[] as &[&str]).blocked);
    }

    #[test]
    fn pattern_tokens() {
        let blocklist = Blocklist::builtin();
        let gambling = &["gambling"];
        assert!(blocklist.is_domain_blocked("poker.example", gambling).blocked);
        assert!(blocklist.is_domain_blocked("best-poker-sites.example", gambling).blocked);
        assert!(!blocklist.is_domain_blocked("pokermon.example", gambling).blocked);
        assert!(!blocklist.is_domain_blocked("sussex.example", ADULT).blocked);
    }

    #[test]
    fn urls() {
        let blocklist = Blocklist::builtin();
        assert_eq!(
            blocklist.is_url_blocked("https://www.pornhub.com/view?id=1", ADULT),
            BlockStatus::blocked("adult", BlockReason::Domain)
        );
        assert_eq!(
            blocklist.is_url_blocked("https://example.com/galleries/porn/1", ADULT),
            BlockStatus::blocked("adult", BlockReason::UrlPattern)
        );
        assert!(!blocklist.is_url_blocked("https://example.com/?q=nsfw", ADULT).blocked);
        assert!(!blocklist.is_url_blocked("https://example.com/recipes", ADULT).blocked);

        // Fail open.
        assert_eq!(blocklist.is_url_blocked("not a url", ADULT), BlockStatus::allowed());
        assert_eq!(blocklist.is_url_blocked("", ADULT), BlockStatus::allowed());
    }

    #[test]
    fn category_order() {
        let blocklist = Blocklist::builtin();
        let url = "https://casino-porn.example/";
        let either = blocklist.is_url_blocked(url, &["gambling", "adult"]);
        let or = blocklist.is_url_blocked(url, &["adult", "gambling"]);
        // Listed order, not enabled order, decides which is reported.
        assert_eq!(either, or);
        assert_eq!(either, BlockStatus::blocked("adult", BlockReason::Pattern));

        // Host checks of every category come before url patterns.
        assert_eq!(
            blocklist.is_url_blocked("https://casino.example/porn", &["adult", "gambling"]),
            BlockStatus::blocked("gambling", BlockReason::Pattern)
        );
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_string(&BlockStatus::allowed()).unwrap();
        assert_eq!(json, r#"{"blocked":false}"#);
        let json =
            serde_json::to_string(&BlockStatus::blocked("custom", BlockReason::CustomDomain))
                .unwrap();
        assert_eq!(
            json,
            r#"{"blocked":true,"category":"custom","reason":"custom_domain"}"#
        );

        let summary = serde_json::to_value(&Blocklist::builtin().categories()[0]).unwrap();
        assert!(summary["domainCount"].as_u64().unwrap() > 0);

        let custom: CustomBlocklist = serde_json::from_str(r#"{"domains":["a.example"]}"#).unwrap();
        assert_eq!(custom.domains, ["a.example"]);
        assert!(custom.patterns.is_empty());

        // Stored patterns survive a round trip but don't match.
        let custom: CustomBlocklist =
            serde_json::from_str(r#"{"domains":[],"patterns":["forum"]}"#).unwrap();
        assert_eq!(custom.patterns, ["forum"]);
        assert!(!custom.matches("forum.example.org"));
    }

    #[test]
    fn malformed() {
        let categories = "id,name,description\nadult,Adult,Adult sites\n";
        assert!(Blocklist::from_csv(categories, "category,kind,value\nadult,domain,a.example\n").is_ok());
        assert!(matches!(
            Blocklist::from_csv(categories, "category,kind,value\nnews,domain,a.example\n"),
            Err(Error::Asset { line: 2, .. })
        ));
        assert!(matches!(
            Blocklist::from_csv(categories, "category,kind,value\nadult,pattern,(\n"),
            Err(Error::Pattern { .. })
        ));
        assert!(matches!(
            Blocklist::from_csv(categories, "category,kind,value\nadult,ip,1.2.3.4\n"),
            Err(Error::Csv(_))
        ));
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_domain("WWW.Example.COM"), "example.com");
        assert_eq!(normalize_domain("www2.example.com"), "www2.example.com");
        assert_eq!(normalize_domain(" example.com "), "example.com");
    }

    #[tokio::test]
    async fn custom_domains() {
        let blocklist = Blocklist::builtin();
        let store = MemoryStore::default();

        let url = "https://forum.example.org/thread/1";
        assert!(!blocklist.is_blocked(url, ADULT, &store).await.unwrap().blocked);

        add_custom_domain(&store, "WWW.Example.org").await.unwrap();
        let list = add_custom_domain(&store, "example.org").await.unwrap();
        assert_eq!(list.domains, ["example.org"]);
        assert_eq!(store.snapshot(), list);

        assert_eq!(
            blocklist.is_blocked(url, ADULT, &store).await.unwrap(),
            BlockStatus::blocked("custom", BlockReason::CustomDomain)
        );
        assert_eq!(
            blocklist
                .is_blocked("https://www.example.org", ADULT, &store)
                .await
                .unwrap()
                .reason,
            Some(BlockReason::CustomDomain)
        );
        assert!(!blocklist
            .is_blocked("https://notexample.org", ADULT, &store)
            .await
            .unwrap()
            .blocked);

        // Built-in categories are reported before custom domains.
        add_custom_domain(&store, "pornhub.com").await.unwrap();
        assert_eq!(
            blocklist
                .is_blocked("https://pornhub.com", ADULT, &store)
                .await
                .unwrap()
                .category
                .as_deref(),
            Some("adult")
        );

        let list = remove_custom_domain(&store, "www.example.org").await.unwrap();
        assert_eq!(list.domains, ["pornhub.com"]);
        assert!(!blocklist.is_blocked(url, ADULT, &store).await.unwrap().blocked);
    }

    struct BrokenStore;

    #[async_trait]
    impl CustomBlocklistStore for BrokenStore {
        async fn load(&self) -> Result<CustomBlocklist> {
            Err(Error::Store("unavailable".to_owned()))
        }

        async fn save(&self, _: &CustomBlocklist) -> Result<()> {
            Err(Error::Store("unavailable".to_owned()))
        }
    }

    #[tokio::test]
    async fn store_errors() {
        let blocklist = Blocklist::builtin();
        // Built-in hits don't need the store.
        assert!(blocklist
            .is_blocked("https://pornhub.com", ADULT, &BrokenStore)
            .await
            .unwrap()
            .blocked);
        assert!(matches!(
            blocklist.is_blocked("https://example.com", ADULT, &BrokenStore).await,
            Err(Error::Store(_))
        ));
        // Unparsable URLs are allowed before the store is consulted.
        assert!(!blocklist
            .is_blocked("not a url", ADULT, &BrokenStore)
            .await
            .unwrap()
            .blocked);
        assert!(add_custom_domain(&BrokenStore, "example.com").await.is_err());
    }
}
