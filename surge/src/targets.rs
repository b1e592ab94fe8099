use crate::issuer::Target;
use rand::seq::SliceRandom;
use rand::Rng;
use surge_core::TargetProfile;
use url::Url;

const DEFAULT_KEYWORDS: &[&str] = &[
    "latest tech news",
    "weather today",
    "best pizza near me",
    "how to learn react",
    "javascript async await",
    "world news headlines",
    "stock market summary",
    "healthy recipes",
    "upcoming movies",
    "coding best practices",
    "travel destinations",
    "fitness tips",
    "space exploration",
    "renewable energy",
    "world history events",
    "classical music",
];

const DEFAULT_VARIATIONS: &[&str] = &["", " news", " guide", " tips", " why", " how"];

/// Chooses the target of each request.
pub trait TargetSelector {
    fn select<R: Rng + ?Sized>(&self, profile: TargetProfile, rng: &mut R) -> Target;
}

/// Random search queries against a single base URL: `<base>?q=<keyword><variation>`.
#[derive(Clone, Debug)]
pub struct SearchTargets {
    base: Url,
    keywords: Vec<String>,
    variations: Vec<String>,
}

impl SearchTargets {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            variations: DEFAULT_VARIATIONS.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn keywords<T: Into<String>>(mut self, keywords: impl IntoIterator<Item = T>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn variations<T: Into<String>>(mut self, variations: impl IntoIterator<Item = T>) -> Self {
        self.variations = variations.into_iter().map(Into::into).collect();
        self
    }
}

impl TargetSelector for SearchTargets {
    fn select<R: Rng + ?Sized>(&self, profile: TargetProfile, rng: &mut R) -> Target {
        let keyword = self.keywords.choose(rng).map(String::as_str).unwrap_or("");
        let variation = self.variations.choose(rng).map(String::as_str).unwrap_or("");

        let mut url = self.base.clone();
        if !keyword.is_empty() {
            url.query_pairs_mut()
                .append_pair("q", &format!("{keyword}{variation}"));
        }

        Target { url, profile }
    }
}

/// Always the same URL. Handy for pointing a run at one endpoint.
#[derive(Clone, Debug)]
pub struct FixedTarget(pub Url);

impl TargetSelector for FixedTarget {
    fn select<R: Rng + ?Sized>(&self, profile: TargetProfile, _rng: &mut R) -> Target {
        Target {
            url: self.0.clone(),
            profile,
        }
    }
}
