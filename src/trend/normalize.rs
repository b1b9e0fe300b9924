use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Normalized identity of a raw category string (page path, referral source,
/// country, metric label).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(String);

impl CategoryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CategoryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CategoryKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CategoryKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Match condition of a normalization rule, tested against the input after
/// trailing separators are stripped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "match", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    Exact(Vec<String>),
    ExactIgnoreCase(Vec<String>),
    Prefix(String),
    Any,
}

impl Predicate {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(values) => values.iter().any(|v| v == candidate),
            Self::ExactIgnoreCase(values) => values.iter().any(|v| v.eq_ignore_ascii_case(candidate)),
            Self::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            Self::Any => true,
        }
    }
}

/// A `(predicate, replacement)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    pub predicate: Predicate,
    pub replacement: String,
}

impl Rule {
    pub fn new(predicate: Predicate, replacement: impl Into<String>) -> Self {
        Self {
            predicate,
            replacement: replacement.into(),
        }
    }
}

/// Ordered rule list mapping raw category strings onto `CategoryKey`s.
///
/// Normalization is pure and idempotent: every rule replacement is a fixed
/// point, and the fallback (input with trailing `/` stripped) never changes on
/// a second pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    rules: Vec<Rule>,
}

impl Normalizer {
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// A normalizer without rules; it only strips trailing separators.
    pub const fn identity() -> Self {
        Self { rules: Vec::new() }
    }

    /// Default page-path rules: home-page aliases collapse to `/`, search-tool
    /// paths collapse to their tool root.
    pub fn page_paths() -> Self {
        Self::new(vec![
            Rule::new(
                Predicate::Exact(vec!["/".to_string(), "/home".to_string()]),
                "/",
            ),
            Rule::new(Predicate::Prefix("/glycan-search".to_string()), "/glycan-search/"),
            Rule::new(Predicate::Prefix("/protein-search".to_string()), "/protein-search/"),
        ])
    }

    /// Session sources grouped into the three traffic channels.
    pub fn traffic_channels() -> Self {
        Self::new(vec![
            Rule::new(
                Predicate::ExactIgnoreCase(vec!["google".to_string()]),
                ORGANIC_SEARCH,
            ),
            Rule::new(
                Predicate::ExactIgnoreCase(vec!["(direct)".to_string()]),
                DIRECT,
            ),
            Rule::new(Predicate::Any, REFERRAL),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Map a raw category onto its key.
    ///
    /// Input equal to any rule's replacement is already a key and comes back
    /// unchanged, before any rule is tried, even when an earlier rule's
    /// predicate would match it. Other input is stripped of trailing
    /// separators and the first matching rule wins.
    pub fn normalize(&self, raw: &str) -> CategoryKey {
        if self.rules.iter().any(|r| r.replacement == raw) {
            return CategoryKey::new(raw);
        }

        let stripped = strip_trailing_separators(raw);
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(stripped))
            .map_or_else(
                || CategoryKey::new(stripped),
                |rule| CategoryKey::new(rule.replacement.clone()),
            )
    }
}

/// Channel label for search-engine traffic.
pub const ORGANIC_SEARCH: &str = "Organic Search";
/// Channel label for direct traffic.
pub const DIRECT: &str = "Direct";
/// Channel label for everything else.
pub const REFERRAL: &str = "Referral";

fn strip_trailing_separators(raw: &str) -> &str {
    let stripped = raw.trim_end_matches('/');
    if stripped.is_empty() && !raw.is_empty() {
        "/"
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_trailing_separator() {
        let n = Normalizer::identity();
        assert_eq!(n.normalize("/about/").as_str(), "/about");
        assert_eq!(n.normalize("/about").as_str(), "/about");
    }

    #[test]
    fn test_root_is_preserved() {
        let n = Normalizer::identity();
        assert_eq!(n.normalize("/").as_str(), "/");
        assert_eq!(n.normalize("//").as_str(), "/");
        assert_eq!(n.normalize("").as_str(), "");
    }

    #[test]
    fn test_home_aliases_collapse() {
        let n = Normalizer::page_paths();
        assert_eq!(n.normalize("/").as_str(), "/");
        assert_eq!(n.normalize("/home").as_str(), "/");
        assert_eq!(n.normalize("/home/").as_str(), "/");
    }

    #[test]
    fn test_search_prefix_collapses_to_root() {
        let n = Normalizer::page_paths();
        assert_eq!(
            n.normalize("/glycan-search/abc123").as_str(),
            "/glycan-search/"
        );
        assert_eq!(n.normalize("/glycan-search").as_str(), "/glycan-search/");
        assert_eq!(
            n.normalize("/protein-search/P12345/").as_str(),
            "/protein-search/"
        );
        assert_eq!(n.normalize("/glycan/G00001MO").as_str(), "/glycan/G00001MO");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let n = Normalizer::new(vec![
            Rule::new(Predicate::Prefix("/a".to_string()), "first"),
            Rule::new(Predicate::Prefix("/ab".to_string()), "second"),
        ]);
        assert_eq!(n.normalize("/abc").as_str(), "first");
    }

    #[test]
    fn test_replacement_passes_through_before_rules() {
        let n = Normalizer::new(vec![
            Rule::new(Predicate::Prefix("/docs".to_string()), "/manual"),
            Rule::new(Predicate::Prefix("/man".to_string()), "/docs"),
        ]);
        assert_eq!(n.normalize("/docs").as_str(), "/docs");
        assert_eq!(n.normalize("/docs/intro").as_str(), "/manual");
        assert_eq!(n.normalize("/manual").as_str(), "/manual");
        assert_eq!(n.normalize("/manpage").as_str(), "/docs");
    }

    #[test]
    fn test_traffic_channels() {
        let n = Normalizer::traffic_channels();
        assert_eq!(n.normalize("google").as_str(), ORGANIC_SEARCH);
        assert_eq!(n.normalize("Google").as_str(), ORGANIC_SEARCH);
        assert_eq!(n.normalize("(direct)").as_str(), DIRECT);
        assert_eq!(n.normalize("bing").as_str(), REFERRAL);
        assert_eq!(n.normalize(ORGANIC_SEARCH).as_str(), ORGANIC_SEARCH);
    }

    #[test]
    fn test_rules_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            rules: Vec<Rule>,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
[[rules]]
predicate = { match = "exact", value = ["/", "/index"] }
replacement = "/"

[[rules]]
predicate = { match = "prefix", value = "/docs" }
replacement = "/docs/"

[[rules]]
predicate = { match = "any" }
replacement = "other"
"#,
        )
        .unwrap();
        let n = Normalizer::new(parsed.rules);
        assert_eq!(n.normalize("/index/").as_str(), "/");
        assert_eq!(n.normalize("/docs/intro").as_str(), "/docs/");
        assert_eq!(n.normalize("/blog").as_str(), "other");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_page_path_normalization_is_idempotent(raw in "(/[a-z\\-]{0,12}){0,4}/{0,3}") {
            let n = Normalizer::page_paths();
            let once = n.normalize(&raw);
            let twice = n.normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_channel_normalization_is_idempotent(raw in "\\PC{0,24}") {
            let n = Normalizer::traffic_channels();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(once.as_str()), once);
        }

        #[test]
        fn prop_identity_normalization_is_idempotent(raw in "\\PC{0,32}") {
            let n = Normalizer::identity();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(once.as_str()), once);
        }
    }
}
