use crate::trend::normalize::{Normalizer, Rule};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Report configuration loaded from a TOML file and environment variables.
///
/// Dates are written as quoted `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_site_id")]
    pub site_id: String,
    /// DuckDB database file holding live events. Without one, reports read
    /// only the Parquet archive.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// First month of the monthly trend reports.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// First month of the overview report.
    #[serde(default = "default_overview_start_date")]
    pub overview_start_date: NaiveDate,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_top_pages")]
    pub top_pages: usize,
    #[serde(default = "default_top_ten")]
    pub top_referrals: usize,
    #[serde(default = "default_top_ten")]
    pub top_countries: usize,
    #[serde(default = "default_top_ten")]
    pub bottom_pages: usize,
    /// Hostnames making up the `portal` scope.
    #[serde(default)]
    pub portal_hostnames: Vec<String>,
    /// Parent domain of subdomain scopes: scope `wiki` reads `wiki.<base>`.
    #[serde(default)]
    pub base_hostname: Option<String>,
    #[serde(default = "default_path_rules")]
    pub path_rules: Vec<Rule>,
    /// Sheet title per report name, overriding the built-in titles.
    #[serde(default)]
    pub titles: BTreeMap<String, String>,
}

fn default_site_id() -> String {
    "localhost".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 4, 1).unwrap_or_default()
}

fn default_overview_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

const fn default_page_size() -> usize {
    100_000
}

const fn default_top_pages() -> usize {
    20
}

const fn default_top_ten() -> usize {
    10
}

fn default_path_rules() -> Vec<Rule> {
    Normalizer::page_paths().rules().to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            database: None,
            data_dir: default_data_dir(),
            out_dir: default_out_dir(),
            start_date: default_start_date(),
            overview_start_date: default_overview_start_date(),
            page_size: default_page_size(),
            top_pages: default_top_pages(),
            top_referrals: default_top_ten(),
            top_countries: default_top_ten(),
            bottom_pages: default_top_ten(),
            portal_hostnames: Vec::new(),
            base_hostname: None,
            path_rules: default_path_rules(),
            titles: BTreeMap::new(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(var = name, value = %raw, "Ignoring unparseable environment override");
    }
    parsed
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `TRENDS_SITE_ID` → site_id
    /// - `TRENDS_DATABASE` → database
    /// - `TRENDS_DATA_DIR` → data_dir
    /// - `TRENDS_OUT_DIR` → out_dir
    /// - `TRENDS_START_DATE` → start_date
    /// - `TRENDS_OVERVIEW_START_DATE` → overview_start_date
    /// - `TRENDS_PAGE_SIZE` → page_size
    /// - `TRENDS_TOP_PAGES` → top_pages
    /// - `TRENDS_TOP_REFERRALS` → top_referrals
    /// - `TRENDS_TOP_COUNTRIES` → top_countries
    /// - `TRENDS_BOTTOM_PAGES` → bottom_pages
    /// - `TRENDS_PORTAL_HOSTNAMES` → portal_hostnames (comma separated)
    /// - `TRENDS_BASE_HOSTNAME` → base_hostname
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        if let Ok(site_id) = std::env::var("TRENDS_SITE_ID") {
            config.site_id = site_id;
        }
        if let Ok(database) = std::env::var("TRENDS_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }
        if let Ok(data_dir) = std::env::var("TRENDS_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(out_dir) = std::env::var("TRENDS_OUT_DIR") {
            config.out_dir = PathBuf::from(out_dir);
        }
        if let Some(d) = env_parse("TRENDS_START_DATE") {
            config.start_date = d;
        }
        if let Some(d) = env_parse("TRENDS_OVERVIEW_START_DATE") {
            config.overview_start_date = d;
        }
        if let Some(n) = env_parse("TRENDS_PAGE_SIZE") {
            config.page_size = n;
        }
        if let Some(n) = env_parse("TRENDS_TOP_PAGES") {
            config.top_pages = n;
        }
        if let Some(n) = env_parse("TRENDS_TOP_REFERRALS") {
            config.top_referrals = n;
        }
        if let Some(n) = env_parse("TRENDS_TOP_COUNTRIES") {
            config.top_countries = n;
        }
        if let Some(n) = env_parse("TRENDS_BOTTOM_PAGES") {
            config.bottom_pages = n;
        }
        if let Ok(hosts) = std::env::var("TRENDS_PORTAL_HOSTNAMES") {
            config.portal_hostnames = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(base) = std::env::var("TRENDS_BASE_HOSTNAME") {
            config.base_hostname = Some(base);
        }

        config
    }

    /// Conventional config location for a named domain.
    pub fn path_for_domain(domain: &str) -> PathBuf {
        PathBuf::from("conf").join(format!("config.{domain}.toml"))
    }

    /// Directory of archived Parquet event files.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("events")
    }

    /// Page-path normalizer built from `path_rules`.
    pub fn path_normalizer(&self) -> Normalizer {
        Normalizer::new(self.path_rules.clone())
    }

    /// Sheet title for `report`, or `default` when none is configured.
    pub fn title(&self, report: &str, default: &str) -> String {
        self.titles
            .get(report)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::normalize::Predicate;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that call `Config::load`, which reads environment
    /// variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_id, "localhost");
        assert!(config.database.is_none());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 4, 1).unwrap());
        assert_eq!(
            config.overview_start_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(config.page_size, 100_000);
        assert_eq!(config.top_pages, 20);
        assert_eq!(config.top_referrals, 10);
        assert_eq!(config.top_countries, 10);
        assert_eq!(config.bottom_pages, 10);
        assert!(config.portal_hostnames.is_empty());
        assert!(config.base_hostname.is_none());
        assert_eq!(config.path_rules, Normalizer::page_paths().rules());
        assert!(config.titles.is_empty());
    }

    #[test]
    fn test_load_from_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"
site_id = "glygen.org"
database = "/var/lib/trends/events.duckdb"
data_dir = "/tmp/trends"
out_dir = "/tmp/trends-out"
start_date = "2024-01-01"
page_size = 500
top_pages = 5
portal_hostnames = ["www.glygen.org", "glygen.org"]
base_hostname = "glygen.org"

[[path_rules]]
replacement = "/docs/"
[path_rules.predicate]
match = "prefix"
value = "/docs"

[titles]
overview = "Portal_Overview"
"#
        )
        .unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.site_id, "glygen.org");
        assert_eq!(
            config.database,
            Some(PathBuf::from("/var/lib/trends/events.duckdb"))
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/trends"));
        assert_eq!(config.out_dir, PathBuf::from("/tmp/trends-out"));
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.page_size, 500);
        assert_eq!(config.top_pages, 5);
        assert_eq!(config.top_referrals, 10);
        assert_eq!(config.portal_hostnames, vec!["www.glygen.org", "glygen.org"]);
        assert_eq!(config.base_hostname.as_deref(), Some("glygen.org"));
        assert_eq!(
            config.path_rules,
            vec![Rule::new(Predicate::Prefix("/docs".to_string()), "/docs/")]
        );
        assert_eq!(config.title("overview", "x"), "Portal_Overview");
        assert_eq!(config.title("top-pages", "Improved_Top20Pages"), "Improved_Top20Pages");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert_eq!(config.page_size, 100_000);
    }

    #[test]
    fn test_load_no_path_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(None);
        assert_eq!(config.top_pages, 20);
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "this is not valid toml {{{").unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.site_id, "localhost");
    }

    #[test]
    fn test_env_var_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        let vars = [
            ("TRENDS_PAGE_SIZE", "250"),
            ("TRENDS_START_DATE", "2022-06-15"),
            ("TRENDS_PORTAL_HOSTNAMES", "a.org, b.org,"),
            ("TRENDS_TOP_PAGES", "not-a-number"),
        ];
        let saved: Vec<_> = vars
            .iter()
            .map(|(k, _)| (*k, std::env::var(k).ok()))
            .collect();
        for (k, v) in vars {
            std::env::set_var(k, v);
        }

        let config = Config::load(None);
        assert_eq!(config.page_size, 250);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2022, 6, 15).unwrap());
        assert_eq!(config.portal_hostnames, vec!["a.org", "b.org"]);
        assert_eq!(config.top_pages, 20);

        for (k, v) in saved {
            match v {
                Some(v) => std::env::set_var(k, v),
                None => std::env::remove_var(k),
            }
        }
    }

    #[test]
    fn test_paths() {
        let config = Config {
            data_dir: PathBuf::from("/var/trends"),
            ..Config::default()
        };
        assert_eq!(config.archive_dir(), PathBuf::from("/var/trends/events"));
        assert_eq!(
            Config::path_for_domain("glygen"),
            PathBuf::from("conf/config.glygen.toml")
        );
    }

    #[test]
    fn test_path_normalizer_uses_rules() {
        let config = Config::default();
        assert_eq!(
            config.path_normalizer().normalize("/glycan-search/abc").as_str(),
            "/glycan-search/"
        );
    }
}
