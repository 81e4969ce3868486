//! Export configuration module.
//!
//! Handles loading, validating, and layering `export.toml`. Every run resolves
//! one [`ExportConfig`] from three layers, later layers winning key by key:
//!
//! ```text
//! stock defaults  →  export.toml  →  command-line flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source = "export.json"       # dumpdata JSON export to read
//! project_dir = "."            # Jekyll source tree to write into
//! print = false                # Print merged records and forest as JSON
//! on_collision = "warn"        # overwrite | warn | error
//!
//! [links]
//! base_url = "{{ site.baseurl }}"
//! assets_path = "/assets/"
//! static_prefixes = ["/static/"]
//! # legacy_origin = "https://www.example.org"
//!
//! [pages]
//! enabled = true
//! layout = "page"
//! convert_markup = false
//! rewrite_links = true
//!
//! [pages.extra]               # Extra front-matter keys for every page
//!
//! [posts]
//! enabled = true
//! layout = "post"
//! convert_markup = false
//! rewrite_links = true
//! directory = "_posts"
//! date_style = "unpadded"      # unpadded (2021-3-5) | padded (2021-03-05)
//!
//! [posts.extra]               # Extra front-matter keys for every post
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::emit::DateStyle;
use crate::sink::CollisionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "export.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Export configuration loaded from `export.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Path to the dumpdata JSON export.
    pub source: String,
    /// Root of the Jekyll source tree; artifacts are written relative to it.
    pub project_dir: String,
    /// Print the merged records and the page forest before emitting.
    pub print: bool,
    /// What to do when two artifacts land on the same path.
    pub on_collision: CollisionPolicy,
    pub links: LinksConfig,
    pub pages: PagesConfig,
    pub posts: PostsConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            source: "export.json".to_string(),
            project_dir: ".".to_string(),
            print: false,
            on_collision: CollisionPolicy::default(),
            links: LinksConfig::default(),
            pages: PagesConfig::default(),
            posts: PostsConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Validate config values are usable before anything is read or written.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.trim().is_empty() {
            return Err(ConfigError::Validation("source must not be empty".into()));
        }
        if self.pages.layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pages.layout must not be empty".into(),
            ));
        }
        if self.posts.layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "posts.layout must not be empty".into(),
            ));
        }
        let dir = Path::new(&self.posts.directory);
        if self.posts.directory.is_empty() || dir.is_absolute() {
            return Err(ConfigError::Validation(
                "posts.directory must be a non-empty relative path".into(),
            ));
        }
        self.links.validate()
    }
}

/// Link rewriting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Prefix every rewritten link starts with. Usually a Liquid expression.
    pub base_url: String,
    /// Where static media lives in the Jekyll tree, below `base_url`.
    pub assets_path: String,
    /// Absolute origin of the old site; links to it become site-relative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_origin: Option<String>,
    /// Old static media prefixes, most specific first.
    pub static_prefixes: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_url: "{{ site.baseurl }}".to_string(),
            assets_path: "/assets/".to_string(),
            legacy_origin: None,
            static_prefixes: vec!["/static/".to_string()],
        }
    }
}

impl LinksConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "links.base_url must not end with '/'".into(),
            ));
        }
        if !is_slash_delimited(&self.assets_path) {
            return Err(ConfigError::Validation(
                "links.assets_path must start and end with '/'".into(),
            ));
        }
        if let Some(prefix) = self
            .static_prefixes
            .iter()
            .find(|p| !is_slash_delimited(p))
        {
            return Err(ConfigError::Validation(format!(
                "links.static_prefixes entry {prefix:?} must start and end with '/'"
            )));
        }
        // A prefix inside the rewritten space would be rewritten again on a second pass.
        let base = self.base_url.as_str();
        let assets = format!("{base}{}", self.assets_path);
        let base_dir = format!("{base}/");
        if let Some(prefix) = self.static_prefixes.iter().find(|p| {
            p.starts_with(&assets) || (base.starts_with('/') && p.starts_with(&base_dir))
        }) {
            return Err(ConfigError::Validation(format!(
                "links.static_prefixes entry {prefix:?} lies inside the rewritten path {base_dir:?}"
            )));
        }
        Ok(())
    }
}

fn is_slash_delimited(s: &str) -> bool {
    s.starts_with('/') && s.ends_with('/')
}

/// Page emission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    pub enabled: bool,
    /// Jekyll layout written into every page's front matter.
    pub layout: String,
    /// Convert HTML bodies to Markdown.
    pub convert_markup: bool,
    pub rewrite_links: bool,
    /// Extra front-matter keys, applied after `layout`.
    pub extra: toml::Table,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layout: "page".to_string(),
            convert_markup: false,
            rewrite_links: true,
            extra: toml::Table::new(),
        }
    }
}

/// Blog post emission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostsConfig {
    pub enabled: bool,
    pub layout: String,
    pub convert_markup: bool,
    pub rewrite_links: bool,
    /// Output directory for posts, relative to the project directory.
    pub directory: String,
    /// Zero-padding of month and day in post filenames.
    pub date_style: DateStyle,
    pub extra: toml::Table,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layout: "post".to_string(),
            convert_markup: false,
            rewrite_links: true,
            directory: "_posts".to_string(),
            date_style: DateStyle::default(),
            extra: toml::Table::new(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<String>,
    pub project_dir: Option<String>,
    pub print: Option<bool>,
    pub pages_enabled: Option<bool>,
    pub posts_enabled: Option<bool>,
    pub page_layout: Option<String>,
    pub post_layout: Option<String>,
    pub convert_markup: Option<bool>,
}

impl ConfigOverrides {
    /// The overrides as a sparse TOML overlay, or `None` when nothing is set.
    pub fn to_value(&self) -> Option<toml::Value> {
        let mut root = toml::Table::new();
        let mut pages = toml::Table::new();
        let mut posts = toml::Table::new();

        if let Some(source) = &self.source {
            root.insert("source".into(), source.clone().into());
        }
        if let Some(dir) = &self.project_dir {
            root.insert("project_dir".into(), dir.clone().into());
        }
        if let Some(print) = self.print {
            root.insert("print".into(), print.into());
        }
        if let Some(enabled) = self.pages_enabled {
            pages.insert("enabled".into(), enabled.into());
        }
        if let Some(enabled) = self.posts_enabled {
            posts.insert("enabled".into(), enabled.into());
        }
        if let Some(layout) = &self.page_layout {
            pages.insert("layout".into(), layout.clone().into());
        }
        if let Some(layout) = &self.post_layout {
            posts.insert("layout".into(), layout.clone().into());
        }
        if let Some(convert) = self.convert_markup {
            pages.insert("convert_markup".into(), convert.into());
            posts.insert("convert_markup".into(), convert.into());
        }

        if !pages.is_empty() {
            root.insert("pages".into(), toml::Value::Table(pages));
        }
        if !posts.is_empty() {
            root.insert("posts".into(), toml::Value::Table(posts));
        }
        (!root.is_empty()).then_some(toml::Value::Table(root))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer every other layer is merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ExportConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Pick the config file for this run.
///
/// An explicit path must exist; otherwise [`CONFIG_FILE`] in `dir` is used
/// when present.
pub fn find_config(explicit: Option<&Path>, dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
        None => {
            let default = dir.join(CONFIG_FILE);
            Ok(default.exists().then_some(default))
        }
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ExportConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ExportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Resolve the full layer stack: stock defaults, then the config file (if
/// any), then command-line overrides.
pub fn load_config(
    file: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ExportConfig, ConfigError> {
    let mut base = stock_defaults_value();
    if let Some(path) = file {
        if let Some(user) = load_raw_config(path)? {
            tracing::debug!(path = %path.display(), "merging config file");
            base = merge_toml(base, user);
        }
    }
    resolve_config(base, overrides.to_value())
}

/// Returns a fully-commented stock `export.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# dumpdata-jekyll Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override values in this file.
# Unknown keys will cause an error.

# dumpdata JSON export to read.
source = "export.json"

# Root of the Jekyll source tree. Pages and posts are written relative to it.
project_dir = "."

# Print the merged records and the page forest as JSON before emitting.
print = false

# What to do when two records resolve to the same output file:
#   "overwrite" - replace silently
#   "warn"      - log a warning, then replace
#   "error"     - stop the run
on_collision = "warn"

# ---------------------------------------------------------------------------
# Link rewriting
# ---------------------------------------------------------------------------
[links]
# Prefix for every rewritten link. Must not end with '/'.
base_url = "{{ site.baseurl }}"

# Location of static media inside the Jekyll site, below base_url.
assets_path = "/assets/"

# Root-relative static media prefixes used by the old site, most specific
# first. Each one is moved under assets_path.
static_prefixes = ["/static/"]

# Absolute origin of the old site. Links pointing at it become site-relative.
# legacy_origin = "https://www.example.org"

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[pages]
# Emit one file per page in the hierarchy.
enabled = true

# Jekyll layout named in every page's front matter.
layout = "page"

# Convert HTML bodies to Markdown (ATX headings).
convert_markup = false

# Rewrite legacy links in bodies.
rewrite_links = true

# Extra front-matter keys added to every page.
[pages.extra]
# sidebar = true

# ---------------------------------------------------------------------------
# Blog posts
# ---------------------------------------------------------------------------
[posts]
enabled = true
layout = "post"
convert_markup = false
rewrite_links = true

# Output directory for posts, relative to project_dir.
directory = "_posts"

# Month/day padding in post filenames:
#   "unpadded" - 2021-3-5-hello.md
#   "padded"   - 2021-03-05-hello.md
date_style = "unpadded"

# Extra front-matter keys added to every post.
[posts.extra]
# comments = true
"##
}
