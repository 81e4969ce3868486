//! End-to-end tests: the sample export in `fixtures/` is converted into a
//! temporary Jekyll tree and the written files are inspected.
//!
//! Run with: cargo test --test build_pipeline

use dumpdata_jekyll::config::{self, ConfigOverrides, ExportConfig};
use dumpdata_jekyll::emit::{DateStyle, EmitError};
use dumpdata_jekyll::pipeline::{self, PipelineError};
use dumpdata_jekyll::sink::{CollisionPolicy, SinkError};
use dumpdata_jekyll::tree::TreeError;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/export.json")
}

/// Temp project with the sample export copied in as `export.json`.
fn project() -> (TempDir, ExportConfig) {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("export.json");
    fs::copy(fixture(), &source).unwrap();
    let config = config_for(tmp.path(), &source);
    (tmp, config)
}

/// Temp project whose export is the given JSON text.
fn project_with(json: &str) -> (TempDir, ExportConfig) {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("export.json");
    fs::write(&source, json).unwrap();
    let config = config_for(tmp.path(), &source);
    (tmp, config)
}

fn config_for(dir: &Path, source: &Path) -> ExportConfig {
    ExportConfig {
        source: source.to_string_lossy().into_owned(),
        project_dir: dir.join("site").to_string_lossy().into_owned(),
        ..ExportConfig::default()
    }
}

fn site(config: &ExportConfig) -> PathBuf {
    PathBuf::from(&config.project_dir)
}

/// Split a written file into its parsed front matter and its body.
fn read_artifact(path: &Path) -> (serde_yaml::Mapping, String) {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let rest = text.strip_prefix("---\n").expect("front matter opens");
    let (yaml, body) = rest.split_once("---\n").expect("front matter closes");
    let meta: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
    (meta, body.trim().to_string())
}

fn meta_str<'a>(meta: &'a serde_yaml::Mapping, key: &str) -> &'a str {
    meta.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("front matter has no string {key:?}: {meta:?}"))
}

fn meta_keys(meta: &serde_yaml::Mapping) -> Vec<&str> {
    meta.keys().filter_map(|k| k.as_str()).collect()
}

/// Text of every heading at `level`, in document order.
fn headings(markdown: &str, level: HeadingLevel) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Option<String> = None;
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level: l, .. }) if l == level => {
                current = Some(String::new());
            }
            Event::Text(text) => {
                if let Some(heading) = current.as_mut() {
                    heading.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(l)) if l == level => {
                if let Some(heading) = current.take() {
                    out.push(heading);
                }
            }
            _ => {}
        }
    }
    out
}

// =========================================================================
// Layout of the written tree
// =========================================================================

#[test]
fn build_writes_every_page_and_post() {
    let (_tmp, config) = project();
    let summary = pipeline::build(&config).unwrap();
    let root = site(&config);

    assert_eq!(summary.records, 8);
    assert_eq!(summary.pages.len(), 5);
    assert_eq!(summary.posts.len(), 3);

    for rel in [
        "home.md",
        "about.md",
        "about/team.md",
        "projects.md",
        "contact.md",
        "_posts/2021-3-5-hello-world.md",
        "_posts/2021-4-12-spring-update.md",
        "_posts/2021-12-20-year-in-review.md",
    ] {
        assert!(root.join(rel).is_file(), "missing {rel}");
    }
}

#[test]
fn pages_are_written_children_first() {
    let (_tmp, config) = project();
    let summary = pipeline::build(&config).unwrap();
    let order: Vec<&str> = summary.pages.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(order, vec!["Team", "About", "Projects", "Home", "Contact"]);

    let team = &summary.pages[0];
    assert_eq!(team.depth, 2);
    assert_eq!(team.path, PathBuf::from("about/team.md"));
}

// =========================================================================
// File contents
// =========================================================================

#[test]
fn page_front_matter() {
    let (_tmp, config) = project();
    pipeline::build(&config).unwrap();
    let (meta, _) = read_artifact(&site(&config).join("about/team.md"));

    assert_eq!(
        meta_keys(&meta),
        vec!["date", "permalink", "order", "title", "description", "layout"]
    );
    assert_eq!(meta_str(&meta, "date"), "2019-06-05 15:45:00");
    assert_eq!(meta_str(&meta, "permalink"), "/about/team/");
    assert_eq!(meta.get("order").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(meta_str(&meta, "title"), "Team");
    assert_eq!(meta_str(&meta, "description"), "The people behind it");
    assert_eq!(meta_str(&meta, "layout"), "page");
    assert!(meta.get("in_menus").is_none());
    assert!(meta.get("site").is_none());
}

#[test]
fn page_body_links_are_rewritten() {
    let (_tmp, config) = project();
    pipeline::build(&config).unwrap();
    let (_, body) = read_artifact(&site(&config).join("about/team.md"));

    assert!(body.contains(r#"href="{{ site.baseurl }}/contact/""#), "{body}");
    assert!(
        body.contains(r#""{{ site.baseurl }}/assets/media/team.jpg""#),
        "{body}"
    );
    assert!(!body.contains(r#""/static/"#));
    assert!(body.contains("<h2>People</h2>"), "markup is kept by default");
}

#[test]
fn page_without_content_uses_description() {
    let (_tmp, config) = project();
    pipeline::build(&config).unwrap();
    let (_, body) = read_artifact(&site(&config).join("contact.md"));
    assert_eq!(body, "How to reach us");
}

#[test]
fn post_front_matter() {
    let (_tmp, config) = project();
    pipeline::build(&config).unwrap();
    let (meta, body) =
        read_artifact(&site(&config).join("_posts/2021-4-12-spring-update.md"));

    assert_eq!(
        meta_keys(&meta),
        vec!["date", "permalink", "author", "title", "description", "layout"]
    );
    assert_eq!(meta_str(&meta, "date"), "2021-04-12 08:15:00");
    assert_eq!(meta_str(&meta, "permalink"), "/blog/spring-update/");
    assert_eq!(meta_str(&meta, "author"), "bob");
    assert_eq!(meta_str(&meta, "layout"), "post");
    assert!(body.contains("<strong>up</strong>"));
}

#[test]
fn null_post_content_uses_description() {
    let (_tmp, config) = project();
    pipeline::build(&config).unwrap();
    let (_, body) =
        read_artifact(&site(&config).join("_posts/2021-12-20-year-in-review.md"));
    assert_eq!(body, "Looking back at 2021");
}

#[test]
fn markdown_conversion_emits_atx_headings() {
    let (_tmp, mut config) = project();
    config.pages.convert_markup = true;
    config.posts.convert_markup = true;
    pipeline::build(&config).unwrap();

    let (_, home) = read_artifact(&site(&config).join("home.md"));
    assert!(home.starts_with("# Welcome"), "{home}");
    assert!(!home.contains("<h1>"));
    assert_eq!(headings(&home, HeadingLevel::H1), vec!["Welcome"]);

    let (_, post) = read_artifact(&site(&config).join("_posts/2021-4-12-spring-update.md"));
    assert_eq!(headings(&post, HeadingLevel::H2), vec!["Progress"]);
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn padded_post_dates() {
    let (_tmp, mut config) = project();
    config.posts.date_style = DateStyle::Padded;
    pipeline::build(&config).unwrap();
    let posts = site(&config).join("_posts");
    assert!(posts.join("2021-03-05-hello-world.md").is_file());
    assert!(!posts.join("2021-3-5-hello-world.md").exists());
}

#[test]
fn config_file_and_overrides_are_layered() {
    let (tmp, _) = project();
    let toml_path = tmp.path().join("export.toml");
    fs::write(
        &toml_path,
        r#"
project_dir = "ignored"

[pages]
layout = "base"

[pages.extra]
sidebar = true

[posts]
enabled = false
"#,
    )
    .unwrap();

    let found = config::find_config(None, tmp.path()).unwrap();
    assert_eq!(found.as_deref(), Some(toml_path.as_path()));

    let overrides = ConfigOverrides {
        source: Some(tmp.path().join("export.json").to_string_lossy().into_owned()),
        project_dir: Some(tmp.path().join("out").to_string_lossy().into_owned()),
        ..ConfigOverrides::default()
    };
    let config = config::load_config(found.as_deref(), &overrides).unwrap();
    let summary = pipeline::build(&config).unwrap();

    let out = tmp.path().join("out");
    assert!(summary.posts.is_empty());
    assert!(!out.join("_posts").exists());
    assert!(!tmp.path().join("ignored").exists());

    let (meta, _) = read_artifact(&out.join("home.md"));
    assert_eq!(meta_str(&meta, "layout"), "base");
    assert_eq!(meta.get("sidebar").and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn check_leaves_disk_untouched() {
    let (_tmp, config) = project();
    let (summary, sink) = pipeline::check(&config).unwrap();
    assert_eq!(sink.len(), summary.total());
    assert!(!site(&config).exists());
}

// =========================================================================
// Failures
// =========================================================================

const DUPLICATE_SLUGS: &str = r#"[
  {"model": "pages.page", "pk": 1, "fields": {
    "title": "One", "slug": "same", "description": "d", "content_model": "richtextpage",
    "parent": null, "in_menus": "", "titles": "One", "_order": 0,
    "publish_date": "2020-01-01T00:00:00Z"}},
  {"model": "pages.page", "pk": 2, "fields": {
    "title": "Two", "slug": "same", "description": "d", "content_model": "richtextpage",
    "parent": null, "in_menus": "", "titles": "Two", "_order": 1,
    "publish_date": "2020-01-01T00:00:00Z"}}
]"#;

#[test]
fn collision_policy_error_stops_the_run() {
    let (_tmp, mut config) = project_with(DUPLICATE_SLUGS);
    config.on_collision = CollisionPolicy::Error;
    let err = pipeline::build(&config).unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::Emit(EmitError::Sink(SinkError::Collision { .. }))
        ),
        "{err}"
    );
}

#[test]
fn collision_policy_warn_keeps_last_write() {
    let (_tmp, config) = project_with(DUPLICATE_SLUGS);
    pipeline::build(&config).unwrap();
    let (meta, _) = read_artifact(&site(&config).join("same.md"));
    assert_eq!(meta_str(&meta, "title"), "Two");
}

#[test]
fn dangling_parent_fails_before_writing() {
    let (_tmp, config) = project_with(
        r#"[
  {"model": "pages.page", "pk": 2, "fields": {
    "title": "Orphan", "slug": "orphan", "description": "d", "content_model": "richtextpage",
    "parent": 9, "in_menus": "", "titles": "Orphan", "_order": 0,
    "publish_date": "2020-01-01T00:00:00Z"}}
]"#,
    );
    let err = pipeline::build(&config).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Tree(TreeError::DanglingParent {
            identity: 2,
            parent: 9
        })
    ));
    assert!(!site(&config).exists());
}

#[test]
fn unknown_model_fails_the_load() {
    let (_tmp, config) = project_with(r#"[{"model": "blog.blogcategory", "pk": 1, "fields": {}}]"#);
    assert!(matches!(
        pipeline::build(&config),
        Err(PipelineError::Load(_))
    ));
}
