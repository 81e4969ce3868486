//! End-to-end orchestration.
//!
//! Ties the stages together for the CLI:
//!
//! ```text
//! prepare:  source JSON ──load──► ContentSet ──build_forest──► forest
//! emit:     forest  ──emit_forest──►  sink   (pages, children first)
//!           content ──emit_posts───►  sink   (posts, flat)
//! ```
//!
//! [`build`] emits into an [`FsSink`] rooted at the project directory;
//! [`check`] runs the same stages into a [`MemorySink`] and leaves the disk
//! alone. Every stage fails fast: the first error aborts the run.

use crate::config::{ConfigError, ExportConfig, LinksConfig};
use crate::emit::{self, Artifact, EmitContext, EmitError};
use crate::links::Rewriter;
use crate::records::{self, ContentSet, LoadError};
use crate::sink::{ArtifactSink, FsSink, MemorySink};
use crate::tree::{self, TreeError, TreeNode};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error("Extra front-matter value is not representable: {0}")]
    Extra(#[from] serde_json::Error),
}

/// Loaded records and the page forest, ready to emit.
#[derive(Debug)]
pub struct Prepared {
    pub content: ContentSet,
    pub forest: Vec<TreeNode>,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub project_dir: PathBuf,
    /// Merged content records loaded from the export.
    pub records: usize,
    /// Page artifacts, children before parents.
    pub pages: Vec<Artifact>,
    pub posts: Vec<Artifact>,
}

impl BuildSummary {
    pub fn total(&self) -> usize {
        self.pages.len() + self.posts.len()
    }
}

/// Load the export and rebuild the page hierarchy.
pub fn prepare(config: &ExportConfig) -> Result<Prepared, PipelineError> {
    let content = records::load_file(Path::new(&config.source))?;
    let forest = tree::build_forest(&content)?;
    Ok(Prepared { content, forest })
}

/// Emit enabled artifact kinds into `sink`.
pub fn emit(
    config: &ExportConfig,
    prepared: &Prepared,
    sink: &mut dyn ArtifactSink,
) -> Result<BuildSummary, PipelineError> {
    let pages = if config.pages.enabled {
        emit::emit_forest(&prepared.forest, &prepared.content, &page_context(config)?, sink)?
    } else {
        tracing::info!("page emission disabled");
        Vec::new()
    };
    let posts = if config.posts.enabled {
        emit::emit_posts(&prepared.content, &post_context(config)?, sink)?
    } else {
        tracing::info!("post emission disabled");
        Vec::new()
    };

    Ok(BuildSummary {
        project_dir: PathBuf::from(&config.project_dir),
        records: prepared.content.len(),
        pages,
        posts,
    })
}

/// Full run, writing under the project directory.
pub fn build(config: &ExportConfig) -> Result<BuildSummary, PipelineError> {
    let prepared = prepare(config)?;
    let mut sink = FsSink::new(&config.project_dir, config.on_collision);
    emit(config, &prepared, &mut sink)
}

/// Full run into memory. Nothing is written to disk.
pub fn check(config: &ExportConfig) -> Result<(BuildSummary, MemorySink), PipelineError> {
    let prepared = prepare(config)?;
    let mut sink = MemorySink::new();
    let summary = emit(config, &prepared, &mut sink)?;
    Ok((summary, sink))
}

/// Emission options for pages, from `[pages]` and `[links]`.
pub fn page_context(config: &ExportConfig) -> Result<EmitContext, PipelineError> {
    let pages = &config.pages;
    let ctx = EmitContext::page()
        .with_markup(pages.convert_markup)
        .with_link_rewrite(pages.rewrite_links)
        .with_rewriter(rewriter(&config.links))
        .with_layout(&pages.layout);
    with_extras(ctx, &pages.extra)
}

/// Emission options for posts, from `[posts]` and `[links]`.
pub fn post_context(config: &ExportConfig) -> Result<EmitContext, PipelineError> {
    let posts = &config.posts;
    let ctx = EmitContext::post()
        .with_markup(posts.convert_markup)
        .with_link_rewrite(posts.rewrite_links)
        .with_rewriter(rewriter(&config.links))
        .with_posts_dir(&posts.directory)
        .with_date_style(posts.date_style)
        .with_layout(&posts.layout);
    with_extras(ctx, &posts.extra)
}

fn rewriter(links: &LinksConfig) -> Rewriter {
    Rewriter::from_config(links)
}

fn with_extras(mut ctx: EmitContext, extra: &toml::Table) -> Result<EmitContext, PipelineError> {
    for (key, value) in extra {
        let value: Value = serde_json::to_value(value)?;
        ctx = ctx.with_extra(key.as_str(), value);
    }
    Ok(ctx)
}
