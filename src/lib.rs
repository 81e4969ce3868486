//! # dumpdata-jekyll
//!
//! Converts a CMS `dumpdata` export (a flat JSON array of page and blog post
//! rows) into a Jekyll source tree: one Markdown file per page, named after
//! its slug, plus one dated file per blog post under `_posts/`.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Load   export.json  →  ContentSet    (rows merged by identity)
//! 2. Tree   ContentSet   →  forest        (parent pointers → page hierarchy)
//! 3. Emit   forest/posts →  *.md files    (front matter + body)
//! ```
//!
//! Each stage is a plain function from the previous stage's output, so unit
//! tests exercise pipeline logic without touching the filesystem. Emission
//! writes through an [`sink::ArtifactSink`], which the `check` command and the
//! tests swap for an in-memory one.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`schema`] | Closed set of model types, their field allow-lists and front-matter conversion tables |
//! | [`records`] | Stage 1: decodes the export, namespaces keys, merges facets into content records |
//! | [`tree`] | Stage 2: two-pass reconstruction of the page forest |
//! | [`emit`] | Stage 3: front matter, body and output path for every page and post |
//! | [`front_matter`] | Insertion-ordered metadata block and its YAML rendering |
//! | [`links`] | Ordered literal substitutions rewriting legacy links |
//! | [`markup`] | HTML → Markdown conversion with ATX headings |
//! | [`sink`] | Filesystem and in-memory artifact destinations, collision policy |
//! | [`config`] | Layered `export.toml` loading and validation |
//! | [`pipeline`] | End-to-end `build` and `check` runs |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Identity Space
//!
//! Pages and blog posts come from different tables whose primary keys overlap.
//! Post keys are shifted by [`schema::POST_IDENTITY_OFFSET`] before merging so
//! that both kinds share one identity-keyed map without collisions. Negative
//! keys, page keys at or above the offset and post keys that would overflow
//! are rejected rather than silently aliased.
//!
//! ## Closed Schema
//!
//! The four understood model types are an enum, not a string lookup. An
//! unknown type tag or a missing allow-listed field fails the load: the export
//! is assumed to match one schema version, and partial output with missing
//! metadata is worse than a loud failure.
//!
//! ## Fail Fast
//!
//! Every stage returns the first error it meets, naming the offending
//! identity, model or field. Nothing is retried and nothing is skipped.

pub mod config;
pub mod emit;
pub mod front_matter;
pub mod links;
pub mod markup;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod sink;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
