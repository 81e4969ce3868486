//! HTML → Markdown conversion for exported rich-text bodies.
//!
//! The CMS stores page and post bodies as editor-generated HTML. Jekyll renders
//! HTML inside `.md` files just fine, so conversion is optional; when enabled
//! it produces plain Markdown with ATX headings (`## Title`), which is far
//! easier to edit by hand afterwards.
//!
//! Parsing and rendering are delegated to [`htmd`]. This module only fixes the
//! options: ATX headings, fenced code blocks, and `script`/`style`/`head`
//! dropped together with their contents.

use htmd::HtmlToMarkdown;
use htmd::options::{CodeBlockStyle, HeadingStyle, Options};

const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "noscript"];

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            ..Options::default()
        })
        .build()
}

/// Convert an HTML fragment to Markdown, trimmed of surrounding blank lines.
pub fn html_to_markdown(html: &str) -> Result<String, std::io::Error> {
    let markdown = converter().convert(html)?;
    Ok(markdown.trim().to_string())
}
