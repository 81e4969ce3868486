//! Legacy link rewriting.
//!
//! Bodies exported from the old site hard-code root-relative and absolute
//! URLs. Jekyll sites are often served from a sub-path, so every such link is
//! rewritten onto the `{{ site.baseurl }}` template prefix, and static media
//! paths move to the site's assets directory:
//!
//! ```text
//! href="/about/"                   → href="{{ site.baseurl }}/about/"
//! "/static/media/a.png"            → "{{ site.baseurl }}/assets/media/a.png"
//! "https://old.example.org/news/"  → "{{ site.baseurl }}/news/"
//! ```
//!
//! A [`Rewriter`] is an ordered list of literal, case-sensitive, replace-all
//! substitutions applied in sequence; the output of one rule is the input of
//! the next. More specific prefixes come first:
//!
//! 1. quoted legacy static prefixes → assets
//! 2. quoted legacy origin → base URL
//! 3. base URL + legacy static prefix (left over from rule 2) → assets
//! 4. `href="/` → `href="{base}/`
//!
//! When `base_url` is itself root-relative (`/docs`), rule 4's output would
//! match its own input, so that rule leaves `href="/` alone where the base is
//! already in place. With that guard one pass is final: rewriting a rewritten
//! body changes nothing.

use crate::config::LinksConfig;

/// One literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub from: String,
    pub to: String,
    /// Occurrences of `from` immediately followed by this text are kept.
    pub unless_followed_by: Option<String>,
}

impl Rule {
    fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            unless_followed_by: None,
        }
    }

    fn guarded(mut self, guard: impl Into<String>) -> Self {
        self.unless_followed_by = Some(guard.into());
        self
    }

    fn apply(&self, text: &str) -> String {
        let Some(guard) = &self.unless_followed_by else {
            return text.replace(&self.from, &self.to);
        };
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(at) = rest.find(&self.from) {
            out.push_str(&rest[..at]);
            let after = &rest[at + self.from.len()..];
            if after.starts_with(guard.as_str()) {
                out.push_str(&self.from);
            } else {
                out.push_str(&self.to);
            }
            rest = after;
        }
        out.push_str(rest);
        out
    }
}

/// Ordered substitution list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewriter {
    rules: Vec<Rule>,
}

impl Rewriter {
    pub fn from_config(config: &LinksConfig) -> Self {
        let base = config.base_url.as_str();
        let assets = format!("\"{base}{}", config.assets_path);
        let mut rules = Vec::new();

        for prefix in &config.static_prefixes {
            rules.push(Rule::new(format!("\"{prefix}"), assets.clone()));
        }
        if let Some(origin) = &config.legacy_origin {
            let origin = origin.trim_end_matches('/');
            rules.push(Rule::new(format!("\"{origin}/"), format!("\"{base}/")));
        }
        for prefix in &config.static_prefixes {
            rules.push(Rule::new(format!("\"{base}{prefix}"), assets.clone()));
        }
        let href = Rule::new("href=\"/", format!("href=\"{base}/"));
        rules.push(match base.strip_prefix('/') {
            Some(path) => href.guarded(format!("{path}/")),
            None => href,
        });

        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rewrite(&self, body: &str) -> String {
        self.rules
            .iter()
            .fold(body.to_string(), |text, rule| {
                if text.contains(&rule.from) {
                    rule.apply(&text)
                } else {
                    text
                }
            })
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::from_config(&LinksConfig::default())
    }
}

/// Rewrite legacy links with the default rule set.
pub fn rewrite_links(body: &str) -> String {
    Rewriter::default().rewrite(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_site() -> Rewriter {
        Rewriter::from_config(&LinksConfig {
            legacy_origin: Some("https://www.example.org/".to_string()),
            static_prefixes: vec!["/site/static/".to_string(), "/static/".to_string()],
            ..LinksConfig::default()
        })
    }

    #[test]
    fn root_relative_href() {
        assert_eq!(
            rewrite_links(r#"<a href="/about/">About</a>"#),
            r#"<a href="{{ site.baseurl }}/about/">About</a>"#
        );
    }

    #[test]
    fn rewriting_is_idempotent() {
        let once = rewrite_links(r#"href="/about/""#);
        assert_eq!(once, r#"href="{{ site.baseurl }}/about/""#);
        assert_eq!(rewrite_links(&once), once);
    }

    #[test]
    fn every_occurrence_is_rewritten() {
        let out = rewrite_links(r#"<a href="/a/">a</a> <a href="/b/">b</a>"#);
        assert_eq!(out.matches("{{ site.baseurl }}").count(), 2);
    }

    #[test]
    fn static_media_moves_to_assets() {
        assert_eq!(
            rewrite_links(r#"<img src="/static/media/a.png">"#),
            r#"<img src="{{ site.baseurl }}/assets/media/a.png">"#
        );
    }

    #[test]
    fn static_href_goes_to_assets_not_root() {
        assert_eq!(
            rewrite_links(r#"<a href="/static/doc.pdf">"#),
            r#"<a href="{{ site.baseurl }}/assets/doc.pdf">"#
        );
    }

    #[test]
    fn absolute_links_to_other_sites_untouched() {
        let body = r#"<a href="https://other.example.com/">x</a>"#;
        assert_eq!(rewrite_links(body), body);
    }

    #[test]
    fn case_sensitive() {
        let body = r#"<a HREF="/about/">x</a>"#;
        assert_eq!(rewrite_links(body), body);
    }

    #[test]
    fn legacy_origin_becomes_base_url() {
        assert_eq!(
            legacy_site().rewrite(r#"<a href="https://www.example.org/news/">"#),
            r#"<a href="{{ site.baseurl }}/news/">"#
        );
    }

    #[test]
    fn origin_plus_static_prefix_reaches_assets() {
        // Rule 2 leaves `{{ site.baseurl }}/site/static/`, rule 3 finishes it.
        assert_eq!(
            legacy_site().rewrite(r#"<img src="https://www.example.org/site/static/x.jpg">"#),
            r#"<img src="{{ site.baseurl }}/assets/x.jpg">"#
        );
    }

    #[test]
    fn specific_prefix_wins_over_general() {
        assert_eq!(
            legacy_site().rewrite(r#"<img src="/site/static/x.jpg">"#),
            r#"<img src="{{ site.baseurl }}/assets/x.jpg">"#
        );
    }

    #[test]
    fn legacy_rules_are_idempotent() {
        let rewriter = legacy_site();
        let body = r#"<a href="/x/"></a><img src="/static/a.png"><a href="https://www.example.org/site/static/b">"#;
        let once = rewriter.rewrite(body);
        assert_eq!(rewriter.rewrite(&once), once);
    }

    #[test]
    fn rule_order() {
        let site = legacy_site();
        let froms: Vec<&str> = site
            .rules()
            .iter()
            .map(|r| r.from.as_str())
            .collect();
        assert_eq!(
            froms,
            vec![
                "\"/site/static/",
                "\"/static/",
                "\"https://www.example.org/",
                "\"{{ site.baseurl }}/site/static/",
                "\"{{ site.baseurl }}/static/",
                "href=\"/",
            ]
        );
    }

    #[test]
    fn custom_base_url() {
        let rewriter = Rewriter::from_config(&LinksConfig {
            base_url: "/docs".to_string(),
            ..LinksConfig::default()
        });
        assert_eq!(rewriter.rewrite(r#"href="/a/""#), r#"href="/docs/a/""#);
    }

    #[test]
    fn root_relative_base_url_is_idempotent() {
        let rewriter = Rewriter::from_config(&LinksConfig {
            base_url: "/docs".to_string(),
            legacy_origin: Some("https://www.example.org".to_string()),
            ..LinksConfig::default()
        });
        let body = r#"<a href="/a/">a</a><img src="/static/p.png"><a href="https://www.example.org/b/">b</a>"#;
        let once = rewriter.rewrite(body);
        assert_eq!(
            once,
            r#"<a href="/docs/a/">a</a><img src="/docs/assets/p.png"><a href="/docs/b/">b</a>"#
        );
        assert_eq!(rewriter.rewrite(&once), once);
    }

    #[test]
    fn root_relative_base_url_guard_is_exact() {
        let rewriter = Rewriter::from_config(&LinksConfig {
            base_url: "/docs".to_string(),
            ..LinksConfig::default()
        });
        assert_eq!(
            rewriter.rewrite(r#"href="/docs/x/" href="/docsite/""#),
            r#"href="/docs/x/" href="/docs/docsite/""#
        );
    }

    #[test]
    fn empty_body() {
        assert_eq!(rewrite_links(""), "");
    }
}
