//! Fixed L1/L2 canonical vocabulary plus open L3, and the job-local tag resolution
//! that maps oracle output onto stored Tags (SPEC_FULL §4.4).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{FlatTags, Tag};
use crate::repo::TagRepo;

pub const L1_CATEGORIES: &[&str] = &["Tech", "Business", "Science", "Society"];

pub static L2_TAG_CATEGORIES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("Region", ["North America", "Europe", "Asia", "China", "India"].as_slice()),
        (
            "Tech Stacks",
            ["Python", "JavaScript", "Rust", "Go", "Java", "Databases", "Cloud", "Mobile"].as_slice(),
        ),
        (
            "Tech Topics",
            [
                "AI/ML",
                "Security",
                "Web Dev",
                "DevOps",
                "Open Source",
                "Hardware",
                "Programming Languages",
            ]
            .as_slice(),
        ),
        ("Business", ["Startups", "Finance", "Markets", "Policy", "Management"].as_slice()),
        ("Science", ["Physics", "Biology", "Space", "Climate", "Medicine"].as_slice()),
    ])
});

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase; collapse every non-alphanumeric run to `-`; trim leading/trailing `-`.
/// Idempotent: `normalize_slug(normalize_slug(x)) == normalize_slug(x)` (SPEC_FULL §8).
pub fn normalize_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let collapsed = NON_ALNUM_RUN.replace_all(&lowered, "-");
    collapsed.trim_matches('-').to_string()
}

/// Exact, case-sensitive membership test: L1 set first, then L2, else 3.
pub fn level_for(name: &str) -> i16 {
    if L1_CATEGORIES.contains(&name) {
        return 1;
    }
    if category_for(name).is_some() {
        return 2;
    }
    3
}

/// The L2 category a name belongs to, or `None` if it isn't an L2 tag.
pub fn category_for(name: &str) -> Option<&'static str> {
    L2_TAG_CATEGORIES
        .iter()
        .find(|(_, names)| names.contains(&name))
        .map(|(category, _)| *category)
}

/// Per-invocation cache keyed by slug, discarded at the end of the call (SPEC_FULL
/// §4.4, §9 — must not outlive a single job to avoid stale reads after a reorganizer
/// execution elsewhere).
pub struct TaxonomyService<'a> {
    tags: &'a TagRepo,
    cache: HashMap<String, Tag>,
}

impl<'a> TaxonomyService<'a> {
    pub fn new(tags: &'a TagRepo) -> Self {
        Self { tags, cache: HashMap::new() }
    }

    /// Looks up `name` by slug (cache, then store); inserts with the computed
    /// `(level, category, is_misc)` if absent. Never increments usage_count here —
    /// usage is a derived count over `story_tags`.
    pub async fn get_or_create_tag(&mut self, name: &str) -> Result<Tag, sqlx::Error> {
        let slug = normalize_slug(name);

        if let Some(tag) = self.cache.get(&slug) {
            return Ok(tag.clone());
        }

        if let Some(tag) = self.tags.get_by_slug(&slug).await? {
            self.cache.insert(slug, tag.clone());
            return Ok(tag);
        }

        let level = level_for(name);
        let category = category_for(name);
        let is_misc = level >= 3;

        let tag = self.tags.create(name, &slug, level, category, is_misc).await?;
        self.cache.insert(slug, tag.clone());
        Ok(tag)
    }

    /// Dedupes `tags` by slug (preserving first-seen order across L1, L2, L3) and
    /// resolves each to a stored Tag.
    pub async fn resolve_tags(&mut self, tags: &FlatTags) -> Result<Vec<Tag>, sqlx::Error> {
        let mut seen = std::collections::HashSet::new();
        let mut resolved = Vec::new();

        for name in tags.iter_all() {
            let slug = normalize_slug(name);
            if !seen.insert(slug) {
                continue;
            }
            resolved.push(self.get_or_create_tag(name).await?);
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_normalization_is_idempotent() {
        let slug = normalize_slug("  Rust / Web Dev!! ");
        assert_eq!(normalize_slug(&slug), slug);
    }

    #[test]
    fn slug_collapses_non_alnum_runs() {
        assert_eq!(normalize_slug("AI/ML"), "ai-ml");
        assert_eq!(normalize_slug("  Open Source  "), "open-source");
    }

    #[test]
    fn level_for_matches_canonical_sets() {
        assert_eq!(level_for("Tech"), 1);
        assert_eq!(level_for("Business"), 1);
        assert_eq!(level_for("Rust"), 2);
        assert_eq!(level_for("AI/ML"), 2);
        assert_eq!(level_for("some long tail thing"), 3);
    }

    #[test]
    fn category_for_only_set_at_level_two() {
        assert_eq!(category_for("Rust"), Some("Tech Stacks"));
        assert_eq!(category_for("Tech"), None);
        assert_eq!(category_for("random"), None);
    }
}
