//! Relevance scoring and result ordering.
//!
//! Scores are additive: a base for every survivor, name and tag matches,
//! content occurrences, recency, usage, and a large bonus when a type or
//! status filter matches exactly. Only non-negated filters contribute.

use crate::index::types::{ItemKind, Searchable};
use crate::query::types::{Field, Query, SearchHit, type_labels};
use crate::utils::normalize_tag;
use chrono::{DateTime, Utc};
use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const DAY_SECS: i64 = 86_400;
const WEEK_SECS: i64 = 7 * DAY_SECS;

/// Configurable weights for scoring factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Every surviving item starts here
    pub base: f32,
    pub name_exact: f32,
    pub name_prefix: f32,
    pub name_substring: f32,
    /// Per `tag:` filter equal to one of the item's tags
    pub tag_exact: f32,
    /// Per occurrence of a content term in the body
    pub content_occurrence: f32,
    /// Occurrences beyond this are not counted
    pub max_content_occurrences: usize,
    /// Modified within the last 24 hours
    pub recent_day: f32,
    /// Modified within the last 7 days
    pub recent_week: f32,
    /// Per pipeline referencing a component
    pub usage_per_reference: f32,
    pub max_usage_bonus: f32,
    /// `type:` or `status:` filter matching exactly
    pub discriminative: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 1.0,
            name_exact: 2.0,
            name_prefix: 1.0,
            name_substring: 0.5,
            tag_exact: 1.5,
            content_occurrence: 0.25,
            max_content_occurrences: 4,
            recent_day: 1.0,
            recent_week: 0.5,
            usage_per_reference: 0.1,
            max_usage_bonus: 0.4,
            discriminative: 10.0,
        }
    }
}

/// Query terms prepared once per search
#[derive(Debug, Default)]
pub struct ScoreContext {
    /// Lowercased `name:` values
    names: Vec<String>,
    /// Normalized `tag:` values
    tags: Vec<String>,
    /// Lowercased `content:` and free-text values
    content: Vec<String>,
    /// Kind labels named exactly by `type:` filters, one set per filter
    types: Vec<Vec<&'static str>>,
    /// `Some(true)` for `status:archived`, `Some(false)` for `status:active`
    statuses: Vec<Option<bool>>,
}

impl ScoreContext {
    pub fn new(query: &Query) -> Self {
        let values = |field: Field| {
            query
                .positive(field)
                .filter_map(|f| f.text_value())
                .collect::<Vec<&str>>()
        };

        Self {
            names: values(Field::Name).iter().map(|v| v.to_lowercase()).collect(),
            tags: values(Field::Tag).iter().map(|v| normalize_tag(v)).collect(),
            content: values(Field::Content)
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
            types: values(Field::Type)
                .iter()
                .map(|v| type_labels(v, false))
                .collect(),
            statuses: values(Field::Status)
                .iter()
                .map(|v| match v.trim().to_lowercase().as_str() {
                    "archived" => Some(true),
                    "active" => Some(false),
                    _ => None,
                })
                .collect(),
        }
    }
}

/// Scorer calculates relevance scores for search results
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
    now: DateTime<Utc>,
}

impl Scorer {
    pub fn new(weights: ScoringWeights, now: DateTime<Utc>) -> Self {
        Self { weights, now }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoringWeights::default(), Utc::now())
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score<S: Searchable + ?Sized>(&self, item: &S, ctx: &ScoreContext) -> f32 {
        let w = &self.weights;
        let mut score = w.base;

        let name_lower = item.name().to_lowercase();
        for value in ctx.names.iter().chain(&ctx.content) {
            score += self.name_score(&name_lower, value);
        }

        let exact_tags = ctx
            .tags
            .iter()
            .filter(|t| item.normalized_tags().contains(*t))
            .count();
        score += exact_tags as f32 * w.tag_exact;

        if !ctx.content.is_empty() {
            let body_lower = item.body().to_lowercase();
            for value in &ctx.content {
                let occurrences = memmem::find_iter(body_lower.as_bytes(), value.as_bytes())
                    .take(w.max_content_occurrences)
                    .count();
                score += occurrences as f32 * w.content_occurrence;
            }
        }

        score += self.recency_score(item.modified());

        if item.kind() == ItemKind::Component {
            score += (item.usage_count() as f32 * w.usage_per_reference).min(w.max_usage_bonus);
        }

        let item_labels = [
            Some(item.kind().label()),
            item.subkind().map(|s| s.label()),
        ];
        for labels in &ctx.types {
            if item_labels.iter().flatten().any(|l| labels.contains(l)) {
                score += w.discriminative;
            }
        }
        for status in ctx.statuses.iter().flatten() {
            if *status == item.archived() {
                score += w.discriminative;
            }
        }

        score
    }

    /// Exact beats prefix beats substring; only the best applies
    fn name_score(&self, name_lower: &str, value: &str) -> f32 {
        let w = &self.weights;
        if name_lower == value {
            w.name_exact
        } else if name_lower.starts_with(value) {
            w.name_prefix
        } else if name_lower.contains(value) {
            w.name_substring
        } else {
            0.0
        }
    }

    fn recency_score(&self, modified: DateTime<Utc>) -> f32 {
        let age = (self.now - modified).num_seconds().max(0);
        if age < DAY_SECS {
            self.weights.recent_day
        } else if age < WEEK_SECS {
            self.weights.recent_week
        } else {
            0.0
        }
    }
}

/// Total order on hits: score descending, then name (case-insensitive, then
/// exact), then path
pub fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.item.name.to_lowercase().cmp(&b.item.name.to_lowercase()))
        .then_with(|| a.item.name.cmp(&b.item.name))
        .then_with(|| a.item.path.cmp(&b.item.path))
}

pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(compare_hits);
}
