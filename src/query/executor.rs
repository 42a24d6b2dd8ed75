//! Query evaluation over a `LibraryIndex`.
//!
//! Each filter reduces to a roaring bitmap of item ids, clipped to the
//! archive-gated universe. Negated filters are complemented against that
//! universe. The bitmaps are then folded left to right: AND intersects, OR
//! unions.

use crate::index::build::LibraryIndex;
use crate::index::types::{Item, ItemId};
use crate::query::highlight::highlights;
use crate::query::scorer::{ScoreContext, Scorer, ScoringWeights, sort_hits};
use crate::query::types::{Field, Filter, FilterValue, Joiner, Query, SearchHit, type_labels};
use crate::utils::{normalize_tag, tokenize};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Evaluation switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalOptions {
    /// `tag:` requires an exact normalized tag instead of a prefix
    pub exact_tags: bool,
}

/// Query executor bound to one index generation
pub struct QueryExecutor<'a> {
    index: &'a LibraryIndex,
    scorer: Scorer,
    options: EvalOptions,
    now: DateTime<Utc>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a LibraryIndex) -> Self {
        let now = Utc::now();
        Self {
            index,
            scorer: Scorer::new(ScoringWeights::default(), now),
            options: EvalOptions::default(),
            now,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.scorer = Scorer::new(weights, self.now);
        self
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluate relative to a fixed clock
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self.scorer = Scorer::new(self.scorer.weights().clone(), now);
        self
    }

    /// Evaluate, score, highlight and sort
    pub fn execute(&self, query: &Query) -> Vec<SearchHit> {
        let ids: Vec<ItemId> = self.evaluate(query).iter().collect();
        let ctx = ScoreContext::new(query);

        let mut hits: Vec<SearchHit> = ids
            .par_iter()
            .filter_map(|&id| self.index.item(id))
            .map(|item| SearchHit {
                score: self.scorer.score(&**item, &ctx),
                highlights: highlights(item, query),
                item: Arc::clone(item),
            })
            .collect();

        sort_hits(&mut hits);
        debug!(filters = query.filters.len(), hits = hits.len(), "query executed");
        hits
    }

    /// Items the archive gate lets through.
    ///
    /// A query that mentions `status:archived` anywhere sees every item in
    /// the index; any other query sees only active items.
    pub fn universe(&self, query: &Query) -> RoaringBitmap {
        if query.requires_archived() {
            self.index.all_ids()
        } else {
            self.index.active_ids()
        }
    }

    /// Ids matching `query`, sorted and deduplicated
    pub fn evaluate(&self, query: &Query) -> RoaringBitmap {
        let universe = self.universe(query);

        let mut filters = query.filters.iter();
        let Some(first) = filters.next() else {
            return universe;
        };

        let mut acc = self.gated(first, &universe);
        for (filter, joiner) in filters.zip(&query.joiners) {
            let set = self.gated(filter, &universe);
            match joiner {
                Joiner::And => acc &= set,
                Joiner::Or => acc |= set,
            }
        }
        acc
    }

    fn gated(&self, filter: &Filter, universe: &RoaringBitmap) -> RoaringBitmap {
        let matched = self.matching(filter) & universe;
        if filter.negated {
            universe - matched
        } else {
            matched
        }
    }

    /// Ids whose items satisfy `filter`, ignoring negation and the gate
    pub fn matching(&self, filter: &Filter) -> RoaringBitmap {
        match (&filter.field, &filter.value) {
            (Field::Modified, FilterValue::Age(age)) => self.scan(|item| {
                age.matches_age((self.now - item.modified).num_seconds())
            }),
            (_, FilterValue::Age(_)) => RoaringBitmap::new(),
            (field, FilterValue::Text(value)) => self.match_text(*field, value),
        }
    }

    fn match_text(&self, field: Field, value: &str) -> RoaringBitmap {
        match field {
            Field::Tag => {
                let tag = normalize_tag(value);
                if self.options.exact_tags {
                    self.index.tag_exact(&tag)
                } else {
                    self.index.tag_prefix(&tag)
                }
            }
            Field::Type => type_labels(value, true)
                .into_iter()
                .fold(RoaringBitmap::new(), |acc, label| {
                    acc | self.index.kind_ids(label)
                }),
            Field::Name => {
                let needle = value.to_lowercase();
                self.scan(|item| item.name.to_lowercase().contains(&needle))
            }
            Field::Content => self.match_content(value),
            Field::Status => match value.trim().to_lowercase().as_str() {
                "archived" => self.index.archived_ids().clone(),
                "active" => self.index.active_ids(),
                _ => RoaringBitmap::new(),
            },
            // Text values never reach `modified`; the parser builds an age
            Field::Modified => RoaringBitmap::new(),
        }
    }

    /// Token lookup first, then a body substring scan when the tokens find
    /// nothing. A value of several tokens is a phrase: the token hits only
    /// narrow the candidates, and the body must contain the whole value.
    /// Names always count.
    fn match_content(&self, value: &str) -> RoaringBitmap {
        let needle = value.trim().to_lowercase();
        if needle.is_empty() {
            return RoaringBitmap::new();
        }

        let tokens = tokenize(value);
        let token_hits = self.token_hits(&tokens);
        let mut ids = if token_hits.is_empty() {
            self.scan(|item| item.body_lower().contains(&needle))
        } else if tokens.len() > 1 {
            self.retain(token_hits, |item| item.body_lower().contains(&needle))
        } else {
            token_hits
        };

        ids |= self.scan(|item| item.name.to_lowercase().contains(&needle));
        ids
    }

    /// Ids holding every one of `tokens`
    fn token_hits(&self, tokens: &[String]) -> RoaringBitmap {
        let mut hits: Option<RoaringBitmap> = None;
        for token in tokens {
            let Some(ids) = self.index.token_ids(token) else {
                return RoaringBitmap::new();
            };
            hits = Some(match hits {
                Some(acc) => acc & ids,
                None => ids.clone(),
            });
        }
        hits.unwrap_or_default()
    }

    /// Members of `candidates` whose items satisfy `predicate`
    fn retain(
        &self,
        candidates: RoaringBitmap,
        predicate: impl Fn(&Item) -> bool,
    ) -> RoaringBitmap {
        candidates
            .into_iter()
            .filter(|&id| self.index.item(id).is_some_and(|item| predicate(&**item)))
            .collect()
    }

    fn scan(&self, predicate: impl Fn(&Item) -> bool + Sync) -> RoaringBitmap {
        let ids: Vec<ItemId> = self
            .index
            .items()
            .par_iter()
            .enumerate()
            .filter(|(_, item)| predicate(item))
            .map(|(id, _)| id as ItemId)
            .collect();
        RoaringBitmap::from_sorted_iter(ids).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::IndexBuilder;
    use crate::index::types::Subkind;
    use crate::query::parser::parse_query;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn items() -> Vec<Item> {
        let t = now();
        vec![
            Item::component(
                Subkind::Prompts,
                "components/prompts/api-prompt.md",
                "API Prompt",
                vec!["api".into(), "error-handling".into(), "v2".into()],
                "Describe error handling for the endpoint.",
                t - Duration::days(2),
            )
            .with_usage_count(1),
            Item::component(
                Subkind::Prompts,
                "components/prompts/auth-prompt.md",
                "Authentication Prompt",
                vec!["auth".into(), "security".into(), "api".into()],
                "Validate tokens.",
                t - Duration::days(40),
            ),
            Item::component(
                Subkind::Contexts,
                "components/contexts/api-context.md",
                "API Context",
                vec!["api".into(), "documentation".into()],
                "Service overview.",
                t - Duration::days(10),
            )
            .with_usage_count(1),
            Item::component(
                Subkind::Rules,
                "components/rules/security-rules.md",
                "Security Rules",
                vec!["security".into(), "critical".into()],
                "Never log secrets.",
                t - Duration::days(400),
            ),
            Item::pipeline(
                "pipelines/api-pipeline.yaml",
                "api-pipeline",
                vec!["api".into(), "production".into()],
                "components:\n  - type: prompts\n    path: ../components/prompts/api-prompt.md\n",
                t - Duration::hours(3),
            ),
            Item::component(
                Subkind::Rules,
                "archive/components/rules/old-rules.md",
                "Old Rules",
                vec!["security".into()],
                "Deprecated.",
                t - Duration::days(700),
            )
            .with_archived(true),
        ]
    }

    fn index() -> LibraryIndex {
        IndexBuilder::new()
            .include_archived(true)
            .from_items(items())
            .unwrap()
    }

    fn paths(index: &LibraryIndex, query: &str) -> Vec<String> {
        let query = parse_query(query).unwrap();
        let ids = QueryExecutor::new(index).at(now()).evaluate(&query);
        let mut paths: Vec<String> = ids
            .iter()
            .map(|id| index.item(id).unwrap().path.clone())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_empty_query_is_active_universe() {
        let index = index();
        assert_eq!(paths(&index, "").len(), 5);
    }

    #[test]
    fn test_tag_prefix() {
        let index = index();
        assert_eq!(
            paths(&index, "tag:secur"),
            vec!["components/prompts/auth-prompt.md", "components/rules/security-rules.md"]
        );
        assert_eq!(paths(&index, "tag:API").len(), 4);
        assert_eq!(
            paths(&index, "tag:\"Error Handling\""),
            vec!["components/prompts/api-prompt.md"]
        );
    }

    #[test]
    fn test_exact_tags_option() {
        let index = index();
        let query = parse_query("tag:secur").unwrap();
        let exec = QueryExecutor::new(&index).with_options(EvalOptions { exact_tags: true });
        assert!(exec.evaluate(&query).is_empty());
    }

    #[test]
    fn test_type_aliases() {
        let index = index();
        assert_eq!(paths(&index, "type:prompt"), paths(&index, "type:prompts"));
        assert_eq!(paths(&index, "type:prompts").len(), 2);
        assert_eq!(paths(&index, "type:pipe"), vec!["pipelines/api-pipeline.yaml"]);
        assert_eq!(paths(&index, "type:comp").len(), 4);
        assert_eq!(paths(&index, "type:p").len(), 3);
        assert!(paths(&index, "type:widget").is_empty());
    }

    #[test]
    fn test_name_substring_case_insensitive() {
        let index = index();
        assert_eq!(paths(&index, "name:AUTH"), vec!["components/prompts/auth-prompt.md"]);
    }

    #[test]
    fn test_content_token_and_substring_fallback() {
        let index = index();
        assert_eq!(paths(&index, "content:error"), vec!["components/prompts/api-prompt.md"]);
        // not a token anywhere, found by substring
        assert_eq!(paths(&index, "content:endpo"), vec!["components/prompts/api-prompt.md"]);
        // name is searchable through content
        assert_eq!(
            paths(&index, "content:\"security rules\""),
            vec!["components/rules/security-rules.md"]
        );
        // pipeline YAML is content
        assert_eq!(paths(&index, "api-prompt.md"), vec!["pipelines/api-pipeline.yaml"]);
    }

    #[test]
    fn test_content_phrase_keeps_word_order() {
        let index = index();
        assert_eq!(
            paths(&index, "content:\"error handling\""),
            vec!["components/prompts/api-prompt.md"]
        );
        assert!(paths(&index, "content:\"handling error\"").is_empty());
        assert!(paths(&index, "content:\"endpoint error\"").is_empty());
        assert!(paths(&index, "\"handling error\"").is_empty());

        let query = parse_query("\"error handling\"").unwrap();
        let hits = QueryExecutor::new(&index).at(now()).execute(&query);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].highlights[0].text.contains("error handling"));
    }

    #[test]
    fn test_huge_modified_window() {
        let index = index();
        assert_eq!(paths(&index, "modified:>99999999999d").len(), 5);
        assert_eq!(paths(&index, "modified:>999999999999999d").len(), 5);
        assert!(paths(&index, "modified:<999999999999999d").is_empty());
    }

    #[test]
    fn test_modified_inverted_operators() {
        let index = index();
        assert_eq!(
            paths(&index, "modified:>7d"),
            vec!["components/prompts/api-prompt.md", "pipelines/api-pipeline.yaml"]
        );
        assert_eq!(
            paths(&index, "modified:<1m"),
            vec!["components/prompts/auth-prompt.md", "components/rules/security-rules.md"]
        );
        assert!(paths(&index, "modified:>0d").is_empty());
        assert_eq!(paths(&index, "modified:<1y"), vec!["components/rules/security-rules.md"]);
    }

    #[test]
    fn test_status_and_archive_gate() {
        let index = index();
        assert_eq!(paths(&index, "status:archived"), vec!["archive/components/rules/old-rules.md"]);
        assert_eq!(paths(&index, "status:active").len(), 5);
        assert!(paths(&index, "status:bogus").is_empty());
        // archived items only become visible when the query mentions them
        assert_eq!(paths(&index, "tag:security").len(), 2);
        assert_eq!(paths(&index, "tag:security OR status:archived").len(), 3);
        assert_eq!(paths(&index, "NOT status:archived").len(), 5);
    }

    #[test]
    fn test_and_or_not_left_to_right() {
        let index = index();
        assert_eq!(
            paths(&index, "tag:api AND type:component"),
            vec![
                "components/contexts/api-context.md",
                "components/prompts/api-prompt.md",
                "components/prompts/auth-prompt.md",
            ]
        );
        assert_eq!(
            paths(&index, "tag:auth OR tag:critical"),
            vec!["components/prompts/auth-prompt.md", "components/rules/security-rules.md"]
        );
        assert_eq!(
            paths(&index, "tag:api NOT tag:security"),
            vec![
                "components/contexts/api-context.md",
                "components/prompts/api-prompt.md",
                "pipelines/api-pipeline.yaml",
            ]
        );
        // (tag:auth OR tag:critical) AND type:rules, folded left to right
        assert_eq!(
            paths(&index, "tag:auth OR tag:critical AND type:rules"),
            vec!["components/rules/security-rules.md"]
        );
    }

    #[test]
    fn test_negation_complements_single_filter() {
        let index = index();
        let all = paths(&index, "");
        for filter in ["tag:api", "type:rules", "name:prompt", "content:error", "modified:>7d"] {
            let matched = paths(&index, filter);
            let negated = paths(&index, &format!("NOT {filter}"));
            let mut union: Vec<_> = matched.iter().chain(&negated).cloned().collect();
            union.sort();
            assert_eq!(union, all, "{filter}");
            assert!(matched.iter().all(|p| !negated.contains(p)), "{filter}");
        }
    }

    #[test]
    fn test_execute_ranks_and_highlights() {
        let index = index();
        let query = parse_query("tag:auth OR tag:security").unwrap();
        let hits = QueryExecutor::new(&index).at(now()).execute(&query);
        let names: Vec<_> = hits.iter().map(|h| h.item.name.as_str()).collect();
        // both tags match exactly on the auth prompt
        assert_eq!(names, vec!["Authentication Prompt", "Security Rules"]);
        assert!(hits[0].score > hits[1].score);

        let query = parse_query("content:error").unwrap();
        let hits = QueryExecutor::new(&index).at(now()).execute(&query);
        assert_eq!(hits[0].highlights[0].field, Field::Content);
        assert!(hits[0].highlights[0].text.contains("error handling"));
    }

    #[test]
    fn test_execute_is_idempotent() {
        let index = index();
        let query = parse_query("api OR type:rules").unwrap();
        let exec = QueryExecutor::new(&index).at(now());
        let run = || -> Vec<(String, f32)> {
            exec.execute(&query)
                .into_iter()
                .map(|h| (h.item.path.clone(), h.score))
                .collect()
        };
        assert_eq!(run(), run());
    }
}
