use crate::index::build::LibraryIndex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

const TOP_TAGS: usize = 15;

/// Active/archived counts for one item type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub active: usize,
    pub archived: usize,
}

/// Library statistics derived from an archive-inclusive index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryStats {
    /// Keyed by type label: `contexts`, `pipeline`, `prompts`, `rules`
    pub by_type: BTreeMap<&'static str, TypeCounts>,
    pub total_tokens: usize,
    pub distinct_tags: usize,
    pub top_tags: Vec<(String, u64)>,
    /// Components no active pipeline references
    pub unused_components: usize,
    pub vocabulary: usize,
}

impl LibraryStats {
    pub fn from_index(index: &LibraryIndex) -> Self {
        let mut stats = LibraryStats {
            vocabulary: index.token_vocabulary(),
            ..Default::default()
        };

        for item in index.items() {
            let counts = stats.by_type.entry(item.type_label()).or_default();
            if item.archived {
                counts.archived += 1;
            } else {
                counts.active += 1;
                stats.total_tokens += item.token_count;
                if item.is_component() && item.usage_count == 0 {
                    stats.unused_components += 1;
                }
            }
        }

        let mut tags: Vec<(String, u64)> = index
            .tag_counts()
            .map(|(tag, count)| (tag.to_string(), count))
            .collect();
        stats.distinct_tags = tags.len();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tags.truncate(TOP_TAGS);
        stats.top_tags = tags;

        stats
    }

    pub fn total_active(&self) -> usize {
        self.by_type.values().map(|c| c.active).sum()
    }

    pub fn total_archived(&self) -> usize {
        self.by_type.values().map(|c| c.archived).sum()
    }
}

/// Display library statistics
pub fn show_stats(root: &Path, stats: &LibraryStats) {
    println!("Library Statistics");
    println!("==================");
    println!();
    println!("Root path:        {}", root.display());
    println!("Active items:     {}", stats.total_active());
    println!("Archived items:   {}", stats.total_archived());
    println!("Active tokens:    ~{}", stats.total_tokens);
    println!("Unused components: {}", stats.unused_components);
    println!("Vocabulary:       {} tokens", stats.vocabulary);

    println!();
    println!("Items by type:");
    for (label, counts) in &stats.by_type {
        println!(
            "  {:10} {:>5} active {:>5} archived",
            label, counts.active, counts.archived
        );
    }

    if !stats.top_tags.is_empty() {
        println!();
        println!("Top tags:");
        for (tag, count) in &stats.top_tags {
            println!("  {:20} {}", tag, count);
        }
        if stats.distinct_tags > stats.top_tags.len() {
            println!(
                "  ... and {} more",
                stats.distinct_tags - stats.top_tags.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::IndexBuilder;
    use crate::index::types::{Item, Subkind};
    use chrono::Utc;

    #[test]
    fn test_stats_counts() {
        let now = Utc::now();
        let items = vec![
            Item::component(
                Subkind::Prompts,
                "components/prompts/a.md",
                "A",
                vec!["api".into(), "v2".into()],
                "abcd",
                now,
            )
            .with_usage_count(1),
            Item::component(
                Subkind::Prompts,
                "components/prompts/b.md",
                "B",
                vec!["api".into()],
                "",
                now,
            ),
            Item::pipeline("archive/pipelines/p.yaml", "p", vec![], "", now).with_archived(true),
        ];
        let index = IndexBuilder::new()
            .include_archived(true)
            .from_items(items)
            .unwrap();
        let stats = LibraryStats::from_index(&index);

        assert_eq!(stats.by_type["prompts"], TypeCounts { active: 2, archived: 0 });
        assert_eq!(stats.by_type["pipeline"], TypeCounts { active: 0, archived: 1 });
        assert_eq!(stats.total_active(), 2);
        assert_eq!(stats.total_archived(), 1);
        assert_eq!(stats.unused_components, 1);
        assert_eq!(stats.distinct_tags, 2);
        assert_eq!(stats.top_tags[0], ("api".to_string(), 2));
    }
}
