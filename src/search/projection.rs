//! Grouping ranked hits by kind for display.

use crate::index::types::{ItemKind, Subkind};
use crate::query::types::SearchHit;

/// Component hits split by subkind, each in ranked order
#[derive(Debug, Clone, Default)]
pub struct ComponentResults {
    pub prompts: Vec<SearchHit>,
    pub contexts: Vec<SearchHit>,
    pub rules: Vec<SearchHit>,
}

impl ComponentResults {
    /// Keep components whose subkind is listed; an empty list keeps all three
    pub fn from_hits(hits: impl IntoIterator<Item = SearchHit>, subkinds: &[Subkind]) -> Self {
        let mut results = Self::default();
        for hit in hits {
            let Some(subkind) = hit.item.subkind else {
                continue;
            };
            if !subkinds.is_empty() && !subkinds.contains(&subkind) {
                continue;
            }
            results.bucket_mut(subkind).push(hit);
        }
        results
    }

    pub fn bucket(&self, subkind: Subkind) -> &[SearchHit] {
        match subkind {
            Subkind::Prompts => &self.prompts,
            Subkind::Contexts => &self.contexts,
            Subkind::Rules => &self.rules,
        }
    }

    fn bucket_mut(&mut self, subkind: Subkind) -> &mut Vec<SearchHit> {
        match subkind {
            Subkind::Prompts => &mut self.prompts,
            Subkind::Contexts => &mut self.contexts,
            Subkind::Rules => &mut self.rules,
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len() + self.contexts.len() + self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every hit sorted into its display group
#[derive(Debug, Clone, Default)]
pub struct GroupedResults {
    pub pipelines: Vec<SearchHit>,
    pub components: ComponentResults,
}

impl GroupedResults {
    pub fn from_hits(hits: impl IntoIterator<Item = SearchHit>) -> Self {
        let mut pipelines = Vec::new();
        let mut components = Vec::new();
        for hit in hits {
            match hit.item.kind {
                ItemKind::Pipeline => pipelines.push(hit),
                ItemKind::Component => components.push(hit),
            }
        }
        Self {
            pipelines,
            components: ComponentResults::from_hits(components, &[]),
        }
    }

    /// Non-empty groups in display order with their headings
    pub fn groups(&self) -> Vec<(&'static str, &[SearchHit])> {
        let mut groups = vec![("Pipelines", self.pipelines.as_slice())];
        for subkind in [Subkind::Prompts, Subkind::Contexts, Subkind::Rules] {
            groups.push((subkind.title(), self.components.bucket(subkind)));
        }
        groups.retain(|(_, hits)| !hits.is_empty());
        groups
    }

    pub fn len(&self) -> usize {
        self.pipelines.len() + self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
