//! Shared on-disk library fixture for integration tests.

#![allow(dead_code)]

use promptkit::library::LibraryStore;
use promptkit::query::types::SearchHit;
use promptkit::search::SearchEngine;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const API_PROMPT: &str = "components/prompts/api-prompt.md";
pub const AUTH_PROMPT: &str = "components/prompts/auth-prompt.md";
pub const API_CONTEXT: &str = "components/contexts/api-context.md";
pub const SECURITY_RULES: &str = "components/rules/security-rules.md";
pub const API_PIPELINE: &str = "pipelines/api-pipeline.yaml";

/// Temporary library holding the five-item scenario
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self::empty();

        fixture.write(
            API_PROMPT,
            "---\n\
             name: API Prompt\n\
             tags: [api, error-handling, v2]\n\
             ---\n\
             # API Prompt\n\
             \n\
             Describe error handling for every endpoint.\n",
        );
        fixture.write(
            AUTH_PROMPT,
            "---\n\
             name: Authentication Prompt\n\
             tags:\n  - auth\n  - security\n  - api\n\
             ---\n\
             Validate bearer tokens before doing anything else.\n",
        );
        fixture.write(
            API_CONTEXT,
            "---\n\
             name: API Context\n\
             tags: [api, documentation]\n\
             ---\n\
             The service exposes a REST interface.\n",
        );
        fixture.write(
            SECURITY_RULES,
            "---\n\
             name: Security Rules\n\
             tags: [security, critical]\n\
             ---\n\
             Never log secrets.\n",
        );
        fixture.write(
            API_PIPELINE,
            "name: api-pipeline\n\
             tags: [api, production]\n\
             components:\n\
             \x20 - type: contexts\n\
             \x20   path: ../components/contexts/api-context.md\n\
             \x20   order: 2\n\
             \x20 - type: prompts\n\
             \x20   path: ../components/prompts/api-prompt.md\n\
             \x20   order: 1\n",
        );

        fixture
    }

    /// Library layout with no files
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        LibraryStore::init(dir.path()).expect("init library");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> LibraryStore {
        LibraryStore::open(self.root()).expect("open library")
    }

    pub fn engine(&self) -> SearchEngine {
        SearchEngine::new(self.store())
    }

    pub fn write(&self, logical: &str, content: &str) -> PathBuf {
        let file = self.root().join(logical);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&file, content).expect("write fixture file");
        file
    }

    pub fn read(&self, logical: &str) -> String {
        fs::read_to_string(self.root().join(logical)).expect("read fixture file")
    }
}

/// Sorted logical paths of a result
pub fn paths(hits: &[SearchHit]) -> Vec<String> {
    let mut paths: Vec<String> = hits.iter().map(|h| h.item.path.clone()).collect();
    paths.sort();
    paths
}

/// Sorted owned copy of a path list
pub fn sorted(paths: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    out.sort();
    out
}
