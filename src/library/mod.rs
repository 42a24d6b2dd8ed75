//! On-disk prompt library.
//!
//! ```text
//! <root>/
//!   components/{contexts,prompts,rules}/*.md
//!   pipelines/*.yaml
//!   archive/
//!     components/...
//!     pipelines/...
//! ```
//!
//! Every file is addressed by its logical path: the path relative to the
//! library root with `/` separators, e.g. `components/prompts/api-prompt.md`.

pub mod archive;
pub mod compose;
pub mod component;
pub mod editor;
pub mod frontmatter;
pub mod pipeline;

pub use component::Component;
pub use pipeline::{Pipeline, PipelineDocument, PipelineEntry};

use crate::error::{Error, Result};
use crate::index::types::{ItemKind, Subkind};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Component as PathComponent, Path, PathBuf};

pub const COMPONENTS_DIR: &str = "components";
pub const PIPELINES_DIR: &str = "pipelines";
pub const ARCHIVE_DIR: &str = "archive";

const COMPONENT_EXTENSIONS: &[&str] = &["md"];
const PIPELINE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// What a library file holds, derived from where it lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Component(Subkind),
    Pipeline,
}

impl EntryKind {
    pub fn item_kind(self) -> ItemKind {
        match self {
            EntryKind::Component(_) => ItemKind::Component,
            EntryKind::Pipeline => ItemKind::Pipeline,
        }
    }

    pub fn subkind(self) -> Option<Subkind> {
        match self {
            EntryKind::Component(subkind) => Some(subkind),
            EntryKind::Pipeline => None,
        }
    }
}

/// A library file found on disk, not yet read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub kind: EntryKind,
    pub path: String,
    pub file: PathBuf,
    pub archived: bool,
}

impl LibraryEntry {
    pub fn modified(&self) -> Result<DateTime<Utc>> {
        let metadata = fs::metadata(&self.file).map_err(|e| Error::io(&self.file, e))?;
        let mtime = metadata.modified().map_err(|e| Error::io(&self.file, e))?;
        Ok(DateTime::<Utc>::from(mtime))
    }

    pub fn read_to_string(&self) -> Result<String> {
        fs::read_to_string(&self.file).map_err(|e| Error::io(&self.file, e))
    }

    /// File stem, used when no display name is given
    pub fn stem(&self) -> &str {
        self.file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(self.path.as_str())
    }
}

/// Handle on a library root directory
#[derive(Debug, Clone)]
pub struct LibraryStore {
    root: PathBuf,
}

impl LibraryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open an existing library root
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NotFound(root.display().to_string()));
        }
        Ok(Self::new(root))
    }

    /// Create the directory layout (idempotent) and open it
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        for archived in [false, true] {
            for subkind in Subkind::ALL {
                let dir = store.components_dir(subkind, archived);
                fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            }
            let dir = store.pipelines_dir(archived);
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_root(&self, archived: bool) -> PathBuf {
        if archived {
            self.root.join(ARCHIVE_DIR)
        } else {
            self.root.clone()
        }
    }

    pub fn components_dir(&self, subkind: Subkind, archived: bool) -> PathBuf {
        self.scope_root(archived)
            .join(COMPONENTS_DIR)
            .join(subkind.label())
    }

    pub fn pipelines_dir(&self, archived: bool) -> PathBuf {
        self.scope_root(archived).join(PIPELINES_DIR)
    }

    /// Enumerate library files sorted by logical path.
    ///
    /// Missing directories are treated as empty. Errors while walking an
    /// existing directory are returned.
    pub fn entries(&self, include_archived: bool) -> Result<Vec<LibraryEntry>> {
        let scopes: &[bool] = if include_archived {
            &[false, true]
        } else {
            &[false]
        };

        let mut entries = Vec::new();
        for &archived in scopes {
            for subkind in Subkind::ALL {
                self.walk(
                    &self.components_dir(subkind, archived),
                    COMPONENT_EXTENSIONS,
                    EntryKind::Component(subkind),
                    archived,
                    &mut entries,
                )?;
            }
            self.walk(
                &self.pipelines_dir(archived),
                PIPELINE_EXTENSIONS,
                EntryKind::Pipeline,
                archived,
                &mut entries,
            )?;
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn walk(
        &self,
        dir: &Path,
        extensions: &[&str],
        kind: EntryKind,
        archived: bool,
        out: &mut Vec<LibraryEntry>,
    ) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }

        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .build();

        for result in walker {
            let entry = result.map_err(|err| {
                let message = err.to_string();
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other(message));
                Error::io(dir, source)
            })?;

            let file = entry.path();
            if !file.is_file() || !has_extension(file, extensions) {
                continue;
            }

            let Some(path) = self.logical_path(file) else {
                continue;
            };
            out.push(LibraryEntry {
                kind,
                path,
                file: file.to_path_buf(),
                archived,
            });
        }
        Ok(())
    }

    /// Logical path of a file under the root, `None` when outside it
    pub fn logical_path(&self, file: &Path) -> Option<String> {
        let rel = file.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Filesystem location of a logical path; rejects paths escaping the root
    pub fn resolve(&self, logical: &str) -> Result<PathBuf> {
        let rel = Path::new(logical);
        let escapes = rel.components().any(|c| {
            matches!(
                c,
                PathComponent::ParentDir | PathComponent::RootDir | PathComponent::Prefix(_)
            )
        });
        if logical.trim().is_empty() || escapes {
            return Err(Error::InvalidPath(logical.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Look up an existing library file by logical path
    pub fn entry(&self, logical: &str) -> Result<LibraryEntry> {
        let logical = normalize_logical(logical);
        let (kind, archived) =
            classify(&logical).ok_or_else(|| Error::InvalidPath(logical.clone()))?;
        let file = self.resolve(&logical)?;
        if !file.is_file() {
            return Err(Error::NotFound(logical));
        }
        Ok(LibraryEntry {
            kind,
            path: logical,
            file,
            archived,
        })
    }
}

/// Strip a leading `./` and convert backslashes
pub fn normalize_logical(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// Determine what a logical path holds from its location
pub fn classify(logical: &str) -> Option<(EntryKind, bool)> {
    let (rest, archived) = match logical.strip_prefix("archive/") {
        Some(rest) => (rest, true),
        None => (logical, false),
    };

    let mut parts = rest.split('/');
    let kind = match parts.next()? {
        COMPONENTS_DIR => {
            let subkind = parts.next()?.parse::<Subkind>().ok()?;
            let file = Path::new(rest);
            if !has_extension(file, COMPONENT_EXTENSIONS) {
                return None;
            }
            EntryKind::Component(subkind)
        }
        PIPELINES_DIR => {
            if !has_extension(Path::new(rest), PIPELINE_EXTENSIONS) {
                return None;
            }
            EntryKind::Pipeline
        }
        _ => return None,
    };
    // A bare directory name is not a file
    parts.next()?;
    Some((kind, archived))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_entries_sorted_and_gated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "components/rules/b.md", "b");
        write(root, "components/prompts/a.md", "a");
        write(root, "components/prompts/notes.txt", "ignored");
        write(root, "pipelines/p.yaml", "name: p");
        write(root, "pipelines/q.yml", "name: q");
        write(root, "archive/components/contexts/old.md", "old");

        let store = LibraryStore::open(root).unwrap();
        let active: Vec<_> = store
            .entries(false)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            active,
            vec![
                "components/prompts/a.md",
                "components/rules/b.md",
                "pipelines/p.yaml",
                "pipelines/q.yml",
            ]
        );

        let all = store.entries(true).unwrap();
        assert_eq!(all.len(), 5);
        let archived: Vec<_> = all.iter().filter(|e| e.archived).collect();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].path, "archive/components/contexts/old.md");
        assert_eq!(archived[0].kind, EntryKind::Component(Subkind::Contexts));
    }

    #[test]
    fn test_missing_dirs_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::open(dir.path()).unwrap();
        assert!(store.entries(true).unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = LibraryStore::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_init_creates_layout() {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::init(dir.path()).unwrap();
        assert!(store.components_dir(Subkind::Rules, false).is_dir());
        assert!(store.pipelines_dir(true).is_dir());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("components/prompts/a.md"),
            Some((EntryKind::Component(Subkind::Prompts), false))
        );
        assert_eq!(
            classify("archive/pipelines/p.yml"),
            Some((EntryKind::Pipeline, true))
        );
        assert_eq!(classify("components/widgets/a.md"), None);
        assert_eq!(classify("pipelines/readme.md"), None);
        assert_eq!(classify("components/prompts"), None);
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let store = LibraryStore::new("/lib");
        assert!(matches!(
            store.resolve("../etc/passwd"),
            Err(Error::InvalidPath(_))
        ));
        assert_eq!(
            store.resolve("components/rules/x.md").unwrap(),
            Path::new("/lib/components/rules/x.md")
        );
    }

    #[test]
    fn test_entry_lookup() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "components/rules/x.md", "x");
        let store = LibraryStore::open(dir.path()).unwrap();

        let entry = store.entry("./components/rules/x.md").unwrap();
        assert_eq!(entry.path, "components/rules/x.md");
        assert_eq!(entry.stem(), "x");
        assert!(matches!(
            store.entry("components/rules/missing.md"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.entry("notes/x.md"),
            Err(Error::InvalidPath(_))
        ));
    }
}
