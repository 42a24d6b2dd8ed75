//! `$EDITOR` launching and scaffolding of new library files.

use super::frontmatter::{self, FrontMatter};
use super::{LibraryStore, PipelineDocument, pipeline};
use crate::error::{Error, Result};
use crate::index::types::Subkind;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const DEFAULT_EDITOR: &str = "vi";

/// Editor command line from `$EDITOR`, falling back to `vi`
pub fn editor_command() -> Vec<String> {
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    editor.split_whitespace().map(str::to_string).collect()
}

/// Open `file` in the user's editor and wait for it to exit
pub fn open(file: &Path) -> Result<()> {
    let command = editor_command();
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::Internal("empty editor command".to_string()))?;

    debug!(editor = %program, file = %file.display(), "launching editor");
    let status = Command::new(program)
        .args(args)
        .arg(file)
        .status()
        .map_err(|e| Error::io(file, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::io(
            file,
            io::Error::other(format!("editor '{program}' exited with {status}")),
        ))
    }
}

/// File-name slug for a display name: `Code Review!` -> `code-review`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Create a new component with front-matter, refusing to overwrite
pub fn scaffold_component(
    store: &LibraryStore,
    subkind: Subkind,
    name: &str,
    tags: &[String],
) -> Result<PathBuf> {
    let slug = checked_slug(name)?;
    let file = store
        .components_dir(subkind, false)
        .join(format!("{slug}.md"));

    let front_matter = FrontMatter {
        name: Some(name.trim().to_string()),
        tags: tags.to_vec(),
    };
    let body = format!("# {}\n\n", name.trim());
    let text = frontmatter::render(&front_matter, &body).map_err(|source| Error::Yaml {
        path: file.clone(),
        source,
    })?;

    create_new(&file, &text)?;
    Ok(file)
}

/// Create a new, empty pipeline, refusing to overwrite
pub fn scaffold_pipeline(store: &LibraryStore, name: &str, tags: &[String]) -> Result<PathBuf> {
    let slug = checked_slug(name)?;
    let file = store.pipelines_dir(false).join(pipeline::file_name(&slug));

    let doc = PipelineDocument {
        name: Some(name.trim().to_string()),
        tags: tags.to_vec(),
        components: Vec::new(),
    };
    let text = serde_yaml::to_string(&doc).map_err(|source| Error::Yaml {
        path: file.clone(),
        source,
    })?;

    create_new(&file, &text)?;
    Ok(file)
}

fn checked_slug(name: &str) -> Result<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::InvalidPath(format!("'{name}' has no usable file name")));
    }
    Ok(slug)
}

fn create_new(file: &Path, text: &str) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut handle = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::AlreadyExists(file.to_path_buf()),
            _ => Error::io(file, e),
        })?;
    handle
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(file, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Component, Pipeline};
    use tempfile::TempDir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Code Review!"), "code-review");
        assert_eq!(slugify("  API -- Prompt v2 "), "api-prompt-v2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_scaffold_component_loads_back() {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::init(dir.path()).unwrap();
        let tags = vec!["api".to_string(), "v2".to_string()];

        let file = scaffold_component(&store, Subkind::Prompts, "API Prompt", &tags).unwrap();
        assert!(file.ends_with("components/prompts/api-prompt.md"));

        let entry = store.entry("components/prompts/api-prompt.md").unwrap();
        let component = Component::load(&entry).unwrap();
        assert_eq!(component.name, "API Prompt");
        assert_eq!(component.tags, tags);

        let err = scaffold_component(&store, Subkind::Prompts, "API Prompt", &[]).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_scaffold_pipeline_loads_back() {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::init(dir.path()).unwrap();
        scaffold_pipeline(&store, "Release Notes", &["docs".to_string()]).unwrap();

        let entry = store.entry("pipelines/release-notes.yaml").unwrap();
        let pipeline = Pipeline::load(&entry).unwrap();
        assert_eq!(pipeline.name, "Release Notes");
        assert_eq!(pipeline.tags, vec!["docs"]);
        assert!(pipeline.entries.is_empty());
    }

    #[test]
    fn test_empty_slug_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LibraryStore::init(dir.path()).unwrap();
        assert!(matches!(
            scaffold_pipeline(&store, "!!!", &[]),
            Err(Error::InvalidPath(_))
        ));
    }
}
