//! Activation: compose a pipeline or single component into one Markdown file.

use super::{ARCHIVE_DIR, Component, EntryKind, LibraryStore, Pipeline};
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Composed output plus what went into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composition {
    pub text: String,
    /// Logical paths of components included, in output order
    pub included: Vec<String>,
    /// Pipeline references that could not be loaded
    pub missing: Vec<String>,
}

/// Compose the library item at `logical` (pipeline or component)
pub fn activate(store: &LibraryStore, logical: &str) -> Result<Composition> {
    let entry = store.entry(logical)?;
    match entry.kind {
        EntryKind::Pipeline => {
            let pipeline = Pipeline::load(&entry)?;
            Ok(compose_pipeline(store, &pipeline))
        }
        EntryKind::Component(_) => {
            let component = Component::load(&entry)?;
            Ok(compose_component(&component))
        }
    }
}

/// A single component contributes its body alone
pub fn compose_component(component: &Component) -> Composition {
    Composition {
        text: format!("{}\n", component.body.trim()),
        included: vec![component.path.clone()],
        missing: Vec::new(),
    }
}

/// Each referenced component becomes a `## <Name>` section, in pipeline order
pub fn compose_pipeline(store: &LibraryStore, pipeline: &Pipeline) -> Composition {
    let mut sections = Vec::with_capacity(pipeline.entries.len());
    let mut composition = Composition::default();

    for entry in &pipeline.entries {
        let Some(logical) = entry.logical_path() else {
            warn!(
                pipeline = %pipeline.path,
                reference = %entry.path,
                "unresolvable component reference"
            );
            composition.missing.push(entry.path.clone());
            continue;
        };

        match load_reference(store, &logical) {
            Some(component) => {
                sections.push(format!("## {}\n\n{}", component.name, component.body.trim()));
                composition.included.push(component.path);
            }
            None => {
                warn!(
                    pipeline = %pipeline.path,
                    reference = %logical,
                    "component not found, skipping"
                );
                composition.missing.push(logical);
            }
        }
    }

    composition.text = if sections.is_empty() {
        String::new()
    } else {
        format!("{}\n", sections.join("\n\n"))
    };
    debug!(
        pipeline = %pipeline.path,
        included = composition.included.len(),
        missing = composition.missing.len(),
        "composed pipeline"
    );
    composition
}

/// Active copy first, then the archived one
fn load_reference(store: &LibraryStore, logical: &str) -> Option<Component> {
    let candidates = [logical.to_string(), format!("{ARCHIVE_DIR}/{logical}")];
    candidates.iter().find_map(|candidate| {
        let entry = store.entry(candidate).ok()?;
        match Component::load(&entry) {
            Ok(component) => Some(component),
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    })
}

/// Replace `path` with `text` as a whole file (temp file + rename)
pub fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidPath(path.display().to_string()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let written = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.sync_all()
        })
        .map_err(|e| Error::io(&tmp, e))
        .and_then(|_| fs::rename(&tmp, path).map_err(|e| Error::io(path, e)));

    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}
