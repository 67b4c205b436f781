use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::index::RelationIndex;
use crate::services::language::{self, ClassifierPolicy};

pub fn load(path: &Path, policy: ClassifierPolicy) -> Result<RelationIndex> {
    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "index file not found: {} (run the index command first)",
            path.display()
        )));
    }

    let data = fs::read_to_string(path)?;
    let mut index: RelationIndex = serde_json::from_str(&data)?;

    let migrated = ensure_variants(&mut index, policy);
    if migrated > 0 {
        warn!(
            file = %path.display(),
            candidates = migrated,
            "Index predates language classification, classified on load"
        );
    }

    info!(
        file = %path.display(),
        originals = index.len(),
        candidates = index.candidate_count(),
        "Index loaded"
    );

    Ok(index)
}

pub fn save(path: &Path, index: &RelationIndex) -> Result<()> {
    let json = serde_json::to_string_pretty(index)?;
    write_atomic(path, json.as_bytes())?;
    info!(file = %path.display(), originals = index.len(), "Index written");
    Ok(())
}

fn ensure_variants(index: &mut RelationIndex, policy: ClassifierPolicy) -> usize {
    let mut changed = 0usize;

    for (_, entry) in index.iter_mut() {
        for cand in entry.translations.iter_mut() {
            if cand.lang_type.is_none() {
                cand.lang_type = Some(language::detect(&cand.title, policy));
                changed += 1;
            }
        }
    }

    changed
}

/// Writes next to the target and renames over it, so readers see either the
/// old index or the new one.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let staging = staging_path(path);
    fs::write(&staging, bytes)?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "translation_map.json".into());
    name.push(".partial");
    path.with_file_name(name)
}
