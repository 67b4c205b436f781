use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::index::{IndexEntry, ReferenceEntry, RelationIndex, TranslationCandidate};
use crate::model::record::RawRecord;
use crate::parsers::chunk;
use crate::services::hash;
use crate::services::language::ClassifierPolicy;
use crate::services::normalize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexBuildReport {
    pub chunks_read: usize,
    pub chunks_skipped: usize,
    pub duplicate_chunks: usize,
    pub records: usize,
    pub records_skipped: usize,
    pub candidates: usize,
    pub originals: usize,
    pub placeholders: usize,
    pub warnings: Vec<String>,
}

pub struct IndexBuilder {
    policy: ClassifierPolicy,
    skip_duplicate_chunks: bool,
    references: HashMap<String, ReferenceEntry>,
    relations: BTreeMap<String, Vec<TranslationCandidate>>,
    seen_digests: HashSet<String>,
    report: IndexBuildReport,
}

impl IndexBuilder {
    pub fn new(policy: ClassifierPolicy, skip_duplicate_chunks: bool) -> Self {
        IndexBuilder {
            policy,
            skip_duplicate_chunks,
            references: HashMap::new(),
            relations: BTreeMap::new(),
            seen_digests: HashSet::new(),
            report: IndexBuildReport::default(),
        }
    }

    pub fn ingest_file(&mut self, path: &Path) {
        let name = path.display().to_string();
        match fs::read(path) {
            Ok(bytes) => self.ingest_chunk(&name, &bytes),
            Err(e) => self.skip_chunk(&name, format!("failed to read: {e}")),
        }
    }

    pub fn ingest_chunk(&mut self, name: &str, bytes: &[u8]) {
        if self.skip_duplicate_chunks && !self.seen_digests.insert(hash::chunk_digest(bytes)) {
            info!(chunk = name, "Skipping chunk identical to one already ingested");
            self.report.duplicate_chunks += 1;
            return;
        }

        let parsed = match chunk::parse(bytes) {
            Ok(p) => p,
            Err(e) => return self.skip_chunk(name, e),
        };

        if parsed.encoding != "utf-8" && parsed.encoding != "utf-8-sig" {
            warn!(chunk = name, encoding = %parsed.encoding, "Chunk is not UTF-8, decoded by detection");
        }

        for reason in parsed.rejected {
            warn!(chunk = name, %reason, "Skipping malformed record");
            self.report.records_skipped += 1;
            self.report.warnings.push(format!("{name}: {reason}"));
        }

        let count = parsed.records.len();
        self.ingest_records(parsed.records);
        self.report.chunks_read += 1;

        debug!(chunk = name, records = count, "Chunk ingested");
    }

    pub fn ingest_records<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = RawRecord>,
    {
        for record in records {
            self.report.records += 1;

            let normalized = normalize::normalize(&record, self.policy);
            self.references.insert(record.id.clone(), normalized.reference);

            let Some(candidate) = normalized.candidate else {
                continue;
            };

            // One translation pack may depend on several originals; it is listed under each.
            for original_id in record.dependency_ids() {
                self.relations
                    .entry(original_id.to_string())
                    .or_default()
                    .push(candidate.clone());
            }
            self.report.candidates += 1;
        }
    }

    pub fn finish(self) -> (RelationIndex, IndexBuildReport) {
        let IndexBuilder {
            references,
            relations,
            mut report,
            ..
        } = self;

        let mut entries = BTreeMap::new();
        for (original_id, translations) in relations {
            let meta = match references.get(&original_id) {
                Some(r) => r.clone(),
                None => {
                    report.placeholders += 1;
                    ReferenceEntry::placeholder()
                }
            };
            entries.insert(original_id, IndexEntry::new(meta, translations));
        }

        report.originals = entries.len();

        info!(
            chunks = report.chunks_read,
            skipped = report.chunks_skipped,
            duplicates = report.duplicate_chunks,
            records = report.records,
            originals = report.originals,
            candidates = report.candidates,
            placeholders = report.placeholders,
            "Relation index built"
        );

        (RelationIndex::from_entries(entries), report)
    }

    fn skip_chunk(&mut self, name: &str, reason: String) {
        warn!(chunk = name, %reason, "Skipping chunk");
        self.report.chunks_skipped += 1;
        self.report.warnings.push(format!("{name}: {reason}"));
    }
}

/// Every `*.json` file directly inside `dir`, sorted.
pub fn collect_chunk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "chunk directory not found: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(Error::InvalidInput(format!(
            "no JSON chunk files in {}",
            dir.display()
        )));
    }

    files.sort();
    Ok(files)
}

pub fn build_from_dir(
    dir: &Path,
    policy: ClassifierPolicy,
    skip_duplicate_chunks: bool,
) -> Result<(RelationIndex, IndexBuildReport)> {
    let files = collect_chunk_files(dir)?;
    info!(dir = %dir.display(), files = files.len(), "Building relation index");

    let mut builder = IndexBuilder::new(policy, skip_duplicate_chunks);
    for (i, path) in files.iter().enumerate() {
        debug!(file = %path.display(), n = i + 1, total = files.len(), "Reading chunk");
        builder.ingest_file(path);
    }

    Ok(builder.finish())
}
