//! Relation index construction over chunk directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use transmatch_core::model::index::RelationIndex;
use transmatch_core::services::indexer::{self, IndexBuilder};
use transmatch_core::services::language::ClassifierPolicy;
use transmatch_core::services::store;

fn write_chunk(dir: &Path, name: &str, records: &Value) {
    fs::write(dir.join(name), serde_json::to_vec_pretty(records).unwrap()).unwrap();
}

fn chunk_a() -> Value {
    json!([
        { "publishedfileid": "100", "title": "Vanilla Expanded", "tags": ["Mod", "1.5"],
          "time_updated": 1_715_000_000, "subscriptions": 90_000 },
        { "publishedfileid": "900", "title": "Vanilla Expanded 简体中文汉化", "tags": ["Translation", "1.5"],
          "time_updated": 1_716_000_000, "subscriptions": 4_000, "vote_data": { "score": 0.93 },
          "children": [{ "publishedfileid": "100" }] },
        { "publishedfileid": "901", "title": "Vanilla Expanded 繁體中文", "tags": [{ "tag": "translation" }],
          "time_updated": 1_716_500_000, "subscriptions": 800,
          "children": [{ "publishedfileid": "100" }, { "publishedfileid": "200" }] },
    ])
}

fn chunk_b() -> Value {
    json!([
        { "publishedfileid": "902", "title": "Big Chinese Pack CN", "tags": ["Translation"],
          "time_updated": 1_753_000_000, "subscriptions": 20_000,
          "children": [{ "publishedfileid": 100 }, { "publishedfileid": 300 }] },
        { "publishedfileid": "903", "title": "汉化 but orphaned", "tags": ["Translation"],
          "time_updated": 1_753_000_000, "subscriptions": 5, "children": [] },
        { "publishedfileid": "904", "title": "German Translation", "tags": ["Translation"],
          "children": [{ "publishedfileid": "100" }] },
        { "publishedfileid": "300", "title": "Hospitality", "tags": ["Mod"], "time_updated": 1_700_000_000 },
    ])
}

/// original id -> sorted candidate ids, the content that must not depend on file order.
fn multisets(index: &RelationIndex) -> BTreeMap<String, Vec<String>> {
    index
        .iter()
        .map(|(id, entry)| {
            let mut ids: Vec<String> = entry.translations.iter().map(|c| c.id.clone()).collect();
            ids.sort();
            (id.clone(), ids)
        })
        .collect()
}

#[test]
fn builds_index_from_chunk_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "workshop_data.json", &chunk_a());
    write_chunk(dir.path(), "workshop_data_2.json", &chunk_b());
    fs::write(dir.path().join("notes.txt"), "not a chunk").unwrap();

    let (index, report) =
        indexer::build_from_dir(dir.path(), ClassifierPolicy::Canonical, true).unwrap();

    assert_eq!(report.chunks_read, 2);
    assert_eq!(report.records, 7);
    assert_eq!(report.candidates, 3);

    let ids: Vec<&str> = index.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["100", "200", "300"]);

    let core = index.get("100").unwrap();
    assert_eq!(core.title, "Vanilla Expanded");
    let cands: Vec<&str> = core.translations.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(cands, vec!["900", "901", "902"]);

    // Seen only as a dependency.
    let missing = index.get("200").unwrap();
    assert_eq!(missing.title, "Unknown");
    assert_eq!(missing.updated, 0);
    assert!(missing.tags.is_empty());
    assert_eq!(report.placeholders, 1);

    assert_eq!(index.get("300").unwrap().title, "Hospitality");
}

#[test]
fn orphaned_and_non_chinese_packs_never_enter_index() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "a.json", &chunk_b());

    let (index, _) = indexer::build_from_dir(dir.path(), ClassifierPolicy::Canonical, true).unwrap();

    for (_, entry) in index.iter() {
        for cand in &entry.translations {
            assert_ne!(cand.id, "903", "candidate without dependencies admitted");
            assert_ne!(cand.id, "904", "candidate without chinese title admitted");
        }
    }
}

#[test]
fn malformed_chunks_do_not_stop_the_build() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "1.json", &chunk_a());
    fs::write(dir.path().join("2.json"), "{\"response\": {\"publishedfiledetails\": []}}").unwrap();
    fs::write(dir.path().join("3.json"), "[{\"publishedfileid\": \"1\",").unwrap();
    write_chunk(dir.path(), "4.json", &chunk_b());

    let (index, report) =
        indexer::build_from_dir(dir.path(), ClassifierPolicy::Canonical, true).unwrap();

    assert_eq!(report.chunks_read, 2);
    assert_eq!(report.chunks_skipped, 2);
    assert_eq!(report.warnings.len(), 2);
    assert_eq!(index.get("100").unwrap().translations.len(), 3);
}

#[test]
fn file_order_does_not_change_candidate_sets() {
    let a = serde_json::to_vec(&chunk_a()).unwrap();
    let b = serde_json::to_vec(&chunk_b()).unwrap();

    let mut forward = IndexBuilder::new(ClassifierPolicy::Canonical, true);
    forward.ingest_chunk("a", &a);
    forward.ingest_chunk("b", &b);
    let (forward, _) = forward.finish();

    let mut backward = IndexBuilder::new(ClassifierPolicy::Canonical, true);
    backward.ingest_chunk("b", &b);
    backward.ingest_chunk("a", &a);
    let (backward, _) = backward.finish();

    assert_eq!(multisets(&forward), multisets(&backward));
}

#[test]
fn empty_or_missing_directory_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(indexer::build_from_dir(dir.path(), ClassifierPolicy::Canonical, true).is_err());
    assert!(indexer::build_from_dir(
        &dir.path().join("nope"),
        ClassifierPolicy::Canonical,
        true
    )
    .is_err());
}

#[test]
fn written_index_uses_documented_field_names() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "a.json", &chunk_a());
    let (index, _) = indexer::build_from_dir(dir.path(), ClassifierPolicy::Canonical, true).unwrap();

    let out = dir.path().join("translation_map.json");
    store::save(&out, &index).unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let entry = &raw["100"];
    assert_eq!(entry["title"], "Vanilla Expanded");
    assert_eq!(entry["updated"], 1_715_000_000);
    let first = &entry["translations"][0];
    assert_eq!(first["id"], "900");
    assert_eq!(first["subs"], 4_000);
    assert_eq!(first["score"], 0.93);
    assert_eq!(first["lang_type"], "both");
    assert_eq!(entry["translations"][1]["lang_type"], "traditional");

    let reloaded = store::load(&out, ClassifierPolicy::Canonical).unwrap();
    assert_eq!(reloaded, index);
}
