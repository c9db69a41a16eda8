//! End-to-end indexing over a small multi-language repo in a temp dir.

use polygraph::db::{Db, default_db_path};
use polygraph::indexer::{IndexOptions, Indexer, SilentProgress};
use polygraph::model::{EdgeKind, EntityKind};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn seed_repo(root: &Path) {
    write(
        root,
        "src/util.ts",
        "export function formatName(name: string): string {\n  return name.trim();\n}\n",
    );
    write(
        root,
        "src/app.ts",
        "import { formatName } from './util';\nimport Stripe from 'stripe';\n\nexport function render(user: string): string {\n  return formatName(user);\n}\n",
    );
    write(
        root,
        "scripts/job.py",
        "class Job:\n    def run(self):\n        return 1\n",
    );
}

#[test]
fn full_index_builds_expected_graph() {
    let tmp = TempDir::new().unwrap();
    seed_repo(tmp.path());

    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let indexer = Indexer::new(&db);
    let stats = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();

    assert_eq!(stats.scanned, 3);
    assert!(stats.entities >= 6);
    assert!(!stats.version.is_empty());

    let overview = db.overview("demo").unwrap();
    assert_eq!(overview.version.as_deref(), Some(stats.version.as_str()));
    assert_eq!(overview.entities as usize, stats.entities);
    assert_eq!(overview.edges as usize, stats.edges);

    // formatName is defined in util.ts and called from render in app.ts
    let util_entities = db.entities_for_file("demo", "src/util.ts").unwrap();
    let format_fn = util_entities
        .iter()
        .find(|e| e.name == "formatName")
        .expect("formatName entity");
    assert_eq!(format_fn.kind, EntityKind::Function);
    assert!(format_fn.exported);

    let edges = db.edges_for_entity(&format_fn.id).unwrap();
    assert!(edges.iter().any(|e| e.kind == EdgeKind::Calls));

    // the stripe import produced an external boundary edge
    let app_entities = db.entities_for_file("demo", "src/app.ts").unwrap();
    let file_entity = app_entities
        .iter()
        .find(|e| e.kind == EntityKind::File)
        .expect("file entity");
    let file_edges = db.edges_for_entity(&file_entity.id).unwrap();
    let external = file_edges
        .iter()
        .find(|e| e.kind == EdgeKind::Imports && e.is_external)
        .expect("external import edge");
    assert_eq!(external.package_name.as_deref(), Some("stripe"));
    assert_eq!(external.boundary_category.as_deref(), Some("payment"));

    // python fallback sees the class and method
    let py_entities = db.entities_for_file("demo", "scripts/job.py").unwrap();
    assert!(py_entities
        .iter()
        .any(|e| e.kind == EntityKind::Class && e.name == "Job"));
    assert!(py_entities
        .iter()
        .any(|e| e.kind == EntityKind::Method && e.name == "run"));
}

fn varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn bytes_field(field: u64, payload: &[u8], out: &mut Vec<u8>) {
    varint((field << 3) | 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

/// A one-document artifact defining `format()` in src/util.ts.
fn small_artifact() -> Vec<u8> {
    let mut occ = Vec::new();
    let mut range = Vec::new();
    for value in [0u64, 0, 10] {
        varint(value, &mut range);
    }
    bytes_field(1, &range, &mut occ);
    bytes_field(2, b"x . . . util/format()", &mut occ);
    occ.push(3 << 3);
    occ.push(1);

    let mut doc = Vec::new();
    bytes_field(1, b"src/util.ts", &mut doc);
    bytes_field(2, &occ, &mut doc);

    let mut buf = Vec::new();
    bytes_field(2, &doc, &mut buf);
    buf
}

#[test]
fn precise_covered_files_keep_file_entities() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", r#"{"name": "demo"}"#);
    write(
        tmp.path(),
        "src/util.ts",
        "export function format(name: string): string {\n  return name.trim();\n}\n",
    );
    fs::write(tmp.path().join("index.scip"), small_artifact()).unwrap();

    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let indexer = Indexer::new(&db);
    let stats = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();
    assert_eq!(stats.precise_files, 1);

    let util_entities = db.entities_for_file("demo", "src/util.ts").unwrap();
    let format = util_entities
        .iter()
        .find(|e| e.name == "format")
        .expect("format entity from the artifact");
    assert_eq!(format.kind, EntityKind::Function);

    let file_entity = util_entities
        .iter()
        .find(|e| e.kind == EntityKind::File)
        .expect("file entity for the precise-covered file");
    let edges = db.edges_for_entity(&file_entity.id).unwrap();
    assert!(edges.iter().any(|e| {
        e.kind == EdgeKind::Contains && e.from_id == file_entity.id && e.to_id == format.id
    }));
}

#[test]
fn reindex_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    seed_repo(tmp.path());

    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let indexer = Indexer::new(&db);
    let first = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();
    let second = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();

    assert_eq!(first.entities, second.entities);
    assert_eq!(first.edges, second.edges);
    assert_ne!(first.version, second.version);

    // net row counts unchanged: every id re-stamped, nothing orphaned
    assert_eq!(db.count_entities("demo").unwrap() as usize, second.entities);
    assert_eq!(db.count_edges("demo").unwrap() as usize, second.edges);

    let check = db.check_version("demo").unwrap();
    assert_eq!(check.stale_entities, 0);
    assert_eq!(check.stale_edges, 0);
}

#[test]
fn entity_ids_are_stable_across_runs() {
    let tmp = TempDir::new().unwrap();
    seed_repo(tmp.path());

    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let indexer = Indexer::new(&db);
    indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();
    let before: Vec<String> = db
        .entities_for_file("demo", "src/util.ts")
        .unwrap()
        .iter()
        .map(|e| e.id.clone())
        .collect();

    indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();
    let after: Vec<String> = db
        .entities_for_file("demo", "src/util.ts")
        .unwrap()
        .iter()
        .map(|e| e.id.clone())
        .collect();

    assert_eq!(before, after);
}
