//! Orphan retirement across re-index runs: rows that keep the previous
//! version tag after a run are deleted at finalization, and only those.

use polygraph::db::{Db, default_db_path};
use polygraph::indexer::{IndexOptions, Indexer, SilentProgress};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn renamed_file_orphans_are_reaped() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "src/util.ts",
        "export function helper(): number {\n  return 1;\n}\n",
    );
    write(
        tmp.path(),
        "src/app.ts",
        "import { helper } from './util';\n\nexport function main(): number {\n  return helper();\n}\n",
    );

    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let indexer = Indexer::new(&db);
    let first = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();

    let old_entities = db.entities_for_file("demo", "src/util.ts").unwrap();
    assert!(!old_entities.is_empty());

    // Rename the file; every id derived from the old path becomes an orphan.
    fs::rename(tmp.path().join("src/util.ts"), tmp.path().join("src/helpers.ts")).unwrap();
    write(
        tmp.path(),
        "src/app.ts",
        "import { helper } from './helpers';\n\nexport function main(): number {\n  return helper();\n}\n",
    );

    let second = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();
    assert_eq!(first.entities, second.entities);

    // old-path rows are gone, new-path rows exist
    assert!(db.entities_for_file("demo", "src/util.ts").unwrap().is_empty());
    assert!(!db
        .entities_for_file("demo", "src/helpers.ts")
        .unwrap()
        .is_empty());

    // total row count equals the new run's count exactly
    assert_eq!(db.count_entities("demo").unwrap() as usize, second.entities);
    assert_eq!(db.count_edges("demo").unwrap() as usize, second.edges);

    let check = db.check_version("demo").unwrap();
    assert_eq!(check.version.as_deref(), Some(second.version.as_str()));
    assert_eq!(check.stale_entities, 0);
    assert_eq!(check.stale_edges, 0);
}

#[test]
fn deleted_file_rows_retire() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.py", "def alpha():\n    return 1\n");
    write(tmp.path(), "b.py", "def beta():\n    return 2\n");

    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let indexer = Indexer::new(&db);
    indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();
    assert!(!db.entities_for_file("demo", "b.py").unwrap().is_empty());

    fs::remove_file(tmp.path().join("b.py")).unwrap();
    let second = indexer
        .index_repo(tmp.path(), "demo", &IndexOptions::default(), &SilentProgress)
        .unwrap();

    assert!(db.entities_for_file("demo", "b.py").unwrap().is_empty());
    assert_eq!(db.count_entities("demo").unwrap() as usize, second.entities);
}

#[test]
fn overview_before_any_run_is_empty() {
    let tmp = TempDir::new().unwrap();
    let db = Db::new(&default_db_path(tmp.path())).unwrap();
    let overview = db.overview("demo").unwrap();
    assert_eq!(overview.entities, 0);
    assert_eq!(overview.edges, 0);
    assert!(overview.version.is_none());
}
