//! Wire decoder behavior on well-formed and truncated symbol-table
//! artifacts, built from scratch with a minimal protobuf encoder.

use polygraph::model::{EdgeKind, EntityKind};
use polygraph::scip;

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

fn tag(field: u64, wire: u64, out: &mut Vec<u8>) {
    varint((field << 3) | wire, out);
}

fn bytes_field(field: u64, payload: &[u8], out: &mut Vec<u8>) {
    tag(field, 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

fn occurrence(range: &[u64], symbol: &str, roles: u64) -> Vec<u8> {
    let mut occ = Vec::new();
    let mut packed = Vec::new();
    for value in range {
        varint(*value, &mut packed);
    }
    bytes_field(1, &packed, &mut occ);
    bytes_field(2, symbol.as_bytes(), &mut occ);
    if roles != 0 {
        tag(3, 0, &mut occ);
        varint(roles, &mut occ);
    }
    occ
}

fn document(relative_path: &str, occurrences: &[Vec<u8>]) -> Vec<u8> {
    let mut doc = Vec::new();
    bytes_field(1, relative_path.as_bytes(), &mut doc);
    for occ in occurrences {
        bytes_field(2, occ, &mut doc);
    }
    doc
}

fn index(documents: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for doc in documents {
        bytes_field(2, doc, &mut buf);
    }
    buf
}

fn two_file_index() -> Vec<u8> {
    // util.ts defines format() on line 3 (0-based 2); app.ts defines
    // render() on line 11 and references format on line 13, inside render.
    let util = document(
        "src/util.ts",
        &[occurrence(&[2, 0, 10], "x . . . util/format()", 1)],
    );
    let app = document(
        "src/app.ts",
        &[
            occurrence(&[10, 0, 8], "x . . . app/render()", 1),
            occurrence(&[12, 4, 10], "x . . . util/format()", 0),
        ],
    );
    index(&[util, app])
}

#[test]
fn definitions_and_cross_file_call() {
    let buf = two_file_index();
    let output = scip::decode_index(&buf, "demo", "");

    let format = output
        .entities
        .iter()
        .find(|e| e.name == "format")
        .expect("format entity");
    assert_eq!(format.kind, EntityKind::Function);
    assert_eq!(format.file_path, "src/util.ts");
    assert_eq!(format.start_line, 3);

    let render = output
        .entities
        .iter()
        .find(|e| e.name == "render")
        .expect("render entity");
    assert_eq!(render.file_path, "src/app.ts");

    let call = output
        .edges
        .iter()
        .find(|e| e.kind == EdgeKind::Calls)
        .expect("call edge");
    assert_eq!(call.from_id, render.id);
    assert_eq!(call.to_id, format.id);

    assert!(output.covered_files.contains("src/util.ts"));
    assert!(output.covered_files.contains("src/app.ts"));
}

#[test]
fn covered_documents_materialize_file_entities() {
    let buf = two_file_index();
    let output = scip::decode_index(&buf, "demo", "");

    let util_file = output
        .entities
        .iter()
        .find(|e| e.kind == EntityKind::File && e.file_path == "src/util.ts")
        .expect("file entity for util.ts");
    assert_eq!(util_file.name, "src/util.ts");
    assert_eq!(util_file.start_line, 1);
    assert!(util_file.end_line >= 3);

    let format = output
        .entities
        .iter()
        .find(|e| e.name == "format")
        .unwrap();
    assert!(output.edges.iter().any(|e| {
        e.kind == EdgeKind::Contains && e.from_id == util_file.id && e.to_id == format.id
    }));

    assert_eq!(
        output
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::File)
            .count(),
        2
    );
}

#[test]
fn duplicate_definitions_collapse() {
    let doc = document(
        "src/a.ts",
        &[
            occurrence(&[1, 0, 4], "x . . . a/run()", 1),
            occurrence(&[1, 0, 4], "x . . . a/run()", 1),
        ],
    );
    let buf = index(&[doc]);
    let output = scip::decode_index(&buf, "demo", "");
    assert_eq!(output.entities.iter().filter(|e| e.name == "run").count(), 1);
}

#[test]
fn root_prefix_applies_to_paths() {
    let buf = two_file_index();
    let output = scip::decode_index(&buf, "demo", "packages/web/");
    assert!(output
        .entities
        .iter()
        .all(|e| e.file_path.starts_with("packages/web/src/")));
    assert!(output.covered_files.contains("packages/web/src/app.ts"));
}

#[test]
fn truncation_never_panics_and_yields_subset() {
    let buf = two_file_index();
    let full = scip::decode_index(&buf, "demo", "");
    for len in 0..buf.len() {
        let output = scip::decode_index(&buf[..len], "demo", "");
        assert!(output.entities.len() <= full.entities.len());
        assert!(output.edges.len() <= full.edges.len());
        for entity in &output.entities {
            assert!(full.entities.iter().any(|e| e.id == entity.id));
        }
    }
}

#[test]
fn garbage_bytes_do_not_panic() {
    let garbage: Vec<u8> = (0..512u32).map(|i| (i * 31 % 251) as u8).collect();
    let _ = scip::decode_index(&garbage, "demo", "");

    let overlong = vec![0xff; 16];
    let output = scip::decode_index(&overlong, "demo", "");
    assert!(output.entities.is_empty());
}
