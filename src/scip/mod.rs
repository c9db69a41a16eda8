//! Precise decoder for the binary symbol-index artifact.
//!
//! The artifact is a length-delimited, varint-tagged stream of "document"
//! messages, one per source file, each carrying "occurrence" sub-messages
//! (packed range + symbol descriptor + role bitfield, bit 0 = definition).
//! Decoding never throws: a corrupted or truncated sub-message is skipped,
//! a missing artifact yields empty output, and the caller falls back to the
//! structural parsers for anything not covered here.

use crate::ident;
use crate::indexer::scan;
use crate::model::{Edge, EdgeKind, Entity, EntityKind};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub mod symbol;
pub mod wire;

use wire::{Reader, WIRE_LEN, WIRE_VARINT};

const FIELD_INDEX_DOCUMENTS: u32 = 2;
const FIELD_DOC_RELATIVE_PATH: u32 = 1;
const FIELD_DOC_OCCURRENCES: u32 = 2;
const FIELD_OCC_RANGE: u32 = 1;
const FIELD_OCC_SYMBOL: u32 = 2;
const FIELD_OCC_ROLES: u32 = 3;

const ROLE_DEFINITION: u64 = 0x1;

#[derive(Debug, Default)]
pub struct DecodeOutput {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
    pub covered_files: HashSet<String>,
}

struct RawOccurrence {
    range: Vec<u64>,
    symbol: String,
    roles: u64,
}

struct RawDocument {
    relative_path: String,
    occurrences: Vec<RawOccurrence>,
}

/// Decode an artifact file and consume it: the file is removed afterwards
/// regardless of outcome. A missing file yields empty output.
pub fn decode_artifact(path: &Path, repo: &str, root_prefix: &str) -> DecodeOutput {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return DecodeOutput::default(),
    };
    let output = decode_index(&bytes, repo, root_prefix);
    if let Err(err) = fs::remove_file(path) {
        eprintln!("polygraph: failed to remove artifact {}: {err}", path.display());
    }
    output
}

/// Decode an in-memory artifact buffer into entities and edges.
pub fn decode_index(buf: &[u8], repo: &str, root_prefix: &str) -> DecodeOutput {
    let documents = parse_documents(buf);
    resolve(documents, repo, root_prefix)
}

fn parse_documents(buf: &[u8]) -> Vec<RawDocument> {
    let mut documents = Vec::new();
    let mut reader = Reader::new(buf);
    while !reader.is_empty() {
        let Some((field, wire)) = reader.read_tag() else {
            break;
        };
        if field == FIELD_INDEX_DOCUMENTS && wire == WIRE_LEN {
            let Some(payload) = reader.read_len_delimited() else {
                break;
            };
            // One bad document never aborts the artifact.
            if let Some(doc) = parse_document(payload) {
                documents.push(doc);
            }
        } else if reader.skip(wire).is_none() {
            break;
        }
    }
    documents
}

fn parse_document(buf: &[u8]) -> Option<RawDocument> {
    let mut reader = Reader::new(buf);
    let mut relative_path = String::new();
    let mut occurrences = Vec::new();
    while !reader.is_empty() {
        let (field, wire) = reader.read_tag()?;
        match (field, wire) {
            (FIELD_DOC_RELATIVE_PATH, WIRE_LEN) => {
                relative_path = reader.read_string()?.to_string();
            }
            (FIELD_DOC_OCCURRENCES, WIRE_LEN) => {
                let payload = reader.read_len_delimited()?;
                if let Some(occ) = parse_occurrence(payload) {
                    occurrences.push(occ);
                }
            }
            _ => reader.skip(wire)?,
        }
    }
    if relative_path.is_empty() {
        return None;
    }
    Some(RawDocument {
        relative_path,
        occurrences,
    })
}

fn parse_occurrence(buf: &[u8]) -> Option<RawOccurrence> {
    let mut reader = Reader::new(buf);
    let mut range = Vec::new();
    let mut symbol = String::new();
    let mut roles = 0u64;
    while !reader.is_empty() {
        let (field, wire) = reader.read_tag()?;
        match (field, wire) {
            (FIELD_OCC_RANGE, WIRE_LEN) => {
                let payload = reader.read_len_delimited()?;
                range = wire::decode_packed_varints(payload, 4);
            }
            (FIELD_OCC_ROLES, WIRE_VARINT) => {
                roles = reader.read_varint()?;
            }
            (FIELD_OCC_SYMBOL, WIRE_LEN) => {
                symbol = reader.read_string()?.to_string();
            }
            _ => reader.skip(wire)?,
        }
    }
    if symbol.is_empty() || range.is_empty() {
        return None;
    }
    Some(RawOccurrence {
        range,
        symbol,
        roles,
    })
}

/// Range is packed as `[start_line, start_char, end_line, end_char]`, or
/// three elements when the occurrence is single-line. Lines on the wire are
/// 0-based; the graph is 1-based.
fn range_lines(range: &[u64]) -> (i64, i64) {
    let start = range.first().copied().unwrap_or(0) as i64 + 1;
    let end = if range.len() >= 4 {
        range[2] as i64 + 1
    } else {
        start
    };
    (start, end.max(start))
}

struct FileEntry {
    start_line: i64,
    id: String,
}

fn resolve(documents: Vec<RawDocument>, repo: &str, root_prefix: &str) -> DecodeOutput {
    let mut output = DecodeOutput::default();
    let mut seen_entities: HashSet<String> = HashSet::new();
    let mut symbol_targets: HashMap<String, (String, EntityKind)> = HashMap::new();
    let mut per_file: HashMap<String, Vec<FileEntry>> = HashMap::new();
    let mut file_end: HashMap<String, i64> = HashMap::new();

    // Pass 1: materialize definition occurrences, building the symbol map
    // and per-file containment lists.
    for doc in &documents {
        let file_path = joined_path(root_prefix, &doc.relative_path);
        output.covered_files.insert(file_path.clone());
        let language = language_for_file(&file_path);
        for occ in &doc.occurrences {
            if occ.roles & ROLE_DEFINITION == 0 {
                continue;
            }
            let Some(parsed) = symbol::parse_symbol(&occ.symbol) else {
                continue;
            };
            let id = ident::entity_id(repo, &file_path, parsed.kind, &parsed.name, None);
            let (start_line, end_line) = range_lines(&occ.range);
            let max_end = file_end.entry(file_path.clone()).or_insert(1);
            *max_end = (*max_end).max(end_line);
            symbol_targets
                .entry(occ.symbol.clone())
                .or_insert_with(|| (id.clone(), parsed.kind));
            if !seen_entities.insert(id.clone()) {
                continue;
            }
            per_file.entry(file_path.clone()).or_default().push(FileEntry {
                start_line,
                id: id.clone(),
            });
            output.entities.push(Entity {
                id,
                repo: repo.to_string(),
                kind: parsed.kind,
                name: parsed.name,
                file_path: file_path.clone(),
                start_line,
                end_line,
                signature: None,
                language: language.to_string(),
                exported: true,
                doc: None,
                parent: parsed.parent,
                body: None,
                complexity: 1,
            });
        }
    }

    // Every covered document materializes a file entity, containing the
    // definitions decoded from it, so precise-path files look the same in
    // the graph as fallback-parsed ones.
    for doc in &documents {
        let file_path = joined_path(root_prefix, &doc.relative_path);
        let file_id =
            ident::entity_id(repo, &file_path, EntityKind::File, &file_path, None);
        if !seen_entities.insert(file_id.clone()) {
            continue;
        }
        output.entities.push(Entity {
            id: file_id.clone(),
            repo: repo.to_string(),
            kind: EntityKind::File,
            name: file_path.clone(),
            file_path: file_path.clone(),
            start_line: 1,
            end_line: file_end.get(&file_path).copied().unwrap_or(1),
            signature: None,
            language: language_for_file(&file_path).to_string(),
            exported: true,
            doc: None,
            parent: None,
            body: None,
            complexity: 1,
        });
        if let Some(entries) = per_file.get(&file_path) {
            for entry in entries {
                output.edges.push(Edge {
                    id: ident::edge_id(&file_id, &entry.id, EdgeKind::Contains),
                    repo: repo.to_string(),
                    from_id: file_id.clone(),
                    to_id: entry.id.clone(),
                    kind: EdgeKind::Contains,
                    imported_symbols: Vec::new(),
                    is_external: false,
                    package_name: None,
                    boundary_category: None,
                });
            }
        }
    }

    // Sorted once here so pass 2 can binary-search per query.
    for entries in per_file.values_mut() {
        entries.sort_by_key(|entry| entry.start_line);
    }

    // Pass 2: turn reference occurrences into edges from the containing
    // entity to the referenced definition.
    let mut seen_edges: HashSet<(String, String)> = HashSet::new();
    for doc in &documents {
        let file_path = joined_path(root_prefix, &doc.relative_path);
        let Some(entries) = per_file.get(&file_path) else {
            continue;
        };
        for occ in &doc.occurrences {
            if occ.roles & ROLE_DEFINITION != 0 {
                continue;
            }
            let Some((target_id, target_kind)) = symbol_targets.get(&occ.symbol) else {
                continue;
            };
            let (ref_line, _) = range_lines(&occ.range);
            let Some(container) = containing_entry(entries, ref_line) else {
                continue;
            };
            if container.id == *target_id {
                continue;
            }
            if !seen_edges.insert((container.id.clone(), target_id.clone())) {
                continue;
            }
            let kind = if target_kind.is_callable() {
                EdgeKind::Calls
            } else {
                EdgeKind::References
            };
            output.edges.push(Edge {
                id: ident::edge_id(&container.id, target_id, kind),
                repo: repo.to_string(),
                from_id: container.id.clone(),
                to_id: target_id.clone(),
                kind,
                imported_symbols: Vec::new(),
                is_external: false,
                package_name: None,
                boundary_category: None,
            });
        }
    }

    output
}

/// Largest `start_line <= line` via binary search over the sorted list.
fn containing_entry(entries: &[FileEntry], line: i64) -> Option<&FileEntry> {
    let idx = entries.partition_point(|entry| entry.start_line <= line);
    if idx == 0 {
        return None;
    }
    Some(&entries[idx - 1])
}

fn joined_path(root_prefix: &str, relative_path: &str) -> String {
    if root_prefix.is_empty() || root_prefix == "." {
        relative_path.to_string()
    } else {
        format!("{}/{}", root_prefix.trim_end_matches('/'), relative_path)
    }
}

fn language_for_file(file_path: &str) -> &'static str {
    scan::language_for_rel_path(file_path).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_entry_picks_floor() {
        let entries = vec![
            FileEntry {
                start_line: 2,
                id: "a".into(),
            },
            FileEntry {
                start_line: 10,
                id: "b".into(),
            },
            FileEntry {
                start_line: 25,
                id: "c".into(),
            },
        ];
        assert_eq!(containing_entry(&entries, 12).map(|e| e.id.as_str()), Some("b"));
        assert_eq!(containing_entry(&entries, 2).map(|e| e.id.as_str()), Some("a"));
        assert_eq!(containing_entry(&entries, 30).map(|e| e.id.as_str()), Some("c"));
        assert!(containing_entry(&entries, 1).is_none());
    }

    #[test]
    fn empty_buffer_decodes_empty() {
        let output = decode_index(&[], "repo", ".");
        assert!(output.entities.is_empty());
        assert!(output.edges.is_empty());
    }

    #[test]
    fn garbage_buffer_never_panics() {
        let garbage: Vec<u8> = (0..255u8).collect();
        let _ = decode_index(&garbage, "repo", ".");
    }
}
