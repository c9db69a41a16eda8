use crate::model::{EdgeKind, EntityKind};
use blake3::Hasher;

/// Compute a deterministic entity ID from graph coordinates only.
///
/// The ID is a pure function of `(repo, file_path, kind, name, signature)`:
/// two parses of byte-identical input with the same coordinates always
/// produce the same ID, on every run, in any order, from any plugin. Line
/// numbers are deliberately excluded so the ID survives code moves and
/// reformatting; a rename or signature change legitimately produces a new ID
/// and the old one becomes an orphan retired at finalization.
///
/// Returns `ent_{16_hex_chars}` — the first 64 bits of the blake3 hash of
/// the null-byte-separated coordinates.
pub fn entity_id(
    repo: &str,
    file_path: &str,
    kind: EntityKind,
    name: &str,
    signature: Option<&str>,
) -> String {
    let mut hasher = Hasher::new();
    hasher.update(repo.as_bytes());
    hasher.update(b"\x00");
    hasher.update(file_path.as_bytes());
    hasher.update(b"\x00");
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\x00");
    hasher.update(name.as_bytes());
    hasher.update(b"\x00");
    if let Some(sig) = signature {
        hasher.update(sig.as_bytes());
    }
    let hash = hasher.finalize();
    format!("ent_{}", &hash.to_hex()[..16])
}

/// Edge ID: hash of `(from_id, to_id, kind)` so duplicate detections of the
/// same relationship collapse to one row.
pub fn edge_id(from_id: &str, to_id: &str, kind: EdgeKind) -> String {
    let mut hasher = Hasher::new();
    hasher.update(from_id.as_bytes());
    hasher.update(b"\x00");
    hasher.update(to_id.as_bytes());
    hasher.update(b"\x00");
    hasher.update(kind.as_str().as_bytes());
    let hash = hasher.finalize();
    format!("edg_{}", &hash.to_hex()[..16])
}

/// ID for the pseudo-entity standing in for an external package target.
pub fn external_package_id(repo: &str, package: &str) -> String {
    entity_id(repo, package, EntityKind::Module, package, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_deterministic() {
        let a = entity_id("repo", "src/app.ts", EntityKind::Function, "main", Some("(argv)"));
        let b = entity_id("repo", "src/app.ts", EntityKind::Function, "main", Some("(argv)"));
        assert_eq!(a, b);
        assert!(a.starts_with("ent_"));
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn entity_id_varies_by_coordinate() {
        let base = entity_id("repo", "src/app.ts", EntityKind::Function, "main", None);
        assert_ne!(
            base,
            entity_id("repo2", "src/app.ts", EntityKind::Function, "main", None)
        );
        assert_ne!(
            base,
            entity_id("repo", "src/other.ts", EntityKind::Function, "main", None)
        );
        assert_ne!(
            base,
            entity_id("repo", "src/app.ts", EntityKind::Method, "main", None)
        );
        assert_ne!(
            base,
            entity_id("repo", "src/app.ts", EntityKind::Function, "run", None)
        );
        assert_ne!(
            base,
            entity_id("repo", "src/app.ts", EntityKind::Function, "main", Some("(x)"))
        );
    }

    #[test]
    fn separator_prevents_field_bleed() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = entity_id("ab", "c", EntityKind::File, "n", None);
        let b = entity_id("a", "bc", EntityKind::File, "n", None);
        assert_ne!(a, b);
    }

    #[test]
    fn edge_id_collapses_duplicates() {
        let a = edge_id("ent_aaaa", "ent_bbbb", EdgeKind::Calls);
        let b = edge_id("ent_aaaa", "ent_bbbb", EdgeKind::Calls);
        assert_eq!(a, b);
        assert_ne!(a, edge_id("ent_bbbb", "ent_aaaa", EdgeKind::Calls));
        assert_ne!(a, edge_id("ent_aaaa", "ent_bbbb", EdgeKind::References));
    }
}
