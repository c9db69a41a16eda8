use crate::indexer::plugin::{
    self, ImportDraft, LanguagePlugin, ParseContext, ParsedEntity, ParsedFile, RelationDraft,
};
use crate::model::{EdgeKind, EntityKind};
use regex::Regex;
use std::sync::LazyLock;

static FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(\w+)\s*(?:<[^>]*>)?\s*\(([^)]*)"#,
    )
    .unwrap()
});
static STRUCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?struct\s+(\w+)").unwrap());
static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?enum\s+(\w+)").unwrap());
static TRAIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(\w+)").unwrap());
static TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?type\s+(\w+)").unwrap());
static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(\w+)\s*:").unwrap()
});
static MOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*[;{]").unwrap());
static IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*impl(?:<[^>]*>)?\s+(?:([\w:]+)(?:<[^>]*>)?\s+for\s+)?([\w:]+)").unwrap()
});
static USE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(.+?);").unwrap());

pub struct RustPlugin;

impl LanguagePlugin for RustPlugin {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn parse_file(&self, ctx: &ParseContext<'_>) -> ParsedFile {
        let mut output = ParsedFile::default();
        let lines: Vec<&str> = ctx.source.lines().collect();

        // Spans of impl blocks, so fns inside become methods of the type.
        let mut impl_spans: Vec<(usize, usize, String)> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            if let Some(caps) = IMPL_RE.captures(line) {
                let target = last_segment(&caps[2]).to_string();
                let end = plugin::brace_block_end(&lines, idx);
                if let Some(trait_path) = caps.get(1) {
                    output.relations.push(RelationDraft {
                        kind: EdgeKind::Implements,
                        from_name: target.clone(),
                        to_name: last_segment(trait_path.as_str()).to_string(),
                    });
                }
                impl_spans.push((idx, end, target));
            }
        }

        for (idx, line) in lines.iter().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }

            if let Some(caps) = USE_RE.captures(line) {
                let (module, symbols) = parse_use_tree(&caps[1]);
                if !module.is_empty() {
                    output.imports.push(ImportDraft {
                        module,
                        symbols,
                        line: idx as i64 + 1,
                    });
                }
                continue;
            }

            if let Some(caps) = FN_RE.captures(line) {
                let name = caps[2].to_string();
                let end = plugin::brace_block_end(&lines, idx);
                let parent = impl_spans
                    .iter()
                    .find(|(start, span_end, _)| idx > *start && idx <= *span_end)
                    .map(|(_, _, target)| target.clone());
                let body = plugin::body_slice(&lines, idx, end);
                let complexity = body
                    .as_deref()
                    .map(plugin::estimate_complexity)
                    .unwrap_or(1);
                output.entities.push(ParsedEntity {
                    kind: if parent.is_some() {
                        EntityKind::Method
                    } else {
                        EntityKind::Function
                    },
                    name,
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: Some(format!("({})", &caps[3])),
                    exported: caps.get(1).is_some(),
                    doc: plugin::doc_comment_above(&lines, idx, &["///"]),
                    parent,
                    body,
                    complexity,
                });
                continue;
            }

            if let Some((kind, caps)) = match_type_decl(line) {
                let name = caps.1.clone();
                let end = if line.contains('{') {
                    plugin::brace_block_end(&lines, idx)
                } else {
                    idx
                };
                output.entities.push(ParsedEntity {
                    kind,
                    name,
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: None,
                    exported: caps.0,
                    doc: plugin::doc_comment_above(&lines, idx, &["///"]),
                    parent: None,
                    body: plugin::body_slice(&lines, idx, end),
                    complexity: 1,
                });
            }
        }

        output
    }
}

fn match_type_decl(line: &str) -> Option<(EntityKind, (bool, String))> {
    for (re, kind) in [
        (&*STRUCT_RE, EntityKind::Struct),
        (&*ENUM_RE, EntityKind::Enum),
        (&*TRAIT_RE, EntityKind::Interface),
        (&*MOD_RE, EntityKind::Module),
        (&*TYPE_RE, EntityKind::Type),
        (&*CONST_RE, EntityKind::Variable),
    ] {
        if let Some(caps) = re.captures(line) {
            return Some((kind, (caps.get(1).is_some(), caps[2].to_string())));
        }
    }
    None
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Flatten one level of a use tree: `a::b::{c, d as e}` imports `c` and `e`
/// from `a::b`; `a::b::c` imports `c` from `a::b`.
fn parse_use_tree(clause: &str) -> (String, Vec<String>) {
    let clause = clause.trim();
    if let Some((prefix, rest)) = clause.split_once("::{") {
        let inner = rest.trim_end_matches('}');
        let mut symbols = Vec::new();
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() || part == "*" || part.contains('{') {
                continue;
            }
            let bound = match part.rsplit_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => last_segment(part),
            };
            if bound != "self" {
                symbols.push(bound.to_string());
            }
        }
        return (prefix.trim().to_string(), symbols);
    }
    let clause = match clause.rsplit_once(" as ") {
        Some((path, alias)) => {
            let module = path.rsplit_once("::").map(|(m, _)| m).unwrap_or(path);
            return (module.to_string(), vec![alias.trim().to_string()]);
        }
        None => clause,
    };
    match clause.rsplit_once("::") {
        Some((module, symbol)) => {
            let symbols = if symbol == "*" {
                Vec::new()
            } else {
                vec![symbol.to_string()]
            };
            (module.to_string(), symbols)
        }
        None => (clause.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        RustPlugin.parse_file(&ParseContext {
            repo: "repo",
            rel_path: "src/store.rs",
            source,
        })
    }

    #[test]
    fn structs_impls_and_methods() {
        let source = r#"
/// In-memory store.
pub struct Store {
    items: Vec<Item>,
}

impl Store {
    pub fn get(&self, id: u64) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    fn evict(&mut self) {
        self.items.clear();
    }
}

impl Default for Store {
    fn default() -> Self {
        Store { items: Vec::new() }
    }
}

fn helper() -> u64 {
    0
}
"#;
        let parsed = parse(source);
        let store = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Struct)
            .unwrap();
        assert_eq!(store.name, "Store");
        assert!(store.exported);
        assert_eq!(store.doc.as_deref(), Some("In-memory store."));

        let get = parsed.entities.iter().find(|e| e.name == "get").unwrap();
        assert_eq!(get.kind, EntityKind::Method);
        assert_eq!(get.parent.as_deref(), Some("Store"));
        assert!(get.exported);

        let evict = parsed.entities.iter().find(|e| e.name == "evict").unwrap();
        assert!(!evict.exported);

        let helper = parsed.entities.iter().find(|e| e.name == "helper").unwrap();
        assert_eq!(helper.kind, EntityKind::Function);
        assert!(helper.parent.is_none());

        assert!(parsed.relations.iter().any(|r| {
            r.kind == EdgeKind::Implements && r.from_name == "Store" && r.to_name == "Default"
        }));
    }

    #[test]
    fn use_trees() {
        let parsed = parse(
            "use std::collections::{HashMap, HashSet};\nuse crate::model::Entity;\nuse anyhow::Result as AnyResult;\nuse crate::util::*;\n",
        );
        let collections = parsed
            .imports
            .iter()
            .find(|imp| imp.module == "std::collections")
            .unwrap();
        assert_eq!(collections.symbols, vec!["HashMap", "HashSet"]);
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "crate::model" && imp.symbols == vec!["Entity"]));
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "anyhow" && imp.symbols == vec!["AnyResult"]));
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "crate::util" && imp.symbols.is_empty()));
    }

    #[test]
    fn enums_traits_and_consts() {
        let source = "pub enum Mode { A, B }\npub trait Codec {\n    fn encode(&self) -> Vec<u8>;\n}\nconst LIMIT: usize = 8;\n";
        let parsed = parse(source);
        assert!(parsed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Enum && e.name == "Mode"));
        assert!(parsed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Interface && e.name == "Codec"));
        let limit = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Variable)
            .unwrap();
        assert_eq!(limit.name, "LIMIT");
        assert!(!limit.exported);
    }
}
