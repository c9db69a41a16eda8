use crate::indexer::plugin::{
    self, ImportDraft, LanguagePlugin, ParseContext, ParsedEntity, ParsedFile, RelationDraft,
};
use crate::model::{EdgeKind, EntityKind};
use regex::Regex;
use std::sync::LazyLock;

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:public|protected|private|abstract|final|static|sealed)\s+)*(class|interface|enum|record)\s+(\w+)",
    )
    .unwrap()
});
static EXTENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextends\s+([\w.]+)").unwrap());
static IMPLEMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\s+([\w.,\s<>]+?)\s*\{").unwrap());
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:public|protected|private|abstract|final|static|synchronized|native|default)\s+)*[\w.<>\[\],\s]+?\s+(\w+)\s*\(([^)]*)\)[\w\s,]*\{",
    )
    .unwrap()
});
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap());
static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w+)").unwrap());

pub struct JavaPlugin;

impl LanguagePlugin for JavaPlugin {
    fn language(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse_file(&self, ctx: &ParseContext<'_>) -> ParsedFile {
        let mut output = ParsedFile::default();
        let lines: Vec<&str> = ctx.source.lines().collect();

        let mut type_spans: Vec<(usize, usize, String)> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if is_comment(line) {
                continue;
            }
            if let Some(caps) = TYPE_RE.captures(line) {
                let name = caps[3].to_string();
                let end = plugin::brace_block_end(&lines, idx);
                let kind = match &caps[2] {
                    "interface" => EntityKind::Interface,
                    "enum" => EntityKind::Enum,
                    _ => EntityKind::Class,
                };
                output.entities.push(ParsedEntity {
                    kind,
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: None,
                    exported: line.contains("public"),
                    doc: plugin::doc_comment_above(&lines, idx, &["//"]),
                    parent: enclosing(&type_spans, idx),
                    body: plugin::body_slice(&lines, idx, end),
                    complexity: 1,
                });
                if let Some(base) = EXTENDS_RE.captures(line) {
                    output.relations.push(RelationDraft {
                        kind: EdgeKind::Extends,
                        from_name: name.clone(),
                        to_name: simple_name(&base[1]).to_string(),
                    });
                }
                if let Some(ifaces) = IMPLEMENTS_RE.captures(line) {
                    for iface in ifaces[1].split(',') {
                        let iface = iface.trim();
                        let iface = iface.split('<').next().unwrap_or(iface);
                        if !iface.is_empty() {
                            output.relations.push(RelationDraft {
                                kind: EdgeKind::Implements,
                                from_name: name.clone(),
                                to_name: simple_name(iface).to_string(),
                            });
                        }
                    }
                }
                type_spans.push((idx, end, name));
            }
        }

        for (idx, line) in lines.iter().enumerate() {
            if is_comment(line) {
                continue;
            }

            if let Some(caps) = IMPORT_RE.captures(line) {
                let path = caps[1].trim_end_matches(".*");
                let symbol = simple_name(path).to_string();
                output.imports.push(ImportDraft {
                    module: path.to_string(),
                    symbols: if caps[1].ends_with(".*") {
                        Vec::new()
                    } else {
                        vec![symbol]
                    },
                    line: idx as i64 + 1,
                });
                continue;
            }

            if let Some(caps) = ANNOTATION_RE.captures(line) {
                if &caps[1] != "interface" {
                    output.entities.push(ParsedEntity {
                        kind: EntityKind::Decorator,
                        name: caps[1].to_string(),
                        start_line: idx as i64 + 1,
                        end_line: idx as i64 + 1,
                        signature: None,
                        exported: false,
                        doc: None,
                        parent: enclosing(&type_spans, idx),
                        body: None,
                        complexity: 1,
                    });
                }
                continue;
            }

            if TYPE_RE.is_match(line) {
                continue;
            }

            if let Some(caps) = METHOD_RE.captures(line) {
                let name = caps[2].to_string();
                if plugin::is_control_flow(&name) || name == "new" {
                    continue;
                }
                let Some(parent) = enclosing(&type_spans, idx) else {
                    continue;
                };
                let end = plugin::brace_block_end(&lines, idx);
                let body = plugin::body_slice(&lines, idx, end);
                let complexity = body
                    .as_deref()
                    .map(plugin::estimate_complexity)
                    .unwrap_or(1);
                output.entities.push(ParsedEntity {
                    kind: EntityKind::Method,
                    name,
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: Some(format!("({})", &caps[3])),
                    exported: line.contains("public"),
                    doc: plugin::doc_comment_above(&lines, idx, &["//"]),
                    parent: Some(parent),
                    body,
                    complexity,
                });
            }
        }

        output
    }
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*")
}

fn simple_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Innermost type whose brace span strictly contains the line.
fn enclosing(spans: &[(usize, usize, String)], idx: usize) -> Option<String> {
    spans
        .iter()
        .filter(|(start, end, _)| idx > *start && idx <= *end)
        .max_by_key(|(start, _, _)| *start)
        .map(|(_, _, name)| name.clone())
}
