use crate::indexer::plugin::{
    self, ImportDraft, LanguagePlugin, ParseContext, ParsedEntity, ParsedFile, RelationDraft,
};
use crate::model::{EdgeKind, EntityKind};
use regex::Regex;
use std::sync::LazyLock;

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap());
static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\(([^)]*)\)?").unwrap());
static DECORATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w[\w.]*)").unwrap());
static CONST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z_][A-Z0-9_]*)\s*(?::[^=]+)?=").unwrap());
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)").unwrap());
static FROM_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+([\w.]+|\.+[\w.]*)\s+import\s+(.+)").unwrap());

pub struct PythonPlugin;

impl LanguagePlugin for PythonPlugin {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse_file(&self, ctx: &ParseContext<'_>) -> ParsedFile {
        let mut output = ParsedFile::default();
        let lines: Vec<&str> = ctx.source.lines().collect();

        // Innermost enclosing class per indent level, for parent attribution.
        let mut class_stack: Vec<(usize, String)> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let indent = plugin::indent_of(line);
            while class_stack
                .last()
                .map(|(class_indent, _)| indent <= *class_indent && !line.trim().is_empty())
                .unwrap_or(false)
            {
                class_stack.pop();
            }

            if let Some(caps) = FROM_IMPORT_RE.captures(line) {
                output.imports.push(ImportDraft {
                    module: caps[1].to_string(),
                    symbols: parse_imported_names(&caps[2]),
                    line: idx as i64 + 1,
                });
                continue;
            }
            if let Some(caps) = IMPORT_RE.captures(line) {
                for module in caps[1].split(',') {
                    let module = module.trim();
                    if module.is_empty() {
                        continue;
                    }
                    let (module, bound) = match module.split_once(" as ") {
                        Some((module, alias)) => (module.trim(), alias.trim()),
                        None => (module, module.split('.').next_back().unwrap_or(module)),
                    };
                    output.imports.push(ImportDraft {
                        module: module.to_string(),
                        symbols: vec![bound.to_string()],
                        line: idx as i64 + 1,
                    });
                }
                continue;
            }

            if let Some(caps) = DECORATOR_RE.captures(line) {
                output.entities.push(ParsedEntity {
                    kind: EntityKind::Decorator,
                    name: caps[1].to_string(),
                    start_line: idx as i64 + 1,
                    end_line: idx as i64 + 1,
                    signature: None,
                    exported: false,
                    doc: None,
                    parent: class_stack.last().map(|(_, name)| name.clone()),
                    body: None,
                    complexity: 1,
                });
                continue;
            }

            if let Some(caps) = CLASS_RE.captures(line) {
                let name = caps[2].to_string();
                let end = plugin::indent_block_end(&lines, idx);
                output.entities.push(ParsedEntity {
                    kind: EntityKind::Class,
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: None,
                    exported: !name.starts_with('_'),
                    doc: docstring_below(&lines, idx),
                    parent: class_stack.last().map(|(_, name)| name.clone()),
                    body: plugin::body_slice(&lines, idx, end),
                    complexity: 1,
                });
                for base in caps.get(3).map(|m| m.as_str()).unwrap_or("").split(',') {
                    let base = base.trim();
                    if base.is_empty() || base == "object" || base.contains('=') {
                        continue;
                    }
                    output.relations.push(RelationDraft {
                        kind: EdgeKind::Extends,
                        from_name: name.clone(),
                        to_name: base.to_string(),
                    });
                }
                class_stack.push((indent, name));
                continue;
            }

            if let Some(caps) = DEF_RE.captures(line) {
                let name = caps[2].to_string();
                let end = plugin::indent_block_end(&lines, idx);
                let parent = class_stack.last().map(|(_, name)| name.clone());
                let kind = if parent.is_some() {
                    EntityKind::Method
                } else {
                    EntityKind::Function
                };
                let body = plugin::body_slice(&lines, idx, end);
                let complexity = body
                    .as_deref()
                    .map(plugin::estimate_complexity)
                    .unwrap_or(1);
                output.entities.push(ParsedEntity {
                    kind,
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: Some(format!("({})", &caps[3])),
                    exported: !name.starts_with('_'),
                    doc: docstring_below(&lines, idx),
                    parent,
                    body,
                    complexity,
                });
                continue;
            }

            if indent == 0 {
                if let Some(caps) = CONST_RE.captures(line) {
                    output.entities.push(ParsedEntity {
                        kind: EntityKind::Variable,
                        name: caps[1].to_string(),
                        start_line: idx as i64 + 1,
                        end_line: idx as i64 + 1,
                        signature: None,
                        exported: !caps[1].starts_with('_'),
                        doc: None,
                        parent: None,
                        body: None,
                        complexity: 1,
                    });
                }
            }
        }

        output
    }
}

/// `from x import a, b as c` binds `a` and `c` locally.
fn parse_imported_names(clause: &str) -> Vec<String> {
    let clause = clause.trim().trim_start_matches('(').trim_end_matches(')');
    let mut names = Vec::new();
    for part in clause.split(',') {
        let part = part.trim();
        if part.is_empty() || part == "*" {
            continue;
        }
        let bound = match part.split_once(" as ") {
            Some((_, alias)) => alias.trim(),
            None => part,
        };
        if !bound.is_empty() && !names.iter().any(|existing| existing == bound) {
            names.push(bound.to_string());
        }
    }
    names
}

/// Extract a docstring opening on the line after a def/class header. The
/// header may span multiple lines; scan a short window for the quote.
fn docstring_below(lines: &[&str], decl_idx: usize) -> Option<String> {
    let mut idx = decl_idx;
    // Find the line that terminates the header.
    while idx < lines.len() && !lines[idx].trim_end().ends_with(':') {
        idx += 1;
        if idx > decl_idx + 4 {
            return None;
        }
    }
    let first = lines.get(idx + 1)?.trim();
    let quote = if first.starts_with("\"\"\"") {
        "\"\"\""
    } else if first.starts_with("'''") {
        "'''"
    } else {
        return None;
    };
    let inner = &first[3..];
    if let Some(end) = inner.find(quote) {
        let doc = inner[..end].trim();
        return if doc.is_empty() { None } else { Some(doc.to_string()) };
    }
    let mut collected = vec![inner.trim().to_string()];
    for line in lines.iter().skip(idx + 2) {
        if let Some(end) = line.find(quote) {
            collected.push(line[..end].trim().to_string());
            break;
        }
        collected.push(line.trim().to_string());
    }
    let doc = collected
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if doc.is_empty() { None } else { Some(doc) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        PythonPlugin.parse_file(&ParseContext {
            repo: "repo",
            rel_path: "app/main.py",
            source,
        })
    }

    #[test]
    fn classes_methods_and_scope_exit() {
        let source = r#"
class UserService(BaseService):
    """Manages users."""

    def find(self, user_id):
        if user_id in self.cache:
            return self.cache[user_id]
        return load(user_id)

def load(user_id):
    """Load one user."""
    return db.fetch(user_id)
"#;
        let parsed = parse(source);
        let class = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Class)
            .unwrap();
        assert_eq!(class.name, "UserService");
        assert_eq!(class.doc.as_deref(), Some("Manages users."));

        let method = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Method)
            .unwrap();
        assert_eq!(method.name, "find");
        assert_eq!(method.parent.as_deref(), Some("UserService"));

        // load() is after the indent reset, so it is a free function
        let func = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Function)
            .unwrap();
        assert_eq!(func.name, "load");
        assert!(func.parent.is_none());
        assert_eq!(func.doc.as_deref(), Some("Load one user."));

        assert!(parsed.relations.iter().any(|r| {
            r.kind == EdgeKind::Extends && r.from_name == "UserService" && r.to_name == "BaseService"
        }));
    }

    #[test]
    fn imports_and_aliases() {
        let source = r#"
import os
import numpy as np
from collections import OrderedDict, defaultdict
from .helpers import format_name as fmt
from app.services import billing
"#;
        let parsed = parse(source);
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "numpy" && imp.symbols == vec!["np"]));
        let coll = parsed
            .imports
            .iter()
            .find(|imp| imp.module == "collections")
            .unwrap();
        assert_eq!(coll.symbols, vec!["OrderedDict", "defaultdict"]);
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == ".helpers" && imp.symbols == vec!["fmt"]));
        assert!(parsed.imports.iter().any(|imp| imp.module == "app.services"));
    }

    #[test]
    fn private_names_not_exported() {
        let parsed = parse("def _internal():\n    pass\n\nMAX_RETRIES = 3\n");
        let func = parsed.entities.iter().find(|e| e.name == "_internal").unwrap();
        assert!(!func.exported);
        let constant = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Variable)
            .unwrap();
        assert_eq!(constant.name, "MAX_RETRIES");
        assert!(constant.exported);
    }

    #[test]
    fn decorators_recorded() {
        let parsed = parse("@app.route\ndef handler():\n    pass\n");
        assert!(parsed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Decorator && e.name == "app.route"));
    }
}
