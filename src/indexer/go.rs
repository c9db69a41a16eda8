use crate::indexer::plugin::{
    self, ImportDraft, LanguagePlugin, ParseContext, ParsedEntity, ParsedFile,
};
use crate::model::EntityKind;
use regex::Regex;
use std::sync::LazyLock;

static FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^func\s+(?:\(\s*\w+\s+\*?([\w\[\]]+)\s*\)\s+)?(\w+)\s*\(([^)]*)").unwrap()
});
static TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^type\s+(\w+)\s+(struct|interface)\b").unwrap());
static TYPE_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^type\s+(\w+)\s+=?\s*\S").unwrap());
static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:const|var)\s+(\w+)\b").unwrap());
static IMPORT_ONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^import\s+(?:(\w+|\.)\s+)?"([^"]+)""#).unwrap());
static IMPORT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*(?:(\w+|\.|_)\s+)?"([^"]+)""#).unwrap());

pub struct GoPlugin;

impl LanguagePlugin for GoPlugin {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse_file(&self, ctx: &ParseContext<'_>) -> ParsedFile {
        let mut output = ParsedFile::default();
        let lines: Vec<&str> = ctx.source.lines().collect();
        let mut in_import_block = false;

        for (idx, line) in lines.iter().enumerate() {
            if in_import_block {
                if line.trim_start().starts_with(')') {
                    in_import_block = false;
                } else if let Some(caps) = IMPORT_LINE_RE.captures(line) {
                    push_import(&mut output, &caps, idx);
                }
                continue;
            }
            if line.trim_start() == "import (" || line.trim() == "import(" {
                in_import_block = true;
                continue;
            }
            if let Some(caps) = IMPORT_ONE_RE.captures(line) {
                push_import(&mut output, &caps, idx);
                continue;
            }

            if let Some(caps) = FUNC_RE.captures(line) {
                let receiver = caps.get(1).map(|m| trim_generics(m.as_str()).to_string());
                let name = caps[2].to_string();
                let end = plugin::brace_block_end(&lines, idx);
                let body = plugin::body_slice(&lines, idx, end);
                let complexity = body
                    .as_deref()
                    .map(plugin::estimate_complexity)
                    .unwrap_or(1);
                output.entities.push(ParsedEntity {
                    kind: if receiver.is_some() {
                        EntityKind::Method
                    } else {
                        EntityKind::Function
                    },
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: Some(format!("({})", &caps[3])),
                    exported: is_exported(&name),
                    doc: plugin::doc_comment_above(&lines, idx, &["//"]),
                    parent: receiver,
                    body,
                    complexity,
                });
                continue;
            }

            if let Some(caps) = TYPE_RE.captures(line) {
                let name = caps[1].to_string();
                let end = if line.contains('{') {
                    plugin::brace_block_end(&lines, idx)
                } else {
                    idx
                };
                output.entities.push(ParsedEntity {
                    kind: if &caps[2] == "interface" {
                        EntityKind::Interface
                    } else {
                        EntityKind::Struct
                    },
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: end as i64 + 1,
                    signature: None,
                    exported: is_exported(&name),
                    doc: plugin::doc_comment_above(&lines, idx, &["//"]),
                    parent: None,
                    body: plugin::body_slice(&lines, idx, end),
                    complexity: 1,
                });
                continue;
            }

            if let Some(caps) = TYPE_ALIAS_RE.captures(line) {
                let name = caps[1].to_string();
                output.entities.push(ParsedEntity {
                    kind: EntityKind::Type,
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: idx as i64 + 1,
                    signature: None,
                    exported: is_exported(&name),
                    doc: plugin::doc_comment_above(&lines, idx, &["//"]),
                    parent: None,
                    body: None,
                    complexity: 1,
                });
                continue;
            }

            if let Some(caps) = VAR_RE.captures(line) {
                let name = caps[1].to_string();
                if name == "_" {
                    continue;
                }
                output.entities.push(ParsedEntity {
                    kind: EntityKind::Variable,
                    name: name.clone(),
                    start_line: idx as i64 + 1,
                    end_line: idx as i64 + 1,
                    signature: None,
                    exported: is_exported(&name),
                    doc: None,
                    parent: None,
                    body: None,
                    complexity: 1,
                });
            }
        }

        output
    }
}

fn push_import(output: &mut ParsedFile, caps: &regex::Captures<'_>, idx: usize) {
    let path = caps[2].to_string();
    let bound = caps
        .get(1)
        .map(|m| m.as_str())
        .filter(|alias| *alias != "." && *alias != "_")
        .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path));
    output.imports.push(ImportDraft {
        module: path.clone(),
        symbols: vec![bound.to_string()],
        line: idx as i64 + 1,
    });
}

fn trim_generics(receiver: &str) -> &str {
    receiver.split('[').next().unwrap_or(receiver)
}

// Go visibility is spelled with the identifier's first letter.
fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        GoPlugin.parse_file(&ParseContext {
            repo: "repo",
            rel_path: "internal/server/server.go",
            source,
        })
    }

    #[test]
    fn functions_and_methods() {
        let source = r#"package server

// Serve runs the accept loop.
func Serve(addr string) error {
	if addr == "" {
		return errNoAddr
	}
	return listen(addr)
}

func (s *Server) Close() error {
	return s.ln.Close()
}
"#;
        let parsed = parse(source);
        let serve = parsed.entities.iter().find(|e| e.name == "Serve").unwrap();
        assert_eq!(serve.kind, EntityKind::Function);
        assert!(serve.exported);
        assert_eq!(serve.doc.as_deref(), Some("Serve runs the accept loop."));
        assert!(serve.complexity >= 2);

        let close = parsed.entities.iter().find(|e| e.name == "Close").unwrap();
        assert_eq!(close.kind, EntityKind::Method);
        assert_eq!(close.parent.as_deref(), Some("Server"));
    }

    #[test]
    fn structs_interfaces_and_aliases() {
        let source = r#"package server

type Server struct {
	ln net.Listener
}

type Handler interface {
	Handle(w ResponseWriter, r *Request)
}

type handlerFunc func(*Request)
"#;
        let parsed = parse(source);
        assert!(parsed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Struct && e.name == "Server"));
        assert!(parsed
            .entities
            .iter()
            .any(|e| e.kind == EntityKind::Interface && e.name == "Handler"));
        let alias = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Type)
            .unwrap();
        assert_eq!(alias.name, "handlerFunc");
        assert!(!alias.exported);
    }

    #[test]
    fn import_forms() {
        let source = r#"package main

import "fmt"

import (
	"net/http"
	log "github.com/rs/zerolog"
	_ "embed"
)
"#;
        let parsed = parse(source);
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "fmt" && imp.symbols == vec!["fmt"]));
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "net/http" && imp.symbols == vec!["http"]));
        assert!(parsed
            .imports
            .iter()
            .any(|imp| imp.module == "github.com/rs/zerolog" && imp.symbols == vec!["log"]));
        // blank imports keep the path as the bound name
        assert!(parsed.imports.iter().any(|imp| imp.module == "embed"));
    }
}
