use crate::config::Config;
use crate::indexer::plugin::{
    self, ImportDraft, LanguagePlugin, ParseContext, ParsedEntity, ParsedFile, PreciseOutput,
    RelationDraft,
};
use crate::model::{EdgeKind, EntityKind};
use crate::scip;
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

const TS_EXTENSIONS: &[&str] = &["ts", "mts", "cts"];
const TSX_EXTENSIONS: &[&str] = &["tsx"];
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

const ARTIFACT_NAME: &str = "index.scip";
const PROJECT_MARKERS: &[&str] = &["package.json", "tsconfig.json", "jsconfig.json"];

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s+extends\s+([\w$.]+))?(?:\s+implements\s+([\w$.,\s]+?))?\s*\{",
    )
    .unwrap()
});
static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?interface\s+([A-Za-z_$][\w$]*)(?:\s+extends\s+([\w$.,\s]+?))?\s*\{")
        .unwrap()
});
static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:export\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)").unwrap());
static TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)(?:<[^=]*>)?\s*=").unwrap());
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(\([^)]*\)?)")
        .unwrap()
});
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)[^=]*=\s*(?:async\s+)?(\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=>{]+)?=>",
    )
    .unwrap()
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:public\s+|private\s+|protected\s+|static\s+|readonly\s+|override\s+|async\s+)*\*?\s*([A-Za-z_$][\w$]*)\s*(\([^)]*\)?)\s*(?::\s*[^{;]+)?\{",
    )
    .unwrap()
});
static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=").unwrap()
});
static DECORATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@([A-Za-z_$][\w$]*)").unwrap());

static IMPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import|export)\s+(?:type\s+)?(.+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});
static IMPORT_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:const|let|var)\s+(.+?)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap()
});

pub struct TypescriptPlugin {
    language: &'static str,
    extensions: &'static [&'static str],
}

impl TypescriptPlugin {
    pub fn typescript() -> Self {
        Self {
            language: "typescript",
            extensions: TS_EXTENSIONS,
        }
    }

    pub fn tsx() -> Self {
        Self {
            language: "tsx",
            extensions: TSX_EXTENSIONS,
        }
    }

    pub fn javascript() -> Self {
        Self {
            language: "javascript",
            extensions: JS_EXTENSIONS,
        }
    }
}

impl LanguagePlugin for TypescriptPlugin {
    fn language(&self) -> &'static str {
        self.language
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    /// Precise path: decode the symbol-index artifact for one workspace
    /// root. Missing project markers or artifact degrade to empty output;
    /// the fallback parser covers whatever this misses.
    fn precise_index(&self, repo_root: &Path, root: &str, repo: &str) -> Result<PreciseOutput> {
        if self.language != "typescript" {
            // One decode per root is enough; the TS instance owns it.
            return Ok(PreciseOutput::default());
        }
        let root_dir = if root == "." {
            repo_root.to_path_buf()
        } else {
            repo_root.join(root)
        };
        if !PROJECT_MARKERS
            .iter()
            .any(|marker| root_dir.join(marker).exists())
        {
            return Ok(PreciseOutput::default());
        }
        let artifact = root_dir.join(ARTIFACT_NAME);
        if !artifact.exists() {
            if let Some(cmd) = &Config::get().scip_command {
                run_indexer_command(cmd, &root_dir);
            }
        }
        if !artifact.exists() {
            return Ok(PreciseOutput::default());
        }
        let decoded = scip::decode_artifact(&artifact, repo, root);
        Ok(PreciseOutput {
            entities: decoded.entities,
            edges: decoded.edges,
            covered_files: decoded.covered_files,
        })
    }

    fn parse_file(&self, ctx: &ParseContext<'_>) -> ParsedFile {
        let mut output = ParsedFile::default();
        let lines: Vec<&str> = ctx.source.lines().collect();

        collect_imports(&lines, &mut output);

        // Class-like declarations first; their spans decide whether a later
        // match is a method or a free function.
        let mut class_spans: Vec<(String, usize, usize)> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if let Some(caps) = CLASS_RE.captures(line) {
                let name = caps[1].to_string();
                let end = plugin::brace_block_end(&lines, idx);
                push_entity(&mut output, &lines, EntityKind::Class, &name, idx, end, None, None);
                if let Some(base) = caps.get(2) {
                    output.relations.push(RelationDraft {
                        kind: EdgeKind::Extends,
                        from_name: name.clone(),
                        to_name: base.as_str().trim().to_string(),
                    });
                }
                if let Some(ifaces) = caps.get(3) {
                    for iface in ifaces.as_str().split(',') {
                        let iface = iface.trim();
                        if !iface.is_empty() {
                            output.relations.push(RelationDraft {
                                kind: EdgeKind::Implements,
                                from_name: name.clone(),
                                to_name: iface.to_string(),
                            });
                        }
                    }
                }
                class_spans.push((name, idx, end));
            } else if let Some(caps) = INTERFACE_RE.captures(line) {
                let name = caps[1].to_string();
                let end = plugin::brace_block_end(&lines, idx);
                push_entity(
                    &mut output,
                    &lines,
                    EntityKind::Interface,
                    &name,
                    idx,
                    end,
                    None,
                    None,
                );
                if let Some(bases) = caps.get(2) {
                    for base in bases.as_str().split(',') {
                        let base = base.trim();
                        if !base.is_empty() {
                            output.relations.push(RelationDraft {
                                kind: EdgeKind::Extends,
                                from_name: name.clone(),
                                to_name: base.to_string(),
                            });
                        }
                    }
                }
                // Interface members are not methods; exclude the span from
                // method matching by registering it like a class span with
                // an empty name.
                class_spans.push((String::new(), idx, end));
            }
        }

        for (idx, line) in lines.iter().enumerate() {
            let enclosing = class_spans
                .iter()
                .find(|(_, start, end)| idx > *start && idx <= *end);

            if let Some(caps) = DECORATOR_RE.captures(line) {
                let name = caps[1].to_string();
                if !plugin::is_control_flow(&name) {
                    push_entity(
                        &mut output,
                        &lines,
                        EntityKind::Decorator,
                        &name,
                        idx,
                        idx,
                        None,
                        enclosing.map(|(class, _, _)| class.clone()).filter(|c| !c.is_empty()),
                    );
                }
                continue;
            }

            if let Some((class_name, class_start, _)) = enclosing {
                if class_name.is_empty() || idx == *class_start {
                    continue;
                }
                if let Some(caps) = METHOD_RE.captures(line) {
                    let name = caps[1].to_string();
                    if plugin::is_control_flow(&name) {
                        continue;
                    }
                    let end = plugin::brace_block_end(&lines, idx);
                    push_entity(
                        &mut output,
                        &lines,
                        EntityKind::Method,
                        &name,
                        idx,
                        end,
                        Some(caps[2].to_string()),
                        Some(class_name.clone()),
                    );
                }
                continue;
            }

            if let Some(caps) = FUNCTION_RE.captures(line) {
                let name = caps[1].to_string();
                if plugin::is_control_flow(&name) {
                    continue;
                }
                let end = plugin::brace_block_end(&lines, idx);
                push_entity(
                    &mut output,
                    &lines,
                    EntityKind::Function,
                    &name,
                    idx,
                    end,
                    Some(caps[2].to_string()),
                    None,
                );
            } else if let Some(caps) = ARROW_RE.captures(line) {
                let name = caps[1].to_string();
                if plugin::is_control_flow(&name) {
                    continue;
                }
                let end = plugin::brace_block_end(&lines, idx);
                push_entity(
                    &mut output,
                    &lines,
                    EntityKind::Function,
                    &name,
                    idx,
                    end,
                    Some(caps[2].to_string()),
                    None,
                );
            } else if let Some(caps) = ENUM_RE.captures(line) {
                let end = plugin::brace_block_end(&lines, idx);
                push_entity(&mut output, &lines, EntityKind::Enum, &caps[1], idx, end, None, None);
            } else if let Some(caps) = TYPE_RE.captures(line) {
                push_entity(&mut output, &lines, EntityKind::Type, &caps[1], idx, idx, None, None);
            } else if let Some(caps) = CONST_RE.captures(line) {
                if line.contains("require(") {
                    continue;
                }
                push_entity(
                    &mut output,
                    &lines,
                    EntityKind::Variable,
                    &caps[1],
                    idx,
                    idx,
                    None,
                    None,
                );
            }
        }

        output
    }
}

fn run_indexer_command(cmd: &str, root_dir: &Path) {
    let mut parts = cmd.split_whitespace();
    let Some(program) = parts.next() else {
        return;
    };
    let status = Command::new(program)
        .args(parts)
        .current_dir(root_dir)
        .status();
    match status {
        Ok(status) if !status.success() => {
            eprintln!("polygraph: precise indexer exited with {status}");
        }
        Err(err) => eprintln!("polygraph: precise indexer failed to start: {err}"),
        _ => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn push_entity(
    output: &mut ParsedFile,
    lines: &[&str],
    kind: EntityKind,
    name: &str,
    start_idx: usize,
    end_idx: usize,
    signature: Option<String>,
    parent: Option<String>,
) {
    // Arrow consts matched as functions would otherwise re-match as
    // variables; first match wins per (kind-agnostic) name + line.
    if output
        .entities
        .iter()
        .any(|existing| existing.start_line == start_idx as i64 + 1 && existing.name == name)
    {
        return;
    }
    let body = plugin::body_slice(lines, start_idx, end_idx);
    let complexity = body.as_deref().map(plugin::estimate_complexity).unwrap_or(1);
    let exported = lines[start_idx].trim_start().starts_with("export ")
        || lines[start_idx].contains("module.exports");
    output.entities.push(ParsedEntity {
        kind,
        name: name.to_string(),
        start_line: start_idx as i64 + 1,
        end_line: end_idx as i64 + 1,
        signature,
        exported,
        doc: plugin::doc_comment_above(lines, start_idx, &["///", "//"]),
        parent,
        body,
        complexity,
    });
}

fn collect_imports(lines: &[&str], output: &mut ParsedFile) {
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = IMPORT_FROM_RE.captures(line) {
            output.imports.push(ImportDraft {
                module: caps[2].to_string(),
                symbols: parse_import_clause(&caps[1]),
                line: idx as i64 + 1,
            });
        } else if let Some(caps) = REQUIRE_RE.captures(line) {
            output.imports.push(ImportDraft {
                module: caps[2].to_string(),
                symbols: parse_import_clause(&caps[1]),
                line: idx as i64 + 1,
            });
        } else if let Some(caps) = IMPORT_BARE_RE.captures(line) {
            output.imports.push(ImportDraft {
                module: caps[1].to_string(),
                symbols: Vec::new(),
                line: idx as i64 + 1,
            });
        }
    }
}

/// Parse an import clause into the list of bound names: default imports,
/// `{ a, b as c }` destructuring, and `* as ns`.
fn parse_import_clause(clause: &str) -> Vec<String> {
    let mut symbols = Vec::new();
    let clause = clause.trim();
    let mut rest = clause;
    if let Some(open) = clause.find('{') {
        let before = clause[..open].trim().trim_end_matches(',').trim();
        if !before.is_empty() {
            push_symbol(&mut symbols, before);
        }
        let inner_end = clause.rfind('}').unwrap_or(clause.len());
        for part in clause[open + 1..inner_end].split(',') {
            push_symbol(&mut symbols, part);
        }
        rest = "";
    }
    if !rest.is_empty() {
        if let Some(ns) = rest.strip_prefix("* as ") {
            push_symbol(&mut symbols, ns);
        } else {
            push_symbol(&mut symbols, rest);
        }
    }
    symbols
}

fn push_symbol(symbols: &mut Vec<String>, raw: &str) {
    // `orig as alias` binds the alias locally; call sites use the alias.
    let name = match raw.split(" as ").nth(1) {
        Some(alias) => alias.trim(),
        None => raw.trim(),
    };
    let name = name.trim_matches(|ch: char| !ch.is_alphanumeric() && ch != '_' && ch != '$');
    if !name.is_empty() && !symbols.iter().any(|existing| existing == name) {
        symbols.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        let plugin = TypescriptPlugin::typescript();
        plugin.parse_file(&ParseContext {
            repo: "repo",
            rel_path: "src/app.ts",
            source,
        })
    }

    #[test]
    fn classes_methods_and_functions() {
        let source = r#"
export class UserService extends BaseService implements Disposable {
  private cache: Map<string, User>;

  async findUser(id: string): Promise<User> {
    if (this.cache.has(id)) {
      return this.cache.get(id);
    }
    return load(id);
  }
}

export function load(id: string): User {
  return db.fetch(id);
}

const normalize = (raw: string) => raw.trim();
"#;
        let parsed = parse(source);
        let class = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Class)
            .unwrap();
        assert_eq!(class.name, "UserService");
        assert!(class.exported);

        let method = parsed
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Method)
            .unwrap();
        assert_eq!(method.name, "findUser");
        assert_eq!(method.parent.as_deref(), Some("UserService"));
        assert!(method.complexity >= 2);

        let fns: Vec<&str> = parsed
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Function)
            .map(|e| e.name.as_str())
            .collect();
        assert!(fns.contains(&"load"));
        assert!(fns.contains(&"normalize"));

        assert!(parsed.relations.iter().any(|r| {
            r.kind == EdgeKind::Extends && r.from_name == "UserService" && r.to_name == "BaseService"
        }));
        assert!(parsed.relations.iter().any(|r| {
            r.kind == EdgeKind::Implements && r.to_name == "Disposable"
        }));
    }

    #[test]
    fn control_flow_is_not_a_method() {
        let source = r#"
class Widget {
  render() {
    if (this.visible) {
      this.draw();
    }
    while (this.dirty) {
      this.flush();
    }
  }
}
"#;
        let parsed = parse(source);
        let methods: Vec<&str> = parsed
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Method)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(methods, vec!["render"]);
    }

    #[test]
    fn import_clauses() {
        let source = r#"
import express from 'express';
import { helper, format as fmt } from './util';
import * as path from 'path';
import './side-effect';
const legacy = require('./legacy');
"#;
        let parsed = parse(source);
        assert_eq!(parsed.imports.len(), 5);
        let util = parsed
            .imports
            .iter()
            .find(|imp| imp.module == "./util")
            .unwrap();
        assert_eq!(util.symbols, vec!["helper", "fmt"]);
        let express = parsed
            .imports
            .iter()
            .find(|imp| imp.module == "express")
            .unwrap();
        assert_eq!(express.symbols, vec!["express"]);
        assert!(parsed.imports.iter().any(|imp| imp.module == "./side-effect"));
        assert!(parsed.imports.iter().any(|imp| imp.module == "./legacy"));
    }

    #[test]
    fn interfaces_enums_types() {
        let source = r#"
export interface Shape extends Drawable {
  area(): number;
}
enum Color { Red, Green }
export type Id = string;
"#;
        let parsed = parse(source);
        assert!(parsed.entities.iter().any(|e| e.kind == EntityKind::Interface && e.name == "Shape"));
        assert!(parsed.entities.iter().any(|e| e.kind == EntityKind::Enum && e.name == "Color"));
        assert!(parsed.entities.iter().any(|e| e.kind == EntityKind::Type && e.name == "Id"));
        // interface members never surface as methods
        assert!(!parsed.entities.iter().any(|e| e.kind == EntityKind::Method));
    }
}
