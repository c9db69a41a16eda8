use crate::config::Config;
use crate::model::{EdgeKind, EntityKind};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// One file handed to a fallback parser.
pub struct ParseContext<'a> {
    pub repo: &'a str,
    pub rel_path: &'a str,
    pub source: &'a str,
}

/// An entity recognized by a fallback parser, before identity assignment.
#[derive(Debug, Clone)]
pub struct ParsedEntity {
    pub kind: EntityKind,
    pub name: String,
    pub start_line: i64,
    pub end_line: i64,
    pub signature: Option<String>,
    pub exported: bool,
    pub doc: Option<String>,
    pub parent: Option<String>,
    pub body: Option<String>,
    pub complexity: i64,
}

/// A recognized import statement, classified later by the resolver.
#[derive(Debug, Clone)]
pub struct ImportDraft {
    pub module: String,
    pub symbols: Vec<String>,
    pub line: i64,
}

/// An inheritance relation by name; the resolver materializes the edge when
/// the target is locatable.
#[derive(Debug, Clone)]
pub struct RelationDraft {
    pub kind: EdgeKind,
    pub from_name: String,
    pub to_name: String,
}

#[derive(Debug, Default)]
pub struct ParsedFile {
    pub entities: Vec<ParsedEntity>,
    pub imports: Vec<ImportDraft>,
    pub relations: Vec<RelationDraft>,
}

/// Output of a precise-decode pass over one workspace root.
#[derive(Default)]
pub struct PreciseOutput {
    pub entities: Vec<crate::model::Entity>,
    pub edges: Vec<crate::model::Edge>,
    pub covered_files: std::collections::HashSet<String>,
}

/// The polymorphic unit of language extension. A plugin declares the
/// extensions it owns, may run a precise decode over a workspace root, and
/// parses single files with the fallback method. Both paths emit the same
/// entity/edge shape; adding a language is adding one implementation.
pub trait LanguagePlugin: Send + Sync {
    fn language(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    /// Run the precise decoder over one workspace root. The default is a
    /// no-op: most plugins only have the fallback path.
    fn precise_index(&self, _repo_root: &Path, _root: &str, _repo: &str) -> Result<PreciseOutput> {
        Ok(PreciseOutput::default())
    }

    /// Parse one file with the fallback structural method.
    fn parse_file(&self, ctx: &ParseContext<'_>) -> ParsedFile;
}

/// Registry mapping file extensions to plugins. Unknown extensions fall
/// through to the generic file-only plugin.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn LanguagePlugin>>,
    by_extension: HashMap<&'static str, usize>,
    generic: Box<dyn LanguagePlugin>,
}

impl PluginRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            plugins: Vec::new(),
            by_extension: HashMap::new(),
            generic: Box::new(super::generic::GenericPlugin),
        };
        registry.register(Box::new(super::typescript::TypescriptPlugin::typescript()));
        registry.register(Box::new(super::typescript::TypescriptPlugin::tsx()));
        registry.register(Box::new(super::typescript::TypescriptPlugin::javascript()));
        registry.register(Box::new(super::python::PythonPlugin));
        registry.register(Box::new(super::go::GoPlugin));
        registry.register(Box::new(super::rust_lang::RustPlugin));
        registry.register(Box::new(super::java::JavaPlugin));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn LanguagePlugin>) {
        let idx = self.plugins.len();
        for ext in plugin.extensions() {
            self.by_extension.entry(ext).or_insert(idx);
        }
        self.plugins.push(plugin);
    }

    pub fn for_extension(&self, ext: &str) -> &dyn LanguagePlugin {
        match self.by_extension.get(ext) {
            Some(idx) => self.plugins[*idx].as_ref(),
            None => self.generic.as_ref(),
        }
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn LanguagePlugin> {
        self.plugins.iter().map(|plugin| plugin.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Shared line-scanner helpers used by the fallback parsers.

/// Keywords that disqualify a would-be declaration match: `if (...)` looks
/// like a method call pattern in brace languages.
pub const CONTROL_FLOW_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "else", "do", "match",
];

pub fn is_control_flow(name: &str) -> bool {
    CONTROL_FLOW_KEYWORDS.iter().any(|kw| *kw == name)
}

/// Find the line where the brace block opened at `start_idx` closes
/// (0-based indices over `lines`). Falls back to the opening line when the
/// block never closes (truncated file).
pub fn brace_block_end(lines: &[&str], start_idx: usize) -> usize {
    let mut depth = 0i64;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start_idx) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth -= 1;
                    if opened && depth <= 0 {
                        return idx;
                    }
                }
                _ => {}
            }
        }
        // A braceless declaration (e.g. `type X = Y;`) ends on its own line.
        if !opened && idx > start_idx {
            return start_idx;
        }
    }
    if opened { lines.len().saturating_sub(1) } else { start_idx }
}

/// Find where an indentation-scoped block ends: the last line before
/// indentation returns to at most the declaration's level (blank lines do
/// not terminate a block).
pub fn indent_block_end(lines: &[&str], start_idx: usize) -> usize {
    let base = indent_of(lines[start_idx]);
    let mut last = start_idx;
    for (idx, line) in lines.iter().enumerate().skip(start_idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        last = idx;
    }
    last
}

pub fn indent_of(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Collect a contiguous run of comment lines immediately above `decl_idx`.
/// `markers` are line-comment prefixes; block comments delimited by
/// `/** ... */` are folded too.
pub fn doc_comment_above(lines: &[&str], decl_idx: usize, markers: &[&str]) -> Option<String> {
    let mut collected: Vec<String> = Vec::new();
    let mut idx = decl_idx;
    while idx > 0 {
        idx -= 1;
        let trimmed = lines[idx].trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some(marker) = markers.iter().find(|marker| trimmed.starts_with(**marker)) {
            collected.push(trimmed.trim_start_matches(marker).trim().to_string());
            continue;
        }
        if trimmed.ends_with("*/") {
            // Walk back to the opening of the block comment, bottom-up;
            // the final reverse below restores source order.
            loop {
                let line = lines[idx].trim();
                let cleaned = line
                    .trim_end_matches("*/")
                    .trim_start_matches("/**")
                    .trim_start_matches("/*")
                    .trim_start_matches('*')
                    .trim();
                if !cleaned.is_empty() {
                    collected.push(cleaned.to_string());
                }
                if line.starts_with("/*") || idx == 0 {
                    break;
                }
                idx -= 1;
            }
        }
        break;
    }
    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    let doc = collected.join("\n").trim().to_string();
    if doc.is_empty() { None } else { Some(doc) }
}

/// Branching constructs counted by the cyclomatic estimate.
const BRANCH_TOKENS: &[&str] = &[
    "if ", "if(", "else if", "elif ", "for ", "for(", "while ", "while(", "case ", "catch ",
    "catch(", "except ", "&&", "||", " and ", " or ", "?.", " ? ",
];

/// Cyclomatic complexity estimate: 1 + count of branching keywords and
/// operators in the body.
pub fn estimate_complexity(body: &str) -> i64 {
    let mut count: i64 = 1;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*') {
            continue;
        }
        for token in BRANCH_TOKENS {
            count += line.matches(token).count() as i64;
        }
    }
    count
}

/// Cap and slice a body out of the source lines (0-based inclusive range).
pub fn body_slice(lines: &[&str], start_idx: usize, end_idx: usize) -> Option<String> {
    let max_lines = Config::get().max_body_lines;
    if start_idx >= lines.len() {
        return None;
    }
    let end = end_idx.min(lines.len().saturating_sub(1));
    let capped_end = end.min(start_idx + max_lines.saturating_sub(1));
    Some(lines[start_idx..=capped_end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_block_end_matches_nesting() {
        let lines: Vec<&str> = vec![
            "function outer() {", // 0
            "  if (x) {",         // 1
            "    inner();",       // 2
            "  }",                // 3
            "}",                  // 4
            "function next() {}", // 5
        ];
        assert_eq!(brace_block_end(&lines, 0), 4);
        assert_eq!(brace_block_end(&lines, 5), 5);
    }

    #[test]
    fn indent_block_end_skips_blanks() {
        let lines: Vec<&str> = vec![
            "def f():",     // 0
            "    a = 1",    // 1
            "",             // 2
            "    return a", // 3
            "def g():",     // 4
            "    pass",     // 5
        ];
        assert_eq!(indent_block_end(&lines, 0), 3);
        assert_eq!(indent_block_end(&lines, 4), 5);
    }

    #[test]
    fn complexity_counts_branches() {
        let body = "if (a && b) {\n  for (;;) {}\n} else if (c) {\n}";
        assert!(estimate_complexity(body) >= 4);
        assert_eq!(estimate_complexity("return 1;"), 1);
    }

    #[test]
    fn doc_comment_above_line_markers() {
        let lines: Vec<&str> = vec!["// adds two numbers", "// carefully", "fn add() {}"];
        let doc = doc_comment_above(&lines, 2, &["//"]).unwrap();
        assert_eq!(doc, "adds two numbers\ncarefully");
    }
}
