use serde::{Deserialize, Serialize};

/// A named, located unit of code. The `id` is a pure function of
/// `(repo, file_path, kind, name, signature)` — see `ident`.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: String,
    pub repo: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub start_line: i64,
    pub end_line: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub language: String,
    pub exported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub complexity: i64,
}

/// A directed relationship between two entity ids. The `id` is a hash of
/// `(from_id, to_id, kind)` so duplicates collapse to one row.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub id: String,
    pub repo: String,
    pub from_id: String,
    pub to_id: String,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imported_symbols: Vec<String>,
    pub is_external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Directory,
    Function,
    Class,
    Interface,
    Method,
    Variable,
    Type,
    Enum,
    Module,
    Namespace,
    Struct,
    Decorator,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Directory => "directory",
            EntityKind::Function => "function",
            EntityKind::Class => "class",
            EntityKind::Interface => "interface",
            EntityKind::Method => "method",
            EntityKind::Variable => "variable",
            EntityKind::Type => "type",
            EntityKind::Enum => "enum",
            EntityKind::Module => "module",
            EntityKind::Namespace => "namespace",
            EntityKind::Struct => "struct",
            EntityKind::Decorator => "decorator",
        }
    }

    pub fn from_str(value: &str) -> Option<EntityKind> {
        Some(match value {
            "file" => EntityKind::File,
            "directory" => EntityKind::Directory,
            "function" => EntityKind::Function,
            "class" => EntityKind::Class,
            "interface" => EntityKind::Interface,
            "method" => EntityKind::Method,
            "variable" => EntityKind::Variable,
            "type" => EntityKind::Type,
            "enum" => EntityKind::Enum,
            "module" => EntityKind::Module,
            "namespace" => EntityKind::Namespace,
            "struct" => EntityKind::Struct,
            "decorator" => EntityKind::Decorator,
            _ => return None,
        })
    }

    /// Kinds whose bodies can contain call sites.
    pub fn is_callable(&self) -> bool {
        matches!(self, EntityKind::Function | EntityKind::Method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Calls,
    Imports,
    Implements,
    Extends,
    References,
    MemberOf,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
            EdgeKind::Implements => "implements",
            EdgeKind::Extends => "extends",
            EdgeKind::References => "references",
            EdgeKind::MemberOf => "member_of",
        }
    }

    pub fn from_str(value: &str) -> Option<EdgeKind> {
        Some(match value {
            "contains" => EdgeKind::Contains,
            "calls" => EdgeKind::Calls,
            "imports" => EdgeKind::Imports,
            "implements" => EdgeKind::Implements,
            "extends" => EdgeKind::Extends,
            "references" => EdgeKind::References,
            "member_of" => EdgeKind::MemberOf,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceKind {
    Single,
    Pnpm,
    Lerna,
    Npm,
    Cargo,
    GoWork,
}

/// How many independent precise-decode passes are needed (one per root) and
/// where fallback parsing should look for boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceInfo {
    pub roots: Vec<String>,
    pub kind: WorkspaceKind,
}

impl WorkspaceInfo {
    pub fn single() -> Self {
        Self {
            roots: vec![".".to_string()],
            kind: WorkspaceKind::Single,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageDetection {
    pub language: String,
    pub extensions: Vec<String>,
    pub file_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub scanned: usize,
    pub precise_files: usize,
    pub fallback_files: usize,
    pub entities: usize,
    pub edges: usize,
    pub version: String,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct RepoOverview {
    pub repo: String,
    pub entities: i64,
    pub edges: i64,
    pub version: Option<String>,
    pub last_indexed: Option<i64>,
}

/// Result of the shadow-version invariant check: rows stamped with a tag
/// that is not the current version indicate a finalization bug.
#[derive(Debug, Serialize)]
pub struct VersionCheck {
    pub repo: String,
    pub version: Option<String>,
    pub stale_entities: i64,
    pub stale_edges: i64,
}
