//! Cross-file linking over fallback-parsed files.
//!
//! Takes the per-file parse results, resolves import specifiers to files
//! inside the repo (or to external package pseudo-entities), and detects
//! call sites for names that are locally defined or imported. Everything
//! here works on the scanned file set only; nothing touches the filesystem.

use crate::ident;
use crate::indexer::boundary;
use crate::indexer::plugin::{ImportDraft, RelationDraft};
use crate::model::{Edge, EdgeKind, Entity, EntityKind};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// One fallback-parsed file with its entities already materialized.
pub struct FileGraph {
    pub rel_path: String,
    pub language: &'static str,
    pub file_id: String,
    pub entities: Vec<Entity>,
    pub imports: Vec<ImportDraft>,
    pub relations: Vec<RelationDraft>,
}

pub struct Resolution {
    /// Pseudo-entities standing in for external packages.
    pub package_entities: Vec<Entity>,
    pub edges: Vec<Edge>,
}

pub struct Resolver<'a> {
    repo: &'a str,
    files: &'a [FileGraph],
    by_path: HashMap<&'a str, usize>,
    go_module: Option<&'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new(repo: &'a str, files: &'a [FileGraph], go_module: Option<&'a str>) -> Self {
        let by_path = files
            .iter()
            .enumerate()
            .map(|(idx, file)| (file.rel_path.as_str(), idx))
            .collect();
        Self {
            repo,
            files,
            by_path,
            go_module,
        }
    }

    pub fn resolve(&self) -> Resolution {
        let mut out = Resolution {
            package_entities: Vec::new(),
            edges: Vec::new(),
        };
        let mut seen_edges: HashSet<String> = HashSet::new();
        let mut seen_packages: HashSet<String> = HashSet::new();
        // (importing file, target file, locally bound symbols)
        let mut internal_imports: Vec<(usize, usize, Vec<String>)> = Vec::new();

        for (idx, file) in self.files.iter().enumerate() {
            self.structure_edges(file, &mut seen_edges, &mut out.edges);

            for import in &file.imports {
                match self.resolve_internal(file, &import.module) {
                    Some(target_idx) => {
                        let target = &self.files[target_idx];
                        push_edge(
                            &mut out.edges,
                            &mut seen_edges,
                            Edge {
                                id: ident::edge_id(&file.file_id, &target.file_id, EdgeKind::Imports),
                                repo: self.repo.to_string(),
                                from_id: file.file_id.clone(),
                                to_id: target.file_id.clone(),
                                kind: EdgeKind::Imports,
                                imported_symbols: import.symbols.clone(),
                                is_external: false,
                                package_name: None,
                                boundary_category: None,
                            },
                        );
                        if target_idx != idx {
                            internal_imports.push((idx, target_idx, import.symbols.clone()));
                        }
                    }
                    None => {
                        if is_relative_specifier(&import.module, file.language) {
                            // Unresolved relative import; the target is not in
                            // the scanned set, so there is nothing to link.
                            continue;
                        }
                        let package = boundary::package_name(&import.module, file.language);
                        let category = boundary::classify(&import.module, file.language);
                        let package_id = ident::external_package_id(self.repo, &package);
                        if seen_packages.insert(package_id.clone()) {
                            out.package_entities
                                .push(self.package_entity(&package, &package_id, file.language));
                        }
                        push_edge(
                            &mut out.edges,
                            &mut seen_edges,
                            Edge {
                                id: ident::edge_id(&file.file_id, &package_id, EdgeKind::Imports),
                                repo: self.repo.to_string(),
                                from_id: file.file_id.clone(),
                                to_id: package_id,
                                kind: EdgeKind::Imports,
                                imported_symbols: import.symbols.clone(),
                                is_external: true,
                                package_name: Some(package),
                                boundary_category: Some(category.to_string()),
                            },
                        );
                    }
                }
            }

            self.local_calls(file, &mut seen_edges, &mut out.edges);
            self.relation_edges(idx, file, &mut seen_edges, &mut out.edges);
        }

        for (from_idx, to_idx, symbols) in internal_imports {
            self.imported_calls(
                &self.files[from_idx],
                &self.files[to_idx],
                &symbols,
                &mut seen_edges,
                &mut out.edges,
            );
        }

        out
    }

    /// File contains its top-level entities; nested entities point at their
    /// parent with a member_of edge.
    fn structure_edges(&self, file: &FileGraph, seen: &mut HashSet<String>, edges: &mut Vec<Edge>) {
        let by_name = name_index(file);
        for entity in &file.entities {
            match entity
                .parent
                .as_deref()
                .and_then(|parent| by_name.get(parent))
            {
                Some(parent_idx) => {
                    let parent = &file.entities[*parent_idx];
                    push_edge(
                        edges,
                        seen,
                        self.plain_edge(&entity.id, &parent.id, EdgeKind::MemberOf),
                    );
                    push_edge(
                        edges,
                        seen,
                        self.plain_edge(&parent.id, &entity.id, EdgeKind::Contains),
                    );
                }
                None => {
                    push_edge(
                        edges,
                        seen,
                        self.plain_edge(&file.file_id, &entity.id, EdgeKind::Contains),
                    );
                }
            }
        }
    }

    /// Call sites between entities defined in the same file.
    fn local_calls(&self, file: &FileGraph, seen: &mut HashSet<String>, edges: &mut Vec<Edge>) {
        let targets: Vec<&Entity> = file
            .entities
            .iter()
            .filter(|e| e.kind.is_callable() || e.kind == EntityKind::Class)
            .collect();
        if targets.is_empty() {
            return;
        }
        let Some(call_re) = call_pattern(targets.iter().map(|e| e.name.as_str())) else {
            return;
        };

        for caller in file.entities.iter().filter(|e| e.kind.is_callable()) {
            let Some(body) = caller.body.as_deref() else {
                continue;
            };
            for caps in call_re.captures_iter(body) {
                let name = &caps[1];
                if name == caller.name {
                    continue;
                }
                for target in targets.iter().filter(|t| t.name == name) {
                    if target.id == caller.id {
                        continue;
                    }
                    push_edge(
                        edges,
                        seen,
                        self.plain_edge(&caller.id, &target.id, EdgeKind::Calls),
                    );
                }
            }
        }
    }

    /// Call sites in `from` for symbols imported from `to`.
    fn imported_calls(
        &self,
        from: &FileGraph,
        to: &FileGraph,
        symbols: &[String],
        seen: &mut HashSet<String>,
        edges: &mut Vec<Edge>,
    ) {
        let targets: Vec<&Entity> = to
            .entities
            .iter()
            .filter(|e| {
                symbols.iter().any(|s| *s == e.name)
                    && (e.kind.is_callable() || e.kind == EntityKind::Class)
            })
            .collect();
        if targets.is_empty() {
            return;
        }
        let Some(call_re) = call_pattern(targets.iter().map(|e| e.name.as_str())) else {
            return;
        };

        for caller in from.entities.iter().filter(|e| e.kind.is_callable()) {
            let Some(body) = caller.body.as_deref() else {
                continue;
            };
            for caps in call_re.captures_iter(body) {
                let name = &caps[1];
                for target in targets.iter().filter(|t| t.name == name) {
                    push_edge(
                        edges,
                        seen,
                        self.plain_edge(&caller.id, &target.id, EdgeKind::Calls),
                    );
                }
            }
        }
    }

    /// Materialize extends/implements drafts when the target type is
    /// locatable: same file first, then files the importer pulled in.
    fn relation_edges(
        &self,
        idx: usize,
        file: &FileGraph,
        seen: &mut HashSet<String>,
        edges: &mut Vec<Edge>,
    ) {
        let by_name = name_index(file);
        for relation in &file.relations {
            let Some(from_idx) = by_name.get(relation.from_name.as_str()) else {
                continue;
            };
            let from_id = file.entities[*from_idx].id.clone();

            let to_id = match by_name.get(relation.to_name.as_str()) {
                Some(local_idx) => Some(file.entities[*local_idx].id.clone()),
                None => self.imported_type(idx, file, &relation.to_name),
            };
            let Some(to_id) = to_id else {
                continue;
            };
            push_edge(edges, seen, self.plain_edge(&from_id, &to_id, relation.kind));
        }
    }

    fn imported_type(&self, idx: usize, file: &FileGraph, name: &str) -> Option<String> {
        for import in &file.imports {
            if !import.symbols.iter().any(|s| s == name) {
                continue;
            }
            let target_idx = self.resolve_internal(file, &import.module)?;
            if target_idx == idx {
                continue;
            }
            let target = &self.files[target_idx];
            return target
                .entities
                .iter()
                .find(|e| e.name == name && !e.kind.is_callable())
                .map(|e| e.id.clone());
        }
        None
    }

    fn plain_edge(&self, from_id: &str, to_id: &str, kind: EdgeKind) -> Edge {
        Edge {
            id: ident::edge_id(from_id, to_id, kind),
            repo: self.repo.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            kind,
            imported_symbols: Vec::new(),
            is_external: false,
            package_name: None,
            boundary_category: None,
        }
    }

    fn package_entity(&self, package: &str, id: &str, language: &'static str) -> Entity {
        Entity {
            id: id.to_string(),
            repo: self.repo.to_string(),
            kind: EntityKind::Module,
            name: package.to_string(),
            file_path: package.to_string(),
            start_line: 1,
            end_line: 1,
            signature: None,
            language: language.to_string(),
            exported: true,
            doc: None,
            parent: None,
            body: None,
            complexity: 1,
        }
    }

    /// Map an import specifier to a scanned file, per the importing
    /// language's module conventions. None means external (or unresolvable).
    fn resolve_internal(&self, file: &FileGraph, module: &str) -> Option<usize> {
        match file.language {
            "typescript" | "tsx" | "javascript" => self.resolve_ts(file, module),
            "python" => self.resolve_python(file, module),
            "go" => self.resolve_go(module),
            "rust" => self.resolve_rust(file, module),
            "java" => self.resolve_java(module),
            _ => None,
        }
    }

    fn resolve_ts(&self, file: &FileGraph, module: &str) -> Option<usize> {
        if !module.starts_with('.') {
            return None;
        }
        let base = crate::util::join_rel(crate::util::parent_dir(&file.rel_path), module)?;
        const SUFFIXES: &[&str] = &[
            "", ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", "/index.ts", "/index.tsx",
            "/index.js",
        ];
        for suffix in SUFFIXES {
            let candidate = format!("{base}{suffix}");
            if let Some(idx) = self.by_path.get(candidate.as_str()) {
                return Some(*idx);
            }
        }
        None
    }

    fn resolve_python(&self, file: &FileGraph, module: &str) -> Option<usize> {
        if let Some(stripped) = module.strip_prefix('.') {
            // One leading dot is the current package; each further dot
            // climbs one level.
            let mut dir = crate::util::parent_dir(&file.rel_path).to_string();
            let mut rest = stripped;
            while let Some(more) = rest.strip_prefix('.') {
                dir = crate::util::parent_dir(&dir).to_string();
                rest = more;
            }
            let base = if rest.is_empty() {
                dir
            } else if dir.is_empty() {
                rest.replace('.', "/")
            } else {
                format!("{dir}/{}", rest.replace('.', "/"))
            };
            return self.python_candidates(&base);
        }
        let base = module.replace('.', "/");
        self.python_candidates(&base)
            .or_else(|| self.python_candidates(&format!("src/{base}")))
    }

    fn python_candidates(&self, base: &str) -> Option<usize> {
        for candidate in [format!("{base}.py"), format!("{base}/__init__.py")] {
            if let Some(idx) = self.by_path.get(candidate.as_str()) {
                return Some(*idx);
            }
        }
        None
    }

    fn resolve_go(&self, module: &str) -> Option<usize> {
        let prefix = self.go_module?;
        let rest = module.strip_prefix(prefix)?.trim_start_matches('/');
        // A Go import names a package directory; link to its lowest file.
        self.files
            .iter()
            .enumerate()
            .filter(|(_, file)| {
                file.language == "go" && crate::util::parent_dir(&file.rel_path) == rest
            })
            .min_by(|(_, a), (_, b)| a.rel_path.cmp(&b.rel_path))
            .map(|(idx, _)| idx)
    }

    fn resolve_rust(&self, file: &FileGraph, module: &str) -> Option<usize> {
        let base = if let Some(rest) = module.strip_prefix("crate::") {
            format!("src/{}", rest.replace("::", "/"))
        } else if let Some(rest) = module.strip_prefix("super::") {
            let dir = crate::util::parent_dir(crate::util::parent_dir(&file.rel_path));
            crate::util::join_rel(dir, &rest.replace("::", "/"))?
        } else if let Some(rest) = module.strip_prefix("self::") {
            let dir = crate::util::parent_dir(&file.rel_path);
            crate::util::join_rel(dir, &rest.replace("::", "/"))?
        } else {
            return None;
        };
        for candidate in [format!("{base}.rs"), format!("{base}/mod.rs")] {
            if let Some(idx) = self.by_path.get(candidate.as_str()) {
                return Some(*idx);
            }
        }
        None
    }

    fn resolve_java(&self, module: &str) -> Option<usize> {
        let suffix = format!("{}.java", module.replace('.', "/"));
        self.files
            .iter()
            .enumerate()
            .find(|(_, file)| {
                file.rel_path == suffix || file.rel_path.ends_with(&format!("/{suffix}"))
            })
            .map(|(idx, _)| idx)
    }
}

fn name_index(file: &FileGraph) -> HashMap<&str, usize> {
    let mut map = HashMap::new();
    for (idx, entity) in file.entities.iter().enumerate() {
        map.entry(entity.name.as_str()).or_insert(idx);
    }
    map
}

fn is_relative_specifier(module: &str, language: &str) -> bool {
    match language {
        "typescript" | "tsx" | "javascript" | "python" => module.starts_with('.'),
        "rust" => {
            module.starts_with("crate::")
                || module.starts_with("super::")
                || module.starts_with("self::")
                || module == "crate"
        }
        _ => false,
    }
}

/// One alternation matching `name(` or `new Name(` for any of the names.
fn call_pattern<'n>(names: impl Iterator<Item = &'n str>) -> Option<Regex> {
    let mut alts: Vec<String> = names.map(|n| regex::escape(n)).collect();
    alts.sort();
    alts.dedup();
    if alts.is_empty() {
        return None;
    }
    let joined = alts.join("|");
    Regex::new(&format!(r"\b(?:new\s+)?({joined})\s*\(")).ok()
}

fn push_edge(edges: &mut Vec<Edge>, seen: &mut HashSet<String>, edge: Edge) {
    if seen.insert(edge.id.clone()) {
        edges.push(edge);
    }
}
