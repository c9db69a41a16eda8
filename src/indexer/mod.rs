//! The indexing pipeline: scan, precise decode per workspace root, fallback
//! structural parse for whatever the precise pass did not cover, cross-file
//! resolution, then a shadow-versioned bulk write.

use crate::config::Config;
use crate::db::Db;
use crate::ident;
use crate::model::{Entity, EntityKind, IndexStats};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

pub mod boundary;
pub mod generic;
pub mod go;
pub mod java;
pub mod plugin;
pub mod python;
pub mod resolve;
pub mod rust_lang;
pub mod scan;
pub mod typescript;
pub mod workspace;

use plugin::{ParseContext, PluginRegistry};
use resolve::{FileGraph, Resolver};
use scan::{ScanOptions, ScannedFile};

/// Heartbeat sink for long runs. The pipeline reports at the configured
/// cadence so callers can prove liveness on large repos.
pub trait Progress {
    fn heartbeat(&self, processed: usize, total: usize);
}

/// Default sink: a stderr line per heartbeat.
pub struct StderrProgress;

impl Progress for StderrProgress {
    fn heartbeat(&self, processed: usize, total: usize) {
        eprintln!("polygraph: parsed {processed}/{total} files");
    }
}

pub struct SilentProgress;

impl Progress for SilentProgress {
    fn heartbeat(&self, _processed: usize, _total: usize) {}
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub no_ignore: bool,
}

pub struct Indexer<'a> {
    db: &'a Db,
    registry: PluginRegistry,
}

impl<'a> Indexer<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self {
            db,
            registry: PluginRegistry::with_defaults(),
        }
    }

    /// Run a full index of `repo_root` under a fresh version tag. The
    /// previous graph stays readable until the new one is finalized.
    pub fn index_repo(
        &self,
        repo_root: &Path,
        repo: &str,
        options: &IndexOptions,
        progress: &dyn Progress,
    ) -> Result<IndexStats> {
        let start = Instant::now();
        let version = new_version_tag();
        self.db
            .begin_run(repo, &version)
            .with_context(|| format!("begin run {version}"))?;

        let files = scan::scan_repo(repo_root, ScanOptions::new(options.no_ignore))?;
        let info = workspace::detect_workspace_roots(repo_root);
        eprintln!(
            "polygraph: {repo}: {} files, {} workspace root(s)",
            files.len(),
            info.roots.len()
        );

        let mut entities: Vec<Entity> = Vec::new();
        let mut edges = Vec::new();
        let mut covered: HashSet<String> = HashSet::new();

        // Precise pass, once per workspace root per plugin. A failed root
        // falls back to structural parsing of its files.
        for root in &info.roots {
            let (abs_root, prefix) = if root == "." {
                (repo_root.to_path_buf(), String::new())
            } else {
                (repo_root.join(root), format!("{root}/"))
            };
            for plugin in self.registry.plugins() {
                match plugin.precise_index(&abs_root, &prefix, repo) {
                    Ok(output) => {
                        entities.extend(output.entities);
                        edges.extend(output.edges);
                        covered.extend(output.covered_files);
                    }
                    Err(err) => {
                        eprintln!(
                            "polygraph: precise index failed for {root} ({}): {err}",
                            plugin.language()
                        );
                    }
                }
            }
        }
        let precise_files = covered.len();

        // Fallback pass over everything the precise decode did not claim.
        let config = Config::get();
        let max_bytes = config.max_file_mb * 1024 * 1024;
        let go_module = read_go_module(repo_root);
        let mut graphs: Vec<FileGraph> = Vec::new();
        let mut fallback_files = 0usize;

        for (idx, file) in files.iter().enumerate() {
            if config.heartbeat_every > 0 && idx > 0 && idx % config.heartbeat_every == 0 {
                progress.heartbeat(idx, files.len());
            }
            if covered.contains(&file.rel_path) {
                continue;
            }
            match self.parse_one(repo, file, max_bytes) {
                Ok(Some(graph)) => {
                    if file.language.is_some() {
                        fallback_files += 1;
                    }
                    graphs.push(graph);
                }
                Ok(None) => {}
                Err(err) => {
                    eprintln!("polygraph: skipping {}: {err}", file.rel_path);
                }
            }
        }
        progress.heartbeat(files.len(), files.len());

        let resolution = Resolver::new(repo, &graphs, go_module.as_deref()).resolve();
        for graph in graphs {
            entities.push(file_entity(repo, &graph));
            entities.extend(graph.entities);
        }
        entities.extend(resolution.package_entities);
        edges.extend(resolution.edges);

        // Distinct symbols can share an id when a file declares the same
        // name twice with one signature; counts must match stored rows.
        dedup_by_id(&mut entities, |e| e.id.clone());
        dedup_by_id(&mut edges, |e| e.id.clone());

        self.db.upsert_entities(&entities, &version)?;
        self.db.upsert_edges(&edges, &version)?;
        self.db
            .finalize_run(repo, &version, entities.len(), edges.len())
            .with_context(|| format!("finalize run {version}"))?;

        Ok(IndexStats {
            scanned: files.len(),
            precise_files,
            fallback_files,
            entities: entities.len(),
            edges: edges.len(),
            version,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Parse one file into a FileGraph. None means intentionally skipped
    /// (oversized or unreadable as text).
    fn parse_one(
        &self,
        repo: &str,
        file: &ScannedFile,
        max_bytes: u64,
    ) -> Result<Option<FileGraph>> {
        let meta = std::fs::metadata(&file.abs_path)
            .with_context(|| format!("stat {}", file.abs_path.display()))?;
        if meta.len() > max_bytes {
            eprintln!(
                "polygraph: {} exceeds size limit ({} bytes), skipped",
                file.rel_path,
                meta.len()
            );
            return Ok(None);
        }
        let Ok(source) = std::fs::read_to_string(&file.abs_path) else {
            // Binary or non-utf8; nothing to parse.
            return Ok(None);
        };

        let plugin = self.registry.for_extension(&file.extension);
        let language = file.language.unwrap_or_else(|| plugin.language());
        let parsed = plugin.parse_file(&ParseContext {
            repo,
            rel_path: &file.rel_path,
            source: &source,
        });

        let entities = parsed
            .entities
            .into_iter()
            .map(|e| Entity {
                id: ident::entity_id(repo, &file.rel_path, e.kind, &e.name, e.signature.as_deref()),
                repo: repo.to_string(),
                kind: e.kind,
                name: e.name,
                file_path: file.rel_path.clone(),
                start_line: e.start_line,
                end_line: e.end_line,
                signature: e.signature,
                language: language.to_string(),
                exported: e.exported,
                doc: e.doc,
                parent: e.parent,
                body: e.body,
                complexity: e.complexity,
            })
            .collect();

        Ok(Some(FileGraph {
            file_id: ident::entity_id(
                repo,
                &file.rel_path,
                EntityKind::File,
                &file.rel_path,
                None,
            ),
            rel_path: file.rel_path.clone(),
            language,
            entities,
            imports: parsed.imports,
            relations: parsed.relations,
        }))
    }
}

fn file_entity(repo: &str, graph: &FileGraph) -> Entity {
    let end_line = graph
        .entities
        .iter()
        .map(|e| e.end_line)
        .max()
        .unwrap_or(1);
    Entity {
        id: graph.file_id.clone(),
        repo: repo.to_string(),
        kind: EntityKind::File,
        name: graph.rel_path.clone(),
        file_path: graph.rel_path.clone(),
        start_line: 1,
        end_line,
        signature: None,
        language: graph.language.to_string(),
        exported: true,
        doc: None,
        parent: None,
        body: None,
        complexity: 1,
    }
}

fn dedup_by_id<T>(items: &mut Vec<T>, id_of: impl Fn(&T) -> String) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(id_of(item)));
}

/// Version tags only need to be unique per database; wall-clock nanos are
/// plenty and sort chronologically.
fn new_version_tag() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("v{nanos:x}")
}

fn read_go_module(repo_root: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(repo_root.join("go.mod")).ok()?;
    raw.lines().find_map(|line| {
        line.trim()
            .strip_prefix("module ")
            .map(|module| module.trim().to_string())
    })
}
