use crate::config::Config;
use crate::model::{Edge, EdgeKind, Entity, EntityKind, RepoOverview, VersionCheck};
use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod migrations;

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(30))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}

/// Graph store. One serialized write connection plus a pool of readers.
pub struct Db {
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Pool<SqliteConnectionManager>,
}

impl Db {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }

        let config = Config::get();

        let write_conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db at {}", db_path.display()))?;
        write_conn.busy_timeout(Duration::from_secs(30))?;
        write_conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        migrations::migrate(&write_conn)?;

        let manager = SqliteConnectionManager::file(db_path);
        let read_pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.pool_min_idle))
            .connection_timeout(Duration::from_secs(30))
            .connection_customizer(Box::new(ConnectionCustomizer))
            .build(manager)
            .with_context(|| "create connection pool")?;

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    pub fn read_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.read_pool
            .get()
            .with_context(|| "get read connection from pool")
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.write_conn.lock().unwrap()
    }

    // ---- shadow-versioned runs ------------------------------------------

    /// Record the start of an index run under its version tag.
    pub fn begin_run(&self, repo: &str, version: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO runs (version, repo, started) VALUES (?, ?, ?)",
            params![version, repo, crate::util::now_unix()],
        )?;
        Ok(())
    }

    /// The version tag currently published for a repo, if any run finished.
    pub fn current_version(&self, repo: &str) -> Result<Option<String>> {
        self.read_conn()?
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                params![version_key(repo)],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Publish a finished run: stamp the runs row, point the repo at the new
    /// tag, and delete rows still carrying the previous tag. Rows touched by
    /// this run were re-stamped on upsert, so whatever still holds the old
    /// tag is an orphan (deleted or renamed since the last run).
    pub fn finalize_run(
        &self,
        repo: &str,
        version: &str,
        entities: usize,
        edges: usize,
    ) -> Result<()> {
        let previous = self.current_version(repo)?;
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE runs SET finished = ?, entities = ?, edges = ? WHERE version = ?",
            params![
                crate::util::now_unix(),
                entities as i64,
                edges as i64,
                version
            ],
        )?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![version_key(repo), version],
        )?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![
                format!("last_indexed:{repo}"),
                crate::util::now_unix().to_string()
            ],
        )?;
        if let Some(previous) = previous {
            if previous != version {
                tx.execute(
                    "DELETE FROM entities WHERE repo = ? AND version = ?",
                    params![repo, previous],
                )?;
                tx.execute(
                    "DELETE FROM edges WHERE repo = ? AND version = ?",
                    params![repo, previous],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ---- bulk upserts ----------------------------------------------------

    /// Upsert entities in batched transactions, re-stamping survivors with
    /// the new version tag.
    pub fn upsert_entities(&self, entities: &[Entity], version: &str) -> Result<usize> {
        let batch = Config::get().batch_size;
        let mut written = 0;
        for chunk in entities.chunks(batch.max(1)) {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO entities
                     (id, repo, kind, name, file_path, start_line, end_line, signature,
                      language, exported, doc, parent, body, complexity, version)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        start_line = excluded.start_line,
                        end_line = excluded.end_line,
                        exported = excluded.exported,
                        doc = excluded.doc,
                        parent = excluded.parent,
                        body = excluded.body,
                        complexity = excluded.complexity,
                        version = excluded.version",
                )?;
                for entity in chunk {
                    stmt.execute(params![
                        entity.id,
                        entity.repo,
                        entity.kind.as_str(),
                        entity.name,
                        entity.file_path,
                        entity.start_line,
                        entity.end_line,
                        entity.signature.as_deref(),
                        entity.language,
                        entity.exported as i64,
                        entity.doc.as_deref(),
                        entity.parent.as_deref(),
                        entity.body.as_deref(),
                        entity.complexity,
                        version,
                    ])?;
                    written += 1;
                }
            }
            tx.commit()?;
        }
        Ok(written)
    }

    pub fn upsert_edges(&self, edges: &[Edge], version: &str) -> Result<usize> {
        let batch = Config::get().batch_size;
        let mut written = 0;
        for chunk in edges.chunks(batch.max(1)) {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO edges
                     (id, repo, from_id, to_id, kind, imported_symbols, is_external,
                      package_name, boundary_category, version)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        imported_symbols = excluded.imported_symbols,
                        is_external = excluded.is_external,
                        package_name = excluded.package_name,
                        boundary_category = excluded.boundary_category,
                        version = excluded.version",
                )?;
                for edge in chunk {
                    let symbols = if edge.imported_symbols.is_empty() {
                        None
                    } else {
                        Some(serde_json::to_string(&edge.imported_symbols)?)
                    };
                    stmt.execute(params![
                        edge.id,
                        edge.repo,
                        edge.from_id,
                        edge.to_id,
                        edge.kind.as_str(),
                        symbols.as_deref(),
                        edge.is_external as i64,
                        edge.package_name.as_deref(),
                        edge.boundary_category.as_deref(),
                        version,
                    ])?;
                    written += 1;
                }
            }
            tx.commit()?;
        }
        Ok(written)
    }

    // ---- reads -----------------------------------------------------------

    pub fn overview(&self, repo: &str) -> Result<RepoOverview> {
        let version = self.current_version(repo)?;
        let last_indexed = self.get_meta_i64(&format!("last_indexed:{repo}"))?;
        let conn = self.read_conn()?;
        let (entities, edges) = match version.as_deref() {
            Some(version) => {
                let entities: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entities WHERE repo = ? AND version = ?",
                    params![repo, version],
                    |row| row.get(0),
                )?;
                let edges: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM edges WHERE repo = ? AND version = ?",
                    params![repo, version],
                    |row| row.get(0),
                )?;
                (entities, edges)
            }
            None => (0, 0),
        };
        Ok(RepoOverview {
            repo: repo.to_string(),
            entities,
            edges,
            version,
            last_indexed,
        })
    }

    /// Count rows whose tag differs from the published one. Non-zero counts
    /// mean finalization left orphans behind.
    pub fn check_version(&self, repo: &str) -> Result<VersionCheck> {
        let version = self.current_version(repo)?;
        let conn = self.read_conn()?;
        let (stale_entities, stale_edges) = match version.as_deref() {
            Some(version) => {
                let stale_entities: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entities WHERE repo = ? AND version != ?",
                    params![repo, version],
                    |row| row.get(0),
                )?;
                let stale_edges: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM edges WHERE repo = ? AND version != ?",
                    params![repo, version],
                    |row| row.get(0),
                )?;
                (stale_entities, stale_edges)
            }
            None => (0, 0),
        };
        Ok(VersionCheck {
            repo: repo.to_string(),
            version,
            stale_entities,
            stale_edges,
        })
    }

    pub fn count_entities(&self, repo: &str) -> Result<i64> {
        self.read_conn()?
            .query_row(
                "SELECT COUNT(*) FROM entities WHERE repo = ?",
                params![repo],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn count_edges(&self, repo: &str) -> Result<i64> {
        self.read_conn()?
            .query_row(
                "SELECT COUNT(*) FROM edges WHERE repo = ?",
                params![repo],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn entities_for_file(&self, repo: &str, file_path: &str) -> Result<Vec<Entity>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, repo, kind, name, file_path, start_line, end_line, signature,
                    language, exported, doc, parent, body, complexity
             FROM entities
             WHERE repo = ? AND file_path = ?
             ORDER BY start_line",
        )?;
        let rows = stmt.query_map(params![repo, file_path], entity_from_row)?;
        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }

    pub fn edges_for_entity(&self, id: &str) -> Result<Vec<Edge>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, repo, from_id, to_id, kind, imported_symbols, is_external,
                    package_name, boundary_category
             FROM edges
             WHERE from_id = ? OR to_id = ?
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id, id], edge_from_row)?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(row?);
        }
        Ok(edges)
    }

    fn get_meta_i64(&self, key: &str) -> Result<Option<i64>> {
        let value: Option<String> = self
            .read_conn()?
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()))
    }
}

fn version_key(repo: &str) -> String {
    format!("version:{repo}")
}

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let kind: String = row.get(2)?;
    Ok(Entity {
        id: row.get(0)?,
        repo: row.get(1)?,
        kind: EntityKind::from_str(&kind).unwrap_or(EntityKind::File),
        name: row.get(3)?,
        file_path: row.get(4)?,
        start_line: row.get(5)?,
        end_line: row.get(6)?,
        signature: row.get(7)?,
        language: row.get(8)?,
        exported: row.get::<_, i64>(9)? != 0,
        doc: row.get(10)?,
        parent: row.get(11)?,
        body: row.get(12)?,
        complexity: row.get(13)?,
    })
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<Edge> {
    let kind: String = row.get(4)?;
    let symbols: Option<String> = row.get(5)?;
    Ok(Edge {
        id: row.get(0)?,
        repo: row.get(1)?,
        from_id: row.get(2)?,
        to_id: row.get(3)?,
        kind: EdgeKind::from_str(&kind).unwrap_or(EdgeKind::References),
        imported_symbols: symbols
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default(),
        is_external: row.get::<_, i64>(6)? != 0,
        package_name: row.get(7)?,
        boundary_category: row.get(8)?,
    })
}

/// Default database location inside a repo checkout.
pub fn default_db_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".polygraph").join("graph.db")
}
