use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub const SCHEMA_VERSION: i64 = 2;

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        BEGIN;
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS runs (
            version TEXT PRIMARY KEY,
            repo TEXT NOT NULL,
            started INTEGER NOT NULL,
            finished INTEGER,
            entities INTEGER,
            edges INTEGER
        );

        CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            repo TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            signature TEXT,
            language TEXT NOT NULL,
            exported INTEGER NOT NULL DEFAULT 0,
            doc TEXT,
            parent TEXT,
            body TEXT,
            complexity INTEGER NOT NULL DEFAULT 1,
            version TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entities_repo ON entities(repo);
        CREATE INDEX IF NOT EXISTS idx_entities_version ON entities(version);
        CREATE INDEX IF NOT EXISTS idx_entities_file ON entities(file_path);
        CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);

        CREATE TABLE IF NOT EXISTS edges (
            id TEXT PRIMARY KEY,
            repo TEXT NOT NULL,
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            imported_symbols TEXT,
            is_external INTEGER NOT NULL DEFAULT 0,
            package_name TEXT,
            boundary_category TEXT,
            version TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_edges_repo ON edges(repo);
        CREATE INDEX IF NOT EXISTS idx_edges_version ON edges(version);
        CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id);
        CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);
        COMMIT;
        ",
    )?;

    let existing: i64 = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| {
                row.get::<_, String>(0)
                    .map(|v| v.parse::<i64>().unwrap_or(0))
            },
        )
        .optional()?
        .unwrap_or(0);

    if existing < 2 {
        if !has_column(conn, "edges", "boundary_category")? {
            conn.execute("ALTER TABLE edges ADD COLUMN boundary_category TEXT", [])?;
        }
    }

    if existing < SCHEMA_VERSION {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES ('schema_version', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [SCHEMA_VERSION.to_string()],
        )?;
    }

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(true);
        }
    }
    Ok(false)
}
