use anyhow::Result;
use clap::Parser;
use polygraph::{cli, db, indexer};
use serde_json::json;
use std::path::{Path, PathBuf};

fn repo_name(repo: &Path, name: Option<String>) -> String {
    if let Some(name) = name {
        return name;
    }
    repo.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "repo".to_string())
}

fn open_db(repo: &Path, db_path: Option<PathBuf>) -> Result<db::Db> {
    let path = db_path.unwrap_or_else(|| db::default_db_path(repo));
    db::Db::new(&path)
}

fn main() -> Result<()> {
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Index {
            repo,
            db,
            name,
            no_ignore,
        } => {
            let name = repo_name(&repo, name);
            let database = open_db(&repo, db)?;
            let indexer = indexer::Indexer::new(&database);
            let stats = indexer.index_repo(
                &repo,
                &name,
                &indexer::IndexOptions { no_ignore },
                &indexer::StderrProgress,
            )?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        cli::Command::Scan { repo, no_ignore } => {
            let files = indexer::scan::scan_repo(
                &repo,
                indexer::scan::ScanOptions::new(no_ignore),
            )?;
            let languages = indexer::scan::detect_languages(&files);
            let paths: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "files": paths,
                    "languages": languages,
                }))?
            );
            Ok(())
        }
        cli::Command::Workspace { repo } => {
            let info = indexer::workspace::detect_workspace_roots(&repo);
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        cli::Command::Overview { repo, db, name } => {
            let name = repo_name(&repo, name);
            let database = open_db(&repo, db)?;
            let overview = database.overview(&name)?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
            Ok(())
        }
        cli::Command::Check { repo, db, name } => {
            let name = repo_name(&repo, name);
            let database = open_db(&repo, db)?;
            let check = database.check_version(&name)?;
            println!("{}", serde_json::to_string_pretty(&check)?);
            if check.stale_entities > 0 || check.stale_edges > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
