use crate::model::{WorkspaceInfo, WorkspaceKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Detect monorepo sub-roots by inspecting workspace-manager manifests.
///
/// Managers are checked in a fixed priority order so detection is stable no
/// matter which manifests coexist: pnpm beats lerna beats the generic
/// `workspaces` field in package.json, which beats Cargo and go.work.
/// Unresolvable or absent configuration yields the single-root default.
pub fn detect_workspace_roots(repo_root: &Path) -> WorkspaceInfo {
    if let Some(roots) = pnpm_roots(repo_root) {
        return info(WorkspaceKind::Pnpm, roots);
    }
    if let Some(roots) = lerna_roots(repo_root) {
        return info(WorkspaceKind::Lerna, roots);
    }
    if let Some(roots) = package_json_roots(repo_root) {
        return info(WorkspaceKind::Npm, roots);
    }
    if let Some(roots) = cargo_roots(repo_root) {
        return info(WorkspaceKind::Cargo, roots);
    }
    if let Some(roots) = go_work_roots(repo_root) {
        return info(WorkspaceKind::GoWork, roots);
    }
    WorkspaceInfo::single()
}

fn info(kind: WorkspaceKind, roots: Vec<String>) -> WorkspaceInfo {
    if roots.is_empty() {
        return WorkspaceInfo::single();
    }
    WorkspaceInfo { roots, kind }
}

#[derive(Deserialize)]
struct PnpmWorkspace {
    packages: Option<Vec<String>>,
}

fn pnpm_roots(repo_root: &Path) -> Option<Vec<String>> {
    let raw = fs::read_to_string(repo_root.join("pnpm-workspace.yaml")).ok()?;
    let parsed: PnpmWorkspace = serde_yaml_ng::from_str(&raw).ok()?;
    Some(resolve_globs(repo_root, &parsed.packages?))
}

#[derive(Deserialize)]
struct LernaConfig {
    packages: Option<Vec<String>>,
}

fn lerna_roots(repo_root: &Path) -> Option<Vec<String>> {
    let raw = fs::read_to_string(repo_root.join("lerna.json")).ok()?;
    let parsed: LernaConfig = serde_json::from_str(&raw).ok()?;
    let patterns = parsed
        .packages
        .unwrap_or_else(|| vec!["packages/*".to_string()]);
    Some(resolve_globs(repo_root, &patterns))
}

#[derive(Deserialize)]
struct PackageJson {
    workspaces: Option<Workspaces>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Workspaces {
    Patterns(Vec<String>),
    Nested { packages: Vec<String> },
}

fn package_json_roots(repo_root: &Path) -> Option<Vec<String>> {
    let raw = fs::read_to_string(repo_root.join("package.json")).ok()?;
    let parsed: PackageJson = serde_json::from_str(&raw).ok()?;
    let patterns = match parsed.workspaces? {
        Workspaces::Patterns(patterns) => patterns,
        Workspaces::Nested { packages } => packages,
    };
    Some(resolve_globs(repo_root, &patterns))
}

#[derive(Deserialize)]
struct CargoManifest {
    workspace: Option<CargoWorkspace>,
}

#[derive(Deserialize)]
struct CargoWorkspace {
    members: Option<Vec<String>>,
}

fn cargo_roots(repo_root: &Path) -> Option<Vec<String>> {
    let raw = fs::read_to_string(repo_root.join("Cargo.toml")).ok()?;
    let parsed: CargoManifest = toml::from_str(&raw).ok()?;
    let members = parsed.workspace?.members?;
    Some(resolve_globs(repo_root, &members))
}

fn go_work_roots(repo_root: &Path) -> Option<Vec<String>> {
    let raw = fs::read_to_string(repo_root.join("go.work")).ok()?;
    let mut roots = Vec::new();
    let mut in_block = false;
    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with("use (") {
            in_block = true;
            continue;
        }
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            push_root(&mut roots, line);
        } else if let Some(rest) = line.strip_prefix("use ") {
            push_root(&mut roots, rest.trim());
        }
    }
    Some(roots)
}

fn push_root(roots: &mut Vec<String>, raw: &str) {
    let cleaned = raw.trim().trim_start_matches("./");
    if cleaned.is_empty() || cleaned.starts_with("//") {
        return;
    }
    roots.push(cleaned.to_string());
}

/// Resolve workspace patterns to concrete directories. Only single-level
/// globs (`packages/*`) are expanded; literal paths pass through when the
/// directory exists.
fn resolve_globs(repo_root: &Path, patterns: &[String]) -> Vec<String> {
    let mut roots = Vec::new();
    for pattern in patterns {
        let pattern = pattern.trim().trim_start_matches("./");
        if pattern.is_empty() || pattern.starts_with('!') {
            continue;
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            let Ok(entries) = fs::read_dir(repo_root.join(prefix)) else {
                continue;
            };
            for entry in entries.flatten() {
                if !entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    if name.starts_with('.') {
                        continue;
                    }
                    roots.push(format!("{prefix}/{name}"));
                }
            }
        } else if !pattern.contains('*') && repo_root.join(pattern).is_dir() {
            roots.push(pattern.to_string());
        }
    }
    roots.sort();
    roots.dedup();
    roots
}
