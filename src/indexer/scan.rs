use crate::model::LanguageDetection;
use crate::util;
use anyhow::Result;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub extension: String,
    pub language: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

static LANGUAGE_SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        name: "typescript",
        extensions: &["ts", "mts", "cts"],
    },
    LanguageSpec {
        name: "tsx",
        extensions: &["tsx"],
    },
    LanguageSpec {
        name: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
    },
    LanguageSpec {
        name: "python",
        extensions: &["py", "pyi"],
    },
    LanguageSpec {
        name: "go",
        extensions: &["go"],
    },
    LanguageSpec {
        name: "rust",
        extensions: &["rs"],
    },
    LanguageSpec {
        name: "java",
        extensions: &["java"],
    },
];

/// Directories never worth indexing, applied even when no ignore file
/// mentions them.
static ALWAYS_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".polygraph",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    ".next",
    ".turbo",
    ".cache",
];

/// Enumerate all non-ignored files under `root`. A non-existent root yields
/// an empty result rather than an error; if the ignore-aware walker fails,
/// a plain directory walk takes over.
pub fn scan_repo(root: &Path, options: ScanOptions) -> Result<Vec<ScannedFile>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_always_ignored(entry.file_name()))
        .build();

    let mut walk_failed = false;
    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                eprintln!("polygraph: walk error: {err}");
                walk_failed = true;
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(file) = scanned_file(root, entry.path()) {
            files.push(file);
        }
    }
    if files.is_empty() && walk_failed {
        plain_walk(root, root, &mut files);
    }
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn plain_walk(root: &Path, dir: &Path, files: &mut Vec<ScannedFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        if is_always_ignored(&name) {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            plain_walk(root, &path, files);
        } else if file_type.is_file() {
            if let Some(file) = scanned_file(root, &path) {
                files.push(file);
            }
        }
    }
}

fn scanned_file(root: &Path, path: &Path) -> Option<ScannedFile> {
    let rel_path = util::normalize_rel_path(root, path).ok()?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_string();
    let language = language_for_extension(&extension);
    Some(ScannedFile {
        rel_path,
        abs_path: path.to_path_buf(),
        extension,
        language,
    })
}

fn is_always_ignored(name: &OsStr) -> bool {
    ALWAYS_IGNORED_DIRS
        .iter()
        .any(|dir| name == OsStr::new(dir))
}

pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    for spec in LANGUAGE_SPECS {
        if spec.extensions.iter().any(|candidate| *candidate == ext) {
            return Some(spec.name);
        }
    }
    None
}

pub fn language_for_rel_path(rel_path: &str) -> Option<&'static str> {
    let ext = rel_path.rsplit('.').next()?;
    language_for_extension(ext)
}

/// Group scanned files by language, ranked by file count. Used as an
/// ordering hint only, never as a filter.
pub fn detect_languages(files: &[ScannedFile]) -> Vec<LanguageDetection> {
    let mut counts: HashMap<&'static str, (usize, Vec<String>)> = HashMap::new();
    for file in files {
        let Some(language) = file.language else {
            continue;
        };
        let entry = counts.entry(language).or_default();
        entry.0 += 1;
        if !entry.1.contains(&file.extension) {
            entry.1.push(file.extension.clone());
        }
    }
    let mut detections: Vec<LanguageDetection> = counts
        .into_iter()
        .map(|(language, (file_count, mut extensions))| {
            extensions.sort();
            LanguageDetection {
                language: language.to_string(),
                extensions,
                file_count,
            }
        })
        .collect();
    detections.sort_by(|a, b| {
        b.file_count
            .cmp(&a.file_count)
            .then_with(|| a.language.cmp(&b.language))
    });
    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection_by_extension() {
        assert_eq!(language_for_extension("ts"), Some("typescript"));
        assert_eq!(language_for_extension("py"), Some("python"));
        assert_eq!(language_for_extension("zig"), None);
        assert_eq!(language_for_rel_path("src/app.tsx"), Some("tsx"));
    }

    #[test]
    fn missing_root_scans_empty() {
        let files = scan_repo(Path::new("/nonexistent/surely/missing"), ScanOptions::default())
            .unwrap();
        assert!(files.is_empty());
    }
}
