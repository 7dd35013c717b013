//! Filesystem ingestion source.
//!
//! Walks a directory, keeps files matching the include globs and not the
//! exclude globs, and turns each into a [`NewDocument`]:
//!
//! - id: path relative to the root, with `/` separators
//! - title: first Markdown `#` heading, else the file stem
//! - metadata: `source_path` and `tags` (the parent directory names)
//!
//! `.git`, `target`, and `node_modules` are always excluded. Files that are
//! not valid UTF-8 are skipped with a warning.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ragrank_core::NewDocument;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::IngestConfig;

pub fn scan_directory(root: &Path, config: &IngestConfig) -> Result<Vec<NewDocument>> {
    if !root.exists() {
        bail!("Ingest root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let body = match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        documents.push(file_to_document(relative, &rel_str, body));
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(documents)
}

/// A single file as a [`NewDocument`], outside of any directory scan.
pub fn read_file(path: &Path) -> Result<NewDocument> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(file_to_document(Path::new(&name), &name, body))
}

fn file_to_document(relative: &Path, rel_str: &str, body: String) -> NewDocument {
    let title = markdown_title(&body).unwrap_or_else(|| {
        relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| rel_str.to_string())
    });

    let tags: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    NewDocument::new(title, body)
        .with_id(rel_str)
        .with_tags(tags)
        .with_metadata("source_path", serde_json::Value::String(rel_str.to_string()))
}

/// Text of the first `# ` heading, if any.
fn markdown_title(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {pattern}"))?);
    }
    Ok(builder.build()?)
}
