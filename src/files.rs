use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub skip_hidden: bool,
    pub exclude: Vec<String>,
}

/// Lists every non-directory entry under `root` in file-name order.
///
/// Paths keep the form `root` was given in, so a relative root yields
/// relative paths. Any unreadable entry aborts the whole walk.
pub fn collect_files(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>> {
    let exclude = build_exclude_globs(&options.exclude)?;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(options.skip_hidden && is_hidden(entry)));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.into_path();
        if should_skip(root, &path, exclude.as_ref()) {
            continue;
        }
        ensure_listable(&path)?;
        files.push(path);
    }

    Ok(files)
}

fn ensure_listable(path: &Path) -> Result<()> {
    let Some(text) = path.to_str() else {
        bail!(
            "{} is not valid UTF-8 and cannot be written to the listing",
            path.display()
        );
    };
    if text.contains('\n') || text.contains('\r') {
        bail!("{text:?} contains a line break and cannot be written to the listing");
    }
    Ok(())
}

fn should_skip(root: &Path, path: &Path, exclude: Option<&GlobSet>) -> bool {
    let Some(set) = exclude else {
        return false;
    };
    let relative = path.strip_prefix(root).unwrap_or(path);
    set.is_match(normalize_slashes(relative).as_str())
}

// The root itself is never pruned, so `mfe .` still walks the current directory.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn build_exclude_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|err| anyhow!("invalid exclude glob '{pattern}': {err}"))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| anyhow!("unable to build exclude globs: {err}"))
}
