use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::listing::{CommandLine, Verb};
use crate::logging::Journal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move { source: PathBuf, target: PathBuf },
    Delete { source: PathBuf },
    Unknown {
        verb: String,
        source: PathBuf,
        target: String,
    },
}

impl Action {
    fn label(&self) -> &str {
        match self {
            Action::Move { .. } => "move",
            Action::Delete { .. } => "delete",
            Action::Unknown { verb, .. } => verb,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { source, target } => {
                write!(f, "Moving {} to {}", source.display(), target.display())
            }
            Action::Delete { source } => write!(f, "Deleting {}", source.display()),
            Action::Unknown { verb, target, .. } => {
                write!(f, "Unknown command {verb} for {target}")
            }
        }
    }
}

/// An action together with the zero-based listing line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub line: usize,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub overwrite: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyStats {
    pub moved: usize,
    pub deleted: usize,
    pub unknown: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: usize,
}

impl ApplyStats {
    pub fn print(&self) {
        let total =
            self.moved + self.deleted + self.unknown + self.skipped + self.failed + self.dry_run;
        if total == 0 {
            println!("no changes requested");
            return;
        }
        println!(
            "mfe summary: moved={}, deleted={}, unknown={}, skipped={}, failed={}, dry-run={}",
            self.moved, self.deleted, self.unknown, self.skipped, self.failed, self.dry_run
        );
    }
}

/// Pairs up the original and edited lines and turns each changed line into an action.
///
/// Both slices must have the same length; unchanged lines produce nothing.
pub fn plan_modifications(before: &[String], after: &[String]) -> Vec<PlannedAction> {
    before
        .iter()
        .zip(after)
        .enumerate()
        .filter(|(_, (old, new))| old != new)
        .map(|(line, (old, new))| {
            let source = PathBuf::from(CommandLine::parse(old).path);
            let edited = CommandLine::parse(new);
            let action = match edited.verb {
                Verb::Move => Action::Move {
                    source,
                    target: PathBuf::from(edited.path),
                },
                Verb::Delete => Action::Delete { source },
                Verb::Unknown(verb) => Action::Unknown {
                    verb,
                    source,
                    target: edited.path.to_string(),
                },
            };
            PlannedAction { line, action }
        })
        .collect()
}

/// Runs every planned action in listing order.
///
/// A failing action is reported and counted; the remaining actions still run.
pub fn apply_modifications(
    actions: &[PlannedAction],
    options: ApplyOptions,
    journal: Option<&Journal>,
) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for planned in actions {
        let (source, target) = match &planned.action {
            Action::Move { source, target } => (display(source), display(target)),
            Action::Delete { source } => (display(source), display(source)),
            Action::Unknown { source, target, .. } => (display(source), target.clone()),
        };

        let outcome = run_action(&planned.action, options, &mut stats);
        let (label, error) = match &outcome {
            Ok(outcome) => (outcome.label(), None),
            Err(err) => {
                println!("error: line {}: {err:#}", planned.line + 1);
                stats.failed += 1;
                ("failed", Some(format!("{err:#}")))
            }
        };

        if let Some(journal) = journal {
            if let Err(err) = journal.record(
                planned.action.label(),
                &source,
                &target,
                label,
                error.as_deref(),
            ) {
                println!("warning: unable to write journal entry: {err:#}");
            }
        }
    }

    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Skipped,
    DryRun,
    Unknown,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Skipped => "skipped",
            Outcome::DryRun => "dry-run",
            Outcome::Unknown => "unknown",
        }
    }
}

fn run_action(action: &Action, options: ApplyOptions, stats: &mut ApplyStats) -> Result<Outcome> {
    match action {
        Action::Move { source, target } => {
            if target.as_os_str().is_empty() {
                bail!("move of {} is missing a target path", source.display());
            }
            if source == target {
                println!("{} is already at its target; skipping", source.display());
                stats.skipped += 1;
                return Ok(Outcome::Skipped);
            }
            ensure_target_free(target, options.overwrite)?;
            if options.dry_run {
                println!("would move {} to {}", source.display(), target.display());
                stats.dry_run += 1;
                return Ok(Outcome::DryRun);
            }
            println!("{action}");
            move_file(source, target)?;
            stats.moved += 1;
            Ok(Outcome::Applied)
        }
        Action::Delete { source } => {
            if options.dry_run {
                println!("would delete {}", source.display());
                stats.dry_run += 1;
                return Ok(Outcome::DryRun);
            }
            println!("{action}");
            fs::remove_file(source).with_context(|| format!("deleting {}", source.display()))?;
            stats.deleted += 1;
            Ok(Outcome::Applied)
        }
        Action::Unknown { .. } => {
            println!("{action}");
            stats.unknown += 1;
            Ok(Outcome::Unknown)
        }
    }
}

fn ensure_target_free(target: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && fs::symlink_metadata(target).is_ok() {
        bail!(
            "refusing to overwrite existing {} (pass --overwrite to allow)",
            target.display()
        );
    }
    Ok(())
}

fn move_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    fs::rename(source, target)
        .with_context(|| format!("moving {} to {}", source.display(), target.display()))?;
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
