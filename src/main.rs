use std::env;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use is_terminal::IsTerminal;

mod apply;
mod diff;
mod editor;
mod files;
mod listing;
mod logging;

use apply::{ApplyOptions, ApplyStats};
use editor::{Editor, EditorConfig, ExternalEditor};
use files::WalkOptions;
use listing::{Listing, ListingBuffer};
use logging::Journal;

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Default)]
enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn should_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mfe",
    version,
    about = "Move and delete files by editing a listing in your text editor"
)]
struct Cli {
    /// Directory whose files are listed for editing.
    #[arg(value_name = "DIRECTORY", value_hint = ValueHint::DirPath)]
    directory: Option<PathBuf>,
    /// Editor command; overrides $EDITOR.
    #[arg(long, value_name = "COMMAND")]
    editor: Option<String>,
    /// Print the planned moves and deletes without touching any file.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Allow moves to replace files that already exist.
    #[arg(long, action = ArgAction::SetTrue)]
    overwrite: bool,
    /// Leave out files and directories whose names start with a dot.
    #[arg(long = "skip-hidden", action = ArgAction::SetTrue)]
    skip_hidden: bool,
    /// Leave out files matching this glob, relative to the directory (repeatable).
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
    /// Append a JSON line per action to this file.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    journal: Option<PathBuf>,
    /// When to color the listing diff shown after a line-count mismatch.
    #[arg(long = "color", value_enum, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Debug, Clone, Default)]
struct SessionOptions {
    walk: WalkOptions,
    apply: ApplyOptions,
    colorize: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let Some(directory) = cli.directory.as_deref() else {
        print_usage();
        return Ok(());
    };

    let env_editor = env::var("EDITOR").ok();
    let config = EditorConfig::resolve(cli.editor.as_deref(), env_editor.as_deref())?;
    let editor = ExternalEditor::new(config);
    let journal = cli.journal.as_ref().map(Journal::new);
    let options = SessionOptions {
        walk: WalkOptions {
            skip_hidden: cli.skip_hidden,
            exclude: cli.exclude.clone(),
        },
        apply: ApplyOptions {
            dry_run: cli.dry_run,
            overwrite: cli.overwrite,
        },
        colorize: cli.color.should_color(),
    };

    let stats = edit_tree(directory, &options, &editor, journal.as_ref())?;
    stats.print();
    if stats.failed > 0 {
        bail!("{} action(s) failed", stats.failed);
    }
    Ok(())
}

fn print_usage() {
    let program = env::args().next().unwrap_or_else(|| "mfe".into());
    println!("{program}: missing directory operand");
    println!("Usage: {program} <directory>");
}

/// Lists the files under `root`, lets the user edit the listing, then applies the edits.
///
/// Nothing on disk changes unless the edited listing still has one line per file.
fn edit_tree(
    root: &Path,
    options: &SessionOptions,
    editor: &dyn Editor,
    journal: Option<&Journal>,
) -> Result<ApplyStats> {
    let paths = files::collect_files(root, &options.walk)?;
    let listing = Listing::from_paths(&paths);
    if listing.is_empty() {
        println!("no files found under {}", root.display());
        return Ok(ApplyStats::default());
    }

    let buffer = ListingBuffer::create(&listing)?;
    editor.edit(buffer.path())?;
    let edited = buffer.read_edited()?;

    let after = match listing::calculate_modifications(&listing, &edited) {
        Ok(after) => after,
        Err(err) => {
            diff::print_structural_changes(&listing.render(), &edited, options.colorize);
            return Err(err);
        }
    };

    let actions = apply::plan_modifications(listing.lines(), &after);
    Ok(apply::apply_modifications(&actions, options.apply, journal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    /// Rewrites the listing with a closure instead of opening a real editor.
    struct ScriptedEditor<F> {
        rewrite: F,
        seen: RefCell<Option<PathBuf>>,
    }

    impl<F> ScriptedEditor<F>
    where
        F: Fn(&str) -> String,
    {
        fn new(rewrite: F) -> Self {
            ScriptedEditor {
                rewrite,
                seen: RefCell::new(None),
            }
        }

        fn buffer_path(&self) -> Option<PathBuf> {
            self.seen.borrow().clone()
        }
    }

    impl<F> Editor for ScriptedEditor<F>
    where
        F: Fn(&str) -> String,
    {
        fn edit(&self, path: &Path) -> Result<()> {
            *self.seen.borrow_mut() = Some(path.to_path_buf());
            let text = fs::read_to_string(path)?;
            fs::write(path, (self.rewrite)(&text))?;
            Ok(())
        }
    }

    fn seed(root: &Path, names: &[&str]) {
        for name in names {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("parent dir");
            }
            fs::write(&path, *name).expect("seed file");
        }
    }

    fn snapshot(root: &Path) -> Vec<PathBuf> {
        files::collect_files(root, &WalkOptions::default()).expect("snapshot")
    }

    #[test]
    fn untouched_listing_changes_nothing() {
        let temp = tempdir().expect("temp dir");
        seed(temp.path(), &["a.txt", "dir/b.txt"]);
        let before = snapshot(temp.path());

        let editor = ScriptedEditor::new(|text: &str| format!("{text}\n"));
        let stats = edit_tree(temp.path(), &SessionOptions::default(), &editor, None)
            .expect("session");

        assert_eq!(stats, ApplyStats::default());
        assert_eq!(snapshot(temp.path()), before);
    }

    #[test]
    fn edited_target_moves_the_file() {
        let temp = tempdir().expect("temp dir");
        seed(temp.path(), &["a.txt", "keep.txt"]);
        let source = temp.path().join("a.txt").display().to_string();
        let target = temp.path().join("b/c.txt").display().to_string();

        let editor = ScriptedEditor::new(move |text: &str| text.replace(&source, &target));
        let stats = edit_tree(temp.path(), &SessionOptions::default(), &editor, None)
            .expect("session");

        assert_eq!(stats.moved, 1);
        assert!(!temp.path().join("a.txt").exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("b/c.txt")).expect("moved file"),
            "a.txt"
        );
        assert!(temp.path().join("keep.txt").exists());
    }

    #[test]
    fn delete_and_unknown_verbs_are_applied_per_line() {
        let temp = tempdir().expect("temp dir");
        seed(temp.path(), &["a.txt", "b.txt"]);

        let editor = ScriptedEditor::new(|text: &str| {
            let mut lines = text.lines();
            let first = lines.next().unwrap_or_default().replacen("move", "d", 1);
            let second = lines.next().unwrap_or_default().replacen("move", "rename", 1);
            format!("{first}\n{second}\n")
        });
        let stats = edit_tree(temp.path(), &SessionOptions::default(), &editor, None)
            .expect("session");

        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.unknown, 1);
        assert!(!temp.path().join("a.txt").exists());
        assert!(temp.path().join("b.txt").exists());
    }

    #[test]
    fn line_count_mismatch_aborts_without_changes() {
        let temp = tempdir().expect("temp dir");
        seed(temp.path(), &["a.txt", "b.txt", "c.txt"]);
        let before = snapshot(temp.path());

        let removes_line = ScriptedEditor::new(|text: &str| {
            let lines: Vec<&str> = text.lines().collect();
            lines[1..]
                .iter()
                .map(|line| line.replacen("move", "d", 1))
                .collect::<Vec<_>>()
                .join("\n")
        });
        let err = edit_tree(temp.path(), &SessionOptions::default(), &removes_line, None)
            .unwrap_err();
        assert!(err.to_string().contains("do not add or remove lines"));
        assert_eq!(snapshot(temp.path()), before);
        let buffer = removes_line.buffer_path().expect("editor ran");
        assert!(!buffer.exists());

        let adds_line = ScriptedEditor::new(|text: &str| {
            format!("{}\ndelete extra.txt", text.replace("move ", "delete "))
        });
        assert!(edit_tree(temp.path(), &SessionOptions::default(), &adds_line, None).is_err());
        assert_eq!(snapshot(temp.path()), before);
    }

    #[test]
    fn buffer_is_removed_after_successful_run() {
        let temp = tempdir().expect("temp dir");
        seed(temp.path(), &["a.txt"]);

        let editor = ScriptedEditor::new(|text: &str| text.to_string());
        edit_tree(temp.path(), &SessionOptions::default(), &editor, None).expect("session");

        let buffer = editor.buffer_path().expect("editor ran");
        assert!(!buffer.exists());
    }

    #[test]
    fn empty_tree_skips_the_editor() {
        let temp = tempdir().expect("temp dir");
        fs::create_dir_all(temp.path().join("only/dirs")).expect("dirs");

        let editor = ScriptedEditor::new(|text: &str| text.to_string());
        let stats = edit_tree(temp.path(), &SessionOptions::default(), &editor, None)
            .expect("session");

        assert_eq!(stats, ApplyStats::default());
        assert!(editor.buffer_path().is_none());
    }

    #[test]
    fn unreadable_root_aborts_before_editing() {
        let temp = tempdir().expect("temp dir");
        let editor = ScriptedEditor::new(|text: &str| text.to_string());
        let result = edit_tree(
            &temp.path().join("missing"),
            &SessionOptions::default(),
            &editor,
            None,
        );

        assert!(result.is_err());
        assert!(editor.buffer_path().is_none());
    }

    #[test]
    fn dry_run_session_reports_without_touching_files() {
        let temp = tempdir().expect("temp dir");
        seed(temp.path(), &["a.txt"]);
        let before = snapshot(temp.path());

        let editor = ScriptedEditor::new(|text: &str| text.replacen("move", "delete", 1));
        let options = SessionOptions {
            apply: ApplyOptions {
                dry_run: true,
                overwrite: false,
            },
            ..SessionOptions::default()
        };
        let stats = edit_tree(temp.path(), &options, &editor, None).expect("session");

        assert_eq!(stats.dry_run, 1);
        assert_eq!(snapshot(temp.path()), before);
    }

    #[test]
    fn cli_accepts_missing_directory() {
        let cli = Cli::try_parse_from(["mfe"]).expect("parse");
        assert!(cli.directory.is_none());
        run(cli).expect("usage path succeeds");
    }

    #[test]
    fn help_describes_every_flag() {
        use clap::CommandFactory;

        let help = Cli::command().render_long_help().to_string();
        for text in [
            "Print the planned moves and deletes",
            "names start with a dot",
            "Leave out files matching this glob",
            "When to color the listing diff",
            "overrides $EDITOR",
            "Allow moves to replace files",
            "Append a JSON line per action",
        ] {
            assert!(help.contains(text), "missing {text:?} in:\n{help}");
        }
    }

    #[test]
    fn cli_parses_options() {
        let cli = Cli::try_parse_from([
            "mfe",
            "--editor",
            "nano",
            "--dry-run",
            "--exclude",
            "*.log",
            "--exclude",
            "target/**",
            "--color",
            "never",
            "photos",
        ])
        .expect("parse");
        assert_eq!(cli.directory, Some(PathBuf::from("photos")));
        assert_eq!(cli.editor.as_deref(), Some("nano"));
        assert!(cli.dry_run);
        assert!(!cli.overwrite);
        assert_eq!(cli.exclude, ["*.log", "target/**"]);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(!cli.color.should_color());
    }
}
