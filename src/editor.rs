use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

pub const DEFAULT_EDITOR: &str = "vim";

/// Something that lets the user edit a file in place and returns once they are done.
pub trait Editor {
    fn edit(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl EditorConfig {
    /// Picks the editor from the `--editor` flag, then `$EDITOR`, then [`DEFAULT_EDITOR`].
    ///
    /// Blank values count as unset. The chosen value is split shell-style so
    /// settings such as `code --wait` keep their arguments.
    pub fn resolve(flag: Option<&str>, env: Option<&str>) -> Result<Self> {
        let command = [flag, env]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_EDITOR);

        let Some(mut words) = shlex::split(command) else {
            bail!("unable to parse editor command '{command}'");
        };
        if words.is_empty() {
            bail!("editor command '{command}' is empty");
        }
        let program = words.remove(0);
        Ok(EditorConfig {
            program,
            args: words,
        })
    }

    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Runs the configured program attached to this terminal.
pub struct ExternalEditor {
    config: EditorConfig,
}

impl ExternalEditor {
    pub fn new(config: EditorConfig) -> Self {
        ExternalEditor { config }
    }
}

impl Editor for ExternalEditor {
    fn edit(&self, path: &Path) -> Result<()> {
        let status = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(path)
            .status()
            .with_context(|| format!("launching editor '{}'", self.config.display()))?;

        // Whatever the buffer holds now is taken as the user's answer.
        if !status.success() {
            println!(
                "warning: editor '{}' exited with {status}; using the listing as saved",
                self.config.display()
            );
        }
        Ok(())
    }
}
