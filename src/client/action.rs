//! What "reload" means for the native listener.

use std::process::Command;

use anyhow::{Context, Result};

use crate::log;

pub trait ReloadAction: Send {
    fn reload(&mut self) -> Result<()>;
}

/// Print a line per reload.
#[derive(Debug, Default)]
pub struct LogAction {
    count: u64,
}

impl ReloadAction for LogAction {
    fn reload(&mut self) -> Result<()> {
        self.count += 1;
        log!("client"; "reload #{}", self.count);
        Ok(())
    }
}

/// Run a shell command per reload.
#[derive(Debug)]
pub struct CommandAction {
    command: String,
}

impl CommandAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", &self.command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", &self.command]);
            cmd
        }
    }
}

impl ReloadAction for CommandAction {
    fn reload(&mut self) -> Result<()> {
        log!("client"; "reload: {}", self.command);
        let output = self
            .shell()
            .output()
            .with_context(|| format!("Failed to execute `{}`", self.command))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            log!("client"; "{}", line);
        }
        if !output.status.success() {
            anyhow::bail!(
                "`{}` failed ({}): {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_command_action_runs_shell() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("reloaded");
        let mut action = CommandAction::new(format!("touch '{}'", marker.display()));

        action.reload().unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_command_action_reports_failure() {
        let mut action = CommandAction::new("echo oops >&2; exit 3");
        let err = action.reload().unwrap_err().to_string();
        assert!(err.contains("oops"));
    }
}
