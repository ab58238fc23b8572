use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};

use crate::core::error::AppError;
use crate::ui;

/// Flags whose following argument must never be echoed.
const SECRET_FLAGS: &[&str] = &[
    "--token",
    "--deployment-token",
    "--password",
    "--passout",
    "--passin",
    "--auth",
];

/// Execution context that controls how external tools are run.
/// Supports dry-run mode (commands are printed and recorded, not executed)
/// and verbose output.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    dry_run: bool,
    verbose: bool,
    plan: Arc<Mutex<Vec<String>>>,
}

impl ExecutionContext {
    /// Creates a new execution context.
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self {
            dry_run,
            verbose,
            plan: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns true if in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Commands that were skipped because of dry-run, in order, with secrets redacted.
    pub fn planned_commands(&self) -> Vec<String> {
        self.plan.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Executes a command and captures its output.
    /// In dry-run mode, prints the command without executing it.
    pub fn run_command(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput, AppError> {
        self.run(cmd, args, None, &[])
    }

    /// Executes a command from a working directory.
    pub fn run_command_in(
        &self,
        dir: &Path,
        cmd: &str,
        args: &[&str],
    ) -> Result<CommandOutput, AppError> {
        self.run(cmd, args, Some(dir), &[])
    }

    /// Executes a command with extra environment variables. Values are never printed.
    pub fn run_command_with_env(
        &self,
        cmd: &str,
        args: &[&str],
        dir: Option<&Path>,
        envs: &[(&str, &str)],
    ) -> Result<CommandOutput, AppError> {
        self.run(cmd, args, dir, envs)
    }

    fn run(
        &self,
        cmd: &str,
        args: &[&str],
        dir: Option<&Path>,
        envs: &[(&str, &str)],
    ) -> Result<CommandOutput, AppError> {
        let display = display_command(cmd, args);

        if self.dry_run {
            self.record(&display);
            return Ok(CommandOutput::dry_run());
        }

        if self.verbose {
            ui::info(&format!("Running: {}", display));
        }

        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        for (key, value) in envs {
            command.env(key, value);
        }

        let output = command.output().map_err(|e| spawn_error(cmd, e))?;
        let cmd_output = CommandOutput::from_output(output);

        if self.verbose && !cmd_output.stdout.is_empty() {
            println!("{}", cmd_output.stdout);
        }

        Ok(cmd_output)
    }

    /// Executes a command attached to the terminal (interactive logins, long builds).
    pub fn run_command_streaming(
        &self,
        cmd: &str,
        args: &[&str],
    ) -> Result<CommandOutput, AppError> {
        let display = display_command(cmd, args);

        if self.dry_run {
            self.record(&display);
            return Ok(CommandOutput::dry_run());
        }

        if self.verbose {
            ui::info(&format!("Running: {}", display));
        }

        let status = Command::new(cmd)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| spawn_error(cmd, e))?;

        Ok(CommandOutput {
            success: status.success(),
            code: status.code().unwrap_or(-1),
            stdout: String::new(),
            stderr: String::new(),
            dry_run: false,
        })
    }

    /// Checks whether a tool can be spawned at all.
    pub fn tool_available(&self, cmd: &str, version_arg: &str) -> bool {
        if self.dry_run {
            return true;
        }
        Command::new(cmd)
            .arg(version_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Fails with `ToolMissing` when a tool is not installed.
    pub fn require_tool(&self, cmd: &str, version_arg: &str) -> Result<(), AppError> {
        if self.tool_available(cmd, version_arg) {
            Ok(())
        } else {
            Err(AppError::ToolMissing(cmd.to_string()))
        }
    }

    fn record(&self, display: &str) {
        ui::info(&format!("[DRY-RUN] {}", display));
        if let Ok(mut plan) = self.plan.lock() {
            plan.push(display.to_string());
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(false, false)
    }
}

fn spawn_error(cmd: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::ToolMissing(cmd.to_string())
    } else {
        AppError::Command(format!("Failed to execute '{}': {}", cmd, e))
    }
}

/// Renders a command line for display, masking secret arguments.
pub fn display_command(cmd: &str, args: &[&str]) -> String {
    let mut parts = vec![cmd.to_string()];
    parts.extend(redact(args));
    parts.join(" ")
}

/// Masks the value following any secret flag (`--token X` or `--token=X`).
pub fn redact(args: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            out.push("****".to_string());
            mask_next = false;
            continue;
        }

        if let Some((flag, _)) = arg.split_once('=') {
            if SECRET_FLAGS.contains(&flag) {
                out.push(format!("{}=****", flag));
                continue;
            }
        }

        if SECRET_FLAGS.contains(arg) {
            mask_next = true;
        } else if arg.starts_with("pass:") {
            out.push("pass:****".to_string());
            continue;
        }
        out.push(arg.to_string());
    }

    out
}

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    pub dry_run: bool,
}

impl CommandOutput {
    /// Creates a mock output for dry-run mode.
    pub fn dry_run() -> Self {
        Self {
            success: true,
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
            dry_run: true,
        }
    }

    /// Creates output from a std::process::Output.
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            dry_run: false,
        }
    }

    /// Returns an error if the command failed.
    pub fn ensure_success(&self, context: &str) -> Result<(), AppError> {
        if self.dry_run || self.success {
            Ok(())
        } else {
            Err(AppError::Command(format!(
                "{}: {}",
                context,
                if self.stderr.is_empty() {
                    "Command failed"
                } else {
                    &self.stderr
                }
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_masks_flag_values() {
        let args = [
            "staticwebapp",
            "create",
            "--token",
            "ghp_secret",
            "--name",
            "site",
        ];
        let redacted = redact(&args);
        assert_eq!(
            redacted,
            vec!["staticwebapp", "create", "--token", "****", "--name", "site"]
        );
    }

    #[test]
    fn test_redact_masks_inline_and_openssl_passwords() {
        let redacted = redact(&["--deployment-token=abc", "-passout", "pass:hunter2"]);
        assert_eq!(redacted, vec!["--deployment-token=****", "-passout", "pass:****"]);
    }

    #[test]
    fn test_dry_run_records_plan() {
        let ctx = ExecutionContext::new(true, false);
        let out = ctx
            .run_command("az", &["group", "create", "--name", "dev-we-rg-homelab"])
            .unwrap();
        assert!(out.dry_run);
        assert!(out.success);
        assert_eq!(
            ctx.planned_commands(),
            vec!["az group create --name dev-we-rg-homelab"]
        );
    }

    #[test]
    fn test_plan_is_shared_between_clones() {
        let ctx = ExecutionContext::new(true, false);
        let clone = ctx.clone();
        clone.run_command("git", &["status"]).unwrap();
        assert_eq!(ctx.planned_commands().len(), 1);
    }

    #[test]
    fn test_ensure_success_reports_stderr() {
        let output = CommandOutput {
            success: false,
            code: 1,
            stdout: String::new(),
            stderr: "ResourceGroupNotFound".into(),
            dry_run: false,
        };
        let err = output.ensure_success("Failed to show group").unwrap_err();
        assert!(err.to_string().contains("ResourceGroupNotFound"));
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let ctx = ExecutionContext::default();
        let err = ctx
            .run_command("homelab-definitely-missing-tool", &[])
            .unwrap_err();
        assert!(matches!(err, AppError::ToolMissing(_)));
    }
}
