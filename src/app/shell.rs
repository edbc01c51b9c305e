use std::env;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Tcsh,
    Powershell,
    Cmd,
}

impl Shell {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim_end_matches(".exe").to_ascii_lowercase().as_str() {
            "bash" | "sh" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            "tcsh" | "csh" => Some(Self::Tcsh),
            "pwsh" | "powershell" => Some(Self::Powershell),
            "cmd" => Some(Self::Cmd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ShellDetectionError(String);

/// Guess the user's interactive shell from the process environment.
///
/// POSIX hosts use the basename of `SHELL`. Windows has no equivalent, so
/// `PROMPT` (set by cmd.exe) and `PSModulePath` (set by PowerShell) are used
/// instead.
pub fn detect_shell(platform: Platform) -> Result<Shell, ShellDetectionError> {
    match platform {
        Platform::Windows => {
            if env::var_os("PROMPT").is_some() {
                Ok(Shell::Cmd)
            } else if env::var_os("PSModulePath").is_some() {
                Ok(Shell::Powershell)
            } else {
                Err(ShellDetectionError(
                    "neither PROMPT nor PSModulePath is set".to_string(),
                ))
            }
        }
        Platform::Linux | Platform::MacOs => {
            let value = env::var("SHELL")
                .map_err(|_| ShellDetectionError("SHELL is not set".to_string()))?;
            let name = Path::new(&value)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            Shell::from_name(name)
                .ok_or_else(|| ShellDetectionError(format!("unsupported shell `{value}`")))
        }
    }
}

/// Prompt token shown in front of example commands.
pub fn command_line_prefix(platform: Platform, shell: Option<Shell>) -> &'static str {
    match (platform, shell) {
        (Platform::Windows, Some(Shell::Powershell)) => "PS>",
        (Platform::Windows, _) => ">",
        _ => "$",
    }
}

/// Command that loads the output of `command` into the current shell.
pub fn usage_hint(shell: Option<Shell>, command: &str) -> String {
    match shell {
        Some(Shell::Fish) => format!("eval ({command})"),
        Some(Shell::Powershell) => format!("& {command} | Invoke-Expression"),
        Some(Shell::Cmd) => format!("@FOR /f \"tokens=*\" %i IN ('{command}') DO @call %i"),
        Some(Shell::Tcsh) => format!("eval `{command}`"),
        Some(Shell::Bash) | Some(Shell::Zsh) | None => format!("eval $({command})"),
    }
}
