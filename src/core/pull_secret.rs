use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{Error, Result};

use super::version::LANDING_PAGE_URL;

/// Source of pull-secret material, consulted only when the backend needs it.
pub trait PullSecretLoader: Send + Sync {
    fn load(&self) -> Result<String>;

    /// Short description safe to log; never includes the secret itself.
    fn describe(&self) -> String;
}

/// Reads the pull secret from a configured file, falling back to an
/// interactive prompt when no file is configured and stdin is a terminal.
#[derive(Debug, Clone)]
pub struct ConfiguredPullSecret {
    path: Option<PathBuf>,
}

impl ConfiguredPullSecret {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl PullSecretLoader for ConfiguredPullSecret {
    fn load(&self) -> Result<String> {
        let contents = match &self.path {
            Some(path) => fs::read_to_string(path).map_err(|err| Error::PullSecret {
                message: format!("failed to read {}: {err}", path.display()),
            })?,
            None => prompt_for_pull_secret()?,
        };
        validate_pull_secret(&contents)?;
        Ok(contents.trim().to_string())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("pull secret file {}", path.display()),
            None => "interactive pull secret".to_string(),
        }
    }
}

/// Pull secret supplied directly as a string.
#[derive(Clone)]
pub struct InlinePullSecret {
    contents: String,
}

impl InlinePullSecret {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
        }
    }
}

impl PullSecretLoader for InlinePullSecret {
    fn load(&self) -> Result<String> {
        validate_pull_secret(&self.contents)?;
        Ok(self.contents.clone())
    }

    fn describe(&self) -> String {
        "inline pull secret".to_string()
    }
}

fn prompt_for_pull_secret() -> Result<String> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(Error::PullSecret {
            message: format!(
                "no pull secret file configured. Download it from {LANDING_PAGE_URL} and pass --pull-secret-file."
            ),
        });
    }

    let mut stderr = io::stderr();
    let _ = write!(
        stderr,
        "Please enter the pull secret (copy it from {LANDING_PAGE_URL}): "
    );
    let _ = stderr.flush();

    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .map_err(|err| Error::PullSecret {
            message: format!("failed to read pull secret from stdin: {err}"),
        })?;
    Ok(line)
}

/// A pull secret is a JSON object with an `auths` object.
pub fn validate_pull_secret(contents: &str) -> Result<()> {
    let value: Value = serde_json::from_str(contents.trim()).map_err(|err| Error::PullSecret {
        message: format!("pull secret is not valid JSON: {err}"),
    })?;
    match value.get("auths") {
        Some(Value::Object(_)) => Ok(()),
        _ => Err(Error::PullSecret {
            message: "pull secret is missing the `auths` object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_and_trims_secret_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pull-secret.json");
        fs::write(&path, "{\"auths\":{\"quay.io\":{\"auth\":\"abc\"}}}\n").expect("write");

        let loader = ConfiguredPullSecret::new(Some(path.clone()));
        let secret = loader.load().expect("load");
        assert_eq!(secret, "{\"auths\":{\"quay.io\":{\"auth\":\"abc\"}}}");
        assert_eq!(
            loader.describe(),
            format!("pull secret file {}", path.display())
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().expect("tempdir");
        let loader = ConfiguredPullSecret::new(Some(dir.path().join("absent.json")));
        let err = loader.load().expect_err("missing file");
        assert!(matches!(err, Error::PullSecret { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn rejects_secret_without_auths() {
        assert!(validate_pull_secret("{\"auths\":{}}").is_ok());
        assert!(validate_pull_secret("{\"registry\":{}}").is_err());
        assert!(validate_pull_secret("{\"auths\":[]}").is_err());
        assert!(validate_pull_secret("not json").is_err());
    }

    #[test]
    fn inline_secret_is_validated_on_load() {
        assert!(InlinePullSecret::new("{}").load().is_err());
        assert_eq!(
            InlinePullSecret::new("{\"auths\":{}}").load().expect("load"),
            "{\"auths\":{}}"
        );
    }
}
