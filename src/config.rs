//! Runtime configuration, read once from the environment at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `HEARTWISE_DB_PATH` | `heartwise.db` |
//! | `HEARTWISE_MODEL_PATH` | `models/heart_model.json` |
//! | `HEARTWISE_MODEL_SHA256` | unset (no pin) |
//! | `HEARTWISE_EXPORT_DIR` | `exports` |
//! | `HEARTWISE_FONT_PATH` | `fonts/NotoSans-Regular.ttf` |
//! | `HEARTWISE_FONT_URL` | Noto Sans on GitHub; `off` disables fetching |
//! | `HEARTWISE_SMTP_RELAY` | `smtp.gmail.com` |
//! | `HEARTWISE_SMTP_SENDER` | unset (mail disabled) |
//!
//! The SMTP password is read from the first available of
//! `HEARTWISE_SMTP_PASSWORD_FD`, `HEARTWISE_SMTP_PASSWORD_FILE`,
//! `/run/secrets/heartwise_smtp_password` and, in debug builds only,
//! `HEARTWISE_SMTP_PASSWORD`.

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::adapters::smtp::{SmtpSettings, DEFAULT_RELAY};

pub const DEFAULT_FONT_URL: &str =
    "https://github.com/notofonts/notofonts.github.io/raw/main/fonts/NotoSans/hinted/ttf/NotoSans-Regular.ttf";

const PASSWORD_FD_ENV: &str = "HEARTWISE_SMTP_PASSWORD_FD";
const PASSWORD_FILE_ENV: &str = "HEARTWISE_SMTP_PASSWORD_FILE";
const PASSWORD_ENV: &str = "HEARTWISE_SMTP_PASSWORD";
const DOCKER_SECRET_PATH: &str = "/run/secrets/heartwise_smtp_password";

/// Configuration errors. Never include secret material.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SMTP password source {source_name}: {reason}")]
    Secret {
        source_name: &'static str,
        reason: String,
    },
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub model_sha256: Option<String>,
    pub export_dir: PathBuf,
    pub font_path: PathBuf,
    /// `None` when fetching is disabled
    pub font_url: Option<String>,
    pub smtp: SmtpSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("heartwise.db"),
            model_path: PathBuf::from("models/heart_model.json"),
            model_sha256: None,
            export_dir: PathBuf::from("exports"),
            font_path: PathBuf::from("fonts/NotoSans-Regular.ttf"),
            font_url: Some(DEFAULT_FONT_URL.to_string()),
            smtp: SmtpSettings::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Secret` if a password source is named but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), Path::new(DOCKER_SECRET_PATH))
    }

    /// Build configuration from an arbitrary variable lookup.
    fn from_lookup<F>(lookup: F, docker_secret: &Path) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let font_url = match var("HEARTWISE_FONT_URL") {
            Some(v) if v.eq_ignore_ascii_case("off") => None,
            Some(v) => Some(v),
            None => defaults.font_url,
        };

        let smtp = SmtpSettings {
            relay: var("HEARTWISE_SMTP_RELAY").unwrap_or_else(|| DEFAULT_RELAY.to_string()),
            sender: var("HEARTWISE_SMTP_SENDER"),
            password: read_password(&lookup, docker_secret)?,
        };

        Ok(Self {
            db_path: var("HEARTWISE_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            model_path: var("HEARTWISE_MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
            model_sha256: var("HEARTWISE_MODEL_SHA256"),
            export_dir: var("HEARTWISE_EXPORT_DIR").map_or(defaults.export_dir, PathBuf::from),
            font_path: var("HEARTWISE_FONT_PATH").map_or(defaults.font_path, PathBuf::from),
            font_url,
            smtp,
        })
    }
}

fn secret_from(source_name: &'static str, raw: &str) -> Result<Zeroizing<String>, ConfigError> {
    let secret = Zeroizing::new(raw.trim_end_matches(['\n', '\r']).to_string());
    if secret.is_empty() {
        return Err(ConfigError::Secret {
            source_name,
            reason: "empty secret".into(),
        });
    }
    Ok(secret)
}

/// Find the SMTP password. `Ok(None)` means no source is configured.
fn read_password<F>(lookup: &F, docker_secret: &Path) -> Result<Option<Zeroizing<String>>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    #[cfg(unix)]
    if let Some(fd_str) = lookup(PASSWORD_FD_ENV) {
        use std::io::Read;
        use std::os::unix::io::FromRawFd;

        let fd: i32 = fd_str.trim().parse().map_err(|_| ConfigError::Secret {
            source_name: PASSWORD_FD_ENV,
            reason: "not a file descriptor number".into(),
        })?;
        if fd <= 2 {
            return Err(ConfigError::Secret {
                source_name: PASSWORD_FD_ENV,
                reason: "refusing to read from a stdio descriptor".into(),
            });
        }
        // SAFETY: the FD is handed to this process for a one-time secret read
        // and is owned (and closed) by the File from here on.
        let mut file = unsafe { std::fs::File::from_raw_fd(fd) };
        let mut buf = Zeroizing::new(String::new());
        file.read_to_string(&mut buf).map_err(|e| ConfigError::Secret {
            source_name: PASSWORD_FD_ENV,
            reason: e.to_string(),
        })?;
        return secret_from(PASSWORD_FD_ENV, &buf).map(Some);
    }

    if let Some(path) = lookup(PASSWORD_FILE_ENV) {
        let content = std::fs::read_to_string(path.trim())
            .map(Zeroizing::new)
            .map_err(|e| ConfigError::Secret {
                source_name: PASSWORD_FILE_ENV,
                reason: e.to_string(),
            })?;
        return secret_from(PASSWORD_FILE_ENV, &content).map(Some);
    }

    if docker_secret.exists() {
        let content = std::fs::read_to_string(docker_secret)
            .map(Zeroizing::new)
            .map_err(|e| ConfigError::Secret {
                source_name: "docker secret",
                reason: e.to_string(),
            })?;
        return secret_from("docker secret", &content).map(Some);
    }

    // Dev-only fallback.
    if cfg!(debug_assertions) {
        if let Some(v) = lookup(PASSWORD_ENV) {
            return secret_from(PASSWORD_ENV, &Zeroizing::new(v)).map(Some);
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = AppConfig::from_lookup(lookup(&[]), &temp.path().join("none"))
            .expect("Should build");

        assert_eq!(config.db_path, PathBuf::from("heartwise.db"));
        assert_eq!(config.model_path, PathBuf::from("models/heart_model.json"));
        assert_eq!(config.export_dir, PathBuf::from("exports"));
        assert_eq!(config.font_url.as_deref(), Some(DEFAULT_FONT_URL));
        assert_eq!(config.smtp.relay, "smtp.gmail.com");
        assert!(config.model_sha256.is_none());
        assert!(!config.smtp.is_complete());
    }

    #[test]
    fn test_overrides() {
        let temp = tempdir().expect("tempdir");
        let config = AppConfig::from_lookup(
            lookup(&[
                ("HEARTWISE_DB_PATH", "/data/h.db"),
                ("HEARTWISE_FONT_URL", "OFF"),
                ("HEARTWISE_SMTP_SENDER", "clinic@example.org"),
                ("HEARTWISE_MODEL_SHA256", "  abc123  "),
                ("HEARTWISE_EXPORT_DIR", "   "),
            ]),
            &temp.path().join("none"),
        )
        .expect("Should build");

        assert_eq!(config.db_path, PathBuf::from("/data/h.db"));
        assert!(config.font_url.is_none());
        assert_eq!(config.smtp.sender.as_deref(), Some("clinic@example.org"));
        assert_eq!(config.model_sha256.as_deref(), Some("abc123"));
        assert_eq!(config.export_dir, PathBuf::from("exports"));
    }

    #[test]
    fn test_password_file_wins_over_docker_secret() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("pw");
        let docker = temp.path().join("docker");
        std::fs::write(&file, "from-file\n").expect("write");
        std::fs::write(&docker, "from-docker").expect("write");

        let path = file.to_string_lossy().into_owned();
        let password = read_password(&lookup(&[(PASSWORD_FILE_ENV, &path)]), &docker)
            .expect("Should read")
            .expect("present");
        assert_eq!(password.as_str(), "from-file");

        let password = read_password(&lookup(&[]), &docker)
            .expect("Should read")
            .expect("present");
        assert_eq!(password.as_str(), "from-docker");
    }

    #[test]
    fn test_empty_password_file_is_error() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("pw");
        std::fs::write(&file, "\n").expect("write");

        let path = file.to_string_lossy().into_owned();
        let err = read_password(&lookup(&[(PASSWORD_FILE_ENV, &path)]), &temp.path().join("none"));
        assert!(matches!(err, Err(ConfigError::Secret { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdio_fd_refused() {
        let temp = tempdir().expect("tempdir");
        let err = read_password(&lookup(&[(PASSWORD_FD_ENV, "1")]), &temp.path().join("none"));
        assert!(matches!(err, Err(ConfigError::Secret { .. })));
    }

    #[test]
    fn test_error_message_has_no_secret() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing-pw");
        let path = missing.to_string_lossy().into_owned();
        let err = read_password(&lookup(&[(PASSWORD_FILE_ENV, &path)]), &temp.path().join("none"))
            .expect_err("missing file");
        assert!(err.to_string().contains(PASSWORD_FILE_ENV));
    }
}
