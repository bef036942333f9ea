use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR: &str = "kitty-agenda";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `backend.url`.
pub const ENV_SUPABASE_URL: &str = "KITTY_AGENDA_SUPABASE_URL";
/// Environment variable overriding `backend.anon_key`.
pub const ENV_SUPABASE_ANON_KEY: &str = "KITTY_AGENDA_SUPABASE_ANON_KEY";
/// Environment variable overriding `backend.kind`.
pub const ENV_BACKEND: &str = "KITTY_AGENDA_BACKEND";

const DEFAULT_NOTICE_TTL_SECS: u64 = 5;
const REDACTED: &str = "<redacted>";

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Which backend to talk to and how to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
}

/// Shell presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notice_ttl_secs: DEFAULT_NOTICE_TTL_SECS,
        }
    }
}

const fn default_notice_ttl_secs() -> u64 {
    DEFAULT_NOTICE_TTL_SECS
}

/// Backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted Supabase project.
    #[default]
    Supabase,
    /// In-process demo backend; nothing survives the process.
    Memory,
}

impl BackendKind {
    /// Wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Supabase => "supabase",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized backend name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend '{0}' (expected supabase or memory)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "memory" => Ok(Self::Memory),
            other => Err(UnknownBackend(other.to_owned())),
        }
    }
}

impl AppConfig {
    /// Default location: `<config_dir>/kitty-agenda/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path` (or the default location), apply environment and CLI
    /// overrides, then validate.
    ///
    /// Precedence: `backend_override` > environment > file > defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed, or the result is invalid.
    pub fn load(path: Option<&Path>, backend_override: Option<BackendKind>) -> Result<Self> {
        let mut fetch = |key: &'static str| env::var(key).ok();
        Self::load_with_env(path, backend_override, &mut fetch)
    }

    fn load_with_env(
        path: Option<&Path>,
        backend_override: Option<BackendKind>,
        fetch: &mut impl FnMut(&'static str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(fetch)?;
        if let Some(kind) = backend_override {
            config.backend.kind = kind;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn apply_env(&mut self, fetch: &mut impl FnMut(&'static str) -> Option<String>) -> Result<()> {
        if let Some(kind) = fetch(ENV_BACKEND).filter(|value| !value.trim().is_empty()) {
            self.backend.kind = kind.parse().with_context(|| format!("invalid {ENV_BACKEND}"))?;
        }
        if let Some(url) = fetch(ENV_SUPABASE_URL) {
            self.backend.url = Some(url);
        }
        if let Some(key) = fetch(ENV_SUPABASE_ANON_KEY) {
            self.backend.anon_key = Some(key);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.ui.notice_ttl_secs == 0 {
            bail!("ui.notice_ttl_secs must be greater than zero");
        }
        if self.backend.kind == BackendKind::Supabase {
            let url = self.backend.url.as_deref().map(str::trim).unwrap_or_default();
            if url.is_empty() {
                bail!("backend.url is required for the supabase backend (or set {ENV_SUPABASE_URL})");
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("backend.url must start with http:// or https://, got '{url}'");
            }
            let key = self.backend.anon_key.as_deref().map(str::trim).unwrap_or_default();
            if key.is_empty() {
                bail!(
                    "backend.anon_key is required for the supabase backend (or set {ENV_SUPABASE_ANON_KEY})"
                );
            }
        }
        Ok(())
    }

    /// How long notices stay visible.
    #[must_use]
    pub const fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.ui.notice_ttl_secs)
    }

    /// TOML rendering with the anon key hidden.
    ///
    /// # Errors
    /// Returns an error when serialization fails.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.backend.anon_key.is_some() {
            shown.backend.anon_key = Some(REDACTED.to_owned());
        }
        toml::to_string_pretty(&shown).context("failed to render configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &'static str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, body: &str) -> Result<PathBuf> {
        let path = dir.join(CONFIG_FILE);
        let mut file = fs::File::create(&path)?;
        writeln!(file, "{body}")?;
        Ok(path)
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let cfg = AppConfig::from_file(&dir.path().join(CONFIG_FILE))?;
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.backend.kind, BackendKind::Supabase);
        assert_eq!(cfg.notice_ttl(), Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn loads_supabase_settings() -> Result<()> {
        let dir = tempdir()?;
        let path = write_config(
            dir.path(),
            "[backend]\nkind = \"supabase\"\nurl = \"https://xyz.supabase.co\"\nanon_key = \"anon\"\n\n[ui]\nnotice_ttl_secs = 8",
        )?;
        let cfg = AppConfig::load_with_env(Some(&path), None, &mut no_env)?;
        assert_eq!(cfg.backend.url.as_deref(), Some("https://xyz.supabase.co"));
        assert_eq!(cfg.notice_ttl(), Duration::from_secs(8));
        Ok(())
    }

    #[test]
    fn env_beats_file_and_cli_beats_env() -> Result<()> {
        let dir = tempdir()?;
        let path = write_config(
            dir.path(),
            "[backend]\nurl = \"https://file.supabase.co\"\nanon_key = \"file-key\"",
        )?;
        let vars = HashMap::from([
            (ENV_SUPABASE_URL, "https://env.supabase.co".to_owned()),
            (ENV_BACKEND, "supabase".to_owned()),
        ]);
        let mut fetch = |key: &'static str| vars.get(key).cloned();

        let cfg = AppConfig::load_with_env(Some(&path), None, &mut fetch)?;
        assert_eq!(cfg.backend.url.as_deref(), Some("https://env.supabase.co"));
        assert_eq!(cfg.backend.anon_key.as_deref(), Some("file-key"));

        let cfg = AppConfig::load_with_env(Some(&path), Some(BackendKind::Memory), &mut fetch)?;
        assert_eq!(cfg.backend.kind, BackendKind::Memory);
        Ok(())
    }

    #[test]
    fn supabase_requires_url_and_key() -> Result<()> {
        let dir = tempdir()?;
        let path = write_config(dir.path(), "[backend]\nkind = \"supabase\"")?;
        let Err(err) = AppConfig::load_with_env(Some(&path), None, &mut no_env) else {
            panic!("missing url should error");
        };
        assert!(err.to_string().contains("backend.url is required"));

        let path = write_config(dir.path(), "[backend]\nurl = \"ftp://xyz\"\nanon_key = \"k\"")?;
        let Err(err) = AppConfig::load_with_env(Some(&path), None, &mut no_env) else {
            panic!("non-http url should error");
        };
        assert!(err.to_string().contains("must start with http"));

        let path = write_config(dir.path(), "[backend]\nurl = \"https://xyz.supabase.co\"")?;
        let Err(err) = AppConfig::load_with_env(Some(&path), None, &mut no_env) else {
            panic!("missing key should error");
        };
        assert!(err.to_string().contains("anon_key is required"));
        Ok(())
    }

    #[test]
    fn memory_backend_needs_no_credentials_but_ttl_must_be_positive() -> Result<()> {
        let dir = tempdir()?;
        let path = write_config(dir.path(), "[backend]\nkind = \"memory\"")?;
        let cfg = AppConfig::load_with_env(Some(&path), None, &mut no_env)?;
        assert_eq!(cfg.backend.kind, BackendKind::Memory);

        let path = write_config(dir.path(), "[backend]\nkind = \"memory\"\n[ui]\nnotice_ttl_secs = 0")?;
        let Err(err) = AppConfig::load_with_env(Some(&path), None, &mut no_env) else {
            panic!("zero ttl should error");
        };
        assert!(err.to_string().contains("notice_ttl_secs"));
        Ok(())
    }

    #[test]
    fn bad_backend_env_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        let mut fetch = |key: &'static str| (key == ENV_BACKEND).then(|| "sqlite".to_owned());
        let Err(err) = AppConfig::load_with_env(Some(&path), None, &mut fetch) else {
            panic!("unknown backend should error");
        };
        assert!(format!("{err:#}").contains("unknown backend 'sqlite'"));
        Ok(())
    }

    #[test]
    fn redacted_rendering_hides_key() -> Result<()> {
        let cfg = AppConfig {
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                url: Some("https://xyz.supabase.co".into()),
                anon_key: Some("super-secret".into()),
            },
            ui: UiConfig::default(),
        };
        let rendered = cfg.to_redacted_toml()?;
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains(REDACTED));
        assert!(rendered.contains("https://xyz.supabase.co"));
        Ok(())
    }
}
