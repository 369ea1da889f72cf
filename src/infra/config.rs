use super::podman_adapter::DEFAULT_PODMAN_BINARY;
use super::runner::{RelayPolicy, RunnerSettings};
use crate::domain::DEFAULT_REGISTRIES;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "contaiman.toml";
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../config/default_contaiman.toml");

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
        .join(".config/contaiman")
}

pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    fs::create_dir_all(config_dir).with_context(|| format!("criando {:?}", config_dir))
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ConnectionConfig {
    pub uri: Option<String>,
    pub podman_binary: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RunnerConfig {
    pub shell: Option<String>,
    pub inherit_stdin: Option<bool>,
    /// 0 disables the timeout
    pub timeout_secs: Option<u64>,
    pub relay_policy: Option<RelayPolicy>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PullConfig {
    pub registries: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub pull: PullConfig,
}

impl AppConfig {
    /// Merges another AppConfig into self.
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: AppConfig) {
        if let Some(uri) = other.connection.uri {
            self.connection.uri = Some(uri);
        }
        if let Some(bin) = other.connection.podman_binary {
            self.connection.podman_binary = Some(bin);
        }
        if let Some(shell) = other.runner.shell {
            self.runner.shell = Some(shell);
        }
        if let Some(inherit) = other.runner.inherit_stdin {
            self.runner.inherit_stdin = Some(inherit);
        }
        if let Some(secs) = other.runner.timeout_secs {
            self.runner.timeout_secs = Some(secs);
        }
        if let Some(policy) = other.runner.relay_policy {
            self.runner.relay_policy = Some(policy);
        }
        if let Some(registries) = other.pull.registries {
            self.pull.registries = Some(registries);
        }
    }

    pub fn podman_binary(&self) -> &str {
        self.connection
            .podman_binary
            .as_deref()
            .unwrap_or(DEFAULT_PODMAN_BINARY)
    }

    pub fn registries(&self) -> Vec<String> {
        match &self.pull.registries {
            Some(registries) => registries.clone(),
            None => DEFAULT_REGISTRIES.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        let defaults = RunnerSettings::default();
        RunnerSettings {
            shell: self.runner.shell.clone().unwrap_or(defaults.shell),
            inherit_stdin: self.runner.inherit_stdin.unwrap_or(defaults.inherit_stdin),
            timeout: self
                .runner
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            relay_policy: self.runner.relay_policy.unwrap_or(defaults.relay_policy),
            chunk_size: defaults.chunk_size,
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path).with_context(|| format!("lendo {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("parse de {:?}", path))
}

/// Global config from `config_dir`, overridden by `./contaiman.toml`.
pub fn load_app_config(config_dir: &Path) -> Result<AppConfig> {
    load_app_config_from(config_dir, Path::new("./"))
}

pub fn load_app_config_from(config_dir: &Path, local_dir: &Path) -> Result<AppConfig> {
    let mut app_config = AppConfig::default();

    let global_config_path = config_dir.join(CONFIG_FILE_NAME);
    if global_config_path.exists() {
        debug!("Carregando config global de {:?}", global_config_path);
        app_config = read_config(&global_config_path)?;
    }

    let local_config_path = local_dir.join(CONFIG_FILE_NAME);
    if local_config_path.exists() && local_config_path != global_config_path {
        debug!("Aplicando config local de {:?}", local_config_path);
        app_config.merge(read_config(&local_config_path)?);
    }

    Ok(app_config)
}

/// Writes the default config unless one already exists. Returns whether a file was written.
pub fn install_default_config(config_dir: &Path) -> Result<bool> {
    ensure_config_dir(config_dir)?;

    let target = config_dir.join(CONFIG_FILE_NAME);
    if target.exists() {
        return Ok(false);
    }

    fs::write(&target, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("escrevendo template em {:?}", target))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.podman_binary(), "podman");
        assert_eq!(config.registries(), vec!["registry.redhat.io", "docker.io"]);

        let settings = config.runner_settings();
        assert_eq!(settings.shell, "sh");
        assert!(settings.timeout.is_none());
        assert_eq!(settings.relay_policy, RelayPolicy::Terminate);
    }

    #[test]
    fn test_merge_overrides_only_present_fields() {
        let mut base: AppConfig = toml::from_str(
            r#"
[connection]
uri = "unix:///run/podman/podman.sock"
[runner]
shell = "bash"
timeout_secs = 30
"#,
        )
        .unwrap();
        let local: AppConfig = toml::from_str(
            r#"
[runner]
timeout_secs = 5
relay_policy = "detach"
"#,
        )
        .unwrap();

        base.merge(local);

        assert_eq!(
            base.connection.uri.as_deref(),
            Some("unix:///run/podman/podman.sock")
        );
        let settings = base.runner_settings();
        assert_eq!(settings.shell, "bash");
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.relay_policy, RelayPolicy::Detach);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.podman_binary(), DEFAULT_PODMAN_BINARY);
        assert_eq!(config.registries().len(), DEFAULT_REGISTRIES.len());
        assert!(config.runner_settings().inherit_stdin);
    }
}
