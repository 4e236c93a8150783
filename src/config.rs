use crate::model::Node;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("env {0} not found")]
    EnvNotFound(String),
    #[error("env {0} is already configured")]
    DuplicateEnv(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ssh_user: String,
    pub ui: UiConfig,
    pub proxies: Vec<Proxy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssh_user: "root".to_string(),
            ui: UiConfig::default(),
            proxies: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub column_width: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { column_width: 40 }
    }
}

/// Widest host column the picker accepts.
pub const MAX_COLUMN_WIDTH: usize = 256;

impl UiConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_COLUMN_WIDTH).contains(&self.column_width) {
            return Err(anyhow!(
                "ui.column_width must be between 1 and {MAX_COLUMN_WIDTH}, got {}",
                self.column_width
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proxy {
    pub env: String,
    pub address: String,
    pub auth_connector: String,
    pub user_name: String,
    pub two_fa: bool,
}

impl Proxy {
    pub fn validate(&self) -> Result<()> {
        validate_env(&self.env).map_err(|err| anyhow!("{}: {err}", self.env))?;
        validate_address(&self.address).map_err(|err| anyhow!("{}: {err}", self.env))?;
        validate_identity(&self.auth_connector, &self.user_name)
            .map_err(|err| anyhow!("{}: {err}", self.env))?;
        Ok(())
    }
}

pub fn validate_env(env: &str) -> std::result::Result<(), String> {
    if env.trim().is_empty() {
        return Err("Environment is required".to_string());
    }
    if env.trim() != env || env.contains(['/', '\\']) {
        return Err("Environment must not have surrounding spaces or path separators".to_string());
    }
    Ok(())
}

pub fn validate_address(address: &str) -> std::result::Result<(), String> {
    let url = url::Url::parse(address).map_err(|err| format!("invalid address: {err}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err("address has no host".to_string()),
        scheme => Err(format!("unsupported scheme {scheme}, use http or https")),
    }
}

pub fn validate_identity(auth_connector: &str, user_name: &str) -> std::result::Result<(), String> {
    if auth_connector.trim().is_empty() && user_name.trim().is_empty() {
        return Err("Username OR Auth Connector is required".to_string());
    }
    Ok(())
}

impl Config {
    pub fn find_proxy(&self, env: &str) -> Result<&Proxy> {
        self.proxies
            .iter()
            .find(|proxy| proxy.env == env)
            .ok_or_else(|| ConfigError::EnvNotFound(env.to_string()).into())
    }

    pub fn add_proxy(&mut self, proxy: Proxy) -> Result<()> {
        if self.proxies.iter().any(|existing| existing.env == proxy.env) {
            return Err(ConfigError::DuplicateEnv(proxy.env).into());
        }
        self.proxies.push(proxy);
        Ok(())
    }

    /// Replace the proxy named `env`. The replacement may be renamed, but not
    /// onto another configured env.
    pub fn replace_proxy(&mut self, env: &str, proxy: Proxy) -> Result<()> {
        if proxy.env != env && self.proxies.iter().any(|existing| existing.env == proxy.env) {
            return Err(ConfigError::DuplicateEnv(proxy.env).into());
        }
        let slot = self
            .proxies
            .iter_mut()
            .find(|existing| existing.env == env)
            .ok_or_else(|| ConfigError::EnvNotFound(env.to_string()))?;
        *slot = proxy;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.ui.validate()?;
        let mut seen = std::collections::HashSet::new();
        for proxy in &self.proxies {
            proxy.validate()?;
            if !seen.insert(proxy.env.as_str()) {
                return Err(ConfigError::DuplicateEnv(proxy.env.clone()).into());
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Unable to serialize config")
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| anyhow!("HOME not set"))?;
    Ok(PathBuf::from(home).join(".config").join("hostpick"))
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join("config.toml")
}

pub fn nodes_path(dir: &Path, env: &str) -> PathBuf {
    dir.join("nodes").join(format!("{env}.toml"))
}

pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Unable to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Unable to parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save(path: &Path, config: &Config) -> Result<()> {
    let contents = config.to_toml_string()?;
    write_file(path, &contents)?;
    tracing::info!(path = %path.display(), proxies = config.proxies.len(), "saved config");
    Ok(())
}

pub fn load_nodes(path: &Path) -> Result<Node> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Unable to read node cache: {}", path.display()))?;
    let node: Node = toml::from_str(&contents)
        .with_context(|| format!("Unable to parse node cache: {}", path.display()))?;
    Ok(node)
}

pub fn save_nodes(path: &Path, node: &Node) -> Result<()> {
    let contents = toml::to_string_pretty(node).context("Unable to serialize node cache")?;
    write_file(path, &contents)?;
    tracing::info!(path = %path.display(), nodes = node.items.len(), "saved node cache");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Unable to write file: {}", path.display()))?;
    Ok(())
}

#[derive(Debug)]
pub enum EditOutcome {
    Changed(Config),
    Unchanged,
    Invalid(String),
}

/// Open `initial` in `$EDITOR` (default `vi`) and return the edited text.
pub fn edit_text(dir: &Path, initial: &str) -> Result<String> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    edit_text_with(&editor, dir, initial)
}

fn edit_text_with(editor: &str, dir: &Path, initial: &str) -> Result<String> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Unable to create directory: {}", dir.display()))?;
    // removed when dropped, whichever way this returns
    let scratch = tempfile::Builder::new()
        .prefix("edit-")
        .suffix(".toml")
        .tempfile_in(dir)
        .context("Unable to create scratch file")?;
    fs::write(scratch.path(), initial)
        .with_context(|| format!("Unable to write {}", scratch.path().display()))?;

    let status = Command::new(editor)
        .arg(scratch.path())
        .status()
        .with_context(|| format!("Failed to launch editor {editor}"))?;
    if !status.success() {
        return Err(anyhow!("Editor exited with status {status}"));
    }
    fs::read_to_string(scratch.path())
        .with_context(|| format!("Unable to read {}", scratch.path().display()))
}

/// Check an edited copy of the whole config.
pub fn apply_edit_all(current: &Config, edited: &str) -> EditOutcome {
    let config: Config = match toml::from_str(edited) {
        Ok(config) => config,
        Err(err) => return EditOutcome::Invalid(err.to_string()),
    };
    if let Err(err) = config.validate() {
        return EditOutcome::Invalid(err.to_string());
    }
    if &config == current {
        EditOutcome::Unchanged
    } else {
        EditOutcome::Changed(config)
    }
}

/// Check an edited copy of the proxy named `env` and splice it into the config.
pub fn apply_edit_proxy(current: &Config, env: &str, edited: &str) -> EditOutcome {
    let proxy: Proxy = match toml::from_str(edited) {
        Ok(proxy) => proxy,
        Err(err) => return EditOutcome::Invalid(err.to_string()),
    };
    if let Err(err) = proxy.validate() {
        return EditOutcome::Invalid(err.to_string());
    }
    let mut config = current.clone();
    if let Err(err) = config.replace_proxy(env, proxy) {
        return EditOutcome::Invalid(err.to_string());
    }
    if &config == current {
        EditOutcome::Unchanged
    } else {
        EditOutcome::Changed(config)
    }
}

pub fn proxy_to_toml_string(proxy: &Proxy) -> Result<String> {
    toml::to_string_pretty(proxy).context("Unable to serialize proxy")
}
