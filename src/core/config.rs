use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment override for the endpoint base URL.
pub const ENV_BASE_URL: &str = "MMCHAT_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Chat-completions endpoint base URL.
    pub base_url: Option<String>,
    /// Model identifier; omitted from requests when the endpoint is pinned
    /// to a single deployment.
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to_path(&Self::config_path())
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "mmchat")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Base URL resolution: CLI flag, then environment, then config file.
    pub fn resolve_base_url(&self, flag: Option<&str>) -> Option<String> {
        if let Some(url) = flag {
            return Some(url.to_string());
        }
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.is_empty() {
                return Some(url);
            }
        }
        self.base_url.clone()
    }

    /// Apply a `set` command. Keys use the CLI spelling.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "model" => self.model = Some(value.to_string()),
            "system-prompt" => self.system_prompt = Some(value.to_string()),
            "temperature" => {
                self.temperature =
                    Some(value.parse().map_err(|_| format!("invalid number: {value}"))?)
            }
            "top-p" => {
                self.top_p = Some(value.parse().map_err(|_| format!("invalid number: {value}"))?)
            }
            "max-tokens" => {
                self.max_tokens =
                    Some(value.parse().map_err(|_| format!("invalid number: {value}"))?)
            }
            _ => return Err(format!("unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = None,
            "model" => self.model = None,
            "system-prompt" => self.system_prompt = None,
            "temperature" => self.temperature = None,
            "top-p" => self.top_p = None,
            "max-tokens" => self.max_tokens = None,
            _ => return Err(format!("unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset)"),
        }
        match &self.model {
            Some(model) => println!("  model: {model}"),
            None => println!("  model: (unset)"),
        }
        match &self.system_prompt {
            Some(prompt) => println!("  system-prompt: {prompt}"),
            None => println!("  system-prompt: (default)"),
        }
        match self.temperature {
            Some(t) => println!("  temperature: {t}"),
            None => println!("  temperature: (default)"),
        }
        match self.top_p {
            Some(p) => println!("  top-p: {p}"),
            None => println!("  top-p: (default)"),
        }
        match self.max_tokens {
            Some(n) => println!("  max-tokens: {n}"),
            None => println!("  max-tokens: (default)"),
        }
    }
}
