use std::path::{Path, PathBuf};

use datachat_core::{ChatError, Model};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_PATH: &str = "datachat.toml";
const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub model: Model,
    pub task_id: Option<String>,
    pub file_name: Option<String>,
    pub http_proxy: String,
    pub https_proxy: String,
    /// Applies to request/response calls only, never to the stream.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            model: Model::default(),
            task_id: None,
            file_name: None,
            http_proxy: String::new(),
            https_proxy: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".datachat").join("config.toml"))
}

impl ClientConfig {
    /// Defaults, then `datachat.toml` (or `~/.datachat/config.toml`), then environment.
    pub fn load() -> Self {
        let mut config = Self::default();

        let candidates = std::iter::once(PathBuf::from(CONFIG_FILE_PATH)).chain(user_config_path());
        for path in candidates {
            if let Some(file_config) = Self::read_file(&path) {
                config = file_config;
                break;
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn read_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("Failed to read {}: {}", path.display(), err);
                return None;
            }
        };
        match toml::from_str::<Self>(&content) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(err) => {
                log::warn!("Ignoring invalid config {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATACHAT_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(model) = lookup("DATACHAT_MODEL") {
            match model.parse() {
                Ok(model) => self.model = model,
                Err(err) => log::warn!("Ignoring DATACHAT_MODEL: {}", err),
            }
        }
        if let Some(task_id) = lookup("DATACHAT_TASK_ID") {
            self.task_id = Some(task_id);
        }
        if let Some(file_name) = lookup("DATACHAT_FILE_NAME") {
            self.file_name = Some(file_name);
        }
        if let Some(http_proxy) = lookup("HTTP_PROXY") {
            self.http_proxy = http_proxy;
        }
        if let Some(https_proxy) = lookup("HTTPS_PROXY") {
            self.https_proxy = https_proxy;
        }
        if let Some(timeout) = lookup("DATACHAT_REQUEST_TIMEOUT_SECS") {
            match timeout.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(err) => log::warn!("Ignoring DATACHAT_REQUEST_TIMEOUT_SECS: {}", err),
            }
        }
    }

    /// Task id and file name the chat is bound to.
    pub fn target(&self) -> Result<(&str, &str), ChatError> {
        let task_id = self.task_id.as_deref().filter(|s| !s.trim().is_empty());
        let file_name = self.file_name.as_deref().filter(|s| !s.trim().is_empty());
        match (task_id, file_name) {
            (Some(task_id), Some(file_name)) => Ok((task_id, file_name)),
            _ => Err(ChatError::Config(
                "missing task id or file name".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: ClientConfig = toml::from_str(
            r#"
            server_url = "http://files:9000"
            model = "deepseek"
            task_id = "from-file"
            "#,
        )
        .unwrap();

        config.apply_env(env(&[
            ("DATACHAT_MODEL", "Ollama"),
            ("DATACHAT_TASK_ID", "from-env"),
            ("DATACHAT_FILE_NAME", "out.csv"),
        ]));

        assert_eq!(config.server_url, "http://files:9000");
        assert_eq!(config.model, Model::Ollama);
        assert_eq!(config.target().unwrap(), ("from-env", "out.csv"));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut config = ClientConfig::default();
        config.apply_env(env(&[
            ("DATACHAT_MODEL", "gpt-9"),
            ("DATACHAT_REQUEST_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.model, Model::Deepseek);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn missing_target_is_a_config_error() {
        let mut config = ClientConfig::default();
        assert!(matches!(config.target(), Err(ChatError::Config(_))));

        config.task_id = Some("t".into());
        config.file_name = Some("  ".into());
        assert!(config.target().is_err());

        config.file_name = Some("f.csv".into());
        assert_eq!(config.target().unwrap(), ("t", "f.csv"));
    }

    #[test]
    fn reads_config_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server_url = \"http://disk:1\"\nrequest_timeout_secs = 5\n").unwrap();

        let config = ClientConfig::read_file(&path).unwrap();
        assert_eq!(config.server_url, "http://disk:1");
        assert_eq!(config.request_timeout_secs, 5);

        std::fs::write(&path, "server_url = [").unwrap();
        assert!(ClientConfig::read_file(&path).is_none());
    }
}
