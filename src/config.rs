use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::jsonrpc::id::IdStrategy;
use crate::jsonrpc::requester::RequesterOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// ファイルから読み込めるRequester設定
///
/// ```json
/// { "id_strategy": "counter", "timeout_ms": 100, "timeout_message": "Timed out" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequesterConfig {
    pub id_strategy: IdStrategy,
    /// 未指定ならタイムアウトなし
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_message: Option<String>,
}

impl RequesterConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// JSONファイルから設定を読み込み
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded requester config from {}", path.display());
        Self::from_json_str(&text)
    }

    /// `timeout_ms: 0` means no timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    pub fn into_options(self) -> RequesterOptions {
        let mut options = RequesterOptions::new().id_generator(self.id_strategy);
        if let Some(timeout) = self.timeout() {
            options = options.timeout(timeout);
        }
        if let Some(message) = self.timeout_message {
            options = options.timeout_message(message);
        }
        options
    }
}
