//! 服务端配置
//!
//! 可以从命令行指定的 JSON 文件加载，缺失的字段使用默认值。

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use protocol::{GameConfig, DEFAULT_PORT, MIN_PLAYERS};

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 每局人数
    pub players_per_match: usize,
    /// 终局存档目录，未设置时使用系统数据目录
    pub results_dir: Option<PathBuf>,
    /// 是否保存终局存档
    pub archive_results: bool,
    /// 板块配置文件，未设置时使用内置标准板块集
    pub game_config: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            players_per_match: MIN_PLAYERS,
            results_dir: None,
            archive_results: true,
            game_config: None,
        }
    }
}

impl ServerConfig {
    /// 加载配置，读取失败时使用默认配置
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    tracing::info!("已加载配置: {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("配置文件格式无效: {}，使用默认配置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取配置文件: {}，使用默认配置", e);
                Self::default()
            }
        }
    }

    /// 监听地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 加载板块配置
    pub fn load_game_config(&self) -> Result<GameConfig> {
        let config = match &self.game_config {
            Some(path) => GameConfig::from_json_file(path)?,
            None => GameConfig::standard(),
        };

        if self.players_per_match < config.min_players
            || self.players_per_match > config.max_players
        {
            anyhow::bail!(
                "每局人数 {} 超出范围 {}..={}",
                self.players_per_match,
                config.min_players,
                config.max_players
            );
        }
        Ok(config)
    }
}
