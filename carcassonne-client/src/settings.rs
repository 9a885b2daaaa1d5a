//! 客户端设置
//!
//! 默认保存在系统配置目录下的 `carcassonne/client.json`，
//! 也可以从命令行指定的文件加载。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use protocol::{GameConfig, DEFAULT_PORT};

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 服务器地址
    pub server_addr: String,
    /// 玩家昵称
    pub nickname: String,
    /// 放置板块后是否尝试在中心区块放米宝
    pub place_meeples: bool,
    /// 板块配置文件，必须与服务端一致
    pub game_config: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            nickname: "player".to_string(),
            place_meeples: false,
            game_config: None,
        }
    }
}

impl ClientSettings {
    /// 获取设置文件路径
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("carcassonne");
            path.push("client.json");
            path
        })
    }

    /// 从默认位置加载设置
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            tracing::warn!("无法获取配置目录，使用默认设置");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("设置文件不存在，使用默认设置");
            return Self::default();
        }

        Self::load_from(&path)
    }

    /// 从指定文件加载设置
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    tracing::info!("已加载设置: {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("设置文件格式无效: {}，使用默认设置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取设置文件: {}，使用默认设置", e);
                Self::default()
            }
        }
    }

    /// 保存设置到默认位置
    pub fn save(&self) -> Result<(), String> {
        let Some(path) = Self::settings_path() else {
            return Err("无法获取配置目录".to_string());
        };
        self.save_to(&path)
    }

    /// 保存设置到指定文件
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return Err(format!("无法创建配置目录: {}", e));
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("序列化设置失败: {}", e))?;

        std::fs::write(path, content).map_err(|e| format!("写入设置文件失败: {}", e))?;

        tracing::info!("设置已保存: {:?}", path);
        Ok(())
    }

    /// 加载板块配置
    pub fn load_game_config(&self) -> anyhow::Result<GameConfig> {
        match &self.game_config {
            Some(path) => GameConfig::from_json_file(path),
            None => Ok(GameConfig::standard()),
        }
    }
}
