//! 对局配置
//!
//! 板块配置表在主从两端必须完全一致：复制命令只传输板块在表中的索引。

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PLAYERS, MEEPLES_PER_PLAYER, MIN_PLAYERS};
use crate::tile::Edge::{Field as F, Road as R, Town as T};
use crate::tile::{Tile, TileConfig};

/// 对局配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub meeples_per_player: u32,
    /// 有序的板块配置表
    pub tiles: Vec<TileConfig>,
}

impl GameConfig {
    /// 内置的标准板块集
    pub fn standard() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            meeples_per_player: MEEPLES_PER_PLAYER,
            tiles: vec![
                TileConfig::new("start", 1, [T, R, F, R]).starting(),
                TileConfig::new("town_road_straight", 3, [T, R, F, R]),
                TileConfig::new("town_cap", 5, [T, F, F, F]),
                TileConfig::new("town_corner", 5, [T, T, F, F]),
                TileConfig::new("town_opposite", 3, [T, F, T, F]),
                TileConfig::new("town_three", 4, [T, T, F, T]),
                TileConfig::new("town_three_road", 3, [T, T, R, T]),
                TileConfig::new("town_full", 1, [T, T, T, T]),
                TileConfig::new("town_curve_left", 3, [T, F, R, R]),
                TileConfig::new("town_curve_right", 3, [T, R, R, F]),
                TileConfig::new("road_straight", 8, [R, F, R, F]),
                TileConfig::new("road_curve", 9, [F, F, R, R]),
                TileConfig::new("road_junction", 4, [F, R, R, R]),
                TileConfig::new("road_cross", 1, [R, R, R, R]),
                TileConfig::new("monastery", 4, [F, F, F, F]),
                TileConfig::new("monastery_road", 2, [F, F, R, F]),
            ],
        }
    }

    /// 从 JSON 字符串读取
    pub fn from_json(content: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(content).context("解析对局配置失败")?;
        if !config.tiles.iter().any(|t| t.starting) {
            anyhow::bail!("对局配置中没有起始板块");
        }
        Ok(config)
    }

    /// 从 JSON 文件读取
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取对局配置失败: {:?}", path))?;
        Self::from_json(&content)
    }

    /// 按索引创建板块
    pub fn create_tile(&self, index: u32) -> Option<Tile> {
        self.tiles
            .get(index as usize)
            .map(|config| Tile::from_config(index, config))
    }

    /// 牌堆总数
    pub fn total_tiles(&self) -> usize {
        self.tiles.iter().map(|t| t.count as usize).sum()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::standard()
    }
}
