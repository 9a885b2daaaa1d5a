//! 板块与牌堆

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Direction, Rotation};
use crate::config::GameConfig;

/// 板块边的地形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// 草地
    Field,
    /// 道路
    Road,
    /// 城市
    Town,
}

/// 板块配置（共享配置表中的一项）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfig {
    pub name: String,
    /// 牌堆中的数量
    pub count: u32,
    /// 北、东、南、西四条边
    pub edges: [Edge; 4],
    /// 是否为起始板块
    #[serde(default)]
    pub starting: bool,
}

impl TileConfig {
    pub fn new(name: &str, count: u32, edges: [Edge; 4]) -> Self {
        Self {
            name: name.to_string(),
            count,
            edges,
            starting: false,
        }
    }

    /// 标记为起始板块
    pub fn starting(mut self) -> Self {
        self.starting = true;
        self
    }
}

/// 板块实例
///
/// 只记录它在配置表中的索引和边，主从两端用同一张配置表，
/// 因此索引足以在从端重建同一个板块。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub config_index: u32,
    pub edges: [Edge; 4],
    pub starting: bool,
}

impl Tile {
    /// 从配置创建板块
    pub fn from_config(config_index: u32, config: &TileConfig) -> Self {
        Self {
            config_index,
            edges: config.edges,
            starting: config.starting,
        }
    }

    /// 旋转后某个方向上的边
    pub fn edge(&self, direction: Direction, rotation: Rotation) -> Edge {
        let turns = rotation.quarter_turns();
        self.edges[(direction as usize + 4 - turns) % 4]
    }
}

/// 牌堆
///
/// 主端由配置填充并洗牌；从端只会被复制命令放入刚刚公布的那一块。
#[derive(Debug, Clone, Default)]
pub struct TileStack {
    tiles: VecDeque<Tile>,
}

impl TileStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置中的数量填充
    pub fn fill_from_config(&mut self, config: &GameConfig) {
        for (index, tile_config) in config.tiles.iter().enumerate() {
            for _ in 0..tile_config.count {
                self.tiles.push_back(Tile::from_config(index as u32, tile_config));
            }
        }
    }

    /// 追加板块
    pub fn fill(&mut self, tiles: impl IntoIterator<Item = Tile>) {
        self.tiles.extend(tiles);
    }

    /// 洗牌，起始板块放到最前面
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tiles.make_contiguous().shuffle(rng);

        if let Some(index) = self.tiles.iter().position(|t| t.starting) {
            if let Some(starting) = self.tiles.remove(index) {
                self.tiles.push_front(starting);
            }
        }
    }

    /// 抽出最上面的板块
    pub fn draw(&mut self) -> Option<Tile> {
        self.tiles.pop_front()
    }

    pub fn peek(&self) -> Option<&Tile> {
        self.tiles.front()
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fill_from_config() {
        let config = GameConfig::standard();
        let mut stack = TileStack::new();
        stack.fill_from_config(&config);

        let expected: u32 = config.tiles.iter().map(|t| t.count).sum();
        assert_eq!(stack.len(), expected as usize);
    }

    #[test]
    fn test_shuffle_keeps_starting_tile_first() {
        let config = GameConfig::standard();
        let mut stack = TileStack::new();
        stack.fill_from_config(&config);

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            stack.shuffle(&mut rng);
            assert!(stack.peek().unwrap().starting);
        }
    }

    #[test]
    fn test_edge_rotation() {
        let tile = Tile {
            config_index: 0,
            edges: [Edge::Town, Edge::Road, Edge::Field, Edge::Road],
            starting: false,
        };

        assert_eq!(tile.edge(Direction::North, Rotation::R0), Edge::Town);
        // 顺时针转 90 度后城市朝东
        assert_eq!(tile.edge(Direction::East, Rotation::R90), Edge::Town);
        assert_eq!(tile.edge(Direction::North, Rotation::R90), Edge::Road);
        assert_eq!(tile.edge(Direction::South, Rotation::R180), Edge::Town);
        assert_eq!(tile.edge(Direction::West, Rotation::R270), Edge::Town);
    }

    #[test]
    fn test_draw_order() {
        let mut stack = TileStack::new();
        let a = Tile { config_index: 1, edges: [Edge::Field; 4], starting: false };
        let b = Tile { config_index: 2, edges: [Edge::Road; 4], starting: false };
        stack.fill([a, b]);

        assert_eq!(stack.draw(), Some(a));
        assert_eq!(stack.draw(), Some(b));
        assert!(stack.draw().is_none());
        assert!(stack.is_empty());
    }
}
