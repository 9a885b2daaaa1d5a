//! 棋盘状态

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::player::UserId;
use crate::tile::Tile;

/// 棋盘坐标（y 轴向北）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// 起始板块的位置
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 相邻格子，坐标越界时为 `None`
    pub fn neighbour(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        Some(Position::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 方向（与板块边的顺序一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }
}

/// 顺时针旋转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn quarter_turns(self) -> usize {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }
}

/// 板块上可以放置米宝的区块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkId {
    Center,
    North,
    East,
    South,
    West,
}

impl ChunkId {
    pub const ALL: [ChunkId; 5] = [
        ChunkId::Center,
        ChunkId::North,
        ChunkId::East,
        ChunkId::South,
        ChunkId::West,
    ];
}

/// 已放置的米宝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeple {
    pub owner: UserId,
    pub chunk: ChunkId,
}

/// 已放置的板块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub tile: Tile,
    pub position: Position,
    pub rotation: Rotation,
    pub meeples: Vec<Meeple>,
}

impl PlacedTile {
    /// 某个区块上的米宝
    pub fn meeple_at(&self, chunk: ChunkId) -> Option<&Meeple> {
        self.meeples.iter().find(|m| m.chunk == chunk)
    }
}

/// 棋盘
///
/// 使用有序表保存，遍历顺序确定，主从两端找到的"第一个空位"一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    tiles: BTreeMap<Position, PlacedTile>,
}

impl Board {
    /// 创建空棋盘
    pub fn new() -> Self {
        Self::default()
    }

    /// 从快照中的板块列表重建
    pub fn from_tiles(tiles: impl IntoIterator<Item = PlacedTile>) -> Self {
        Self {
            tiles: tiles.into_iter().map(|t| (t.position, t)).collect(),
        }
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

    pub fn get(&self, position: Position) -> Option<&PlacedTile> {
        self.tiles.get(&position)
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut PlacedTile> {
        self.tiles.get_mut(&position)
    }

    /// 按坐标顺序遍历所有板块
    pub fn tiles(&self) -> impl Iterator<Item = &PlacedTile> {
        self.tiles.values()
    }

    /// 放置起始板块
    pub fn place_starting(&mut self, tile: Tile) {
        self.tiles.insert(
            Position::ORIGIN,
            PlacedTile {
                tile,
                position: Position::ORIGIN,
                rotation: Rotation::R0,
                meeples: Vec::new(),
            },
        );
    }

    /// 检查板块能否放在该位置
    pub fn can_place(&self, tile: &Tile, position: Position, rotation: Rotation) -> bool {
        if self.tiles.contains_key(&position) {
            return false;
        }

        let mut has_neighbour = false;
        for direction in Direction::ALL {
            let neighbour = position
                .neighbour(direction)
                .and_then(|p| self.tiles.get(&p));
            if let Some(neighbour) = neighbour {
                has_neighbour = true;
                let facing = neighbour.tile.edge(direction.opposite(), neighbour.rotation);
                if tile.edge(direction, rotation) != facing {
                    return false;
                }
            }
        }

        has_neighbour
    }

    /// 放置板块
    pub fn place(
        &mut self,
        tile: Tile,
        position: Position,
        rotation: Rotation,
    ) -> Result<&PlacedTile, CommandError> {
        if !self.can_place(&tile, position, rotation) {
            return Err(CommandError::IllegalPlacement { position, rotation });
        }

        Ok(self.tiles.entry(position).or_insert(PlacedTile {
            tile,
            position,
            rotation,
            meeples: Vec::new(),
        }))
    }

    /// 枚举所有合法放置（按棋盘顺序、北东南西、旋转顺序）
    pub fn find_free_places(&self, tile: &Tile) -> Vec<(Position, Rotation)> {
        let mut visited = BTreeSet::new();
        let mut places = Vec::new();

        for placed in self.tiles.values() {
            for direction in Direction::ALL {
                let Some(candidate) = placed.position.neighbour(direction) else {
                    continue;
                };
                if self.tiles.contains_key(&candidate) || !visited.insert(candidate) {
                    continue;
                }
                for rotation in Rotation::ALL {
                    if self.can_place(tile, candidate, rotation) {
                        places.push((candidate, rotation));
                    }
                }
            }
        }

        places
    }

    /// 第一个合法放置
    pub fn first_free_place(&self, tile: &Tile) -> Option<(Position, Rotation)> {
        self.find_free_places(tile).into_iter().next()
    }

    /// 是否存在合法放置
    pub fn has_free_place(&self, tile: &Tile) -> bool {
        self.first_free_place(tile).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Edge;

    fn tile(edges: [Edge; 4]) -> Tile {
        Tile { config_index: 0, edges, starting: false }
    }

    fn start_board() -> Board {
        let mut board = Board::new();
        board.place_starting(Tile {
            config_index: 0,
            edges: [Edge::Town, Edge::Road, Edge::Field, Edge::Road],
            starting: true,
        });
        board
    }

    #[test]
    fn test_place_requires_neighbour() {
        let board = start_board();
        let road = tile([Edge::Road, Edge::Field, Edge::Road, Edge::Field]);

        assert!(!board.can_place(&road, Position::new(5, 5), Rotation::R0));
    }

    #[test]
    fn test_place_matches_edges() {
        let mut board = start_board();
        let straight = tile([Edge::Road, Edge::Field, Edge::Road, Edge::Field]);

        // 东侧需要朝西的道路：旋转 90 度后道路为东西走向
        assert!(!board.can_place(&straight, Position::new(1, 0), Rotation::R0));
        assert!(board.can_place(&straight, Position::new(1, 0), Rotation::R90));

        board.place(straight, Position::new(1, 0), Rotation::R90).unwrap();
        assert_eq!(board.len(), 2);

        // 已被占用
        let err = board.place(straight, Position::new(1, 0), Rotation::R90).unwrap_err();
        assert!(matches!(err, CommandError::IllegalPlacement { .. }));
    }

    #[test]
    fn test_neighbour_at_coordinate_limits() {
        let corner = Position::new(i32::MAX, i32::MIN);
        assert_eq!(corner.neighbour(Direction::East), None);
        assert_eq!(corner.neighbour(Direction::South), None);
        assert_eq!(
            corner.neighbour(Direction::West),
            Some(Position::new(i32::MAX - 1, i32::MIN))
        );

        let board = start_board();
        let road = tile([Edge::Road, Edge::Field, Edge::Road, Edge::Field]);
        for rotation in Rotation::ALL {
            assert!(!board.can_place(&road, corner, rotation));
        }
    }

    #[test]
    fn test_find_free_places_is_deterministic() {
        let board = start_board();
        let field = tile([Edge::Field; 4]);

        // 只有南侧是草地
        let places = board.find_free_places(&field);
        assert!(!places.is_empty());
        assert!(places.iter().all(|(p, _)| *p == Position::new(0, -1)));
        assert_eq!(board.first_free_place(&field), places.first().copied());
        assert_eq!(places, board.find_free_places(&field));
    }

    #[test]
    fn test_no_free_place() {
        let board = start_board();
        let full_town = tile([Edge::Town; 4]);

        // 北侧的城市边可以接上
        assert!(board.has_free_place(&full_town));

        let mut board = Board::new();
        board.place_starting(tile([Edge::Field; 4]));
        assert!(!board.has_free_place(&full_town));
    }
}
