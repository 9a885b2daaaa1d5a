//! 对局状态机与回合

use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::command::CommandType;
use crate::tile::Tile;

/// 对局阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStateType {
    /// 等待回合开始（主端抽牌，从端等待主端公布板块）
    TurnStart,
    /// 等待放置抽到的板块
    PlaceTile,
    /// 等待放置米宝（可跳过）
    PlaceMeeple,
    /// 回合结束，轮转到下一名玩家
    TurnEnd,
    /// 对局结束
    GameOver,
}

impl GameStateType {
    pub const ALL: [GameStateType; 5] = [
        GameStateType::TurnStart,
        GameStateType::PlaceTile,
        GameStateType::PlaceMeeple,
        GameStateType::TurnEnd,
        GameStateType::GameOver,
    ];

    /// 该阶段允许的命令
    pub fn allowed_commands(self) -> &'static [CommandType] {
        match self {
            GameStateType::TurnStart => &[CommandType::MasterTurnStarted],
            GameStateType::PlaceTile => &[CommandType::PlaceTileDrawn],
            GameStateType::PlaceMeeple => {
                &[CommandType::PlaceMeeple, CommandType::SkipMeeplePlacement]
            }
            GameStateType::TurnEnd | GameStateType::GameOver => &[],
        }
    }

    /// 该阶段是否允许某类命令
    pub fn allows(self, command: CommandType) -> bool {
        self.allowed_commands().contains(&command)
    }
}

/// 回合状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTurn {
    /// 必须行动的玩家（玩家列表下标）
    pub player_index: usize,
    /// 回合序号
    pub number: u32,
    /// 本回合抽到的板块
    pub tile_drawn: Option<Tile>,
    /// 本回合放置板块的位置
    pub placed_at: Option<Position>,
    /// 本回合是否已结束
    pub over: bool,
}

impl GameTurn {
    /// 开始新回合
    pub fn begin(&mut self, tile: Tile) {
        self.number += 1;
        self.tile_drawn = Some(tile);
        self.placed_at = None;
        self.over = false;
    }

    /// 结束回合并轮转到下一名玩家
    pub fn end(&mut self, player_count: usize) {
        self.over = true;
        self.tile_drawn = None;
        if player_count > 0 {
            self.player_index = (self.player_index + 1) % player_count;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
