//! 游戏命令
//!
//! 命令既用于修改对局，也原样复制给远端。线上格式为
//! `[命令类型: u32 大端][bincode 命令体]`，命令类型与消息类型 ID 相互独立。

use serde::{Deserialize, Serialize};

use crate::board::{ChunkId, Position, Rotation};
use crate::error::{CommandError, DecodeError};
use crate::game::{Game, GameRole};
use crate::state::GameStateType;

/// 命令类型（稳定的整数编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum CommandType {
    MasterTurnStarted = 0,
    PlaceTileDrawn = 1,
    PlaceMeeple = 2,
    SkipMeeplePlacement = 3,
}

impl CommandType {
    pub const ALL: [CommandType; 4] = [
        CommandType::MasterTurnStarted,
        CommandType::PlaceTileDrawn,
        CommandType::PlaceMeeple,
        CommandType::SkipMeeplePlacement,
    ];

    pub fn value(self) -> u32 {
        self as u32
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.value() == value)
    }

    /// 命令唯一合法的阶段（由状态机的允许列表决定）
    pub fn required_state(self) -> GameStateType {
        GameStateType::ALL
            .into_iter()
            .find(|state| state.allows(self))
            .unwrap_or(GameStateType::GameOver)
    }
}

/// 可执行的命令
///
/// 阶段与回合归属由 [`CommandExecutor`](crate::CommandExecutor) 检查，
/// 这里只负责命令自身的合法性和效果。
pub trait Executable {
    fn command_type(&self) -> CommandType;

    /// 检查命令能否执行，不修改对局
    fn can_be_executed(&self, game: &Game) -> Result<(), CommandError>;

    /// 执行命令
    fn execute(&self, game: &mut Game) -> Result<(), CommandError>;
}

/// 主端公布本回合抽到的板块（只在从端执行）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterTurnStarted {
    /// 板块在配置表中的索引，而不是它在牌堆中的位置
    pub tile_index: u32,
}

impl Executable for MasterTurnStarted {
    fn command_type(&self) -> CommandType {
        CommandType::MasterTurnStarted
    }

    fn can_be_executed(&self, game: &Game) -> Result<(), CommandError> {
        let len = game.config().tiles.len();
        if self.tile_index as usize >= len {
            return Err(CommandError::TileIndexOutOfRange {
                index: self.tile_index,
                len,
            });
        }
        if game.role() != GameRole::Slave {
            return Err(CommandError::WrongRole {
                command: self.command_type(),
                role: game.role(),
            });
        }
        Ok(())
    }

    fn execute(&self, game: &mut Game) -> Result<(), CommandError> {
        let len = game.config().tiles.len();
        let tile = game
            .config()
            .create_tile(self.tile_index)
            .ok_or(CommandError::TileIndexOutOfRange {
                index: self.tile_index,
                len,
            })?;
        game.receive_replicated_tile(tile);
        game.begin_turn()?;
        Ok(())
    }
}

/// 放置本回合抽到的板块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceTileDrawn {
    pub position: Position,
    pub rotation: Rotation,
}

impl Executable for PlaceTileDrawn {
    fn command_type(&self) -> CommandType {
        CommandType::PlaceTileDrawn
    }

    fn can_be_executed(&self, game: &Game) -> Result<(), CommandError> {
        let tile = game.turn().tile_drawn.ok_or(CommandError::NoTileDrawn)?;
        if !game.board().can_place(&tile, self.position, self.rotation) {
            return Err(CommandError::IllegalPlacement {
                position: self.position,
                rotation: self.rotation,
            });
        }
        Ok(())
    }

    fn execute(&self, game: &mut Game) -> Result<(), CommandError> {
        game.place_drawn_tile(self.position, self.rotation)
    }
}

/// 在刚放置的板块上放米宝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceMeeple {
    pub chunk: ChunkId,
}

impl Executable for PlaceMeeple {
    fn command_type(&self) -> CommandType {
        CommandType::PlaceMeeple
    }

    fn can_be_executed(&self, game: &Game) -> Result<(), CommandError> {
        let position = game.turn().placed_at.ok_or(CommandError::NoTileDrawn)?;
        let player = game
            .turn_executor()
            .map(|p| p.id)
            .ok_or(CommandError::NoTileDrawn)?;
        game.check_meeple_placement(player, position, self.chunk)
    }

    fn execute(&self, game: &mut Game) -> Result<(), CommandError> {
        game.place_meeple(self.chunk)
    }
}

/// 跳过米宝放置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipMeeplePlacement;

impl Executable for SkipMeeplePlacement {
    fn command_type(&self) -> CommandType {
        CommandType::SkipMeeplePlacement
    }

    fn can_be_executed(&self, _game: &Game) -> Result<(), CommandError> {
        Ok(())
    }

    fn execute(&self, game: &mut Game) -> Result<(), CommandError> {
        game.skip_meeple()
    }
}

/// 所有命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MasterTurnStarted(MasterTurnStarted),
    PlaceTileDrawn(PlaceTileDrawn),
    PlaceMeeple(PlaceMeeple),
    SkipMeeplePlacement(SkipMeeplePlacement),
}

impl Command {
    /// 命令类型字段的长度
    pub const TYPE_SIZE: usize = 4;

    pub fn master_turn_started(tile_index: u32) -> Self {
        Command::MasterTurnStarted(MasterTurnStarted { tile_index })
    }

    pub fn place_tile(position: Position, rotation: Rotation) -> Self {
        Command::PlaceTileDrawn(PlaceTileDrawn { position, rotation })
    }

    pub fn place_meeple(chunk: ChunkId) -> Self {
        Command::PlaceMeeple(PlaceMeeple { chunk })
    }

    pub fn skip_meeple() -> Self {
        Command::SkipMeeplePlacement(SkipMeeplePlacement)
    }

    fn inner(&self) -> &dyn Executable {
        match self {
            Command::MasterTurnStarted(c) => c,
            Command::PlaceTileDrawn(c) => c,
            Command::PlaceMeeple(c) => c,
            Command::SkipMeeplePlacement(c) => c,
        }
    }

    pub fn required_state(&self) -> GameStateType {
        self.command_type().required_state()
    }

    /// 编码为 `[类型][命令体]`
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        let mut bytes = self.command_type().value().to_be_bytes().to_vec();
        match self {
            Command::MasterTurnStarted(c) => bincode::serialize_into(&mut bytes, c)?,
            Command::PlaceTileDrawn(c) => bincode::serialize_into(&mut bytes, c)?,
            Command::PlaceMeeple(c) => bincode::serialize_into(&mut bytes, c)?,
            Command::SkipMeeplePlacement(c) => bincode::serialize_into(&mut bytes, c)?,
        }
        Ok(bytes)
    }

    /// 从 `[类型][命令体]` 解码
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < Self::TYPE_SIZE {
            return Err(DecodeError::Truncated {
                needed: Self::TYPE_SIZE,
                actual: bytes.len(),
            });
        }

        let (type_bytes, body) = bytes.split_at(Self::TYPE_SIZE);
        let value = u32::from_be_bytes([type_bytes[0], type_bytes[1], type_bytes[2], type_bytes[3]]);
        let command_type =
            CommandType::from_value(value).ok_or(DecodeError::UnknownCommandType(value))?;

        let command = match command_type {
            CommandType::MasterTurnStarted => {
                Command::MasterTurnStarted(bincode::deserialize(body)?)
            }
            CommandType::PlaceTileDrawn => Command::PlaceTileDrawn(bincode::deserialize(body)?),
            CommandType::PlaceMeeple => Command::PlaceMeeple(bincode::deserialize(body)?),
            CommandType::SkipMeeplePlacement => {
                Command::SkipMeeplePlacement(bincode::deserialize(body)?)
            }
        };
        Ok(command)
    }
}

impl Executable for Command {
    fn command_type(&self) -> CommandType {
        self.inner().command_type()
    }

    fn can_be_executed(&self, game: &Game) -> Result<(), CommandError> {
        self.inner().can_be_executed(game)
    }

    fn execute(&self, game: &mut Game) -> Result<(), CommandError> {
        self.inner().execute(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use std::sync::Arc;

    #[test]
    fn test_command_type_round_trip() {
        for command_type in CommandType::ALL {
            assert_eq!(
                CommandType::from_value(command_type.value()),
                Some(command_type)
            );
        }
        assert_eq!(CommandType::from_value(CommandType::ALL.len() as u32), None);
    }

    #[test]
    fn test_command_type_values_are_unique() {
        let mut values: Vec<u32> = CommandType::ALL.iter().map(|t| t.value()).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), CommandType::ALL.len());
    }

    #[test]
    fn test_command_encoding_starts_with_type() {
        let command = Command::place_tile(Position::new(1, -2), Rotation::R270);
        let bytes = command.encode().unwrap();
        assert_eq!(&bytes[..4], &1u32.to_be_bytes());
        assert_eq!(Command::decode(&bytes).unwrap(), command);

        let skip = Command::skip_meeple().encode().unwrap();
        assert_eq!(skip, 3u32.to_be_bytes().to_vec());
        assert_eq!(Command::decode(&skip).unwrap(), Command::skip_meeple());
    }

    #[test]
    fn test_decode_unknown_command_type() {
        let bytes = 42u32.to_be_bytes();
        assert!(matches!(
            Command::decode(&bytes),
            Err(DecodeError::UnknownCommandType(42))
        ));
        assert!(matches!(
            Command::decode(&[0, 0]),
            Err(DecodeError::Truncated { needed: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_master_turn_started_is_slave_only() {
        let master = Game::new(Arc::new(GameConfig::standard()), GameRole::Master, ());
        let command = Command::master_turn_started(1);
        assert_eq!(
            command.can_be_executed(&master),
            Err(CommandError::WrongRole {
                command: CommandType::MasterTurnStarted,
                role: GameRole::Master,
            })
        );
    }

    #[test]
    fn test_master_turn_started_checks_index_first() {
        let master = Game::new(Arc::new(GameConfig::standard()), GameRole::Master, ());
        let len = master.config().tiles.len();
        let err = Command::master_turn_started(len as u32)
            .can_be_executed(&master)
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::TileIndexOutOfRange {
                index: len as u32,
                len
            }
        );
        assert!(err.is_fatal());
    }
}
