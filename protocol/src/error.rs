//! 错误类型定义

use thiserror::Error;

use crate::board::{ChunkId, Position, Rotation};
use crate::command::CommandType;
use crate::game::GameRole;
use crate::player::UserId;
use crate::state::GameStateType;

/// 帧错误（致命，连接必须关闭）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// 魔数不匹配，字节流已失去对齐
    #[error("Bad frame magic: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic { expected: u32, actual: u32 },

    /// 负载超过上限
    #[error("Payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// 校验和不一致
    #[error("Checksum mismatch: header says {expected:#010x}, payload hashes to {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

/// 解码错误（逻辑错误，丢弃该消息但保留连接）
#[derive(Error, Debug)]
pub enum DecodeError {
    /// 未知的消息类型
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u32),

    /// 未知的命令类型
    #[error("Unknown command type: {0}")]
    UnknownCommandType(u32),

    /// 负载被截断
    #[error("Truncated payload: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// 负载内容反序列化失败
    #[error("Bincode payload error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// 对局规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// 玩家不足
    #[error("Not enough players: {count} (min: {min})")]
    NotEnoughPlayers { count: usize, min: usize },

    /// 玩家过多
    #[error("Too many players (max: {max})")]
    TooManyPlayers { max: usize },

    /// 对局已开始
    #[error("Game is already started")]
    AlreadyStarted,

    /// 对局未开始
    #[error("Game is not started")]
    NotStarted,

    /// 对局已结束
    #[error("Game is already over")]
    GameOver,

    /// 只有权威端可以执行的操作
    #[error("Operation '{0}' is reserved to the master game")]
    MasterOnly(&'static str),

    /// 牌堆配置中没有起始板块
    #[error("Tile configuration has no starting tile")]
    NoStartingTile,

    /// 主从状态已经分叉
    #[error("Master/slave desync: {0}")]
    Desync(String),
}

/// 命令执行错误
///
/// 大多数变体是可恢复的拒绝；[`CommandError::is_fatal`] 为真的变体
/// 说明主从状态已经不一致，调用方必须高声报告。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// 不是该玩家的回合
    #[error("Player {user} is not the turn holder (turn holder: {turn_holder})")]
    NotYourTurn { user: UserId, turn_holder: UserId },

    /// 玩家不在对局中
    #[error("Player {0} is not part of this game")]
    UnknownPlayer(UserId),

    /// 当前阶段不允许该命令
    #[error("Command requires state {required:?} but game is in {actual:?}")]
    WrongState {
        required: GameStateType,
        actual: GameStateType,
    },

    /// 本回合还没有抽到板块
    #[error("No tile has been drawn this turn")]
    NoTileDrawn,

    /// 板块不能放在该位置
    #[error("Tile cannot be placed at {position} with rotation {rotation:?}")]
    IllegalPlacement { position: Position, rotation: Rotation },

    /// 米宝已用完
    #[error("Player {0} has no meeple left")]
    NoMeepleLeft(UserId),

    /// 该区块已被占用
    #[error("Chunk {0:?} of the placed tile is already occupied")]
    ChunkOccupied(ChunkId),

    /// 复制命令引用了越界的板块配置
    #[error("Tile config index {index} is out of range (config has {len} tiles)")]
    TileIndexOutOfRange { index: u32, len: usize },

    /// 命令在错误的一端执行
    #[error("Command {command:?} cannot be executed on a {role:?} game")]
    WrongRole { command: CommandType, role: GameRole },

    /// 对局层面的错误
    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

impl CommandError {
    /// 是否为主从失步（协议/编程错误），而不是普通的拒绝
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CommandError::TileIndexOutOfRange { .. }
                | CommandError::WrongRole { .. }
                | CommandError::Game(GameError::Desync(_))
        )
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 帧错误
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// 解码错误
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 昵称为空
    #[error("Nickname is empty")]
    NicknameEmpty,

    /// 昵称过长
    #[error("Nickname too long: {len} chars (max: {max})")]
    NicknameTooLong { len: usize, max: usize },
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
