//! 卡卡颂共享协议库
//!
//! 包含:
//! - 板块、棋盘、牌堆等核心数据结构
//! - 对局状态机、命令与命令执行器
//! - 消息类型定义与数据包编解码
//! - 字节流分帧 (PacketFramer)
//! - 传输层抽象 (Connector, Connection, Listener traits)

mod board;
mod command;
mod config;
mod constants;
mod error;
mod executor;
mod framer;
mod game;
mod listener;
mod message;
mod packet;
mod player;
mod state;
mod tile;
mod transport;

pub use board::{Board, ChunkId, Direction, Meeple, PlacedTile, Position, Rotation};
pub use command::{
    Command, CommandType, Executable, MasterTurnStarted, PlaceMeeple, PlaceTileDrawn,
    SkipMeeplePlacement,
};
pub use config::GameConfig;
pub use constants::*;
pub use error::{CommandError, DecodeError, FrameError, GameError, ProtocolError, Result};
pub use executor::CommandExecutor;
pub use framer::{PacketFramer, MAX_FRAME_SIZE};
pub use game::{Game, GameRole, GameSnapshot};
pub use listener::{ChannelListener, CommandListener, GameEvent, GameListener};
pub use message::{validate_nickname, Message, MessageType};
pub use packet::{checksum, encode_message, Packet, PacketHeader};
pub use player::{Player, UserId};
pub use state::{GameStateType, GameTurn};
pub use tile::{Edge, Tile, TileConfig, TileStack};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, TcpConnection, TcpConnector,
    TcpListener,
};
