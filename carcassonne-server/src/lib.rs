//! 卡卡颂服务端
//!
//! 包含:
//! - 会话管理
//! - 匹配队列
//! - 对局编排（权威对局、命令广播、断线代打）
//! - 终局存档

pub mod archive;
pub mod config;
pub mod game_match;
pub mod matchmaking;
pub mod server;
pub mod session;

pub use archive::{MatchResult, ResultArchive};
pub use config::ServerConfig;
pub use game_match::{Match, MatchId};
pub use matchmaking::Matchmaking;
pub use server::{
    lock_room, MatchRoom, MessageHandler, PendingMessages, Senders, Server, ServerState,
    SessionError, SharedRoom,
};
pub use session::{ClientSession, SessionManager, SessionStatus};
