//! 卡卡颂无界面客户端
//!
//! 包含:
//! - 客户端设置
//! - 影子对局（重放服务端命令，轮到自己时自动出牌）
//! - 服务器连接

pub mod game;
pub mod network;
pub mod settings;

pub use game::{ClientError, ClientGame, ClientPhase, GameLogger};
pub use network::ServerConnection;
pub use settings::ClientSettings;
