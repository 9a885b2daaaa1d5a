//! 影子对局与自动出牌

mod logger;
mod state;

pub use logger::GameLogger;
pub use state::{ClientError, ClientGame, ClientPhase};
