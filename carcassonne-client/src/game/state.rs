//! 客户端游戏状态
//!
//! 客户端持有一份影子对局，只重放服务端广播的命令；
//! 轮到自己时自动选择第一个合法位置放置板块。

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use protocol::{
    ChunkId, Command, CommandError, CommandExecutor, Game, GameConfig, GameError, GameSnapshot,
    GameStateType, Message, MessageType, Player, UserId,
};

use super::logger::GameLogger;

/// 客户端所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// 等待握手回应
    Handshake,
    /// 已登录，未排队
    Lobby,
    /// 匹配队列中
    Queued,
    /// 对局中
    Playing,
    /// 收到终局结果
    Finished,
}

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Unexpected message {message:?} while {phase:?}")]
    Unexpected {
        message: MessageType,
        phase: ClientPhase,
    },

    #[error("Matchmaking failed: {0}")]
    Matchmaking(String),

    #[error("Replicated command failed: {0}")]
    Replication(#[from] CommandError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

/// 客户端游戏状态
pub struct ClientGame {
    config: Arc<GameConfig>,
    nickname: String,
    user_id: Option<UserId>,
    phase: ClientPhase,
    game: Option<Game>,
    executor: CommandExecutor,
    place_meeples: bool,
    result: Option<GameSnapshot>,
}

impl ClientGame {
    pub fn new(config: Arc<GameConfig>, nickname: impl Into<String>) -> Self {
        Self {
            config,
            nickname: nickname.into(),
            user_id: None,
            phase: ClientPhase::Handshake,
            game: None,
            executor: CommandExecutor::default(),
            place_meeples: false,
            result: None,
        }
    }

    /// 放置板块后是否尝试放米宝
    pub fn with_meeples(mut self, place_meeples: bool) -> Self {
        self.place_meeples = place_meeples;
        self
    }

    /// 握手消息
    pub fn hello(&self) -> Message {
        Message::ClientHello {
            nickname: self.nickname.clone(),
        }
    }

    /// 处理服务端消息，返回需要回复的消息
    pub fn handle(&mut self, msg: Message) -> Result<Vec<Message>, ClientError> {
        match msg {
            Message::ServerHello { user_id } => {
                info!("登录成功，用户 ID: {}", user_id);
                self.user_id = Some(user_id);
                self.executor = CommandExecutor::new(GameLogger::new(user_id));
                self.phase = ClientPhase::Lobby;
                Ok(vec![Message::JoinMatchmaking])
            }
            Message::MatchmakingData { queued, required } => {
                info!("匹配中: {}/{}", queued, required);
                self.phase = ClientPhase::Queued;
                Ok(Vec::new())
            }
            Message::MatchmakingLeft => {
                self.phase = ClientPhase::Lobby;
                Ok(Vec::new())
            }
            Message::MatchmakingFailed { reason } => Err(ClientError::Matchmaking(reason)),
            Message::GameData { snapshot } => {
                let user_id = self.user_id.unwrap_or_default();
                info!("对局开始，共 {} 名玩家", snapshot.players.len());
                self.game = Some(Game::from_snapshot(
                    self.config.clone(),
                    snapshot,
                    GameLogger::new(user_id),
                ));
                self.phase = ClientPhase::Playing;
                Ok(self.next_action())
            }
            Message::GameCommand { command } => {
                let phase = self.phase;
                let Some(game) = self.game.as_mut() else {
                    return Err(ClientError::Unexpected {
                        message: MessageType::GameCommand,
                        phase,
                    });
                };
                self.executor.replicate(game, &command)?;
                Ok(self.next_action())
            }
            Message::GameResult { snapshot } => {
                if let Some(game) = self.game.as_mut() {
                    game.apply_result(snapshot.clone())?;
                }
                log_standings(&snapshot);
                self.result = Some(snapshot);
                self.phase = ClientPhase::Finished;
                Ok(Vec::new())
            }
            other => Err(self.unexpected(other.message_type())),
        }
    }

    /// 轮到自己时决定下一条请求
    fn next_action(&self) -> Vec<Message> {
        let (Some(game), Some(user_id)) = (self.game.as_ref(), self.user_id) else {
            return Vec::new();
        };
        if game.turn_executor().map(|p| p.id) != Some(user_id) {
            return Vec::new();
        }

        let command = match game.state() {
            GameStateType::PlaceTile => {
                let Some(tile) = game.turn().tile_drawn else {
                    return Vec::new();
                };
                match game.board().first_free_place(&tile) {
                    Some((position, rotation)) => Command::place_tile(position, rotation),
                    None => {
                        warn!("板块 {} 没有可放置的位置", tile.config_index);
                        return Vec::new();
                    }
                }
            }
            GameStateType::PlaceMeeple => {
                let has_meeple = game.player(user_id).is_some_and(Player::has_meeple);
                if self.place_meeples && has_meeple {
                    Command::place_meeple(ChunkId::Center)
                } else {
                    Command::skip_meeple()
                }
            }
            _ => return Vec::new(),
        };

        vec![Message::GameCommandRequest { command }]
    }

    fn unexpected(&self, message: MessageType) -> ClientError {
        ClientError::Unexpected {
            message,
            phase: self.phase,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// 终局快照
    pub fn result(&self) -> Option<&GameSnapshot> {
        self.result.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ClientPhase::Finished
    }
}

fn log_standings(snapshot: &GameSnapshot) {
    let mut players: Vec<&Player> = snapshot.players.iter().collect();
    players.sort_by(|a, b| b.score.cmp(&a.score));

    info!("终局排名（共 {} 回合）:", snapshot.turn.number);
    for (rank, player) in players.iter().enumerate() {
        info!(
            "  {}. 玩家 {} 得分 {} 剩余米宝 {}",
            rank + 1,
            player.id,
            player.score,
            player.meeples
        );
    }
}
