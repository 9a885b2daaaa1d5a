//! 对局日志监听器

use tracing::{debug, error, info, warn};

use protocol::{Command, CommandError, CommandListener, GameEvent, GameListener, UserId};

/// 把影子对局的事件和命令执行结果写入日志
#[derive(Debug, Clone, Copy)]
pub struct GameLogger {
    user_id: UserId,
}

impl GameLogger {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

impl GameListener for GameLogger {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::TurnStarted { player, tile } if *player == self.user_id => {
                info!("[{}] 轮到我行动，抽到板块 {}", self.user_id, tile.config_index);
            }
            GameEvent::TurnStarted { player, tile } => {
                debug!("[{}] 玩家 {} 回合开始，板块 {}", self.user_id, player, tile.config_index);
            }
            GameEvent::TilePlaced { player, tile } => {
                debug!(
                    "[{}] 玩家 {} 在 {} 放置板块 {}",
                    self.user_id, player, tile.position, tile.tile.config_index
                );
            }
            GameEvent::MeeplePlaced { player, position, chunk } => {
                debug!("[{}] 玩家 {} 在 {} 的 {:?} 放置米宝", self.user_id, player, position, chunk);
            }
            GameEvent::GameOver => info!("[{}] 对局结束", self.user_id),
            other => tracing::trace!("[{}] {:?}", self.user_id, other),
        }
    }
}

impl CommandListener for GameLogger {
    fn on_command_executed(&mut self, command: &Command) {
        tracing::trace!("[{}] 已复制命令 {:?}", self.user_id, command);
    }

    fn on_command_failed(&mut self, command: &Command, reason: &CommandError) {
        if reason.is_fatal() {
            error!("[{}] 复制命令 {:?} 失步: {}", self.user_id, command, reason);
        } else {
            warn!("[{}] 复制命令 {:?} 被拒绝: {}", self.user_id, command, reason);
        }
    }
}
