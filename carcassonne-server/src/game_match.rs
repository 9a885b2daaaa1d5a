//! 对局编排
//!
//! 每个 [`Match`] 持有一个权威对局和固定数量的座位。客户端请求的命令
//! 先在权威对局上执行，成功后原样广播给所有在线座位，由客户端重放。

use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use protocol::{
    ChannelListener, Command, CommandError, CommandExecutor, CommandListener, Executable, Game,
    GameConfig, GameError, GameEvent, GameRole, GameSnapshot, GameStateType, Message, UserId,
};

use crate::server::PendingMessages;

/// 对局 ID
pub type MatchId = u64;

/// 记录命令执行结果
struct CommandLogger {
    match_id: MatchId,
}

impl CommandListener for CommandLogger {
    fn on_command_executed(&mut self, command: &Command) {
        debug!("对局 {} 执行命令 {:?}", self.match_id, command.command_type());
    }

    fn on_command_failed(&mut self, command: &Command, reason: &CommandError) {
        if reason.is_fatal() {
            error!(
                "对局 {} 命令 {:?} 失步: {}",
                self.match_id,
                command.command_type(),
                reason
            );
        } else {
            warn!(
                "对局 {} 拒绝命令 {:?}: {}",
                self.match_id,
                command.command_type(),
                reason
            );
        }
    }
}

/// 对局
pub struct Match {
    id: MatchId,
    game: Game,
    events: mpsc::UnboundedReceiver<GameEvent>,
    executor: CommandExecutor,
    /// 座位，下标与对局中的玩家顺序一致；`None` 表示该玩家已离开
    slots: Vec<Option<UserId>>,
    /// 终局快照
    result: Option<GameSnapshot>,
}

impl Match {
    /// 创建对局，玩家按座位顺序加入
    pub fn new(id: MatchId, config: Arc<GameConfig>, players: &[UserId]) -> Result<Self, GameError> {
        let (listener, events) = ChannelListener::new();
        let mut game = Game::new(config, GameRole::Master, listener);
        for &user_id in players {
            game.add_player(user_id)?;
        }

        Ok(Self {
            id,
            game,
            events,
            executor: CommandExecutor::new(CommandLogger { match_id: id }),
            slots: players.iter().copied().map(Some).collect(),
            result: None,
        })
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// 仍在线的玩家
    pub fn members(&self) -> impl Iterator<Item = UserId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// 对局是否已结束
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    /// 所有玩家都已离开
    pub fn is_abandoned(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// 终局快照
    pub fn result(&self) -> Option<&GameSnapshot> {
        self.result.as_ref()
    }

    /// 开始对局：先广播完整快照，再开始第一回合
    pub fn start(&mut self, pending: &mut PendingMessages) -> Result<(), GameError> {
        self.start_with_rng(&mut rand::thread_rng(), pending)
    }

    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        pending: &mut PendingMessages,
    ) -> Result<(), GameError> {
        self.game.start_with_rng(rng)?;
        // 开局事件不需要转发
        while self.events.try_recv().is_ok() {}

        info!("对局 {} 开始，玩家: {:?}", self.id, self.slots);
        self.broadcast(
            pending,
            Message::GameData {
                snapshot: self.game.snapshot(),
            },
        );

        self.game.begin_turn()?;
        self.process_events(pending);
        Ok(())
    }

    /// 以玩家身份执行命令，成功后广播给所有在线玩家
    pub fn execute_command(
        &mut self,
        user_id: UserId,
        command: Command,
        pending: &mut PendingMessages,
    ) -> Result<(), CommandError> {
        if self.is_finished() {
            return Err(GameError::GameOver.into());
        }

        self.executor.execute(&mut self.game, user_id, &command)?;
        self.broadcast(pending, Message::GameCommand { command });
        self.process_events(pending);
        Ok(())
    }

    /// 玩家离开
    ///
    /// 如果轮到离线玩家行动，由服务端代为放置板块并跳过米宝放置，
    /// 直到轮到在线玩家或者对局结束。
    pub fn remove_player(&mut self, user_id: UserId, pending: &mut PendingMessages) {
        for slot in &mut self.slots {
            if *slot == Some(user_id) {
                *slot = None;
            }
        }

        if !self.game.is_started() || self.is_finished() {
            return;
        }
        if self.is_abandoned() {
            info!("对局 {} 所有玩家都已离开", self.id);
            return;
        }

        while !self.is_finished() && !self.is_abandoned() && self.turn_holder_is_offline() {
            if let Err(e) = self.autoplay_turn(pending) {
                error!("对局 {} 自动行动失败: {}", self.id, e);
                break;
            }
        }
    }

    fn turn_holder_is_offline(&self) -> bool {
        let index = self.game.turn().player_index;
        matches!(self.slots.get(index), Some(None))
    }

    /// 替离线的回合玩家完成本回合
    fn autoplay_turn(&mut self, pending: &mut PendingMessages) -> Result<(), CommandError> {
        let holder = self
            .game
            .turn_executor()
            .map(|p| p.id)
            .ok_or_else(|| GameError::Desync("turn points at no player".to_string()))?;

        if self.game.state() == GameStateType::PlaceTile {
            let tile = self.game.turn().tile_drawn.ok_or(CommandError::NoTileDrawn)?;
            let (position, rotation) = self.game.board().first_free_place(&tile).ok_or_else(|| {
                GameError::Desync(format!("drawn tile {} has no free place", tile.config_index))
            })?;

            info!(
                "玩家 {} 已离开对局 {}，板块放置在 {}",
                holder, self.id, position
            );
            self.execute_command(holder, Command::place_tile(position, rotation), pending)?;
        }

        if self.game.state() == GameStateType::PlaceMeeple {
            self.execute_command(holder, Command::skip_meeple(), pending)?;
        }
        Ok(())
    }

    /// 处理命令执行期间产生的对局事件
    fn process_events(&mut self, pending: &mut PendingMessages) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                GameEvent::TurnStarted { player, tile } => {
                    debug!("对局 {} 玩家 {} 回合开始", self.id, player);
                    // 只公布板块在配置表中的索引
                    self.broadcast(
                        pending,
                        Message::GameCommand {
                            command: Command::master_turn_started(tile.config_index),
                        },
                    );
                }
                GameEvent::TileDiscarded { tile } => {
                    debug!("对局 {} 丢弃无处可放的板块 {}", self.id, tile.config_index);
                }
                GameEvent::GameOver => self.on_game_over(pending),
                other => trace!("对局 {} 事件: {:?}", self.id, other),
            }
        }
    }

    fn on_game_over(&mut self, pending: &mut PendingMessages) {
        let snapshot = self.game.snapshot();
        info!("对局 {} 结束", self.id);
        self.broadcast(
            pending,
            Message::GameResult {
                snapshot: snapshot.clone(),
            },
        );
        self.result = Some(snapshot);
    }

    fn broadcast(&self, pending: &mut PendingMessages, message: Message) {
        for user_id in self.members() {
            pending.send(user_id, message.clone());
        }
    }
}
