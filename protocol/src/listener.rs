//! 对局事件与监听器
//!
//! 监听器在构造时注入对局和命令执行器，游戏逻辑只通过它们向外通知。

use tokio::sync::mpsc;

use crate::board::{ChunkId, PlacedTile, Position};
use crate::command::Command;
use crate::error::CommandError;
use crate::player::UserId;
use crate::state::GameStateType;
use crate::tile::Tile;

/// 对局生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// 对局开始
    Started,
    /// 回合开始，`tile` 为本回合抽到的板块
    TurnStarted { player: UserId, tile: Tile },
    /// 回合结束
    TurnEnded { player: UserId },
    /// 阶段变化
    StateChanged {
        from: GameStateType,
        to: GameStateType,
    },
    /// 抽到的板块无处可放，被丢弃
    TileDiscarded { tile: Tile },
    /// 板块已放置
    TilePlaced { player: UserId, tile: PlacedTile },
    /// 米宝已放置
    MeeplePlaced {
        player: UserId,
        position: Position,
        chunk: ChunkId,
    },
    /// 米宝被收回
    MeepleRemoved {
        player: UserId,
        position: Position,
        chunk: ChunkId,
    },
    /// 对局结束
    GameOver,
}

/// 对局事件监听器
pub trait GameListener: Send {
    fn on_event(&mut self, event: &GameEvent);
}

impl GameListener for () {
    fn on_event(&mut self, _event: &GameEvent) {}
}

/// 把事件转发到通道，由对局的持有者在命令执行完毕后按顺序处理
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<GameEvent>,
}

impl ChannelListener {
    /// 创建监听器和对应的接收端
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GameEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl GameListener for ChannelListener {
    fn on_event(&mut self, event: &GameEvent) {
        // 接收端已释放说明对局已销毁，事件可以丢弃
        let _ = self.tx.send(event.clone());
    }
}

/// 命令执行结果监听器
pub trait CommandListener: Send {
    fn on_command_executed(&mut self, _command: &Command) {}

    fn on_command_failed(&mut self, _command: &Command, _reason: &CommandError) {}
}

impl CommandListener for () {}
