//! 服务器主逻辑
//!
//! 全局状态（会话、匹配队列、对局表）由一把异步锁保护；每个对局另有
//! 自己的锁，命令在对局锁内执行并广播，不占用全局锁。
//! 加锁顺序固定为先全局后对局。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use protocol::{
    Command, CommandError, Connection, GameConfig, Listener, Message, MessageType, ProtocolError,
    TcpConnection, TcpListener, UserId,
};

use crate::archive::{MatchResult, ResultArchive};
use crate::config::ServerConfig;
use crate::game_match::{Match, MatchId};
use crate::matchmaking::Matchmaking;
use crate::session::{SessionManager, SessionStatus};

/// 用户 ID -> 消息发送通道
pub type Senders = HashMap<UserId, mpsc::UnboundedSender<Message>>;

/// 会话级错误，返回后连接会被关闭
#[derive(Error, Debug)]
pub enum SessionError {
    /// 命令执行时发现主从失步
    #[error("Fatal command error: {0}")]
    Desync(CommandError),

    /// 握手后再次握手等不应出现的消息
    #[error("Unexpected message from client: {0:?}")]
    Unexpected(MessageType),
}

/// 对局房间：对局本身和成员的发送通道
pub struct MatchRoom {
    pub game_match: Match,
    senders: Senders,
}

impl MatchRoom {
    fn new(game_match: Match, connections: &Senders) -> Self {
        let senders = game_match
            .members()
            .filter_map(|id| connections.get(&id).map(|tx| (id, tx.clone())))
            .collect();
        Self {
            game_match,
            senders,
        }
    }

    /// 是否应当销毁
    pub fn is_done(&self) -> bool {
        self.game_match.is_finished() || self.game_match.is_abandoned()
    }
}

/// 带独立锁的对局房间
pub type SharedRoom = Arc<StdMutex<MatchRoom>>;

/// 锁定对局房间
///
/// 命令执行不会在持锁时 panic，锁中毒时沿用其中的状态。
pub fn lock_room(room: &SharedRoom) -> MutexGuard<'_, MatchRoom> {
    room.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 服务器状态
pub struct ServerState {
    pub config: ServerConfig,
    pub game_config: Arc<GameConfig>,
    pub sessions: SessionManager,
    pub matchmaking: Matchmaking,
    pub matches: HashMap<MatchId, SharedRoom>,
    pub archive: Option<ResultArchive>,
    pub connections: Senders,
    next_match_id: MatchId,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let game_config = Arc::new(config.load_game_config()?);

        let archive = if config.archive_results {
            let archive = match &config.results_dir {
                Some(dir) => ResultArchive::with_dir(dir.clone())?,
                None => ResultArchive::new()?,
            };
            info!("终局存档目录: {:?}", archive.results_directory());
            Some(archive)
        } else {
            None
        };

        Ok(Self {
            matchmaking: Matchmaking::new(config.players_per_match),
            config,
            game_config,
            sessions: SessionManager::new(),
            matches: HashMap::new(),
            archive,
            connections: HashMap::new(),
            next_match_id: 1,
        })
    }

    /// 发送消息给用户
    pub fn send_to_user(&self, user_id: UserId, msg: Message) {
        send_to(&self.connections, user_id, msg);
    }

    /// 用户所在的对局房间
    pub fn room_of(&self, user_id: UserId) -> Option<(MatchId, SharedRoom)> {
        let match_id = self.sessions.match_of(user_id)?;
        let room = self.matches.get(&match_id)?;
        Some((match_id, room.clone()))
    }

    fn generate_match_id(&mut self) -> MatchId {
        let id = self.next_match_id;
        self.next_match_id += 1;
        id
    }
}

fn send_to(senders: &Senders, user_id: UserId, msg: Message) {
    if let Some(tx) = senders.get(&user_id) {
        // 接收端已关闭说明连接正在断开，由断线流程清理
        let _ = tx.send(msg);
    }
}

/// 待发送的消息
///
/// 处理过程中产生的消息先缓存，状态修改完成后再统一发送。
#[derive(Debug, Default)]
pub struct PendingMessages {
    messages: Vec<(UserId, Message)>,
}

impl PendingMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, user_id: UserId, msg: Message) {
        self.messages.push((user_id, msg));
    }

    pub fn messages(&self) -> &[(UserId, Message)] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn flush(self, senders: &Senders) {
        for (user_id, msg) in self.messages {
            send_to(senders, user_id, msg);
        }
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理握手，返回分配的用户 ID
    pub fn handle_hello(
        state: &mut ServerState,
        nickname: String,
    ) -> Result<UserId, ProtocolError> {
        let user_id = state.sessions.login(nickname)?;
        info!(
            "用户 {} 已登录: {}",
            user_id,
            state.sessions.get_nickname(user_id).unwrap_or_default()
        );
        Ok(user_id)
    }

    /// 处理已握手用户的消息
    pub fn handle(
        state: &mut ServerState,
        user_id: UserId,
        msg: Message,
    ) -> Result<(), SessionError> {
        let mut pending = PendingMessages::new();

        let result = match msg {
            Message::ClientHello { .. } => Err(SessionError::Unexpected(MessageType::ClientHello)),
            Message::JoinMatchmaking => {
                Self::handle_join_matchmaking(state, &mut pending, user_id);
                Ok(())
            }
            Message::LeaveMatchmaking => {
                Self::handle_leave_matchmaking(state, &mut pending, user_id);
                Ok(())
            }
            Message::GameCommandRequest { command } => {
                let room = state.room_of(user_id);
                let result = Self::handle_command_request(room.as_ref(), user_id, command);
                if let (Some((match_id, _)), Ok(true)) = (room, &result) {
                    Self::cleanup_match(state, match_id);
                }
                result.map(|_| ())
            }
            other => {
                warn!("忽略用户 {} 发送的服务端消息 {:?}", user_id, other.message_type());
                Ok(())
            }
        };

        // 发送待发送的消息
        pending.flush(&state.connections);

        result
    }

    /// 处理加入匹配
    fn handle_join_matchmaking(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        user_id: UserId,
    ) {
        let Some(session) = state.sessions.get(user_id) else {
            return;
        };

        let reason = match session.status {
            SessionStatus::Idle => None,
            SessionStatus::Queued => Some("already in the matchmaking queue"),
            SessionStatus::InMatch(_) => Some("already in a match"),
        };
        if let Some(reason) = reason {
            pending.send(
                user_id,
                Message::MatchmakingFailed {
                    reason: reason.to_string(),
                },
            );
            return;
        }

        state.matchmaking.join(user_id);
        state.sessions.set_status(user_id, SessionStatus::Queued);
        pending.send(
            user_id,
            Message::MatchmakingData {
                queued: state.matchmaking.queued() as u32,
                required: state.matchmaking.players_per_match() as u32,
            },
        );
        debug!("用户 {} 加入匹配队列", user_id);

        if let Some(group) = state.matchmaking.try_form_group() {
            Self::start_match(state, pending, group);
        }
    }

    /// 处理离开匹配
    fn handle_leave_matchmaking(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        user_id: UserId,
    ) {
        if state.matchmaking.leave(user_id) {
            state.sessions.set_status(user_id, SessionStatus::Idle);
            pending.send(user_id, Message::MatchmakingLeft);
        } else {
            pending.send(
                user_id,
                Message::MatchmakingFailed {
                    reason: "not in the matchmaking queue".to_string(),
                },
            );
        }
    }

    /// 在对局锁内执行命令请求并广播
    ///
    /// 不需要全局状态。返回对局是否应当销毁。
    pub fn handle_command_request(
        room: Option<&(MatchId, SharedRoom)>,
        user_id: UserId,
        command: Command,
    ) -> Result<bool, SessionError> {
        let Some((match_id, room)) = room else {
            warn!("用户 {} 不在对局中，忽略命令请求", user_id);
            return Ok(false);
        };

        let mut room = lock_room(room);
        let mut pending = PendingMessages::new();
        let result = room.game_match.execute_command(user_id, command, &mut pending);
        pending.flush(&room.senders);

        match result {
            Err(e) if e.is_fatal() => {
                error!("对局 {} 用户 {} 命令失步", match_id, user_id);
                Err(SessionError::Desync(e))
            }
            // 普通拒绝已由对局记录，不回复客户端
            _ => Ok(room.is_done()),
        }
    }

    /// 创建并开始对局
    fn start_match(state: &mut ServerState, pending: &mut PendingMessages, players: Vec<UserId>) {
        let match_id = state.generate_match_id();

        let started = Match::new(match_id, state.game_config.clone(), &players).and_then(|mut m| {
            m.start(pending)?;
            Ok(m)
        });

        match started {
            Ok(game_match) => {
                for &user_id in &players {
                    state
                        .sessions
                        .set_status(user_id, SessionStatus::InMatch(match_id));
                }
                let room = MatchRoom::new(game_match, &state.connections);
                state.matches.insert(match_id, Arc::new(StdMutex::new(room)));
                Self::cleanup_match(state, match_id);
            }
            Err(e) => {
                error!("无法开始对局 {}: {}", match_id, e);
                for user_id in players {
                    state.sessions.set_status(user_id, SessionStatus::Idle);
                    pending.send(
                        user_id,
                        Message::MatchmakingFailed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
    }

    /// 销毁已结束或已无人的对局
    pub fn cleanup_match(state: &mut ServerState, match_id: MatchId) {
        let Some(room) = state.matches.get(&match_id).cloned() else {
            return;
        };
        let room = lock_room(&room);
        if !room.is_done() {
            return;
        }
        state.matches.remove(&match_id);

        let game_match = &room.game_match;
        for player in game_match.game().players() {
            if state.sessions.match_of(player.id) == Some(match_id) {
                state.sessions.set_status(player.id, SessionStatus::Idle);
            }
        }

        match game_match.result() {
            Some(snapshot) => {
                info!("对局 {} 已结束并销毁", match_id);
                let Some(archive) = &state.archive else {
                    return;
                };
                let sessions = &state.sessions;
                let result = MatchResult::from_snapshot(match_id, snapshot, |id| {
                    sessions.get_nickname(id).map(str::to_string)
                });
                match archive.save(&result) {
                    Ok(filename) => info!("终局存档已保存: {}", filename),
                    Err(e) => error!("保存终局存档失败: {:#}", e),
                }
            }
            None => info!("对局 {} 无人在线，已销毁", match_id),
        }
    }

    /// 处理用户断线
    pub fn handle_disconnect(state: &mut ServerState, user_id: UserId) {
        if state.matchmaking.leave(user_id) {
            debug!("用户 {} 断线，已移出匹配队列", user_id);
        }

        if let Some((match_id, room)) = state.room_of(user_id) {
            {
                let mut room = lock_room(&room);
                room.senders.remove(&user_id);
                let mut pending = PendingMessages::new();
                room.game_match.remove_player(user_id, &mut pending);
                pending.flush(&room.senders);
            }
            Self::cleanup_match(state, match_id);
        }

        state.sessions.remove(user_id);
        state.connections.remove(&user_id);
        info!("用户 {} 已断开", user_id);
    }
}

/// TCP 服务器
pub struct Server {
    listener: TcpListener,
    state: Arc<Mutex<ServerState>>,
}

impl Server {
    /// 绑定监听地址
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = config.addr();
        let state = ServerState::new(config)?;
        let listener = TcpListener::bind(&addr).await?;
        info!("服务器监听于 {}", listener.local_addr().unwrap_or(addr));

        Ok(Self {
            listener,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 共享状态
    pub fn state(&self) -> Arc<Mutex<ServerState>> {
        self.state.clone()
    }

    /// 接受连接直到出错
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            let conn = self.listener.accept().await?;
            let state = self.state.clone();
            tokio::spawn(async move {
                handle_connection(state, conn).await;
            });
        }
    }
}

/// 处理单个连接的完整生命周期
async fn handle_connection(state: Arc<Mutex<ServerState>>, conn: TcpConnection) {
    let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
    let (mut reader, mut writer) = conn.split();

    // 第一条消息必须是握手
    let nickname = match reader.recv().await {
        Ok(Message::ClientHello { nickname }) => nickname,
        Ok(other) => {
            warn!("{} 未握手就发送了 {:?}，关闭连接", peer, other.message_type());
            return;
        }
        Err(e) => {
            debug!("{} 握手前断开: {}", peer, e);
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let user_id = {
        let mut state = state.lock().await;
        match MessageHandler::handle_hello(&mut state, nickname) {
            Ok(user_id) => {
                state.connections.insert(user_id, tx);
                state.send_to_user(user_id, Message::ServerHello { user_id });
                user_id
            }
            Err(e) => {
                warn!("{} 握手失败: {}", peer, e);
                return;
            }
        }
    };

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer.send(&msg).await {
                debug!("发送给用户 {} 失败: {}", user_id, e);
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    loop {
        match reader.recv().await {
            Ok(Message::GameCommandRequest { command }) => {
                // 只在查找对局时持有全局锁
                let room = state.lock().await.room_of(user_id);
                match MessageHandler::handle_command_request(room.as_ref(), user_id, command) {
                    Ok(true) => {
                        if let Some((match_id, _)) = room {
                            MessageHandler::cleanup_match(&mut *state.lock().await, match_id);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!("用户 {} 会话错误，关闭连接: {}", user_id, e);
                        break;
                    }
                }
            }
            Ok(msg) => {
                let mut state = state.lock().await;
                if let Err(e) = MessageHandler::handle(&mut state, user_id, msg) {
                    error!("用户 {} 会话错误，关闭连接: {}", user_id, e);
                    break;
                }
            }
            Err(ProtocolError::ConnectionClosed) => {
                debug!("用户 {} 关闭了连接", user_id);
                break;
            }
            Err(ProtocolError::Frame(e)) => {
                warn!("用户 {} 帧错误，关闭连接: {}", user_id, e);
                break;
            }
            Err(e) => {
                warn!("用户 {} 接收失败: {}", user_id, e);
                break;
            }
        }
    }

    MessageHandler::handle_disconnect(&mut *state.lock().await, user_id);
    if let Err(e) = writer_task.await {
        error!("用户 {} 发送任务异常: {}", user_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{CommandType, Executable};
    use tempfile::TempDir;

    fn test_state(players_per_match: usize) -> ServerState {
        ServerState::new(ServerConfig {
            players_per_match,
            archive_results: false,
            ..ServerConfig::default()
        })
        .unwrap()
    }

    fn login(state: &mut ServerState, nickname: &str) -> (UserId, mpsc::UnboundedReceiver<Message>) {
        let user_id = MessageHandler::handle_hello(state, nickname.to_string()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        state.connections.insert(user_id, tx);
        (user_id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    fn turn_holder(state: &ServerState, match_id: MatchId) -> UserId {
        let room = lock_room(&state.matches[&match_id]);
        room.game_match.game().turn_executor().unwrap().id
    }

    /// 让当前回合玩家以第一个合法位置放置板块并跳过米宝
    fn play_turn(state: &mut ServerState, match_id: MatchId) {
        let (holder, position, rotation) = {
            let room = lock_room(&state.matches[&match_id]);
            let game = room.game_match.game();
            let tile = game.turn().tile_drawn.unwrap();
            let (position, rotation) = game.board().first_free_place(&tile).unwrap();
            (game.turn_executor().unwrap().id, position, rotation)
        };

        for command in [Command::place_tile(position, rotation), Command::skip_meeple()] {
            MessageHandler::handle(state, holder, Message::GameCommandRequest { command }).unwrap();
        }
    }

    #[test]
    fn test_hello_rejects_bad_nickname() {
        let mut state = test_state(2);
        assert!(MessageHandler::handle_hello(&mut state, "  ".to_string()).is_err());
        assert_eq!(state.sessions.online_count(), 0);
    }

    #[test]
    fn test_matchmaking_starts_match() {
        let mut state = test_state(2);
        let (alice, mut alice_rx) = login(&mut state, "alice");
        let (bob, mut bob_rx) = login(&mut state, "bob");

        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        assert_eq!(
            drain(&mut alice_rx),
            vec![Message::MatchmakingData { queued: 1, required: 2 }]
        );

        MessageHandler::handle(&mut state, bob, Message::JoinMatchmaking).unwrap();
        let bob_messages = drain(&mut bob_rx);
        assert_eq!(bob_messages[0], Message::MatchmakingData { queued: 2, required: 2 });
        assert!(matches!(bob_messages[1], Message::GameData { .. }));
        assert!(matches!(
            &bob_messages[2],
            Message::GameCommand { command } if command.command_type() == CommandType::MasterTurnStarted
        ));

        let alice_messages = drain(&mut alice_rx);
        assert!(matches!(alice_messages[0], Message::GameData { .. }));

        assert_eq!(state.matches.len(), 1);
        assert_eq!(state.sessions.match_of(alice), state.sessions.match_of(bob));
        assert_eq!(state.matchmaking.queued(), 0);
    }

    #[test]
    fn test_join_twice_fails() {
        let mut state = test_state(3);
        let (alice, mut rx) = login(&mut state, "alice");

        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();

        let messages = drain(&mut rx);
        assert!(matches!(messages[1], Message::MatchmakingFailed { .. }));
        assert_eq!(state.matchmaking.queued(), 1);
    }

    #[test]
    fn test_leave_matchmaking() {
        let mut state = test_state(2);
        let (alice, mut rx) = login(&mut state, "alice");

        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        MessageHandler::handle(&mut state, alice, Message::LeaveMatchmaking).unwrap();
        MessageHandler::handle(&mut state, alice, Message::LeaveMatchmaking).unwrap();

        let messages = drain(&mut rx);
        assert_eq!(messages[1], Message::MatchmakingLeft);
        assert!(matches!(messages[2], Message::MatchmakingFailed { .. }));
        assert_eq!(state.sessions.get(alice).unwrap().status, SessionStatus::Idle);
    }

    #[test]
    fn test_command_outside_match_is_ignored() {
        let mut state = test_state(2);
        let (alice, mut rx) = login(&mut state, "alice");

        let result = MessageHandler::handle(
            &mut state,
            alice,
            Message::GameCommandRequest {
                command: Command::skip_meeple(),
            },
        );
        assert!(result.is_ok());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_second_hello_closes_session() {
        let mut state = test_state(2);
        let (alice, _rx) = login(&mut state, "alice");

        let result = MessageHandler::handle(
            &mut state,
            alice,
            Message::ClientHello {
                nickname: "again".to_string(),
            },
        );
        assert!(matches!(result, Err(SessionError::Unexpected(MessageType::ClientHello))));
    }

    #[test]
    fn test_disconnect_of_turn_holder_autoplays() {
        let mut state = test_state(2);
        let (alice, _alice_rx) = login(&mut state, "alice");
        let (bob, mut bob_rx) = login(&mut state, "bob");
        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        MessageHandler::handle(&mut state, bob, Message::JoinMatchmaking).unwrap();
        drain(&mut bob_rx);

        let match_id = state.sessions.match_of(bob).unwrap();
        assert_eq!(turn_holder(&state, match_id), alice);

        MessageHandler::handle_disconnect(&mut state, alice);

        let commands: Vec<_> = drain(&mut bob_rx)
            .into_iter()
            .filter_map(|msg| match msg {
                Message::GameCommand { command } => Some(command.command_type()),
                _ => None,
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                CommandType::PlaceTileDrawn,
                CommandType::SkipMeeplePlacement,
                CommandType::MasterTurnStarted,
            ]
        );
        assert_eq!(turn_holder(&state, match_id), bob);
        assert!(!state.connections.contains_key(&alice));

        MessageHandler::handle_disconnect(&mut state, bob);
        assert!(state.matches.is_empty());
    }

    #[test]
    fn test_finished_match_is_destroyed_and_archived() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = ServerState::new(ServerConfig {
            results_dir: Some(temp_dir.path().to_path_buf()),
            ..ServerConfig::default()
        })
        .unwrap();

        let (alice, mut alice_rx) = login(&mut state, "alice");
        let (bob, _bob_rx) = login(&mut state, "bob");
        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        MessageHandler::handle(&mut state, bob, Message::JoinMatchmaking).unwrap();
        let match_id = state.sessions.match_of(alice).unwrap();

        while state.matches.contains_key(&match_id) {
            play_turn(&mut state, match_id);
        }

        let last = drain(&mut alice_rx).pop().unwrap();
        let Message::GameResult { snapshot } = last else {
            panic!("expected GameResult, got {:?}", last);
        };
        assert!(snapshot.is_over());

        assert_eq!(state.sessions.get(alice).unwrap().status, SessionStatus::Idle);
        assert_eq!(state.sessions.get(bob).unwrap().status, SessionStatus::Idle);

        let results = state.archive.as_ref().unwrap().list().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_id, match_id);
        assert_eq!(results[0].players[0].nickname.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_command_runs_without_global_lock() {
        let mut state = test_state(2);
        let (alice, _alice_rx) = login(&mut state, "alice");
        let (bob, mut bob_rx) = login(&mut state, "bob");
        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        MessageHandler::handle(&mut state, bob, Message::JoinMatchmaking).unwrap();
        drain(&mut bob_rx);

        let room = state.room_of(alice).unwrap();
        let command = {
            let guard = lock_room(&room.1);
            let game = guard.game_match.game();
            let tile = game.turn().tile_drawn.unwrap();
            let (position, rotation) = game.board().first_free_place(&tile).unwrap();
            Command::place_tile(position, rotation)
        };

        // 其他任务持有全局锁时，对局内的命令照常执行并广播
        let shared = Arc::new(Mutex::new(state));
        let _global = shared.try_lock().unwrap();
        let done = MessageHandler::handle_command_request(Some(&room), alice, command).unwrap();

        assert!(!done);
        assert_eq!(drain(&mut bob_rx), vec![Message::GameCommand { command }]);
        assert_eq!(
            lock_room(&room.1).game_match.game().state(),
            protocol::GameStateType::PlaceMeeple
        );
    }

    #[test]
    fn test_rejected_command_in_room_broadcasts_nothing() {
        let mut state = test_state(2);
        let (alice, _alice_rx) = login(&mut state, "alice");
        let (bob, mut bob_rx) = login(&mut state, "bob");
        MessageHandler::handle(&mut state, alice, Message::JoinMatchmaking).unwrap();
        MessageHandler::handle(&mut state, bob, Message::JoinMatchmaking).unwrap();
        drain(&mut bob_rx);

        // 主端从不停在回合开始阶段，公布板块的命令被当作普通拒绝
        let result = MessageHandler::handle(
            &mut state,
            alice,
            Message::GameCommandRequest {
                command: Command::master_turn_started(0),
            },
        );
        assert!(result.is_ok());
        assert!(drain(&mut bob_rx).is_empty());
        assert_eq!(state.matches.len(), 1);
    }
}
