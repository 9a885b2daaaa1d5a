//! 客户端会话管理

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use protocol::{validate_nickname, ProtocolError, UserId};

use crate::game_match::MatchId;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// 已握手，空闲
    Idle,
    /// 在匹配队列中
    Queued,
    /// 在对局中
    InMatch(MatchId),
}

/// 客户端会话
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub user_id: UserId,
    pub nickname: String,
    pub status: SessionStatus,
}

impl ClientSession {
    pub fn new(user_id: UserId, nickname: String) -> Self {
        Self {
            user_id,
            nickname,
            status: SessionStatus::Idle,
        }
    }

    /// 所在的对局
    pub fn match_id(&self) -> Option<MatchId> {
        match self.status {
            SessionStatus::InMatch(id) => Some(id),
            _ => None,
        }
    }
}

/// 会话管理器
pub struct SessionManager {
    /// 用户 ID -> 会话
    sessions: HashMap<UserId, ClientSession>,
    /// ID 生成器
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成新的用户 ID
    fn generate_id(&self) -> UserId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 握手，返回分配的用户 ID
    pub fn login(&mut self, nickname: String) -> Result<UserId, ProtocolError> {
        validate_nickname(&nickname)?;

        let id = self.generate_id();
        let nickname = nickname.trim().to_string();
        self.sessions.insert(id, ClientSession::new(id, nickname));
        Ok(id)
    }

    /// 移除会话
    pub fn remove(&mut self, user_id: UserId) -> Option<ClientSession> {
        self.sessions.remove(&user_id)
    }

    pub fn get(&self, user_id: UserId) -> Option<&ClientSession> {
        self.sessions.get(&user_id)
    }

    /// 设置会话状态
    pub fn set_status(&mut self, user_id: UserId, status: SessionStatus) {
        if let Some(session) = self.sessions.get_mut(&user_id) {
            session.status = status;
        }
    }

    /// 会话所在的对局
    pub fn match_of(&self, user_id: UserId) -> Option<MatchId> {
        self.sessions.get(&user_id).and_then(ClientSession::match_id)
    }

    /// 获取昵称
    pub fn get_nickname(&self, user_id: UserId) -> Option<&str> {
        self.sessions.get(&user_id).map(|s| s.nickname.as_str())
    }

    pub fn exists(&self, user_id: UserId) -> bool {
        self.sessions.contains_key(&user_id)
    }

    /// 在线会话数量
    pub fn online_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
