//! 玩家

use serde::{Deserialize, Serialize};

/// 用户 ID（握手时由服务端分配）
pub type UserId = u64;

/// 对局中的玩家
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: UserId,
    /// 得分（由计分规则维护）
    pub score: u32,
    /// 剩余米宝
    pub meeples: u32,
}

impl Player {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            score: 0,
            meeples: 0,
        }
    }

    /// 开局时重置
    pub fn init(&mut self, meeples: u32) {
        self.score = 0;
        self.meeples = meeples;
    }

    pub fn has_meeple(&self) -> bool {
        self.meeples > 0
    }
}
