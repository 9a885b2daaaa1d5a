//! 匹配队列
//!
//! 先到先得：凑满一局所需的人数后立即成组。

use std::collections::VecDeque;

use protocol::UserId;

/// 匹配队列
pub struct Matchmaking {
    queue: VecDeque<UserId>,
    players_per_match: usize,
}

impl Matchmaking {
    pub fn new(players_per_match: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            players_per_match,
        }
    }

    /// 加入队列，已在队列中时返回 false
    pub fn join(&mut self, user_id: UserId) -> bool {
        if self.contains(user_id) {
            return false;
        }
        self.queue.push_back(user_id);
        true
    }

    /// 离开队列，不在队列中时返回 false
    pub fn leave(&mut self, user_id: UserId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|&id| id != user_id);
        self.queue.len() != before
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.queue.contains(&user_id)
    }

    /// 人数足够时取出一组玩家
    pub fn try_form_group(&mut self) -> Option<Vec<UserId>> {
        if self.queue.len() < self.players_per_match {
            return None;
        }
        Some(self.queue.drain(..self.players_per_match).collect())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn players_per_match(&self) -> usize {
        self.players_per_match
    }
}
