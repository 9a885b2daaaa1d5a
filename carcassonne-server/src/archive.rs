//! 终局存档
//!
//! 每局结束后把终局快照写成 JSON 文件，文件名带时间戳和对局 ID。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use protocol::{GameSnapshot, UserId};

use crate::game_match::MatchId;

/// 存档中的玩家信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedPlayer {
    pub user_id: UserId,
    pub nickname: Option<String>,
    pub score: u32,
    pub meeples: u32,
}

/// 终局存档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub finished_at: DateTime<Utc>,
    pub players: Vec<ArchivedPlayer>,
    pub tiles_placed: usize,
    pub turns: u32,
}

impl MatchResult {
    /// 从终局快照生成，`nickname` 用于查找玩家昵称
    pub fn from_snapshot(
        match_id: MatchId,
        snapshot: &GameSnapshot,
        nickname: impl Fn(UserId) -> Option<String>,
    ) -> Self {
        Self {
            match_id,
            finished_at: Utc::now(),
            players: snapshot
                .players
                .iter()
                .map(|p| ArchivedPlayer {
                    user_id: p.id,
                    nickname: nickname(p.id),
                    score: p.score,
                    meeples: p.meeples,
                })
                .collect(),
            tiles_placed: snapshot.board.len(),
            turns: snapshot.turn.number,
        }
    }
}

/// 存档管理器
pub struct ResultArchive {
    results_dir: PathBuf,
}

impl ResultArchive {
    /// 使用系统数据目录创建
    pub fn new() -> Result<Self> {
        Self::with_dir(get_results_directory()?)
    }

    /// 使用指定目录创建
    pub fn with_dir(results_dir: PathBuf) -> Result<Self> {
        // 确保目录存在
        if !results_dir.exists() {
            fs::create_dir_all(&results_dir)
                .with_context(|| format!("无法创建存档目录: {:?}", results_dir))?;
        }

        Ok(Self { results_dir })
    }

    /// 保存终局存档，返回文件名
    pub fn save(&self, result: &MatchResult) -> Result<String> {
        let filename = generate_filename(&result.finished_at, result.match_id);
        let filepath = self.results_dir.join(&filename);

        let json_content = serde_json::to_string_pretty(result).context("序列化终局存档失败")?;

        fs::write(&filepath, json_content)
            .with_context(|| format!("写入文件失败: {:?}", filepath))?;

        Ok(filename)
    }

    /// 读取终局存档
    pub fn load(&self, filename: &str) -> Result<MatchResult> {
        let filepath = self.results_dir.join(filename);

        if !filepath.exists() {
            anyhow::bail!("存档文件不存在: {}", filename);
        }

        let content = fs::read_to_string(&filepath)
            .with_context(|| format!("读取文件失败: {:?}", filepath))?;

        serde_json::from_str(&content).context("解析存档文件失败")
    }

    /// 列出所有存档，最新的在前
    pub fn list(&self) -> Result<Vec<MatchResult>> {
        let mut results = Vec::new();

        let entries = fs::read_dir(&self.results_dir)
            .with_context(|| format!("读取存档目录失败: {:?}", self.results_dir))?;

        for entry in entries {
            let entry = entry.context("读取目录项失败")?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };

            match self.load(filename) {
                Ok(result) => results.push(result),
                Err(e) => tracing::warn!("跳过损坏的存档 {}: {}", filename, e),
            }
        }

        results.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(results)
    }

    /// 获取存档目录路径
    pub fn results_directory(&self) -> &Path {
        &self.results_dir
    }
}

/// 获取跨平台存档目录
fn get_results_directory() -> Result<PathBuf> {
    let app_data_dir = dirs::data_dir().context("无法获取应用数据目录")?;

    Ok(app_data_dir.join("carcassonne").join("results"))
}

/// 生成文件名
fn generate_filename(timestamp: &DateTime<Utc>, match_id: MatchId) -> String {
    format!("{}_match{}.json", timestamp.format("%Y%m%d_%H%M%S"), match_id)
}
