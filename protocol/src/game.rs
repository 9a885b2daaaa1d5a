//! 对局
//!
//! 同一个 [`Game`] 类型同时用于权威端（主端，持有完整牌堆）和
//! 客户端的影子对局（从端，只通过复制命令获得已经公布的板块）。

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, ChunkId, Meeple, PlacedTile, Position, Rotation};
use crate::config::GameConfig;
use crate::error::{CommandError, GameError};
use crate::listener::{GameEvent, GameListener};
use crate::player::{Player, UserId};
use crate::state::{GameStateType, GameTurn};
use crate::tile::{Tile, TileStack};

/// 对局在同步关系中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameRole {
    /// 权威端
    Master,
    /// 影子端
    Slave,
}

/// 对局快照
///
/// 不包含牌堆内容，只有剩余数量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: Vec<Player>,
    pub board: Vec<PlacedTile>,
    pub turn: GameTurn,
    pub state: GameStateType,
    pub remaining_tiles: u32,
    pub started: bool,
}

impl GameSnapshot {
    pub fn encode(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> bincode::Result<Self> {
        bincode::deserialize(bytes)
    }

    pub fn is_over(&self) -> bool {
        self.state == GameStateType::GameOver
    }

    /// 得分最高的玩家（同分时取先行动者）
    pub fn leader(&self) -> Option<&Player> {
        self.players
            .iter()
            .rev()
            .max_by_key(|p| p.score)
    }
}

/// 对局
pub struct Game {
    config: Arc<GameConfig>,
    role: GameRole,
    board: Board,
    stack: TileStack,
    players: Vec<Player>,
    turn: GameTurn,
    state: GameStateType,
    started: bool,
    listener: Box<dyn GameListener>,
}

impl Game {
    /// 创建空对局
    pub fn new(
        config: Arc<GameConfig>,
        role: GameRole,
        listener: impl GameListener + 'static,
    ) -> Self {
        Self {
            config,
            role,
            board: Board::new(),
            stack: TileStack::new(),
            players: Vec::new(),
            turn: GameTurn::default(),
            state: GameStateType::TurnStart,
            started: false,
            listener: Box::new(listener),
        }
    }

    /// 根据主端快照创建影子对局
    pub fn from_snapshot(
        config: Arc<GameConfig>,
        snapshot: GameSnapshot,
        listener: impl GameListener + 'static,
    ) -> Self {
        Self {
            config,
            role: GameRole::Slave,
            board: Board::from_tiles(snapshot.board),
            stack: TileStack::new(),
            players: snapshot.players,
            turn: snapshot.turn,
            state: snapshot.state,
            started: snapshot.started,
            listener: Box::new(listener),
        }
    }

    /// 生成快照
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self.players.clone(),
            board: self.board.tiles().cloned().collect(),
            turn: self.turn.clone(),
            state: self.state,
            remaining_tiles: self.stack.len() as u32,
            started: self.started,
        }
    }

    /// 添加玩家
    pub fn add_player(&mut self, id: UserId) -> Result<(), GameError> {
        if self.started {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() >= self.config.max_players {
            return Err(GameError::TooManyPlayers {
                max: self.config.max_players,
            });
        }
        self.players.push(Player::new(id));
        Ok(())
    }

    /// 开始对局（仅主端）
    pub fn start(&mut self) -> Result<(), GameError> {
        self.start_with_rng(&mut rand::thread_rng())
    }

    /// 使用指定随机源开始对局
    pub fn start_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        if self.role != GameRole::Master {
            return Err(GameError::MasterOnly("start"));
        }
        if self.players.len() < self.config.min_players {
            return Err(GameError::NotEnoughPlayers {
                count: self.players.len(),
                min: self.config.min_players,
            });
        }

        // 重开时清空上一局
        if self.started {
            self.board.clear();
            self.turn.reset();
        }

        let meeples = self.config.meeples_per_player;
        for player in &mut self.players {
            player.init(meeples);
        }

        self.stack.clear();
        self.stack.fill_from_config(&self.config);
        self.stack.shuffle(rng);

        let starting = match self.stack.draw() {
            Some(tile) if tile.starting => tile,
            _ => return Err(GameError::NoStartingTile),
        };
        self.board.place_starting(starting);

        self.started = true;
        self.set_state(GameStateType::TurnStart);
        self.emit(GameEvent::Started);
        Ok(())
    }

    /// 开始回合：从牌堆抽出本回合的板块
    ///
    /// 主端丢弃无处可放的板块，牌堆抽空则对局结束；
    /// 从端的牌堆只有主端公布的那一块，放不下说明两端已经失步。
    pub fn begin_turn(&mut self) -> Result<(), GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if self.state == GameStateType::GameOver {
            return Err(GameError::GameOver);
        }

        loop {
            let Some(tile) = self.stack.draw() else {
                return match self.role {
                    GameRole::Master => {
                        self.game_over();
                        Ok(())
                    }
                    GameRole::Slave => Err(GameError::Desync(
                        "no replicated tile to draw".to_string(),
                    )),
                };
            };

            if self.board.has_free_place(&tile) {
                self.turn.begin(tile);
                let player = self.turn_executor_id()?;
                self.emit(GameEvent::TurnStarted { player, tile });
                self.set_state(GameStateType::PlaceTile);
                return Ok(());
            }

            if self.role == GameRole::Slave {
                return Err(GameError::Desync(format!(
                    "replicated tile {} has no free place on the board",
                    tile.config_index
                )));
            }

            tracing::debug!("板块 {} 无处可放，丢弃", tile.config_index);
            self.emit(GameEvent::TileDiscarded { tile });
        }
    }

    /// 把主端公布的板块放入从端牌堆
    pub(crate) fn receive_replicated_tile(&mut self, tile: Tile) {
        self.stack.clear();
        self.stack.fill([tile]);
    }

    /// 放置本回合抽到的板块
    pub(crate) fn place_drawn_tile(
        &mut self,
        position: Position,
        rotation: Rotation,
    ) -> Result<(), CommandError> {
        let tile = self.turn.tile_drawn.ok_or(CommandError::NoTileDrawn)?;
        let player = self.turn_executor_id()?;

        let placed = self.board.place(tile, position, rotation)?.clone();
        self.turn.placed_at = Some(position);
        self.emit(GameEvent::TilePlaced { player, tile: placed });
        self.set_state(GameStateType::PlaceMeeple);
        Ok(())
    }

    /// 在刚放置的板块上放米宝并结束回合
    pub(crate) fn place_meeple(&mut self, chunk: ChunkId) -> Result<(), CommandError> {
        let position = self.turn.placed_at.ok_or(CommandError::NoTileDrawn)?;
        let player = self.turn_executor_id()?;

        self.check_meeple_placement(player, position, chunk)?;

        if let Some(p) = self.players.iter_mut().find(|p| p.id == player) {
            p.meeples -= 1;
        }
        if let Some(placed) = self.board.get_mut(position) {
            placed.meeples.push(Meeple { owner: player, chunk });
        }

        self.emit(GameEvent::MeeplePlaced { player, position, chunk });
        self.end_turn()?;
        Ok(())
    }

    /// 检查米宝能否放在刚放置的板块上
    pub(crate) fn check_meeple_placement(
        &self,
        player: UserId,
        position: Position,
        chunk: ChunkId,
    ) -> Result<(), CommandError> {
        let has_meeple = self
            .player(player)
            .map(Player::has_meeple)
            .ok_or(CommandError::UnknownPlayer(player))?;
        if !has_meeple {
            return Err(CommandError::NoMeepleLeft(player));
        }

        let placed = self.board.get(position).ok_or(CommandError::NoTileDrawn)?;
        if placed.meeple_at(chunk).is_some() {
            return Err(CommandError::ChunkOccupied(chunk));
        }
        Ok(())
    }

    /// 跳过米宝放置并结束回合
    pub(crate) fn skip_meeple(&mut self) -> Result<(), CommandError> {
        self.end_turn()?;
        Ok(())
    }

    /// 收回米宝（供计分规则调用）
    pub fn return_meeple(&mut self, position: Position, chunk: ChunkId) -> Option<Meeple> {
        let placed = self.board.get_mut(position)?;
        let index = placed.meeples.iter().position(|m| m.chunk == chunk)?;
        let meeple = placed.meeples.remove(index);

        if let Some(owner) = self.players.iter_mut().find(|p| p.id == meeple.owner) {
            owner.meeples += 1;
        }
        self.emit(GameEvent::MeepleRemoved {
            player: meeple.owner,
            position,
            chunk,
        });
        Some(meeple)
    }

    /// 结束回合
    ///
    /// 主端立即开始下一回合；从端停在 `TurnStart` 等待主端公布板块。
    fn end_turn(&mut self) -> Result<(), GameError> {
        let player = self.turn_executor_id()?;
        self.set_state(GameStateType::TurnEnd);
        self.turn.end(self.players.len());
        self.emit(GameEvent::TurnEnded { player });
        self.set_state(GameStateType::TurnStart);

        match self.role {
            GameRole::Master => self.begin_turn(),
            GameRole::Slave => Ok(()),
        }
    }

    /// 应用主端发来的终局快照（仅从端）
    pub fn apply_result(&mut self, result: GameSnapshot) -> Result<(), GameError> {
        if self.role != GameRole::Slave {
            return Err(GameError::Desync(
                "master game received a game result".to_string(),
            ));
        }
        self.players = result.players;
        self.board = Board::from_tiles(result.board);
        self.turn = result.turn;
        if self.state != GameStateType::GameOver {
            self.game_over();
        }
        Ok(())
    }

    fn game_over(&mut self) {
        self.set_state(GameStateType::GameOver);
        self.emit(GameEvent::GameOver);
    }

    fn set_state(&mut self, to: GameStateType) {
        let from = self.state;
        if from != to {
            self.state = to;
            self.emit(GameEvent::StateChanged { from, to });
        }
    }

    fn emit(&mut self, event: GameEvent) {
        self.listener.on_event(&event);
    }

    fn turn_executor_id(&self) -> Result<UserId, GameError> {
        self.turn_executor()
            .map(|p| p.id)
            .ok_or_else(|| GameError::Desync("turn points at no player".to_string()))
    }

    // ========================================================================
    // 访问器
    // ========================================================================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn role(&self) -> GameRole {
        self.role
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn stack(&self) -> &TileStack {
        &self.stack
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// 当前必须行动的玩家
    pub fn turn_executor(&self) -> Option<&Player> {
        self.players.get(self.turn.player_index)
    }

    pub fn turn(&self) -> &GameTurn {
        &self.turn
    }

    pub fn state(&self) -> GameStateType {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_over(&self) -> bool {
        self.state == GameStateType::GameOver
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("role", &self.role)
            .field("players", &self.players)
            .field("turn", &self.turn)
            .field("state", &self.state)
            .field("started", &self.started)
            .field("board_tiles", &self.board.len())
            .field("stack_tiles", &self.stack.len())
            .finish()
    }
}
