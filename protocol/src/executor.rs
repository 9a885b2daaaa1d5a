//! 命令执行器
//!
//! 执行顺序固定：回合归属、阶段、命令自身的合法性，全部通过后才修改对局。
//! 任何一步失败都不会改变对局状态。

use crate::command::{Command, Executable};
use crate::error::{CommandError, GameError};
use crate::game::Game;
use crate::listener::CommandListener;
use crate::player::UserId;

/// 命令执行器
pub struct CommandExecutor {
    listener: Box<dyn CommandListener>,
}

impl CommandExecutor {
    pub fn new(listener: impl CommandListener + 'static) -> Self {
        Self {
            listener: Box::new(listener),
        }
    }

    /// 以玩家 `user` 的身份执行命令
    pub fn execute(
        &mut self,
        game: &mut Game,
        user: UserId,
        command: &Command,
    ) -> Result<(), CommandError> {
        let result = Self::check_turn(game, user).and_then(|_| Self::apply(game, command));
        self.report(command, result)
    }

    /// 在从端重放主端已经执行过的命令
    ///
    /// 回合归属已经由主端判定，这里只检查阶段和合法性。
    pub fn replicate(&mut self, game: &mut Game, command: &Command) -> Result<(), CommandError> {
        let result = Self::check_started(game).and_then(|_| Self::apply(game, command));
        self.report(command, result)
    }

    fn check_started(game: &Game) -> Result<(), CommandError> {
        if !game.is_started() {
            return Err(GameError::NotStarted.into());
        }
        Ok(())
    }

    fn check_turn(game: &Game, user: UserId) -> Result<(), CommandError> {
        Self::check_started(game)?;
        if game.player(user).is_none() {
            return Err(CommandError::UnknownPlayer(user));
        }

        let turn_holder = game
            .turn_executor()
            .map(|p| p.id)
            .ok_or_else(|| GameError::Desync("turn points at no player".to_string()))?;
        if turn_holder != user {
            return Err(CommandError::NotYourTurn { user, turn_holder });
        }
        Ok(())
    }

    fn apply(game: &mut Game, command: &Command) -> Result<(), CommandError> {
        if !game.state().allows(command.command_type()) {
            return Err(CommandError::WrongState {
                required: command.required_state(),
                actual: game.state(),
            });
        }

        command.can_be_executed(game)?;
        command.execute(game)
    }

    fn report(
        &mut self,
        command: &Command,
        result: Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        match &result {
            Ok(()) => self.listener.on_command_executed(command),
            Err(reason) => self.listener.on_command_failed(command, reason),
        }
        result
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(())
    }
}
