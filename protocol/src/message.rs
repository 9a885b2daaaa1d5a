//! 消息类型定义
//!
//! 每种消息都有固定的类型 ID：客户端发起的消息占用 `<= 199` 的区间，
//! 服务端发起的消息占用 `>= 200` 的区间。负载只包含消息自身字段的编码。

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::constants::{CLIENT_MESSAGE_TYPE_MAX, MAX_NICKNAME_LEN};
use crate::error::{DecodeError, ProtocolError};
use crate::game::GameSnapshot;
use crate::player::UserId;

/// 消息类型 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageType {
    // === 客户端 → 服务端 ===
    ClientHello = 100,
    JoinMatchmaking = 110,
    LeaveMatchmaking = 111,
    GameCommandRequest = 121,

    // === 服务端 → 客户端 ===
    ServerHello = 200,
    MatchmakingData = 210,
    MatchmakingLeft = 211,
    MatchmakingFailed = 212,
    GameData = 220,
    GameCommand = 221,
    GameResult = 222,
}

impl MessageType {
    pub const ALL: [MessageType; 11] = [
        MessageType::ClientHello,
        MessageType::JoinMatchmaking,
        MessageType::LeaveMatchmaking,
        MessageType::GameCommandRequest,
        MessageType::ServerHello,
        MessageType::MatchmakingData,
        MessageType::MatchmakingLeft,
        MessageType::MatchmakingFailed,
        MessageType::GameData,
        MessageType::GameCommand,
        MessageType::GameResult,
    ];

    pub fn value(self) -> u32 {
        self as u32
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.value() == value)
    }

    /// 是否由客户端发起
    pub fn is_client_originated(self) -> bool {
        self.value() <= CLIENT_MESSAGE_TYPE_MAX
    }
}

/// 协议消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // === 身份认证 ===
    /// 握手
    ClientHello { nickname: String },
    /// 握手成功，分配用户 ID
    ServerHello { user_id: UserId },

    // === 匹配 ===
    /// 加入匹配队列
    JoinMatchmaking,
    /// 匹配队列状态
    MatchmakingData { queued: u32, required: u32 },
    /// 离开匹配队列
    LeaveMatchmaking,
    /// 已离开匹配队列
    MatchmakingLeft,
    /// 无法加入匹配
    MatchmakingFailed { reason: String },

    // === 对局 ===
    /// 对局开始时的完整快照
    GameData { snapshot: GameSnapshot },
    /// 客户端请求执行命令
    GameCommandRequest { command: Command },
    /// 主端已执行的命令，供客户端重放
    GameCommand { command: Command },
    /// 终局快照
    GameResult { snapshot: GameSnapshot },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ClientHello { .. } => MessageType::ClientHello,
            Message::ServerHello { .. } => MessageType::ServerHello,
            Message::JoinMatchmaking => MessageType::JoinMatchmaking,
            Message::MatchmakingData { .. } => MessageType::MatchmakingData,
            Message::LeaveMatchmaking => MessageType::LeaveMatchmaking,
            Message::MatchmakingLeft => MessageType::MatchmakingLeft,
            Message::MatchmakingFailed { .. } => MessageType::MatchmakingFailed,
            Message::GameData { .. } => MessageType::GameData,
            Message::GameCommandRequest { .. } => MessageType::GameCommandRequest,
            Message::GameCommand { .. } => MessageType::GameCommand,
            Message::GameResult { .. } => MessageType::GameResult,
        }
    }

    pub fn type_id(&self) -> u32 {
        self.message_type().value()
    }

    /// 编码消息负载
    pub fn encode_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = match self {
            Message::ClientHello { nickname } => bincode::serialize(nickname)?,
            Message::ServerHello { user_id } => bincode::serialize(user_id)?,
            Message::MatchmakingData { queued, required } => {
                bincode::serialize(&(queued, required))?
            }
            Message::MatchmakingFailed { reason } => bincode::serialize(reason)?,
            Message::GameData { snapshot } | Message::GameResult { snapshot } => {
                snapshot.encode()?
            }
            Message::GameCommandRequest { command } | Message::GameCommand { command } => {
                command.encode()?
            }
            Message::JoinMatchmaking | Message::LeaveMatchmaking | Message::MatchmakingLeft => {
                Vec::new()
            }
        };
        Ok(payload)
    }

    /// 按类型 ID 解码消息负载
    pub fn decode_payload(type_id: u32, payload: &[u8]) -> Result<Self, DecodeError> {
        let message_type =
            MessageType::from_value(type_id).ok_or(DecodeError::UnknownMessageType(type_id))?;

        let message = match message_type {
            MessageType::ClientHello => Message::ClientHello {
                nickname: bincode::deserialize(payload)?,
            },
            MessageType::ServerHello => Message::ServerHello {
                user_id: bincode::deserialize(payload)?,
            },
            MessageType::JoinMatchmaking => Message::JoinMatchmaking,
            MessageType::MatchmakingData => {
                let (queued, required) = bincode::deserialize(payload)?;
                Message::MatchmakingData { queued, required }
            }
            MessageType::LeaveMatchmaking => Message::LeaveMatchmaking,
            MessageType::MatchmakingLeft => Message::MatchmakingLeft,
            MessageType::MatchmakingFailed => Message::MatchmakingFailed {
                reason: bincode::deserialize(payload)?,
            },
            MessageType::GameData => Message::GameData {
                snapshot: GameSnapshot::decode(payload)?,
            },
            MessageType::GameCommandRequest => Message::GameCommandRequest {
                command: Command::decode(payload)?,
            },
            MessageType::GameCommand => Message::GameCommand {
                command: Command::decode(payload)?,
            },
            MessageType::GameResult => Message::GameResult {
                snapshot: GameSnapshot::decode(payload)?,
            },
        };
        Ok(message)
    }
}

/// 校验昵称
pub fn validate_nickname(nickname: &str) -> Result<(), ProtocolError> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::NicknameEmpty);
    }
    let len = trimmed.chars().count();
    if len > MAX_NICKNAME_LEN {
        return Err(ProtocolError::NicknameTooLong {
            len,
            max: MAX_NICKNAME_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{ChunkId, Position, Rotation};
    use crate::constants::SERVER_MESSAGE_TYPE_MIN;

    #[test]
    fn test_message_type_round_trip() {
        for message_type in MessageType::ALL {
            assert_eq!(
                MessageType::from_value(message_type.value()),
                Some(message_type)
            );
        }
        assert_eq!(MessageType::from_value(0), None);
    }

    #[test]
    fn test_message_type_ranges() {
        for message_type in MessageType::ALL {
            if message_type.is_client_originated() {
                assert!(message_type.value() <= CLIENT_MESSAGE_TYPE_MAX);
            } else {
                assert!(message_type.value() >= SERVER_MESSAGE_TYPE_MIN);
            }
        }
        assert!(MessageType::GameCommandRequest.is_client_originated());
        assert!(!MessageType::GameCommand.is_client_originated());
    }

    #[test]
    fn test_message_serialize() {
        let msg = Message::ClientHello {
            nickname: "player1".to_string(),
        };
        let payload = msg.encode_payload().unwrap();
        let decoded = Message::decode_payload(msg.type_id(), &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_command_messages_carry_command_type_first() {
        let msg = Message::GameCommand {
            command: Command::place_meeple(ChunkId::North),
        };
        let payload = msg.encode_payload().unwrap();
        assert_eq!(&payload[..4], &2u32.to_be_bytes());

        let request = Message::GameCommandRequest {
            command: Command::place_tile(Position::new(0, 1), Rotation::R90),
        };
        let payload = request.encode_payload().unwrap();
        assert_eq!(
            Message::decode_payload(MessageType::GameCommandRequest.value(), &payload).unwrap(),
            request
        );
    }

    #[test]
    fn test_empty_payload_messages() {
        for msg in [
            Message::JoinMatchmaking,
            Message::LeaveMatchmaking,
            Message::MatchmakingLeft,
        ] {
            assert!(msg.encode_payload().unwrap().is_empty());
            assert_eq!(Message::decode_payload(msg.type_id(), &[]).unwrap(), msg);
        }
    }

    #[test]
    fn test_unknown_type_is_decode_error() {
        assert!(matches!(
            Message::decode_payload(150, &[]),
            Err(DecodeError::UnknownMessageType(150))
        ));
    }

    #[test]
    fn test_validate_nickname() {
        assert!(validate_nickname("alice").is_ok());
        assert!(matches!(validate_nickname("   "), Err(ProtocolError::NicknameEmpty)));
        assert!(matches!(
            validate_nickname(&"x".repeat(21)),
            Err(ProtocolError::NicknameTooLong { len: 21, max: 20 })
        ));
    }
}
