//! 协议常量定义

use std::time::Duration;

/// 帧头魔数 ("CARC")
pub const PROTOCOL_MAGIC: u32 = 0x4341_5243;

/// 帧头大小: 4 字节魔数 + 4 字节类型 + 4 字节长度 + 4 字节校验和
pub const HEADER_SIZE: usize = 16;

/// 消息负载最大大小
pub const MAX_PAYLOAD_SIZE: usize = 65536;

/// 接收缓冲区初始容量
pub const INITIAL_RECEIVE_BUFFER: usize = 4096;

/// 客户端消息类型上限（<= 199 为客户端发起）
pub const CLIENT_MESSAGE_TYPE_MAX: u32 = 199;

/// 服务端消息类型下限（>= 200 为服务端发起）
pub const SERVER_MESSAGE_TYPE_MIN: u32 = 200;

/// 最少玩家数
pub const MIN_PLAYERS: usize = 2;

/// 最多玩家数
pub const MAX_PLAYERS: usize = 5;

/// 每名玩家的初始米宝数量
pub const MEEPLES_PER_PLAYER: u32 = 7;

/// 昵称最大长度
pub const MAX_NICKNAME_LEN: usize = 20;

/// 默认服务端口
pub const DEFAULT_PORT: u16 = 9528;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
