//! 数据包编解码
//!
//! 帧布局（全部为大端序）：
//!
//! | 偏移 | 长度 | 字段       |
//! |------|------|------------|
//! | 0    | 4    | 魔数       |
//! | 4    | 4    | 消息类型   |
//! | 8    | 4    | 负载长度   |
//! | 12   | 4    | 负载 CRC-32 |
//! | 16   | n    | 负载       |

use crate::constants::{HEADER_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_MAGIC};
use crate::error::{DecodeError, FrameError, ProtocolError};
use crate::message::Message;

/// 负载校验和
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// 帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub magic: u32,
    pub type_id: u32,
    pub payload_length: u32,
    pub checksum: u32,
}

impl PacketHeader {
    /// 从字节解析帧头，不足 [`HEADER_SIZE`] 字节时返回 `None`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_SIZE)?;
        let field = |i: usize| {
            u32::from_be_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]])
        };
        Some(Self {
            magic: field(0),
            type_id: field(4),
            payload_length: field(8),
            checksum: field(12),
        })
    }

    /// 检查魔数和长度上限，只需要帧头即可判断
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.magic != PROTOCOL_MAGIC {
            return Err(FrameError::BadMagic {
                expected: PROTOCOL_MAGIC,
                actual: self.magic,
            });
        }
        if self.payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: self.payload_length as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(())
    }

    /// 整帧长度
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_length as usize
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.type_id.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.payload_length.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.checksum.to_be_bytes());
        bytes
    }
}

/// 数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    /// 编码消息
    pub fn create(message: &Message) -> Result<Self, ProtocolError> {
        let payload = message.encode_payload()?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            }
            .into());
        }

        Ok(Self {
            header: PacketHeader {
                magic: PROTOCOL_MAGIC,
                type_id: message.type_id(),
                payload_length: payload.len() as u32,
                checksum: checksum(&payload),
            },
            payload,
        })
    }

    /// 从完整的帧解析，校验魔数、长度与校验和
    pub fn parse(frame: &[u8]) -> Result<Option<Self>, FrameError> {
        let Some(header) = PacketHeader::parse(frame) else {
            return Ok(None);
        };
        header.validate()?;

        let Some(payload) = frame.get(HEADER_SIZE..header.frame_len()) else {
            return Ok(None);
        };
        let actual = checksum(payload);
        if actual != header.checksum {
            return Err(FrameError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        Ok(Some(Self {
            header,
            payload: payload.to_vec(),
        }))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// 解码为消息
    pub fn into_message(self) -> Result<Message, DecodeError> {
        Message::decode_payload(self.header.type_id, &self.payload)
    }
}

/// 直接把消息编码为帧字节
pub fn encode_message(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    Ok(Packet::create(message)?.to_bytes())
}
