//! 字节流分帧
//!
//! 把一次次不完整的网络读取拼接成完整的数据包。一次 `on_receive`
//! 会分发缓冲区中所有完整的包，末尾不完整的部分原样保留到下一次。

use crate::constants::{HEADER_SIZE, INITIAL_RECEIVE_BUFFER, MAX_PAYLOAD_SIZE};
use crate::error::FrameError;
use crate::message::Message;
use crate::packet::{Packet, PacketHeader};

/// 单帧最大长度
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// 分帧器
///
/// 返回 [`FrameError`] 时字节流已经失去对齐，调用方必须关闭连接。
/// 未知消息类型等解码错误只记录日志并丢弃该包。
#[derive(Debug)]
pub struct PacketFramer {
    buffer: Vec<u8>,
    filled: usize,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_RECEIVE_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.clamp(HEADER_SIZE, MAX_FRAME_SIZE)],
            filled: 0,
        }
    }

    /// 下一次读取应写入的空闲区域
    pub fn receive_buffer(&mut self) -> &mut [u8] {
        if self.filled == self.buffer.len() {
            self.grow(self.buffer.len() * 2);
        }
        &mut self.buffer[self.filled..]
    }

    /// 已缓冲但尚未分发的字节数
    pub fn buffered(&self) -> usize {
        self.filled
    }

    /// 通知分帧器 `received` 个字节已写入 [`receive_buffer`](Self::receive_buffer)
    ///
    /// 返回本次分发的消息数量。
    pub fn on_receive(
        &mut self,
        received: usize,
        mut dispatch: impl FnMut(Message),
    ) -> Result<usize, FrameError> {
        self.filled = (self.filled + received).min(self.buffer.len());

        let mut cursor = 0;
        let mut dispatched = 0;
        let result = loop {
            let available = &self.buffer[cursor..self.filled];

            // 帧头不完整，等待更多数据
            let Some(header) = PacketHeader::parse(available) else {
                break Ok(dispatched);
            };
            // 只有帧头也要立即拒绝超长的包
            if let Err(e) = header.validate() {
                break Err(e);
            }

            let frame_len = header.frame_len();
            if available.len() < frame_len {
                // 为剩余部分腾出空间
                if cursor + frame_len > self.buffer.len() {
                    self.compact(cursor);
                    cursor = 0;
                    self.grow(frame_len);
                }
                break Ok(dispatched);
            }

            match Packet::parse(&available[..frame_len]) {
                Ok(Some(packet)) => match packet.into_message() {
                    Ok(message) => {
                        dispatch(message);
                        dispatched += 1;
                    }
                    Err(e) => {
                        tracing::warn!("丢弃无法解码的消息 (type={}): {}", header.type_id, e);
                    }
                },
                Ok(None) => break Ok(dispatched),
                Err(e) => break Err(e),
            }
            cursor += frame_len;
        };

        if result.is_ok() {
            self.compact(cursor);
        }
        result
    }

    /// 追加一段字节并分发其中的完整包
    pub fn extend(
        &mut self,
        mut data: &[u8],
        mut dispatch: impl FnMut(Message),
    ) -> Result<usize, FrameError> {
        let mut dispatched = 0;
        while !data.is_empty() {
            let spare = self.receive_buffer();
            let n = spare.len().min(data.len());
            spare[..n].copy_from_slice(&data[..n]);
            data = &data[n..];
            dispatched += self.on_receive(n, &mut dispatch)?;
        }
        Ok(dispatched)
    }

    /// 丢弃已分发的字节，把剩余部分移到缓冲区开头
    fn compact(&mut self, consumed: usize) {
        if consumed == 0 {
            return;
        }
        self.buffer.copy_within(consumed..self.filled, 0);
        self.filled -= consumed;
    }

    fn grow(&mut self, size: usize) {
        let size = size.min(MAX_FRAME_SIZE);
        if size > self.buffer.len() {
            self.buffer.resize(size, 0);
        }
    }
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ChunkId;
    use crate::command::Command;
    use crate::constants::PROTOCOL_MAGIC;
    use crate::packet::{checksum, encode_message};

    fn hello(nickname: &str) -> Message {
        Message::ClientHello {
            nickname: nickname.to_string(),
        }
    }

    fn feed(framer: &mut PacketFramer, bytes: &[u8]) -> (Vec<Message>, Result<usize, FrameError>) {
        let mut received = Vec::new();
        let result = framer.extend(bytes, |m| received.push(m));
        (received, result)
    }

    #[test]
    fn test_two_packets_in_one_receive() {
        let mut bytes = encode_message(&hello("a")).unwrap();
        bytes.extend(encode_message(&Message::JoinMatchmaking).unwrap());

        let mut framer = PacketFramer::new();
        let spare = framer.receive_buffer();
        spare[..bytes.len()].copy_from_slice(&bytes);

        let mut received = Vec::new();
        let count = framer.on_receive(bytes.len(), |m| received.push(m)).unwrap();

        assert_eq!(count, 2);
        assert_eq!(received, vec![hello("a"), Message::JoinMatchmaking]);
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_corrupted_checksum_closes() {
        let clean = encode_message(&hello("bob")).unwrap();

        // 校验和字段与负载中任意一个字节被改动都会被发现
        for index in (12..16).chain(HEADER_SIZE..clean.len()) {
            let mut bytes = clean.clone();
            bytes[index] ^= 0xFF;

            let (received, result) = feed(&mut PacketFramer::new(), &bytes);
            assert!(received.is_empty(), "byte {}", index);
            assert!(
                matches!(result, Err(FrameError::ChecksumMismatch { .. })),
                "byte {}: {:?}",
                index,
                result
            );
        }
    }

    #[test]
    fn test_corrupted_magic_closes() {
        let clean = encode_message(&hello("bob")).unwrap();

        for index in 0..4 {
            let mut bytes = clean.clone();
            bytes[index] ^= 0xFF;

            let (received, result) = feed(&mut PacketFramer::new(), &bytes);
            assert!(received.is_empty(), "byte {}", index);
            assert!(
                matches!(result, Err(FrameError::BadMagic { .. })),
                "byte {}: {:?}",
                index,
                result
            );
        }
    }

    #[test]
    fn test_oversized_payload_closes_with_header_only() {
        let header = PacketHeader {
            magic: PROTOCOL_MAGIC,
            type_id: 220,
            payload_length: (MAX_PAYLOAD_SIZE + 1) as u32,
            checksum: 0,
        };

        let (received, result) = feed(&mut PacketFramer::new(), &header.to_bytes());
        assert!(received.is_empty());
        assert_eq!(
            result,
            Err(FrameError::PayloadTooLarge {
                size: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE,
            })
        );
    }

    #[test]
    fn test_partial_packet_waits_for_last_byte() {
        let bytes = encode_message(&hello("carol")).unwrap();
        let mut framer = PacketFramer::new();

        let (received, result) = feed(&mut framer, &bytes[..bytes.len() - 1]);
        assert!(received.is_empty());
        assert_eq!(result, Ok(0));

        let (received, result) = feed(&mut framer, &bytes[bytes.len() - 1..]);
        assert_eq!(received, vec![hello("carol")]);
        assert_eq!(result, Ok(1));
    }

    #[test]
    fn test_complete_then_partial() {
        let a = encode_message(&hello("a")).unwrap();
        let b = encode_message(&Message::GameCommand {
            command: Command::place_meeple(ChunkId::West),
        })
        .unwrap();

        let mut bytes = a.clone();
        bytes.extend_from_slice(&b[..b.len() - 1]);

        let mut framer = PacketFramer::new();
        let (received, result) = feed(&mut framer, &bytes);
        assert_eq!(received, vec![hello("a")]);
        assert_eq!(result, Ok(1));
        assert_eq!(framer.buffered(), b.len() - 1);

        let (received, _) = feed(&mut framer, &b[b.len() - 1..]);
        assert_eq!(
            received,
            vec![Message::GameCommand {
                command: Command::place_meeple(ChunkId::West),
            }]
        );
    }

    #[test]
    fn test_byte_by_byte_delivery() {
        let mut bytes = encode_message(&hello("x")).unwrap();
        bytes.extend(encode_message(&Message::LeaveMatchmaking).unwrap());

        let mut framer = PacketFramer::new();
        let mut received = Vec::new();
        for byte in &bytes {
            framer.extend(&[*byte], |m| received.push(m)).unwrap();
        }
        assert_eq!(received, vec![hello("x"), Message::LeaveMatchmaking]);
    }

    #[test]
    fn test_unknown_type_is_dropped_without_closing() {
        let payload = b"junk".to_vec();
        let header = PacketHeader {
            magic: PROTOCOL_MAGIC,
            type_id: 150,
            payload_length: payload.len() as u32,
            checksum: checksum(&payload),
        };
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&payload);
        bytes.extend(encode_message(&Message::MatchmakingLeft).unwrap());

        let (received, result) = feed(&mut PacketFramer::new(), &bytes);
        assert_eq!(received, vec![Message::MatchmakingLeft]);
        assert_eq!(result, Ok(1));
    }

    #[test]
    fn test_buffer_grows_for_large_packet() {
        let nickname = "n".repeat(INITIAL_RECEIVE_BUFFER * 3);
        let bytes = encode_message(&hello(&nickname)).unwrap();
        assert!(bytes.len() > INITIAL_RECEIVE_BUFFER);

        let mut framer = PacketFramer::new();
        let (received, result) = feed(&mut framer, &bytes);
        assert_eq!(result, Ok(1));
        assert_eq!(received, vec![hello(&nickname)]);
    }
}
