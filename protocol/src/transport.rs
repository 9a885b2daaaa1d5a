//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使上层协议与具体传输实现解耦。
//! 读端通过 [`PacketFramer`] 把任意切分的字节流还原为消息。

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::CONNECT_TIMEOUT;
use crate::error::{ProtocolError, Result};
use crate::framer::PacketFramer;
use crate::message::Message;
use crate::packet::encode_message;

/// 连接抽象 trait（核心抽象，用于业务层）
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送消息
    async fn send(&mut self, msg: &Message) -> Result<()>;

    /// 接收消息
    async fn recv(&mut self) -> Result<Message>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

/// 监听器 trait（服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, msg: &Message) -> Result<()> {
        self.writer.write_message(msg).await
    }

    async fn recv(&mut self) -> Result<Message> {
        self.reader.read_message().await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 帧读写
// ============================================================================

/// 帧读取器
pub struct FrameReader<R> {
    reader: R,
    framer: PacketFramer,
    pending: VecDeque<Message>,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: PacketFramer::new(),
            pending: VecDeque::new(),
        }
    }

    /// 读取下一条消息
    ///
    /// 帧错误会作为 [`ProtocolError::Frame`] 返回，此后连接不可再用。
    pub async fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(msg) = self.pending.pop_front() {
                return Ok(msg);
            }

            let n = self.reader.read(self.framer.receive_buffer()).await?;
            if n == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }

            let pending = &mut self.pending;
            self.framer.on_receive(n, |msg| pending.push_back(msg))?;
        }
    }

    /// 接收消息（read_message 的别名）
    pub async fn recv(&mut self) -> Result<Message> {
        self.read_message().await
    }
}

/// 帧写入器
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 编码并写入一条消息
    pub async fn write_message(&mut self, msg: &Message) -> Result<()> {
        let bytes = encode_message(msg)?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// 发送消息（write_message 的别名）
    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        self.write_message(msg).await
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    #[tokio::test]
    async fn test_tcp_connection() {
        // 启动监听
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // 客户端连接
        let client_handle = tokio::spawn(async move {
            let connector = TcpConnector;
            let mut conn = connector.connect(&addr).await.unwrap();

            conn.send(&Message::ClientHello {
                nickname: "test".to_string(),
            })
            .await
            .unwrap();

            let msg = conn.recv().await.unwrap();
            assert_eq!(msg, Message::ServerHello { user_id: 1 });
        });

        // 服务端接受连接
        let mut conn = listener.accept().await.unwrap();

        let msg = conn.recv().await.unwrap();
        assert_eq!(
            msg,
            Message::ClientHello {
                nickname: "test".to_string()
            }
        );

        conn.send(&Message::ServerHello { user_id: 1 }).await.unwrap();

        client_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_reader_splits_coalesced_writes() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.send(&Message::JoinMatchmaking).await.unwrap();
        writer.send(&Message::LeaveMatchmaking).await.unwrap();

        assert_eq!(reader.recv().await.unwrap(), Message::JoinMatchmaking);
        assert_eq!(reader.recv().await.unwrap(), Message::LeaveMatchmaking);
    }

    #[tokio::test]
    async fn test_reader_reports_frame_error() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut reader = FrameReader::new(server);

        client.write_all(&[0u8; 32]).await.unwrap();

        assert!(matches!(
            reader.recv().await,
            Err(ProtocolError::Frame(FrameError::BadMagic { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reader_reports_closed() {
        let (client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);
        drop(client);

        assert!(matches!(
            reader.recv().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }
}
