//! 服务器连接
//!
//! 使用 protocol 库的传输层抽象，把收到的消息交给 [`ClientGame`] 处理，
//! 再把它产生的回复发回服务器。

use anyhow::{Context, Result};
use tracing::{debug, info};

use protocol::{Connection, Connector, GameSnapshot, ProtocolError, TcpConnection, TcpConnector};

use crate::game::ClientGame;

/// 与服务器的连接
pub struct ServerConnection<C: Connection> {
    conn: C,
}

impl ServerConnection<TcpConnection> {
    /// 连接到服务器（超时为 `CONNECT_TIMEOUT`）
    pub async fn connect(addr: &str) -> Result<Self> {
        let conn = TcpConnector
            .connect(addr)
            .await
            .with_context(|| format!("无法连接服务器 {}", addr))?;

        info!("已连接到服务器: {}", addr);
        Ok(Self::new(conn))
    }
}

impl<C: Connection> ServerConnection<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// 握手、排队并完成一局，返回终局快照
    pub async fn play(&mut self, client: &mut ClientGame) -> Result<GameSnapshot> {
        self.conn.send(&client.hello()).await?;

        loop {
            let msg = match self.conn.recv().await {
                Ok(msg) => msg,
                Err(ProtocolError::ConnectionClosed) => {
                    anyhow::bail!("服务器关闭了连接");
                }
                Err(e) => return Err(e).context("接收消息失败"),
            };
            debug!("收到 {:?}", msg.message_type());

            for reply in client.handle(msg)? {
                self.conn.send(&reply).await?;
            }

            if let Some(result) = client.result() {
                let result = result.clone();
                if let Err(e) = self.conn.close().await {
                    debug!("关闭连接失败: {}", e);
                }
                return Ok(result);
            }
        }
    }
}
