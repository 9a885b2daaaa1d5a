//! 网络通信模块

mod connection;

pub use connection::ServerConnection;
