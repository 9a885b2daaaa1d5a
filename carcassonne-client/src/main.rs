use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carcassonne_client::{ClientGame, ClientSettings, ServerConnection};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("carcassonne_client=info".parse()?))
        .init();

    // 参数: [设置文件] [昵称]
    let mut args = std::env::args().skip(1);
    let mut settings = match args.next() {
        Some(path) => ClientSettings::load_from(&PathBuf::from(path)),
        None => ClientSettings::load(),
    };
    if let Some(nickname) = args.next() {
        settings.nickname = nickname;
    }

    let config = Arc::new(settings.load_game_config()?);
    let mut client = ClientGame::new(config, settings.nickname.clone())
        .with_meeples(settings.place_meeples);

    let mut conn = ServerConnection::connect(&settings.server_addr).await?;
    let result = conn.play(&mut client).await?;

    if let Some(leader) = result.leader() {
        info!("胜者: 玩家 {}（{} 分）", leader.id, leader.score);
    }
    Ok(())
}
