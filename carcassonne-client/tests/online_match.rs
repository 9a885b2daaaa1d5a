//! 服务端与两个客户端通过本地 TCP 完整对局

use std::sync::Arc;
use std::time::Duration;

use carcassonne_client::{ClientGame, ServerConnection};
use carcassonne_server::{Server, ServerConfig};
use protocol::GameConfig;
use tempfile::TempDir;

async fn play(addr: String, nickname: &str, place_meeples: bool) -> (ClientGame, protocol::GameSnapshot) {
    let mut client = ClientGame::new(Arc::new(GameConfig::standard()), nickname)
        .with_meeples(place_meeples);
    let mut conn = ServerConnection::connect(&addr).await.unwrap();
    let result = conn.play(&mut client).await.unwrap();
    (client, result)
}

#[tokio::test]
async fn test_two_clients_play_to_the_end() {
    let temp_dir = TempDir::new().unwrap();
    let server = Server::bind(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        results_dir: Some(temp_dir.path().to_path_buf()),
        ..ServerConfig::default()
    })
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let state = server.state();
    tokio::spawn(server.run());

    let ((alice, alice_result), (bob, bob_result)) = tokio::time::timeout(
        Duration::from_secs(30),
        async { tokio::join!(play(addr.clone(), "alice", true), play(addr.clone(), "bob", false)) },
    )
    .await
    .expect("match did not finish in time");

    assert_eq!(alice_result, bob_result);
    assert!(alice_result.is_over());
    assert!(alice_result.turn.number > 0);

    // 两份影子对局与主端终局一致
    for client in [&alice, &bob] {
        assert!(client.is_finished());
        let shadow = client.game().unwrap();
        assert!(shadow.is_over());
        assert_eq!(shadow.board().len(), alice_result.board.len());
    }

    // 只有 alice 放了米宝
    let alice_id = alice.user_id().unwrap();
    let bob_id = bob.user_id().unwrap();
    let meeples_left = |id| {
        alice_result
            .players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.meeples)
            .unwrap()
    };
    assert!(meeples_left(alice_id) < 7);
    assert_eq!(meeples_left(bob_id), 7);

    // 终局结果先于对局销毁发出，等待服务端完成清理
    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = state.lock().await;
            if state.matches.is_empty() {
                break state;
            }
            drop(state);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("match was not cleaned up");
    let archived = state.archive.as_ref().unwrap().list().unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].players.len(), 2);
}
