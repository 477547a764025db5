mod test_utils;

use std::time::Duration;

use reactor_redis::resp::RespValue;
use test_utils::{bulk, simple, start_server, strings, TestClient};

#[tokio::test]
async fn test_pipelined_commands_reply_in_order() {
    let server = start_server();
    let mut client = TestClient::connect(server.local_addr()).await;

    let mut batch = String::new();
    for parts in [
        vec!["SET", "a", "1"],
        vec!["INCR", "a"],
        vec!["GET", "a"],
        vec!["RPUSH", "list", "x", "y"],
        vec!["LRANGE", "list", "0", "-1"],
        vec!["PING"],
    ] {
        batch.push_str(&RespValue::command(&parts).encode());
    }

    client.write_raw(batch.as_bytes()).await;

    let expected = vec![
        RespValue::ok(),
        RespValue::Integer(2),
        bulk("2"),
        RespValue::Integer(2),
        strings(&["x", "y"]),
        simple("PONG"),
    ];

    for reply in expected {
        assert_eq!(client.read_reply().await, reply);
    }
}

#[tokio::test]
async fn test_frames_split_across_reads() {
    let server = start_server();
    let mut client = TestClient::connect(server.local_addr()).await;

    let batch = format!(
        "{}{}",
        RespValue::command(&["ECHO", "Hello, world"]).encode(),
        RespValue::command(&["PING"]).encode()
    );

    for chunk in batch.as_bytes().chunks(3) {
        client.write_raw(chunk).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(client.read_reply().await, bulk("Hello, world"));
    assert_eq!(client.read_reply().await, simple("PONG"));
}

#[tokio::test]
async fn test_commands_after_blpop_wait_for_it() {
    let server = start_server();
    let mut waiter = TestClient::connect(server.local_addr()).await;
    let mut pusher = TestClient::connect(server.local_addr()).await;

    let batch = format!(
        "{}{}",
        RespValue::command(&["BLPOP", "queue", "0"]).encode(),
        RespValue::command(&["PING"]).encode()
    );
    waiter.write_raw(batch.as_bytes()).await;

    assert_eq!(waiter.try_read_reply(Duration::from_millis(200)).await, None);

    assert_eq!(
        pusher.command(&["RPUSH", "queue", "job"]).await,
        RespValue::Integer(1)
    );

    assert_eq!(waiter.read_reply().await, strings(&["queue", "job"]));
    assert_eq!(waiter.read_reply().await, simple("PONG"));
}
