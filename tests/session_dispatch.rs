mod common;

use serde_json::{Value, json};

use common::{connection, default_app, make_app};
use pulso::protocol;
use pulso::websocket::handler::{dispatch, handshake_error};

fn subscribe_auth(app: &pulso::app::Application, socket_id: &str, channel: &str, channel_data: &str) -> String {
    let mut to_sign = format!("{socket_id}:{channel}");
    if channel.starts_with("presence-") || !channel_data.is_empty() {
        to_sign.push(':');
        to_sign.push_str(channel_data);
    }
    format!("{}:{}", app.key(), app.token().sign(&to_sign))
}

#[tokio::test]
async fn ping_gets_a_pong() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(&app, &conn, r#"{"event":"pusher:ping"}"#).await.unwrap();

    let frames = sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], json!({"event": "pusher:pong", "data": "{}"}));
}

#[tokio::test]
async fn public_subscribe_round_trip() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:subscribe","data":{"channel":"chat"}}"#,
    )
    .await
    .unwrap();

    let frames = sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0],
        json!({
            "event": "pusher_internal:subscription_succeeded",
            "channel": "chat",
            "data": "{}",
        })
    );
    assert!(app.find_channel("chat").is_some());
}

#[tokio::test]
async fn invalid_channel_name_is_rejected() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:subscribe","data":{"channel":"bad name!"}}"#,
    )
    .await
    .unwrap();

    let frames = sink.frames();
    assert_eq!(frames[0]["event"], "pusher:error");
    assert_eq!(frames[0]["data"]["code"], Value::Null);
    assert_eq!(frames[0]["data"]["message"], "This channel name is not valid");
}

#[tokio::test]
async fn private_subscribe_with_bad_auth_keeps_session_open() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:subscribe","data":{"channel":"private-room","auth":"K:deadbeef"}}"#,
    )
    .await
    .unwrap();

    let frames = sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0],
        json!({
            "event": "pusher:error",
            "data": {
                "code": null,
                "message": "Auth value for subscription to private-room is invalid",
            },
        })
    );
    assert!(app.find_channel("private-room").is_none());

    // The session is still usable.
    sink.clear();
    dispatch(&app, &conn, r#"{"event":"pusher:ping"}"#).await.unwrap();
    assert_eq!(sink.frames()[0]["event"], "pusher:pong");
}

#[tokio::test]
async fn private_subscribe_with_valid_auth_succeeds() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    let auth = subscribe_auth(&app, "1.1", "private-room", "");
    let frame = json!({
        "event": "pusher:subscribe",
        "data": {"channel": "private-room", "auth": auth},
    });
    dispatch(&app, &conn, &frame.to_string()).await.unwrap();

    let frames = sink.frames();
    assert_eq!(frames[0]["event"], "pusher_internal:subscription_succeeded");
    assert_eq!(frames[0]["channel"], "private-room");
}

#[tokio::test]
async fn presence_subscribe_round_trip_with_roster() {
    let app = default_app();
    let (first, first_sink) = connection("1.1");
    let (second, second_sink) = connection("2.2");
    app.connect(first.clone());
    app.connect(second.clone());

    let data1 = r#"{"user_id":"u1","user_info":{"name":"Alice"}}"#;
    let frame = json!({
        "event": "pusher:subscribe",
        "data": {
            "channel": "presence-lobby",
            "auth": subscribe_auth(&app, "1.1", "presence-lobby", data1),
            "channel_data": data1,
        },
    });
    dispatch(&app, &first, &frame.to_string()).await.unwrap();
    first_sink.clear();

    let data2 = r#"{"user_id":"u2","user_info":{"name":"Bob"}}"#;
    let frame = json!({
        "event": "pusher:subscribe",
        "data": {
            "channel": "presence-lobby",
            "auth": subscribe_auth(&app, "2.2", "presence-lobby", data2),
            "channel_data": data2,
        },
    });
    dispatch(&app, &second, &frame.to_string()).await.unwrap();

    let added = first_sink.frames_named("pusher_internal:member_added");
    assert_eq!(added.len(), 1);
    let member: Value = serde_json::from_str(added[0]["data"].as_str().unwrap()).unwrap();
    assert_eq!(member["user_id"], "u2");

    let succeeded = second_sink.frames_named("pusher_internal:subscription_succeeded");
    assert_eq!(succeeded.len(), 1);
    let roster: Value = serde_json::from_str(succeeded[0]["data"].as_str().unwrap()).unwrap();
    assert_eq!(
        roster,
        json!({
            "presence": {
                "ids": ["u1", "u2"],
                "hash": {"u1": {"name": "Alice"}, "u2": {"name": "Bob"}},
                "count": 2,
            }
        })
    );
}

#[tokio::test]
async fn numeric_user_id_is_normalized_to_string() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    let data = r#"{"user_id":42}"#;
    let frame = json!({
        "event": "pusher:subscribe",
        "data": {
            "channel": "presence-lobby",
            "auth": subscribe_auth(&app, "1.1", "presence-lobby", data),
            "channel_data": data,
        },
    });
    dispatch(&app, &conn, &frame.to_string()).await.unwrap();

    let succeeded = sink.frames_named("pusher_internal:subscription_succeeded");
    let roster: Value = serde_json::from_str(succeeded[0]["data"].as_str().unwrap()).unwrap();
    assert_eq!(roster["presence"]["ids"], json!(["42"]));
}

#[tokio::test]
async fn unsubscribe_for_unknown_channel_is_a_generic_error() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:unsubscribe","data":{"channel":"nope"}}"#,
    )
    .await
    .unwrap();

    let frames = sink.frames();
    assert_eq!(frames[0]["event"], "pusher:error");
    assert_eq!(frames[0]["data"]["code"], Value::Null);
    assert_eq!(
        frames[0]["data"]["message"],
        "Could not find a channel with the id nope"
    );
}

#[tokio::test]
async fn unsubscribe_removes_the_subscription() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:subscribe","data":{"channel":"chat"}}"#,
    )
    .await
    .unwrap();
    sink.clear();

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:unsubscribe","data":{"channel":"chat"}}"#,
    )
    .await
    .unwrap();

    assert!(sink.frames().is_empty());
    assert!(app.find_channel("chat").is_none());
}

#[tokio::test]
async fn client_events_require_the_app_flag() {
    let app = make_app(json!({
        "app_id": "1",
        "key": "K",
        "secret": "S",
        "user_events": false,
    }));
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"client-typing","channel":"private-room","data":{}}"#,
    )
    .await
    .unwrap();

    assert_eq!(
        sink.frames()[0]["data"]["message"],
        "To send client events, you must enable this feature in the Settings."
    );
}

#[tokio::test]
async fn client_events_only_on_private_or_presence_channels() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(
        &app,
        &conn,
        r#"{"event":"pusher:subscribe","data":{"channel":"chat"}}"#,
    )
    .await
    .unwrap();
    sink.clear();

    dispatch(
        &app,
        &conn,
        r#"{"event":"client-typing","channel":"chat","data":{}}"#,
    )
    .await
    .unwrap();

    assert_eq!(
        sink.frames()[0]["data"]["message"],
        "Client event rejected - only supported on private and presence channels"
    );
}

#[tokio::test]
async fn client_event_fans_out_to_peers_but_not_the_sender() {
    let app = default_app();
    let (sender, sender_sink) = connection("1.1");
    let (peer, peer_sink) = connection("2.2");
    app.connect(sender.clone());
    app.connect(peer.clone());

    for (conn, id) in [(&sender, "1.1"), (&peer, "2.2")] {
        let frame = json!({
            "event": "pusher:subscribe",
            "data": {
                "channel": "private-room",
                "auth": subscribe_auth(&app, id, "private-room", ""),
            },
        });
        dispatch(&app, conn, &frame.to_string()).await.unwrap();
    }
    sender_sink.clear();
    peer_sink.clear();

    dispatch(
        &app,
        &sender,
        r#"{"event":"client-typing","channel":"private-room","data":{"status":"typing"}}"#,
    )
    .await
    .unwrap();

    let frames = peer_sink.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["event"], "client-typing");
    assert_eq!(frames[0]["channel"], "private-room");
    assert_eq!(frames[0]["data"], json!({"status": "typing"}));
    assert!(sender_sink.frames().is_empty());
}

#[tokio::test]
async fn undecodable_envelope_terminates_the_session() {
    let app = default_app();
    let (conn, _sink) = connection("1.1");
    app.connect(conn.clone());

    assert!(dispatch(&app, &conn, "not json at all").await.is_err());
}

#[tokio::test]
async fn unknown_events_are_ignored() {
    let app = default_app();
    let (conn, sink) = connection("1.1");
    app.connect(conn.clone());

    dispatch(&app, &conn, r#"{"event":"pusher:noise","data":{}}"#)
        .await
        .unwrap();
    assert!(sink.frames().is_empty());
}

#[test]
fn handshake_check_ordering() {
    let app = default_app();

    assert_eq!(
        handshake_error(None, &app, false).unwrap().code,
        protocol::NO_PROTOCOL_VERSION_SUPPLIED
    );
    assert_eq!(
        handshake_error(Some(""), &app, false).unwrap().code,
        protocol::NO_PROTOCOL_VERSION_SUPPLIED
    );
    assert_eq!(
        handshake_error(Some("abc"), &app, false).unwrap().code,
        protocol::INVALID_VERSION_STRING_FORMAT
    );
    assert_eq!(
        handshake_error(Some("6"), &app, false).unwrap().code,
        protocol::UNSUPPORTED_PROTOCOL_VERSION
    );
    assert!(handshake_error(Some("7"), &app, false).is_none());
}

#[test]
fn handshake_enforces_app_flags() {
    let disabled = make_app(json!({
        "app_id": "1", "key": "K", "secret": "S", "enabled": false,
    }));
    assert_eq!(
        handshake_error(Some("7"), &disabled, false).unwrap().code,
        protocol::APPLICATION_DISABLED
    );

    let ssl_only = make_app(json!({
        "app_id": "2", "key": "K2", "secret": "S", "only_ssl": true,
    }));
    assert_eq!(
        handshake_error(Some("7"), &ssl_only, false).unwrap().code,
        protocol::APPLICATION_ONLY_ACCEPTS_SSL
    );
    assert!(handshake_error(Some("7"), &ssl_only, true).is_none());
}
