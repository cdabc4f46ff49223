//! End-to-end lifecycle tests against an in-process mock of the remote
//! application.

#![allow(clippy::panic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use vts_link::client::VtsClient;
use vts_link::config::ClientConfig;
use vts_link::error::ClientError;
use vts_link::protocol::requests::{InjectParameterDataRequest, MoveModelRequest};
use vts_link::session::ConnectionState;

const TOKEN_KEY: &str = "VTS_LINK_IT_TOKEN";
const STEP: Duration = Duration::from_secs(5);

type ServerSocket = WebSocketStream<TcpStream>;

fn token_file() -> PathBuf {
    std::env::temp_dir().join(format!("vts-link-it-{}.env", uuid::Uuid::new_v4()))
}

fn config(url: &str, tokens: &Path) -> ClientConfig {
    ClientConfig::new(url)
        .with_plugin("Test Plugin", "Test Dev")
        .with_token_store(tokens, TOKEN_KEY)
        .with_launch_app(false)
        .with_reconnect_delay(Duration::from_millis(10))
}

async fn bind() -> (TcpListener, String) {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    (listener, format!("ws://{addr}"))
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let Ok(Ok((stream, _))) = tokio::time::timeout(STEP, listener.accept()).await else {
        panic!("client never connected");
    };
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        panic!("websocket handshake failed");
    };
    ws
}

async fn recv_json(ws: &mut ServerSocket) -> Value {
    loop {
        let Ok(frame) = tokio::time::timeout(STEP, ws.next()).await else {
            panic!("timed out waiting for a request");
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                let Ok(value) = serde_json::from_str(text.as_str()) else {
                    panic!("request is not JSON");
                };
                return value;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

async fn send_json(ws: &mut ServerSocket, value: Value) {
    let Ok(()) = ws.send(Message::text(value.to_string())).await else {
        panic!("send failed");
    };
}

fn message_type(value: &Value) -> &str {
    value
        .get("messageType")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn data_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value
        .get("data")
        .and_then(|d| d.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

async fn grant_token(ws: &mut ServerSocket, token: &str) {
    let request = recv_json(ws).await;
    assert_eq!(message_type(&request), "AuthenticationTokenRequest");
    assert_eq!(
        request.get("requestID").and_then(Value::as_str),
        Some("auth_token_request")
    );
    assert_eq!(data_str(&request, "pluginName"), "Test Plugin");
    assert_eq!(data_str(&request, "pluginDeveloper"), "Test Dev");
    send_json(
        ws,
        json!({"messageType": "AuthenticationTokenResponse", "data": {"authenticationToken": token}}),
    )
    .await;
}

async fn accept_auth(ws: &mut ServerSocket, expected_token: &str) {
    let request = recv_json(ws).await;
    assert_eq!(message_type(&request), "AuthenticationRequest");
    assert_eq!(data_str(&request, "authenticationToken"), expected_token);
    send_json(
        ws,
        json!({"messageType": "AuthenticationResponse", "data": {"authenticated": true, "reason": "ok"}}),
    )
    .await;
}

async fn ready(client: &VtsClient) -> vts_link::client::RequestDispatcher {
    let Ok(Ok(dispatcher)) = tokio::time::timeout(STEP, client.wait_ready()).await else {
        panic!("client never became ready");
    };
    dispatcher
}

fn stored_lines(tokens: &Path) -> usize {
    std::fs::read_to_string(tokens)
        .unwrap_or_default()
        .matches(TOKEN_KEY)
        .count()
}

#[tokio::test]
async fn fresh_plugin_requests_token_then_authenticates() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let client = VtsClient::start(config(&url, &tokens));

    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-fresh").await;
    accept_auth(&mut ws, "tok-fresh").await;
    let _ = ready(&client).await;

    assert_eq!(client.state(), ConnectionState::Ready);
    assert_eq!(stored_lines(&tokens), 1);
    let Ok(contents) = std::fs::read_to_string(&tokens) else {
        panic!("token file missing");
    };
    assert!(contents.contains(&format!("{TOKEN_KEY} = \"tok-fresh\"")));

    client.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn stored_credential_skips_token_request() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let Ok(()) = std::fs::write(&tokens, format!("{TOKEN_KEY} = \"tok-stored\"")) else {
        panic!("seed failed");
    };
    let client = VtsClient::start(config(&url, &tokens));

    let mut ws = accept(&listener).await;
    accept_auth(&mut ws, "tok-stored").await;
    let _ = ready(&client).await;
    assert_eq!(stored_lines(&tokens), 1);

    client.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn persisted_token_survives_restart() {
    let (listener, url) = bind().await;
    let tokens = token_file();

    let first = VtsClient::start(config(&url, &tokens));
    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-restart").await;
    accept_auth(&mut ws, "tok-restart").await;
    let _ = ready(&first).await;
    first.shutdown();
    drop(ws);

    let second = VtsClient::start(config(&url, &tokens));
    let mut ws = accept(&listener).await;
    accept_auth(&mut ws, "tok-restart").await;
    let _ = ready(&second).await;
    assert_eq!(stored_lines(&tokens), 1);

    second.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn blocking_request_waits_and_injection_does_not() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let client = VtsClient::start(config(&url, &tokens));

    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-block").await;
    accept_auth(&mut ws, "tok-block").await;
    let vts = ready(&client).await;

    // Injection returns without any response from the server.
    let Ok(()) = vts.inject_parameter_values(&InjectParameterDataRequest::new("MouthOpen", 0.5))
    else {
        panic!("inject failed");
    };
    let inject = recv_json(&mut ws).await;
    assert_eq!(message_type(&inject), "InjectParameterDataRequest");

    let mover = vts.clone();
    let call = tokio::spawn(async move {
        mover
            .request_model_move(&MoveModelRequest {
                position_x: 0.25,
                ..MoveModelRequest::default()
            })
            .await
    });

    let request = recv_json(&mut ws).await;
    assert_eq!(message_type(&request), "MoveModelRequest");
    assert_eq!(
        request.get("requestID").and_then(Value::as_str),
        Some("model_move")
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!call.is_finished(), "move must wait for its response");

    send_json(
        &mut ws,
        json!({"messageType": "MoveModelResponse", "requestID": "model_move", "data": {}}),
    )
    .await;
    let Ok(Ok(Ok(response))) = tokio::time::timeout(STEP, call).await else {
        panic!("move never completed");
    };
    assert_eq!(response.message_type, "MoveModelResponse");

    client.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn api_error_closes_once_and_stops() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let Ok(()) = std::fs::write(&tokens, format!("{TOKEN_KEY} = \"tok-revoked\"")) else {
        panic!("seed failed");
    };
    let client = VtsClient::start(config(&url, &tokens));

    let mut ws = accept(&listener).await;
    let auth = recv_json(&mut ws).await;
    assert_eq!(message_type(&auth), "AuthenticationRequest");
    send_json(
        &mut ws,
        json!({"messageType": "APIError", "data": {"errorID": 8, "message": "Token invalid"}}),
    )
    .await;

    let mut closes = 0;
    let mut texts = 0;
    while let Ok(Some(frame)) = tokio::time::timeout(STEP, ws.next()).await {
        match frame {
            Ok(Message::Close(_)) => closes += 1,
            Ok(Message::Text(_)) => texts += 1,
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert_eq!(closes, 1);
    assert_eq!(texts, 0);

    let Ok(result) = tokio::time::timeout(STEP, client.wait_ready()).await else {
        panic!("wait_ready hung after api error");
    };
    assert!(matches!(
        result,
        Err(ClientError::Rejected { error_id: 8, .. })
    ));
    assert_eq!(client.state(), ConnectionState::ClosedByError);

    let reconnect = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(reconnect.is_err(), "client must not reconnect after an api error");
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn reconnects_with_held_credential_after_close() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let client = VtsClient::start(config(&url, &tokens));

    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-again").await;
    accept_auth(&mut ws, "tok-again").await;
    let first = ready(&client).await;

    let Ok(()) = ws.close(None).await else {
        panic!("close failed");
    };
    drop(ws);

    let mut ws = accept(&listener).await;
    accept_auth(&mut ws, "tok-again").await;
    let second = ready(&client).await;

    // The old dispatcher is bound to the dead transport.
    assert!(matches!(
        first.request_current_model().await,
        Err(ClientError::SessionClosed)
    ));

    let current = tokio::spawn(async move { second.request_current_model().await });
    let request = recv_json(&mut ws).await;
    assert_eq!(message_type(&request), "CurrentModelRequest");
    assert!(request.get("data").is_none());
    send_json(
        &mut ws,
        json!({"messageType": "CurrentModelResponse", "data": {"modelLoaded": true, "modelName": "Hiyori"}}),
    )
    .await;
    let Ok(Ok(Ok(model))) = tokio::time::timeout(STEP, current).await else {
        panic!("current model request never completed");
    };
    assert_eq!(
        model.data.get("modelName").and_then(Value::as_str),
        Some("Hiyori")
    );
    assert_eq!(stored_lines(&tokens), 1);

    client.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn subscribed_events_reach_the_event_bus() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let client = VtsClient::start(config(&url, &tokens));
    let mut events = client.subscribe_events();

    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-events").await;
    accept_auth(&mut ws, "tok-events").await;
    let vts = ready(&client).await;

    let Ok(()) = vts.request_event_subscription(
        &vts_link::protocol::requests::EventSubscriptionRequest::new("ModelLoadedEvent"),
    ) else {
        panic!("subscribe failed");
    };
    let sub = recv_json(&mut ws).await;
    assert_eq!(message_type(&sub), "EventSubscriptionRequest");
    assert_eq!(data_str(&sub, "eventName"), "ModelLoadedEvent");

    send_json(
        &mut ws,
        json!({"messageType": "ModelLoadedEvent", "data": {"modelLoaded": true}}),
    )
    .await;
    let Ok(Ok(event)) = tokio::time::timeout(STEP, events.recv()).await else {
        panic!("event never published");
    };
    assert_eq!(event.message_type, "ModelLoadedEvent");

    client.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn refused_connections_are_retried() {
    // Reserve a port, then free it so the first attempts are refused.
    let (listener, url) = bind().await;
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    drop(listener);

    let tokens = token_file();
    let client = VtsClient::start(config(&url, &tokens));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!client.is_finished());
    assert!(!client.state().is_connected());

    let Ok(listener) = TcpListener::bind(addr).await else {
        panic!("rebind failed");
    };
    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-late").await;
    accept_auth(&mut ws, "tok-late").await;
    let _ = ready(&client).await;

    client.shutdown();
    let _ = std::fs::remove_file(tokens);
}

#[tokio::test]
async fn shutdown_fails_pending_calls_and_closes_the_socket() {
    let (listener, url) = bind().await;
    let tokens = token_file();
    let client = VtsClient::start(config(&url, &tokens));

    let mut ws = accept(&listener).await;
    grant_token(&mut ws, "tok-stop").await;
    accept_auth(&mut ws, "tok-stop").await;
    let vts = ready(&client).await;

    let mover = vts.clone();
    let call = tokio::spawn(async move {
        mover
            .request_model_move(&MoveModelRequest::default())
            .await
    });
    let request = recv_json(&mut ws).await;
    assert_eq!(message_type(&request), "MoveModelRequest");

    client.shutdown();

    let Ok(Ok(result)) = tokio::time::timeout(STEP, call).await else {
        panic!("pending call hung after shutdown");
    };
    assert!(matches!(result, Err(ClientError::SessionClosed)));

    let closed = tokio::time::timeout(STEP, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(matches!(closed, Ok(true)));

    let Ok(()) = tokio::time::timeout(STEP, client.join()).await else {
        panic!("connection task did not stop");
    };

    // No reconnect after an explicit shutdown.
    let reconnect = tokio::time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(reconnect.is_err());

    // The stale dispatcher fails instead of blocking.
    let Ok(result) = tokio::time::timeout(STEP, vts.request_current_model()).await else {
        panic!("stale dispatcher blocked");
    };
    assert!(matches!(result, Err(ClientError::SessionClosed)));
    let _ = std::fs::remove_file(tokens);
}
