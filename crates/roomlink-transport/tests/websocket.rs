//! Integration tests for the WebSocket transport.
//!
//! These spin up a real `tokio-tungstenite` server on a random port and
//! check that frames, listeners, connect params, and reconnection all work
//! over an actual socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use roomlink_transport::{
        Connect, ConnectOptions, EventTransport, Listener, ReconnectConfig,
        TransportError, WebSocketTransport,
    };
    use serde_json::{Value, json};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::handshake::server::{
        ErrorResponse, Request, Response,
    };

    type ServerWs = WebSocketStream<TcpStream>;

    /// Binds a listener on a random port and returns it with its ws:// URL.
    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}/"))
    }

    /// Accepts one WebSocket connection and reports the request's query.
    async fn accept(listener: &TcpListener) -> (ServerWs, Option<String>) {
        let (stream, _) = listener.accept().await.expect("should accept");
        let query = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&query);
        let ws = tokio_tungstenite::accept_hdr_async(
            stream,
            move |req: &Request,
                  resp: Response|
                  -> Result<Response, ErrorResponse> {
                *sink.lock().unwrap() = req.uri().query().map(str::to_string);
                Ok(resp)
            },
        )
        .await
        .expect("handshake should succeed");
        let query = query.lock().unwrap().clone();
        (ws, query)
    }

    async fn next_frame(ws: &mut ServerWs) -> Value {
        loop {
            match ws.next().await.expect("stream open").expect("frame ok") {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Message::Close(_) => panic!("unexpected close"),
                _ => continue,
            }
        }
    }

    async fn push(ws: &mut ServerWs, event: &str, data: Value) {
        let text = json!({ "event": event, "data": data }).to_string();
        ws.send(Message::Text(text.into())).await.unwrap();
    }

    /// A listener that forwards payloads into a channel.
    fn forwarder() -> (Listener, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Listener::new(move |p| {
            let _ = tx.send(p.clone());
        });
        (listener, rx)
    }

    #[tokio::test]
    async fn test_connect_sends_params_in_query() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let _client = WebSocketTransport::connect(
            ConnectOptions::new(url).with_param("playerID", "pub-42"),
        )
        .await
        .expect("should connect");

        let (_ws, query) = server.await.unwrap();
        assert_eq!(query.as_deref(), Some("playerID=pub-42"));
    }

    #[tokio::test]
    async fn test_emit_and_receive_frames() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let client = WebSocketTransport::connect(ConnectOptions::new(url))
            .await
            .expect("should connect");
        let (mut ws, _) = server.await.unwrap();

        // --- Client emits, server receives ---
        client
            .emit("getRoom", json!(null))
            .expect("emit should succeed");
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame, json!({ "event": "getRoom", "data": null }));

        // --- Server pushes, listener runs ---
        let (listener, mut rx) = forwarder();
        client.on("getRoom_response", listener.clone());
        push(&mut ws, "getRoom_response", json!({ "roomCode": "AB12" })).await;

        let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("listener should run")
            .unwrap();
        assert_eq!(payload["roomCode"], "AB12");

        client.off("getRoom_response", &listener);
        assert_eq!(client.listener_count("getRoom_response"), 0);
    }

    #[tokio::test]
    async fn test_emit_after_close_returns_closed() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let client = WebSocketTransport::connect(ConnectOptions::new(url))
            .await
            .expect("should connect");
        let _server_side = server.await.unwrap();

        client.close().await.expect("close should succeed");

        let result = client.emit("getRoom", json!(null));
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_connect_to_dead_port_fails() {
        // Bind, learn the port, then free it so nothing is listening.
        let (listener, url) = bind().await;
        drop(listener);

        let result = WebSocketTransport::connect(ConnectOptions::new(url)).await;

        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn test_reconnect_fires_lifecycle_and_uses_updated_params() {
        let (listener, url) = bind().await;
        let (conn_tx, mut conn_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                let accepted = accept(&listener).await;
                if conn_tx.send(accepted).is_err() {
                    break;
                }
            }
        });

        let options = ConnectOptions::new(url)
            .with_param("playerID", "old")
            .with_reconnect(ReconnectConfig {
                delay: Duration::from_millis(10),
                max_jitter: Duration::ZERO,
                ..ReconnectConfig::default()
            });
        let client = WebSocketTransport::connect(options)
            .await
            .expect("should connect");
        let (first, query) = conn_rx.recv().await.unwrap();
        assert_eq!(query.as_deref(), Some("playerID=old"));

        let (on_disconnect, mut disconnects) = forwarder();
        let (on_reconnection, mut reconnections) = forwarder();
        client.on("disconnect", on_disconnect);
        client.on("reconnection", on_reconnection);
        client.set_connect_param("playerID", "pub-9");

        // Server drops the first link.
        drop(first);

        let wait = Duration::from_secs(5);
        tokio::time::timeout(wait, disconnects.recv())
            .await
            .expect("disconnect should fire");
        let (mut second, query) = tokio::time::timeout(wait, conn_rx.recv())
            .await
            .expect("client should reconnect")
            .unwrap();
        assert_eq!(query.as_deref(), Some("playerID=pub-9"));
        tokio::time::timeout(wait, reconnections.recv())
            .await
            .expect("reconnection should fire");

        // The new link carries traffic.
        client.emit("getRoom", json!(null)).unwrap();
        let frame = next_frame(&mut second).await;
        assert_eq!(frame["event"], "getRoom");
    }
}
