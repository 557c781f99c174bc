//! Mock completions provider for relay tests

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    dev::ServerHandle,
    http::{StatusCode, header},
    web,
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::{Notify, oneshot};

/// How the mock answers every POST it receives
#[derive(Clone, Debug)]
pub enum MockReply {
    /// 200 with all SSE frames available immediately
    Sse(Vec<String>),
    /// 200 that sends the first frame, then holds the rest until released
    GatedSse { first: String, rest: Vec<String> },
    /// Non-success status with a JSON body
    Error { status: u16, body: String },
    /// 200 that sends one frame, then aborts the connection mid-body
    Truncated { first: String },
    /// 200 that sends one frame, then SSE comments until the reader goes away
    KeepAlive { first: String },
}

/// Fires when a `KeepAlive` body is dropped, i.e. the connection was closed
struct DisconnectSignal(Arc<Notify>);

impl Drop for DisconnectSignal {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

struct MockState {
    reply: MockReply,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    disconnected: Arc<Notify>,
}

pub struct MockUpstream {
    addr: SocketAddr,
    handle: ServerHandle,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    gate_tx: Option<oneshot::Sender<()>>,
    disconnected: Arc<Notify>,
}

impl MockUpstream {
    /// Start the mock on an ephemeral port
    pub fn start(reply: MockReply) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;

        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let disconnected = Arc::new(Notify::new());
        let state = web::Data::new(MockState {
            reply,
            recorded: recorded.clone(),
            gate: Mutex::new(Some(gate_rx)),
            disconnected: disconnected.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .default_service(web::to(mock_responses))
        })
        .workers(1)
        .listen(listener)?
        .run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Ok(Self {
            addr,
            handle,
            recorded,
            gate_tx: Some(gate_tx),
            disconnected,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}/v1/responses", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }

    /// Let a `GatedSse` reply send the rest of its frames
    pub fn release(&mut self) {
        if let Some(tx) = self.gate_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Resolves once a `KeepAlive` body has been dropped by the server
    pub async fn disconnected(&self) {
        self.disconnected.notified().await;
    }

    pub async fn stop(mut self) {
        self.release();
        self.handle.stop(false).await;
    }
}

async fn mock_responses(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.recorded.lock().unwrap().push(RecordedRequest {
        path: req.path().to_string(),
        authorization,
        body,
    });

    match &state.reply {
        MockReply::Sse(frames) => {
            let frames: Vec<Result<Bytes, actix_web::Error>> = frames
                .iter()
                .map(|f| Ok(Bytes::from(f.clone())))
                .collect();
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(stream::iter(frames))
        }
        MockReply::GatedSse { first, rest } => {
            let gate = state.gate.lock().unwrap().take();
            let first = Bytes::from(first.clone());
            let rest = Bytes::from(rest.concat());
            let head = stream::once(async move { Ok::<_, actix_web::Error>(first) });
            let tail = stream::once(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok::<_, actix_web::Error>(rest)
            });
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(head.chain(tail))
        }
        MockReply::Truncated { first } => {
            let first = Bytes::from(first.clone());
            let head = stream::once(async move { Ok::<_, actix_web::Error>(first) });
            // The pause lets the first frame hit the wire before the abort
            let tail = stream::once(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<Bytes, _>(actix_web::error::ErrorInternalServerError(
                    "upstream went away",
                ))
            });
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(head.chain(tail))
        }
        MockReply::KeepAlive { first } => {
            let first = Bytes::from(first.clone());
            let head = stream::once(async move { Ok::<_, actix_web::Error>(first) });
            let signal = DisconnectSignal(state.disconnected.clone());
            let pings = stream::unfold(signal, |signal| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Some((
                    Ok::<_, actix_web::Error>(Bytes::from_static(b": keep-alive\n\n")),
                    signal,
                ))
            });
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(head.chain(pings))
        }
        MockReply::Error { status, body } => {
            HttpResponse::build(StatusCode::from_u16(*status).unwrap())
                .content_type("application/json")
                .body(body.clone())
        }
    }
}

/// An address nothing listens on
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1/responses", addr)
}

pub fn sse_frame(event: &str, data: serde_json::Value) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}
