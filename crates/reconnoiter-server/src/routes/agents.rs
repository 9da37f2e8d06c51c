use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use reconnoiter::agents::AgentParams;
use reconnoiter::model_id::ModelId;
use reconnoiter::models::attachment::Attachment;
use serde::Deserialize;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const RUN_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
pub struct AttachmentRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub message: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default)]
    pub model_id: ModelId,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentRequest>>,
}

fn default_stream() -> bool {
    true
}

/// An absent or empty list means the agent gets no attachments at all
pub fn normalize_attachments(attachments: Option<Vec<AttachmentRequest>>) -> Option<Vec<Attachment>> {
    let attachments = attachments.filter(|attachments| !attachments.is_empty())?;
    Some(
        attachments
            .into_iter()
            .map(|a| Attachment::new(a.url, a.content, a.mime_type, a.filepath))
            .collect(),
    )
}

/// Run chunks framed as `<json>\n\n`, relayed from the agent task
pub struct SseResponse {
    rx: ReceiverStream<anyhow::Result<String>>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<anyhow::Result<String>>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = anyhow::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|chunk| chunk.map(Bytes::from)))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.list_identifiers())
}

async fn create_run(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(request): Json<RunRequest>,
) -> Result<Response, ApiError> {
    tracing::debug!(
        agent = %agent_id,
        model = %request.model_id,
        stream = request.stream,
        "run requested"
    );

    let params = AgentParams {
        model_id: request.model_id,
        user_id: request.user_id,
        session_id: request.session_id,
        debug_mode: state.debug_mode,
    };
    let agent = state.registry.resolve(&agent_id, params)?;
    let attachments = normalize_attachments(request.attachments);
    let message = request.message;

    if !request.stream {
        let response = agent.run(&message, attachments).await?;
        return Ok(response.content.unwrap_or_default().into_response());
    }

    let (tx, rx) = mpsc::channel(RUN_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut chunks = match agent.run_stream(&message, attachments).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::error!("Failed to start run stream: {}", e);
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!(agent = %agent.agent_id(), "client disconnected, stopping run");
                    break;
                }
                chunk = chunks.next() => {
                    let framed = match chunk {
                        Some(Ok(chunk)) => chunk
                            .to_json()
                            .map(|json| format!("{}\n\n", json))
                            .map_err(anyhow::Error::from),
                        Some(Err(e)) => Err(e),
                        None => break,
                    };
                    let failed = framed.is_err();
                    if let Err(e) = &framed {
                        tracing::error!("Error processing run chunk: {}", e);
                    }
                    if tx.send(framed).await.is_err() || failed {
                        break;
                    }
                }
            }
        }
    });

    Ok(SseResponse::new(ReceiverStream::new(rx)).into_response())
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/agents/:agent_id/runs", post(create_run))
        .with_state(state)
}
