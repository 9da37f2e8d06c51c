use anyhow::{anyhow, bail, Result};
use futures::StreamExt;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct AttachmentBody {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunBody {
    pub message: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentBody>>,
}

pub struct ReconClient {
    http: Client,
    endpoint: Url,
}

impl ReconClient {
    pub fn new<S: AsRef<str>>(endpoint: S) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self {
            http: Client::new(),
            endpoint,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Endpoint {} cannot be used as a base URL", self.endpoint))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn list_agents(&self) -> Result<Vec<String>> {
        let response = self.http.get(self.url(&["agents"])?).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post_run(&self, agent: &str, body: &RunBody) -> Result<Response> {
        let url = self.url(&["agents", agent, "runs"])?;
        let response = self.http.post(url).json(body).send().await?;
        check(response).await
    }

    /// The final answer of a non-streaming run
    pub async fn run_buffered(&self, agent: &str, body: &RunBody) -> Result<String> {
        Ok(self.post_run(agent, body).await?.text().await?)
    }

    /// Post a streaming run and hand every decoded chunk to `on_chunk` as it arrives
    pub async fn run_stream<F>(&self, agent: &str, body: &RunBody, mut on_chunk: F) -> Result<()>
    where
        F: FnMut(Value) -> Result<()>,
    {
        let response = self.post_run(agent, body).await?;
        let mut bytes = Box::pin(response.bytes_stream());
        let mut decoder = FrameDecoder::default();

        while let Some(bytes) = bytes.next().await {
            for frame in decoder.push(&bytes?) {
                on_chunk(serde_json::from_str(&frame)?)?;
            }
        }
        if let Some(frame) = decoder.finish() {
            on_chunk(serde_json::from_str(&frame)?)?;
        }
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    bail!("Request failed: {}\n{}", status, detail)
}

/// Splits a run body into frames delimited by a blank line.
///
/// Chunk payloads are single-line JSON, so a blank line never occurs inside one.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&frame[..end]).trim().to_string();
            if !text.is_empty() {
                frames.push(text);
            }
        }
        frames
    }

    /// Whatever trailing data never got its delimiter
    pub fn finish(self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.buffer).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}
