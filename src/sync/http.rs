use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::{
    config::RemoteConfig,
    error::{Error, Result},
    tracking::tree::FrameId,
};

use super::remote::{FrameRemote, RemoteFrame};

#[derive(Serialize)]
struct FramesPayload {
    frames: Vec<RemoteFrame>,
}

/// [FrameRemote] talking JSON over HTTP to `<url>/frames/`.
pub struct HttpRemote {
    client: Client,
    endpoint: String,
    token: String,
}

impl HttpRemote {
    /// Fails with [Error::MissingRemoteConfig] unless both the url and the token are set.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: &RemoteConfig, client: Client) -> Result<Self> {
        let (Some(url), Some(token)) = (config.url.as_deref(), config.token.as_deref()) else {
            return Err(Error::MissingRemoteConfig);
        };
        if url.trim().is_empty() || token.trim().is_empty() {
            return Err(Error::MissingRemoteConfig);
        }

        Ok(Self {
            client,
            endpoint: format!("{}/frames/", url.trim_end_matches('/')),
            token: token.to_owned(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: RequestBuilder, frames: Vec<RemoteFrame>) -> Result<Response> {
        debug!("Sending {} frames to {}", frames.len(), self.endpoint);
        request
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .json(&FramesPayload { frames })
            .send()
            .await
            .map_err(|e| Error::RemoteUnreachable(e.to_string()))
    }
}

async fn rejection(response: Response) -> Error {
    let status = response.status().as_u16();
    let detail = response
        .text()
        .await
        .unwrap_or_else(|e| format!("unreadable response: {e}"));
    Error::RemoteRejected { status, detail }
}

#[async_trait]
impl FrameRemote for HttpRemote {
    async fn create(&self, frames: Vec<RemoteFrame>) -> Result<Vec<FrameId>> {
        let response = self.send(self.client.post(&self.endpoint), frames).await?;
        if response.status() != StatusCode::CREATED {
            return Err(rejection(response).await);
        }
        response
            .json::<Vec<FrameId>>()
            .await
            .map_err(|e| Error::RemoteRejected {
                status: StatusCode::CREATED.as_u16(),
                detail: format!("invalid identifiers: {e}"),
            })
    }

    async fn update(&self, frames: Vec<RemoteFrame>) -> Result<()> {
        let response = self.send(self.client.put(&self.endpoint), frames).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }
}
