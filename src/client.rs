use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::{Ack, CmdRequest, ConfigRequest, Failure, PlotRequest, ProfileInfo};
use crate::error::ClientError;
use crate::session::SessionState;

/// Talks to a running `plotctl serve`.
pub struct PlotctlClient {
    client: Client,
    base_url: String,
}

impl PlotctlClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn state(&self) -> Result<SessionState, ClientError> {
        self.get("/state").await
    }

    pub async fn profile(&self) -> Result<ProfileInfo, ClientError> {
        self.get("/config").await
    }

    pub async fn set_profile(&self, plotter_type: &str) -> Result<Ack, ClientError> {
        let body = ConfigRequest {
            plotter_type: plotter_type.to_string(),
        };
        self.post("/config", Some(&body)).await
    }

    pub async fn connect(&self) -> Result<Ack, ClientError> {
        self.post::<()>("/connect", None).await
    }

    pub async fn disconnect(&self) -> Result<Ack, ClientError> {
        self.post::<()>("/disconnect", None).await
    }

    pub async fn command(&self, line: &str) -> Result<Ack, ClientError> {
        let body = CmdRequest {
            command: line.to_string(),
        };
        self.post("/cmd", Some(&body)).await
    }

    pub async fn plot(&self, req: &PlotRequest) -> Result<Ack, ClientError> {
        self.post("/plot", Some(req)).await
    }

    pub async fn resume(&self) -> Result<Ack, ClientError> {
        self.post::<()>("/resume", None).await
    }

    /// `from_pause` restricts homing to a paused plot.
    pub async fn home(&self, from_pause: bool) -> Result<Ack, ClientError> {
        let path = if from_pause {
            "/home?from_pause=true"
        } else {
            "/home"
        };
        self.post::<()>(path, None).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<Ack, ClientError> {
        let mut request = self.client.post(format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|err| ClientError::Unexpected {
            status: status.as_u16(),
            message: format!("invalid response body: {err}"),
        });
    }

    match serde_json::from_str::<Failure>(&text) {
        Ok(failure) => Err(ClientError::Rejected {
            kind: failure.kind,
            message: failure.error,
        }),
        Err(_) => Err(ClientError::Unexpected {
            status: status.as_u16(),
            message: if text.is_empty() {
                "unknown error".to_string()
            } else {
                text
            },
        }),
    }
}
