//! JSON bodies exchanged between the HTTP façade and its client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::PenParams;
use crate::error::{ErrorKind, SessionError};
use crate::profile::{PlotterProfile, ProfileKind};
use crate::session::LayerSelector;

/// Body of every successful mutating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
    /// Set when the request started a background job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            job_id: None,
        }
    }

    pub fn job(message: impl Into<String>, job_id: Uuid) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::new(message)
        }
    }
}

/// Body of every rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&SessionError> for Failure {
    fn from(err: &SessionError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// `GET /config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub plotter_type: ProfileKind,
    pub profile: PlotterProfile,
    pub nextdraw_available: bool,
}

/// `POST /config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub plotter_type: String,
}

/// `POST /cmd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmdRequest {
    pub command: String,
}

/// Query string of `POST /home`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HomeQuery {
    /// Only home from a paused plot; never jog an idle session.
    #[serde(default)]
    pub from_pause: bool,
}

/// `layer` in a plot request: a single layer or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerSpec {
    One(u32),
    Many(Vec<u32>),
}

impl LayerSpec {
    pub fn selector(spec: Option<LayerSpec>) -> LayerSelector {
        match spec {
            None => LayerSelector::All,
            Some(LayerSpec::One(layer)) => LayerSelector::One(layer),
            Some(LayerSpec::Many(layers)) if layers.is_empty() => LayerSelector::All,
            Some(LayerSpec::Many(layers)) => LayerSelector::Sequence(layers),
        }
    }
}

/// Pen settings in a plot request; absent fields take the server's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pen_up: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pen_down: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_up: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_down: Option<u32>,
}

impl PenSettings {
    pub fn resolve(&self, defaults: PenParams) -> PenParams {
        PenParams {
            pen_up: self.pen_up.unwrap_or(defaults.pen_up),
            pen_down: self.pen_down.unwrap_or(defaults.pen_down),
            speed_up: self.speed_up.unwrap_or(defaults.speed_up),
            speed_down: self.speed_down.unwrap_or(defaults.speed_down),
        }
    }
}

/// `POST /plot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotRequest {
    #[serde(default)]
    pub svg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<LayerSpec>,
    #[serde(default)]
    pub settings: PenSettings,
}
