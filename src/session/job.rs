use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::{PenParams, PlotStatus};

/// Which layers of the artifact a job plots, and in what order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayerSelector {
    #[default]
    All,
    One(u32),
    /// Plotted strictly in the order given.
    Sequence(Vec<u32>),
}

impl LayerSelector {
    /// The layers to plot one pass each; empty means a single all-layers pass.
    pub fn passes(&self) -> Vec<u32> {
        match self {
            LayerSelector::All => Vec::new(),
            LayerSelector::One(layer) => vec![*layer],
            LayerSelector::Sequence(layers) => layers.clone(),
        }
    }
}

/// Why a plot stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseCause {
    /// The pause button on the device (SDK status 102).
    Button,
    /// An interrupt delivered to the process (SDK status 103).
    Interrupt,
}

impl PauseCause {
    pub fn from_status(status: PlotStatus) -> Option<Self> {
        match status {
            PlotStatus::PausedByButton => Some(PauseCause::Button),
            PlotStatus::PausedByInterrupt => Some(PauseCause::Interrupt),
            _ => None,
        }
    }
}

/// Resumable snapshot of an interrupted plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PausedArtifact {
    /// The in-progress drawing as returned by the SDK.
    pub artifact: String,
    /// The layer that was being plotted, if the job ran specific layers.
    pub resume_layer: Option<u32>,
    pub pen: PenParams,
    pub cause: PauseCause,
    pub paused_at: DateTime<Utc>,
}

/// What a job does with its artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPlan {
    Plot(LayerSelector),
    Resume { layer: Option<u32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Plot,
    Resume,
}

/// A unit of plotting work, consumed entirely by the job runner.
#[derive(Debug, Clone)]
pub struct PlotJob {
    pub id: Uuid,
    pub artifact: String,
    pub plan: JobPlan,
    pub pen: PenParams,
    pub created_at: DateTime<Utc>,
}

impl PlotJob {
    pub fn plot(artifact: String, layers: LayerSelector, pen: PenParams) -> Self {
        Self::new(artifact, JobPlan::Plot(layers), pen)
    }

    /// A job that continues `paused` from where it stopped.
    pub fn resume(paused: PausedArtifact) -> Self {
        Self::new(
            paused.artifact,
            JobPlan::Resume {
                layer: paused.resume_layer,
            },
            paused.pen,
        )
    }

    fn new(artifact: String, plan: JobPlan, pen: PenParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact,
            plan,
            pen,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self.plan {
            JobPlan::Plot(_) => JobKind::Plot,
            JobPlan::Resume { .. } => JobKind::Resume,
        }
    }
}

/// Terminal result of a job as produced by the runner.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed,
    Paused(PausedArtifact),
    Failed(String),
}

/// Everything the runner reports back when a job ends.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub outcome: JobOutcome,
    /// Layers whose pass was started, in order.
    pub layers_attempted: Vec<u32>,
    /// Status code of the last SDK run, if one returned.
    pub last_status: Option<i32>,
}

impl JobRun {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            outcome: JobOutcome::Failed(reason.into()),
            layers_attempted: Vec::new(),
            last_status: None,
        }
    }
}

/// Client-visible summary of how a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobEnd {
    Completed,
    Paused {
        cause: PauseCause,
        resume_layer: Option<u32>,
    },
    Failed {
        reason: String,
    },
}

/// Structured record produced at job end, kept as the last-job summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub layers_attempted: Vec<u32>,
    pub last_status: Option<i32>,
    pub end: JobEnd,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl JobReport {
    pub fn from_run(job_id: Uuid, kind: JobKind, started_at: DateTime<Utc>, run: &JobRun) -> Self {
        let finished_at = Utc::now();
        let end = match &run.outcome {
            JobOutcome::Completed => JobEnd::Completed,
            JobOutcome::Paused(paused) => JobEnd::Paused {
                cause: paused.cause,
                resume_layer: paused.resume_layer,
            },
            JobOutcome::Failed(reason) => JobEnd::Failed {
                reason: reason.clone(),
            },
        };
        Self {
            job_id,
            kind,
            layers_attempted: run.layers_attempted.clone(),
            last_status: run.last_status,
            end,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
        }
    }
}
