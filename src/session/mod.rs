mod controller;
mod job;
mod state;

pub use controller::{ControllerSettings, SessionController};
pub use job::{
    JobEnd, JobOutcome, JobPlan, JobReport, JobRun, LayerSelector, PauseCause, PausedArtifact,
    PlotJob,
};
pub use state::SessionState;
