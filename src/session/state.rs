use serde::{Deserialize, Serialize};

use super::job::JobReport;
use crate::profile::PlotterProfile;

/// Read-only snapshot of the controller's state.
///
/// `interactive_connected` and `job_running` are never both true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub interactive_connected: bool,
    pub job_running: bool,
    pub paused: bool,
    pub profile: PlotterProfile,
    /// Whether the NextDraw library is installed right now.
    pub nextdraw_available: bool,
    #[serde(default)]
    pub last_job: Option<JobReport>,
}

impl SessionState {
    /// Short status label for terminal output.
    pub fn label(&self) -> &'static str {
        match (self.job_running, self.paused, self.interactive_connected) {
            (true, _, _) => "plotting",
            (false, true, _) => "paused",
            (false, false, true) => "connected",
            (false, false, false) => "disconnected",
        }
    }
}
