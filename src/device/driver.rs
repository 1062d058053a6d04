use serde::{Deserialize, Serialize};

use crate::device::JogCommand;
use crate::error::DriverError;
use crate::profile::ProfileKind;

/// Pen heights (percent of servo travel) and travel speeds (percent of max).
///
/// Missing fields deserialize to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenParams {
    pub pen_up: u32,
    pub pen_down: u32,
    pub speed_up: u32,
    pub speed_down: u32,
}

impl Default for PenParams {
    fn default() -> Self {
        Self {
            pen_up: 70,
            pen_down: 40,
            speed_up: 75,
            speed_down: 25,
        }
    }
}

/// Run mode handed to the SDK before a plot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Plot every layer.
    Plot,
    /// Plot a single layer.
    Layers(u32),
    /// Continue a paused plot, optionally restricted to one layer.
    ResumePlot { layer: Option<u32> },
    /// Walk back to home from a paused plot (AxiDraw).
    ResumeHome,
    /// Walk back to home from a paused plot (NextDraw).
    FindHome,
}

impl RunMode {
    pub fn sdk_name(&self) -> &'static str {
        match self {
            RunMode::Plot => "plot",
            RunMode::Layers(_) => "layers",
            RunMode::ResumePlot { .. } => "res_plot",
            RunMode::ResumeHome => "res_home",
            RunMode::FindHome => "find_home",
        }
    }

    pub fn layer(&self) -> Option<u32> {
        match self {
            RunMode::Layers(layer) => Some(*layer),
            RunMode::ResumePlot { layer } => *layer,
            _ => None,
        }
    }
}

/// Everything configured on a plotting handle before `run_plot`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotOptions {
    pub pen: PenParams,
    pub mode: RunMode,
}

/// Terminal status reported by the SDK after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlotStatus {
    Completed,
    PausedByButton,
    PausedByInterrupt,
    Failed(i32),
}

impl PlotStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PlotStatus::Completed,
            102 => PlotStatus::PausedByButton,
            103 => PlotStatus::PausedByInterrupt,
            other => PlotStatus::Failed(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PlotStatus::Completed => 0,
            PlotStatus::PausedByButton => 102,
            PlotStatus::PausedByInterrupt => 103,
            PlotStatus::Failed(code) => *code,
        }
    }
}

/// Result of one `run_plot` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRun {
    /// The drawing with progress annotations, when output capture was requested.
    pub output: Option<String>,
    pub status_code: i32,
}

/// Reply to an interactive jog primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JogReply {
    Done,
    Position(f64, f64),
}

/// One handle onto the vendor SDK.
///
/// All methods take `&self`: `disconnect` may be invoked from another thread
/// while `run_plot` is blocked, and implementations must treat that as a
/// request to halt motion. `disconnect` must release resources even when the
/// transport has already failed.
pub trait PlotterDriver: Send + Sync {
    /// Interactive handshake. `Ok(false)` means no device answered.
    fn connect(&self) -> Result<bool, DriverError>;

    fn disconnect(&self) -> Result<(), DriverError>;

    fn load_artifact(&self, svg: &str) -> Result<(), DriverError>;

    fn configure(&self, options: &PlotOptions) -> Result<(), DriverError>;

    fn run_plot(&self, capture_output: bool) -> Result<PlotRun, DriverError>;

    fn jog(&self, command: &JogCommand) -> Result<JogReply, DriverError>;

    /// Raw low-level command; `raw` is already framed for the family.
    fn usb_command(&self, raw: &str) -> Result<(), DriverError>;

    /// Raw low-level query; `raw` is already framed for the family.
    fn usb_query(&self, raw: &str) -> Result<String, DriverError>;
}

/// Creates driver handles for a hardware family.
pub trait DriverFactory: Send + Sync {
    /// Re-probes whether the family's library can be loaded. Never cached.
    fn is_available(&self, kind: ProfileKind) -> bool;

    fn create(&self, kind: ProfileKind) -> Result<Box<dyn PlotterDriver>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(PlotStatus::from_code(0), PlotStatus::Completed);
        assert_eq!(PlotStatus::from_code(102), PlotStatus::PausedByButton);
        assert_eq!(PlotStatus::from_code(103), PlotStatus::PausedByInterrupt);
        assert_eq!(PlotStatus::from_code(38), PlotStatus::Failed(38));
        assert_eq!(PlotStatus::Failed(38).code(), 38);
    }

    #[test]
    fn run_mode_names_and_layers() {
        assert_eq!(RunMode::Plot.sdk_name(), "plot");
        assert_eq!(RunMode::Layers(4).sdk_name(), "layers");
        assert_eq!(RunMode::Layers(4).layer(), Some(4));
        assert_eq!(RunMode::ResumePlot { layer: None }.sdk_name(), "res_plot");
        assert_eq!(RunMode::ResumePlot { layer: Some(2) }.layer(), Some(2));
        assert_eq!(RunMode::FindHome.layer(), None);
    }

    #[test]
    fn default_pen_params() {
        let pen = PenParams::default();
        assert_eq!((pen.pen_up, pen.pen_down), (70, 40));
        assert_eq!((pen.speed_up, pen.speed_down), (75, 25));
    }
}
