//! A simulated plotter that honours the vendor SDK contract.
//!
//! `plotctl serve` uses it when no hardware SDK is linked. A run takes one
//! step per `<path` element, sleeping between steps; disconnecting during a
//! run halts it with status 103 and an output artifact annotated with the
//! step reached, which a later `res_plot` run picks up from.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::device::{
    DriverFactory, JogCommand, JogReply, PlotOptions, PlotRun, PlotterDriver, RunMode,
};
use crate::error::DriverError;
use crate::profile::ProfileKind;

const PROGRESS_MARKER: &str = "<!-- plotctl:progress ";
const SIM_FIRMWARE: &str = "EBBv13_and_above EB Firmware Version 2.8.1 (simulated)";

/// Settings for the simulated hardware.
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    pub device_present: bool,
    pub step_delay: Duration,
    /// The NextDraw library counts as installed while this path exists.
    pub nextdraw_probe: Option<PathBuf>,
}

pub struct SimulatedFactory {
    settings: SimulatorSettings,
}

impl SimulatedFactory {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self { settings }
    }
}

impl DriverFactory for SimulatedFactory {
    fn is_available(&self, kind: ProfileKind) -> bool {
        match kind {
            ProfileKind::AxiDraw => true,
            ProfileKind::NextDraw => self
                .settings
                .nextdraw_probe
                .as_ref()
                .is_some_and(|path| path.exists()),
        }
    }

    fn create(&self, kind: ProfileKind) -> Result<Box<dyn PlotterDriver>, DriverError> {
        if !self.is_available(kind) {
            return Err(DriverError::LibraryMissing(kind.display_name().into()));
        }
        Ok(Box::new(SimulatedPlotter::new(kind, self.settings.clone())))
    }
}

#[derive(Debug, Default)]
/// What the simulated board remembers between calls.
struct SimState {
    // Last artifact passed to `load_artifact`, progress marker included.
    artifact: String,
    // Set by `configure`; without it a run is a plain plot.
    options: Option<PlotOptions>,
    // Carriage position as reported to `turtle_pos`.
    position: (f64, f64),
    pen_down: bool,
}

struct SimulatedPlotter {
    kind: ProfileKind,
    settings: SimulatorSettings,
    state: Mutex<SimState>,
    // Raised by `disconnect`; a run in progress stops at its next step.
    halted: AtomicBool,
}

impl SimulatedPlotter {
    fn new(kind: ProfileKind, settings: SimulatorSettings) -> Self {
        Self {
            kind,
            settings,
            state: Mutex::new(SimState::default()),
            halted: AtomicBool::new(false),
        }
    }
}

/// Splits an artifact into its drawing and the step a previous run reached.
fn split_progress(artifact: &str) -> (&str, usize) {
    match artifact.rfind(PROGRESS_MARKER) {
        Some(at) => {
            let step = artifact[at + PROGRESS_MARKER.len()..]
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            (&artifact[..at], step)
        }
        None => (artifact, 0),
    }
}

fn count_steps(drawing: &str) -> usize {
    drawing.matches("<path").count().max(1)
}

impl PlotterDriver for SimulatedPlotter {
    fn connect(&self) -> Result<bool, DriverError> {
        Ok(self.settings.device_present)
    }

    fn disconnect(&self) -> Result<(), DriverError> {
        self.halted.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn load_artifact(&self, svg: &str) -> Result<(), DriverError> {
        self.state.lock().artifact = svg.to_string();
        Ok(())
    }

    fn configure(&self, options: &PlotOptions) -> Result<(), DriverError> {
        self.state.lock().options = Some(*options);
        Ok(())
    }

    fn run_plot(&self, capture_output: bool) -> Result<PlotRun, DriverError> {
        if !self.settings.device_present {
            return Err(DriverError::Transport(format!(
                "no {} found on USB",
                self.kind.display_name()
            )));
        }
        let (artifact, mode) = {
            let state = self.state.lock();
            let mode = state.options.map(|o| o.mode).unwrap_or(RunMode::Plot);
            (state.artifact.clone(), mode)
        };
        let (drawing, reached) = split_progress(&artifact);

        if matches!(mode, RunMode::ResumeHome | RunMode::FindHome) {
            let mut state = self.state.lock();
            state.position = (0.0, 0.0);
            state.pen_down = false;
            return Ok(PlotRun {
                output: capture_output.then(|| drawing.to_string()),
                status_code: 0,
            });
        }

        let start = match mode {
            RunMode::ResumePlot { .. } => reached,
            _ => 0,
        };
        let total = count_steps(drawing);
        info!(mode = mode.sdk_name(), "simulating {} steps from {start}", total);

        for step in start..total {
            if self.halted.load(Ordering::SeqCst) {
                debug!("simulated run halted at step {step}");
                return Ok(PlotRun {
                    output: capture_output
                        .then(|| format!("{drawing}{PROGRESS_MARKER}{step} -->")),
                    status_code: 103,
                });
            }
            std::thread::sleep(self.settings.step_delay);
        }

        Ok(PlotRun {
            output: capture_output.then(|| drawing.to_string()),
            status_code: 0,
        })
    }

    fn jog(&self, command: &JogCommand) -> Result<JogReply, DriverError> {
        let mut state = self.state.lock();
        let (x, y) = state.position;
        match command {
            JogCommand::MoveTo { x, y } | JogCommand::GoTo { x, y } => {
                state.position = (*x, *y);
            }
            JogCommand::LineTo { x, y } => {
                state.pen_down = true;
                state.position = (*x, *y);
            }
            JogCommand::Move { dx, dy } | JogCommand::Go { dx, dy } => {
                state.position = (x + dx, y + dy);
            }
            JogCommand::Line { dx, dy } => {
                state.pen_down = true;
                state.position = (x + dx, y + dy);
            }
            JogCommand::PenUp => state.pen_down = false,
            JogCommand::PenDown => state.pen_down = true,
            JogCommand::Home => state.position = (0.0, 0.0),
            JogCommand::Delay { ms } => {
                drop(state);
                std::thread::sleep(Duration::from_millis(*ms));
                return Ok(JogReply::Done);
            }
            JogCommand::DrawPath(points) => {
                if let Some(last) = points.last() {
                    state.position = *last;
                }
            }
            JogCommand::TurtlePos | JogCommand::CurrentPos => {
                return Ok(JogReply::Position(x, y));
            }
        }
        Ok(JogReply::Done)
    }

    fn usb_command(&self, raw: &str) -> Result<(), DriverError> {
        debug!(command = %raw.escape_default(), "simulated usb command");
        Ok(())
    }

    fn usb_query(&self, raw: &str) -> Result<String, DriverError> {
        debug!(query = %raw.escape_default(), "simulated usb query");
        match raw.trim_end() {
            "V" => Ok(SIM_FIRMWARE.to_string()),
            _ => Ok("OK".to_string()),
        }
    }
}
