//! Scripted driver used by controller and runner tests.
//!
//! Every SDK call is appended to a shared log, `run_plot` pops status codes
//! off a script (0 when the script is empty), and runs can be held open on a
//! gate so tests can observe a job in flight.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::device::{DriverFactory, JogCommand, JogReply, PlotOptions, PlotRun, PlotterDriver};
use crate::error::DriverError;
use crate::profile::ProfileKind;

#[derive(Default)]
struct Shared {
    // Every driver call, in order, across all handles.
    log: Mutex<Vec<String>>,
    // Results handed out by successive `run_plot` calls; empty means status 0.
    script: Mutex<VecDeque<Result<i32, DriverError>>>,
    // While closed, `run_plot` blocks until opened or halted.
    gate_closed: Mutex<bool>,
    gate: Condvar,
    device_missing: AtomicBool,
    nextdraw_missing: AtomicBool,
    fail_usb: AtomicBool,
}

impl Shared {
    fn record(&self, entry: impl Into<String>) {
        self.log.lock().push(entry.into());
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    shared: Arc<Shared>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_present(self, present: bool) -> Self {
        self.shared.device_missing.store(!present, Ordering::SeqCst);
        self
    }

    pub fn fail_usb(self, fail: bool) -> Self {
        self.shared.fail_usb.store(fail, Ordering::SeqCst);
        self
    }

    pub fn set_nextdraw_available(&self, available: bool) {
        self.shared.nextdraw_missing.store(!available, Ordering::SeqCst);
    }

    /// Queues the outcome of the next `run_plot` calls, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = Result<i32, DriverError>>) {
        self.shared.script.lock().extend(outcomes);
    }

    pub fn statuses(&self, codes: impl IntoIterator<Item = i32>) {
        self.script(codes.into_iter().map(Ok));
    }

    /// Blocks every subsequent `run_plot` until [`open_gate`](Self::open_gate)
    /// or until its handle is disconnected.
    pub fn close_gate(&self) {
        *self.shared.gate_closed.lock() = true;
    }

    pub fn open_gate(&self) {
        *self.shared.gate_closed.lock() = false;
        self.shared.gate.notify_all();
    }

    pub fn calls(&self) -> Vec<String> {
        self.shared.log.lock().clone()
    }

    /// Log entries starting with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

impl DriverFactory for ScriptedFactory {
    fn is_available(&self, kind: ProfileKind) -> bool {
        match kind {
            ProfileKind::AxiDraw => true,
            ProfileKind::NextDraw => !self.shared.nextdraw_missing.load(Ordering::SeqCst),
        }
    }

    fn create(&self, kind: ProfileKind) -> Result<Box<dyn PlotterDriver>, DriverError> {
        if !self.is_available(kind) {
            return Err(DriverError::LibraryMissing(kind.display_name().into()));
        }
        self.shared.record(format!("create {kind}"));
        Ok(Box::new(ScriptedDriver {
            shared: self.shared.clone(),
            halted: Arc::new(AtomicBool::new(false)),
            artifact: Mutex::new(String::new()),
        }))
    }
}

struct ScriptedDriver {
    shared: Arc<Shared>,
    halted: Arc<AtomicBool>,
    artifact: Mutex<String>,
}

impl PlotterDriver for ScriptedDriver {
    fn connect(&self) -> Result<bool, DriverError> {
        self.shared.record("connect");
        Ok(!self.shared.device_missing.load(Ordering::SeqCst))
    }

    fn disconnect(&self) -> Result<(), DriverError> {
        self.shared.record("disconnect");
        self.halted.store(true, Ordering::SeqCst);
        self.shared.gate.notify_all();
        Ok(())
    }

    fn load_artifact(&self, svg: &str) -> Result<(), DriverError> {
        self.shared.record(format!("load {svg}"));
        *self.artifact.lock() = svg.to_string();
        Ok(())
    }

    fn configure(&self, options: &PlotOptions) -> Result<(), DriverError> {
        let layer = options
            .mode
            .layer()
            .map(|l| format!(" {l}"))
            .unwrap_or_default();
        self.shared.record(format!(
            "configure {}{layer} pen {}/{} speed {}/{}",
            options.mode.sdk_name(),
            options.pen.pen_up,
            options.pen.pen_down,
            options.pen.speed_up,
            options.pen.speed_down,
        ));
        Ok(())
    }

    fn run_plot(&self, capture_output: bool) -> Result<PlotRun, DriverError> {
        self.shared.record("run");
        {
            let mut closed = self.shared.gate_closed.lock();
            while *closed && !self.halted.load(Ordering::SeqCst) {
                self.shared
                    .gate
                    .wait_for(&mut closed, Duration::from_millis(5));
            }
        }

        let outcome = if self.halted.load(Ordering::SeqCst) {
            Ok(103)
        } else {
            self.shared.script.lock().pop_front().unwrap_or(Ok(0))
        };
        let status_code = outcome?;
        let output = capture_output.then(|| {
            format!("{}<!-- progress {status_code} -->", self.artifact.lock())
        });
        Ok(PlotRun {
            output,
            status_code,
        })
    }

    fn jog(&self, command: &JogCommand) -> Result<JogReply, DriverError> {
        self.shared.record(format!("jog {command:?}"));
        match command {
            JogCommand::TurtlePos | JogCommand::CurrentPos => Ok(JogReply::Position(1.0, 2.0)),
            _ => Ok(JogReply::Done),
        }
    }

    fn usb_command(&self, raw: &str) -> Result<(), DriverError> {
        self.shared
            .record(format!("usb_command {}", raw.escape_default()));
        if self.shared.fail_usb.load(Ordering::SeqCst) {
            return Err(DriverError::Transport("usb write failed".into()));
        }
        Ok(())
    }

    fn usb_query(&self, raw: &str) -> Result<String, DriverError> {
        self.shared
            .record(format!("usb_query {}", raw.escape_default()));
        if self.shared.fail_usb.load(Ordering::SeqCst) {
            return Err(DriverError::Transport("usb read failed".into()));
        }
        Ok("OK".to_string())
    }
}
