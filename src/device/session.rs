use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::device::{
    DriverFactory, JogCommand, JogReply, PlotOptions, PlotRun, PlotterDriver,
};
use crate::error::{best_effort, DriverError, SessionError};
use crate::profile::ProfileKind;

/// Raw command that disables both stepper motors.
const MOTOR_DISABLE: &str = "EM,0,0";

/// What a [`DeviceSession`] is being used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Interactive,
    Plotting,
}

/// An opened handle to the physical plotter.
///
/// The handle is released exactly once: [`release`](Self::release) swaps an
/// atomic flag, so concurrent callers (normal job completion and the
/// interrupt bridge) cannot double-disconnect. Dropping an unreleased session
/// releases it.
pub struct DeviceSession {
    driver: Box<dyn PlotterDriver>,
    // Decides how raw commands are framed.
    kind: ProfileKind,
    role: Role,
    // Swapped to true by the first release; later releases are no-ops.
    released: AtomicBool,
}

impl DeviceSession {
    /// Opens an interactive session; fails with `DeviceNotFound` when the
    /// handshake gets no answer.
    pub fn open_interactive(
        factory: &dyn DriverFactory,
        kind: ProfileKind,
    ) -> Result<Self, SessionError> {
        if !factory.is_available(kind) {
            return Err(SessionError::ProfileUnavailable(kind.display_name().into()));
        }
        let driver = factory.create(kind)?;
        let session = Self::wrap(driver, kind, Role::Interactive);
        match session.driver.connect() {
            Ok(true) => Ok(session),
            Ok(false) => Err(SessionError::DeviceNotFound(kind.display_name().into())),
            Err(err) => Err(err.into()),
        }
    }

    /// Creates a plotting handle. The SDK connects on its own during the run.
    pub fn open_plotting(
        factory: &dyn DriverFactory,
        kind: ProfileKind,
    ) -> Result<Self, DriverError> {
        let driver = factory.create(kind)?;
        Ok(Self::wrap(driver, kind, Role::Plotting))
    }

    fn wrap(driver: Box<dyn PlotterDriver>, kind: ProfileKind, role: Role) -> Self {
        Self {
            driver,
            kind,
            role,
            released: AtomicBool::new(false),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Disconnects the handle. Returns `true` only for the call that actually
    /// released it; later calls are no-ops.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!(role = ?self.role, "releasing {} handle", self.kind.display_name());
        best_effort("disconnect", self.driver.disconnect());
        true
    }

    /// Disables motors (best effort) and then releases the handle.
    pub fn shutdown(&self) -> bool {
        if !self.is_released() {
            best_effort("motor disable", self.disable_motors());
        }
        self.release()
    }

    pub fn disable_motors(&self) -> Result<(), DriverError> {
        self.usb_command(MOTOR_DISABLE)
    }

    pub fn usb_command(&self, raw: &str) -> Result<(), DriverError> {
        self.live()?;
        self.driver.usb_command(&self.kind.frame_command(raw))
    }

    pub fn usb_query(&self, raw: &str) -> Result<String, DriverError> {
        self.live()?;
        let reply = self.driver.usb_query(&self.kind.frame_command(raw))?;
        Ok(reply.trim_end().to_string())
    }

    /// Firmware version string reported by the controller board.
    pub fn firmware_version(&self) -> Result<String, DriverError> {
        self.usb_query("V")
    }

    pub fn load_artifact(&self, svg: &str) -> Result<(), DriverError> {
        self.live()?;
        self.driver.load_artifact(svg)
    }

    pub fn configure(&self, options: &PlotOptions) -> Result<(), DriverError> {
        self.live()?;
        self.driver.configure(options)
    }

    pub fn run_plot(&self, capture_output: bool) -> Result<PlotRun, DriverError> {
        self.live()?;
        self.driver.run_plot(capture_output)
    }

    pub fn jog(&self, command: &JogCommand) -> Result<JogReply, DriverError> {
        self.live()?;
        self.driver.jog(command)
    }

    fn live(&self) -> Result<(), DriverError> {
        if self.is_released() {
            Err(DriverError::Released)
        } else {
            Ok(())
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("released", &self.is_released())
            .finish()
    }
}
