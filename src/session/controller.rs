use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::job::{JobOutcome, JobReport, JobRun, LayerSelector, PausedArtifact, PlotJob};
use super::state::SessionState;
use crate::device::{DeviceSession, DriverFactory, JogCommand, PenParams, PlotOptions, PlotStatus};
use crate::error::{DriverError, SessionError};
use crate::profile::{PlotterProfile, ProfileKind};
use crate::runner::PlotJobRunner;
use crate::signal::InterruptFlag;

/// Startup settings for a [`SessionController`].
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub profile: ProfileKind,
    /// Log a warning when a job is still running after this long.
    pub watchdog: Option<Duration>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            profile: ProfileKind::AxiDraw,
            watchdog: None,
        }
    }
}

/// The background job currently holding (or about to hold) the plotter.
struct ActiveJob {
    id: Uuid,
    // Finished once the job task returns, reported or not.
    handle: JoinHandle<()>,
    // Checked by the runner between passes.
    interrupt: InterruptFlag,
    /// Registered once the runner has opened its handle.
    plotting: Option<Arc<DeviceSession>>,
}

/// Everything guarded by the controller lock.
struct Inner {
    profile: ProfileKind,
    // Idle session used for jogging; never open while a job runs.
    interactive: Option<DeviceSession>,
    // Drawing left by the last paused job, consumed by resume or home.
    paused: Option<PausedArtifact>,
    active: Option<ActiveJob>,
    last_report: Option<JobReport>,
}

impl Inner {
    fn job_running(&self) -> bool {
        self.active.as_ref().is_some_and(|job| !job.handle.is_finished())
    }

    /// Drops a job whose task ended without reporting back (it panicked).
    fn reap(&mut self) {
        if self.active.as_ref().is_some_and(|job| job.handle.is_finished()) {
            if let Some(job) = self.active.take() {
                warn!(job = %job.id, "job task ended without reporting; discarding its state");
                self.paused = None;
            }
        }
    }

    fn teardown_interactive(&mut self) {
        if let Some(session) = self.interactive.take() {
            session.release();
        }
    }
}

struct Shared {
    factory: Arc<dyn DriverFactory>,
    inner: Mutex<Inner>,
    // Counts finished jobs; bumped after the lock is released.
    completions: watch::Sender<u64>,
    watchdog: Option<Duration>,
}

/// Single authority over process-wide plotting state.
///
/// Every operation runs under one lock, so state transitions are atomic with
/// respect to each other. Cloning is cheap and yields a handle onto the same
/// state. Job operations spawn onto the tokio blocking pool and must be called
/// from within a runtime.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(factory: Arc<dyn DriverFactory>, settings: ControllerSettings) -> Self {
        let (completions, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                factory,
                inner: Mutex::new(Inner {
                    profile: settings.profile,
                    interactive: None,
                    paused: None,
                    active: None,
                    last_report: None,
                }),
                completions,
                watchdog: settings.watchdog,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock()
    }

    fn factory(&self) -> &dyn DriverFactory {
        self.shared.factory.as_ref()
    }

    pub fn state(&self) -> SessionState {
        let inner = self.lock();
        SessionState {
            interactive_connected: inner.interactive.is_some(),
            job_running: inner.job_running(),
            paused: inner.paused.is_some(),
            profile: PlotterProfile::probe(inner.profile, self.factory()),
            nextdraw_available: self.nextdraw_available(),
            last_job: inner.last_report.clone(),
        }
    }

    /// The selected profile with availability re-probed.
    pub fn profile(&self) -> PlotterProfile {
        let kind = self.lock().profile;
        PlotterProfile::probe(kind, self.factory())
    }

    /// Whether the NextDraw library is installed right now.
    pub fn nextdraw_available(&self) -> bool {
        self.factory().is_available(ProfileKind::NextDraw)
    }

    pub fn is_job_running(&self) -> bool {
        self.lock().job_running()
    }

    pub fn connect(&self) -> Result<String, SessionError> {
        let mut inner = self.lock();
        inner.reap();
        if inner.interactive.is_some() {
            return Err(SessionError::AlreadyConnected);
        }
        if inner.job_running() {
            return Err(SessionError::JobAlreadyRunning);
        }
        let session = DeviceSession::open_interactive(self.factory(), inner.profile)?;
        let name = inner.profile.display_name();
        match session.firmware_version() {
            Ok(firmware) => info!(%firmware, "Connected to {name}"),
            Err(err) => {
                warn!("firmware query failed: {err}");
                info!("Connected to {name}");
            }
        }
        inner.interactive = Some(session);
        Ok(format!("Connected to {name}"))
    }

    pub fn disconnect(&self) -> Result<String, SessionError> {
        let mut inner = self.lock();
        let Some(session) = inner.interactive.take() else {
            return Err(SessionError::NotConnected);
        };
        session.shutdown();
        let name = inner.profile.display_name();
        info!("Disconnected from {name}");
        Ok(format!("Disconnected from {name}"))
    }

    pub fn set_profile(&self, requested: &str) -> Result<String, SessionError> {
        let kind: ProfileKind = requested.parse()?;
        if !self.factory().is_available(kind) {
            return Err(SessionError::ProfileUnavailable(kind.display_name().into()));
        }

        let mut inner = self.lock();
        inner.reap();
        if inner.job_running() {
            return Err(SessionError::JobAlreadyRunning);
        }
        if let Some(session) = inner.interactive.take() {
            session.shutdown();
        }
        inner.profile = kind;
        info!("Plotter type set to {}", kind.display_name());
        Ok(format!("Plotter type set to {}", kind.display_name()))
    }

    /// Starts a plot in the background and returns its job id immediately.
    pub fn submit_plot(
        &self,
        artifact: &str,
        layers: LayerSelector,
        pen: PenParams,
    ) -> Result<Uuid, SessionError> {
        let artifact = artifact.trim();
        if artifact.is_empty() {
            return Err(SessionError::EmptyArtifact);
        }

        let mut inner = self.lock();
        inner.reap();
        if inner.job_running() {
            return Err(SessionError::JobAlreadyRunning);
        }
        inner.teardown_interactive();
        inner.paused = None;

        let job = PlotJob::plot(artifact.to_string(), layers, pen);
        Ok(self.start_job(&mut inner, job))
    }

    /// Continues the paused plot in the background.
    ///
    /// The paused artifact is taken out of the state before the job starts,
    /// so it can only ever be consumed once.
    pub fn resume(&self) -> Result<Uuid, SessionError> {
        let mut inner = self.lock();
        inner.reap();
        if inner.job_running() {
            return Err(SessionError::JobAlreadyRunning);
        }
        let Some(paused) = inner.paused.take() else {
            return Err(SessionError::NoPausedArtifact);
        };
        inner.teardown_interactive();

        let job = PlotJob::resume(paused);
        Ok(self.start_job(&mut inner, job))
    }

    /// Sends the carriage home: from the paused plot if there is one,
    /// otherwise by jogging the interactive session to the origin.
    pub fn go_home(&self) -> Result<String, SessionError> {
        let mut inner = self.lock();
        inner.reap();
        if inner.job_running() {
            return Err(SessionError::JobAlreadyRunning);
        }
        if inner.paused.is_some() {
            return self.home_from_pause(&mut inner);
        }
        let Some(session) = inner.interactive.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        let reply = session.jog(&JogCommand::Home)?;
        Ok(JogCommand::Home.describe(reply))
    }

    /// Like [`go_home`](Self::go_home) but only valid while a plot is paused.
    pub fn return_home_from_pause(&self) -> Result<String, SessionError> {
        let mut inner = self.lock();
        inner.reap();
        if inner.job_running() {
            return Err(SessionError::JobAlreadyRunning);
        }
        if inner.paused.is_none() {
            return Err(SessionError::NoPausedArtifact);
        }
        self.home_from_pause(&mut inner)
    }

    fn home_from_pause(&self, inner: &mut Inner) -> Result<String, SessionError> {
        let Some(paused) = inner.paused.as_ref() else {
            return Err(SessionError::NoPausedArtifact);
        };
        let kind = inner.profile;
        let options = PlotOptions {
            pen: paused.pen,
            mode: kind.home_mode(),
        };
        let artifact = paused.artifact.clone();

        inner.teardown_interactive();
        let homed = self.run_home_sequence(kind, &artifact, &options);

        if homed.is_ok() {
            inner.paused = None;
            info!("Returned to home corner; paused plot discarded");
        }
        self.restore_interactive(inner);
        homed?;
        Ok("Returned to home corner (0, 0)".to_string())
    }

    fn run_home_sequence(
        &self,
        kind: ProfileKind,
        artifact: &str,
        options: &PlotOptions,
    ) -> Result<(), DriverError> {
        let session = DeviceSession::open_plotting(self.factory(), kind)?;
        session.load_artifact(artifact)?;
        session.configure(options)?;
        let run = session.run_plot(false)?;
        session.release();
        match PlotStatus::from_code(run.status_code) {
            PlotStatus::Completed => Ok(()),
            other => Err(DriverError::Sdk(format!(
                "home sequence ended with status {}",
                other.code()
            ))),
        }
    }

    /// Forwards one jog command line to the interactive session.
    pub fn jog(&self, line: &str) -> Result<String, SessionError> {
        let inner = self.lock();
        let Some(session) = inner.interactive.as_ref() else {
            return Err(SessionError::NotConnected);
        };
        let command = JogCommand::parse(line)?;
        let reply = session.jog(&command)?;
        Ok(command.describe(reply))
    }

    /// Interrupts the running job, if any: raises its flag and releases its
    /// plotting handle. Returns whether a job was interrupted.
    ///
    /// Safe to call after the job has finished on its own.
    pub fn interrupt(&self) -> bool {
        let inner = self.lock();
        if !inner.job_running() {
            return false;
        }
        let Some(job) = inner.active.as_ref() else {
            return false;
        };
        job.interrupt.trigger();
        if let Some(plotting) = &job.plotting {
            plotting.release();
        }
        true
    }

    /// A receiver that changes every time a job finishes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.completions.subscribe()
    }

    /// Waits until no job is running.
    pub async fn wait_for_idle(&self) {
        let mut completions = self.subscribe();
        while self.is_job_running() {
            if completions.changed().await.is_err() {
                return;
            }
        }
    }

    fn start_job(&self, inner: &mut Inner, job: PlotJob) -> Uuid {
        let id = job.id;
        let kind = inner.profile;
        let interrupt = InterruptFlag::new();
        info!(job = %id, kind = ?job.kind(), plan = ?job.plan, "Starting plot job");

        let controller = self.clone();
        let flag = interrupt.clone();
        let handle = tokio::task::spawn_blocking(move || controller.execute(job, kind, flag));
        inner.active = Some(ActiveJob {
            id,
            handle,
            interrupt,
            plotting: None,
        });
        self.spawn_watchdog(id);
        id
    }

    /// Body of the background job task.
    fn execute(&self, job: PlotJob, kind: ProfileKind, interrupt: InterruptFlag) {
        let run = match self.open_plotting(job.id, kind) {
            Ok(session) => PlotJobRunner::new(&session, &interrupt).run(&job),
            Err(err) => {
                warn!(job = %job.id, "could not open plotting handle: {err}");
                JobRun::failed(format!("could not open plotting handle: {err}"))
            }
        };
        self.finish_job(&job, run);
    }

    fn open_plotting(
        &self,
        id: Uuid,
        kind: ProfileKind,
    ) -> Result<Arc<DeviceSession>, DriverError> {
        let session = Arc::new(DeviceSession::open_plotting(self.factory(), kind)?);
        let mut inner = self.lock();
        if let Some(job) = inner.active.as_mut().filter(|job| job.id == id) {
            job.plotting = Some(session.clone());
        }
        Ok(session)
    }

    fn finish_job(&self, job: &PlotJob, run: JobRun) {
        let report = JobReport::from_run(job.id, job.kind(), job.created_at, &run);
        {
            let mut inner = self.lock();
            inner.paused = match run.outcome {
                JobOutcome::Paused(paused) => Some(paused),
                JobOutcome::Completed | JobOutcome::Failed(_) => None,
            };
            if inner.active.as_ref().is_some_and(|active| active.id == job.id) {
                inner.active = None;
            }
            inner.last_report = Some(report);
            self.restore_interactive(&mut inner);
        }
        self.shared.completions.send_modify(|finished| *finished += 1);
    }

    /// Re-opens an idle interactive session. Failure is logged, not raised.
    fn restore_interactive(&self, inner: &mut Inner) {
        if inner.interactive.is_some() {
            return;
        }
        match DeviceSession::open_interactive(self.factory(), inner.profile) {
            Ok(session) => {
                info!(
                    "Reconnected interactive session after plot ({})",
                    inner.profile.display_name()
                );
                inner.interactive = Some(session);
            }
            Err(err) => warn!("Could not reconnect interactive session: {err}"),
        }
    }

    fn spawn_watchdog(&self, id: Uuid) {
        let Some(limit) = self.shared.watchdog else {
            return;
        };
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            let still_running = {
                let inner = controller.lock();
                inner.job_running() && inner.active.as_ref().is_some_and(|job| job.id == id)
            };
            if still_running {
                warn!(
                    job = %id,
                    "plot job still running after {}s; it may be hung",
                    limit.as_secs()
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::ScriptedFactory;
    use crate::error::ErrorKind;
    use crate::session::{JobEnd, PauseCause};

    const SVG: &str = "<svg><path d='M0 0 L10 10'/></svg>";

    fn controller() -> (ScriptedFactory, SessionController) {
        let factory = ScriptedFactory::new();
        let controller =
            SessionController::new(Arc::new(factory.clone()), ControllerSettings::default());
        (factory, controller)
    }

    fn assert_exclusive(state: &SessionState) {
        assert!(
            !(state.interactive_connected && state.job_running),
            "interactive session and job both active: {state:?}"
        );
    }

    async fn wait_for_runs(factory: &ScriptedFactory, count: usize) {
        while factory.calls_matching("run").len() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn plot_and_wait(controller: &SessionController, layers: LayerSelector) {
        controller
            .submit_plot(SVG, layers, PenParams::default())
            .unwrap();
        controller.wait_for_idle().await;
    }

    #[test]
    fn connect_twice_is_already_connected() {
        let (_, controller) = controller();
        assert_eq!(controller.connect().unwrap(), "Connected to AxiDraw");
        let err = controller.connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyConnected);
        assert!(controller.state().interactive_connected);
    }

    #[test]
    fn connect_queries_firmware_on_interactive_session_only() {
        let (factory, controller) = controller();
        controller.connect().unwrap();
        assert_eq!(factory.calls_matching("usb_query"), vec!["usb_query V\\r"]);
    }

    #[test]
    fn connect_without_device_is_device_not_found() {
        let factory = ScriptedFactory::new().device_present(false);
        let controller =
            SessionController::new(Arc::new(factory), ControllerSettings::default());
        let err = controller.connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert!(!controller.state().interactive_connected);
    }

    #[test]
    fn disconnect_when_disconnected_leaves_state_unchanged() {
        let (factory, controller) = controller();
        let before = controller.state();
        let err = controller.disconnect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        let after = controller.state();
        assert_eq!(before.interactive_connected, after.interactive_connected);
        assert_eq!(before.paused, after.paused);
        assert_eq!(before.profile, after.profile);
        assert!(factory.calls().is_empty());
    }

    #[test]
    fn disconnect_disables_motors_then_releases() {
        let (factory, controller) = controller();
        controller.connect().unwrap();
        assert_eq!(controller.disconnect().unwrap(), "Disconnected from AxiDraw");
        let calls = factory.calls();
        assert_eq!(&calls[calls.len() - 2..], ["usb_command EM,0,0\\r", "disconnect"]);
        assert!(!controller.state().interactive_connected);
    }

    #[test]
    fn disconnect_clears_handle_when_motor_disable_fails() {
        let factory = ScriptedFactory::new().fail_usb(true);
        let controller =
            SessionController::new(Arc::new(factory.clone()), ControllerSettings::default());
        controller.connect().unwrap();
        assert!(controller.state().interactive_connected);
        controller.disconnect().unwrap();
        assert!(!controller.state().interactive_connected);
        assert!(factory.calls().contains(&"disconnect".to_string()));
    }

    #[test]
    fn set_profile_rejects_unknown_and_unavailable() {
        let (factory, controller) = controller();
        controller.connect().unwrap();
        factory.set_nextdraw_available(false);

        let err = controller.set_profile("plotbot").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidProfile);

        let err = controller.set_profile("nextdraw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProfileUnavailable);

        let state = controller.state();
        assert_eq!(state.profile.kind, ProfileKind::AxiDraw);
        assert!(state.interactive_connected);
        assert!(!state.nextdraw_available);
        assert!(factory.calls_matching("disconnect").is_empty());
    }

    #[test]
    fn set_profile_disconnects_open_session_first() {
        let (factory, controller) = controller();
        controller.connect().unwrap();
        assert_eq!(
            controller.set_profile("nextdraw").unwrap(),
            "Plotter type set to NextDraw"
        );
        let state = controller.state();
        assert_eq!(state.profile.kind, ProfileKind::NextDraw);
        assert!(!state.interactive_connected);
        assert_eq!(factory.calls_matching("disconnect").len(), 1);

        controller.connect().unwrap();
        controller.disconnect().unwrap();
        assert!(factory.calls().contains(&"usb_command EM,0,0".to_string()));
    }

    #[test]
    fn profile_availability_is_reprobed() {
        let (factory, controller) = controller();
        factory.set_nextdraw_available(false);
        assert!(!controller.state().nextdraw_available);
        factory.set_nextdraw_available(true);
        assert!(controller.state().nextdraw_available);
        controller.set_profile("nextdraw").unwrap();
        assert!(controller.profile().available);
    }

    #[test]
    fn blank_artifact_is_rejected() {
        let (_, controller) = controller();
        let err = controller
            .submit_plot("  \n ", LayerSelector::All, PenParams::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyArtifact);
    }

    #[tokio::test]
    async fn plot_runs_in_background_and_restores_interactive_session() {
        let (factory, controller) = controller();
        controller.connect().unwrap();
        factory.close_gate();

        controller
            .submit_plot(SVG, LayerSelector::All, PenParams::default())
            .unwrap();
        let running = controller.state();
        assert!(running.job_running);
        assert!(!running.interactive_connected);
        assert_exclusive(&running);

        let err = controller
            .submit_plot(SVG, LayerSelector::All, PenParams::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::JobAlreadyRunning);
        assert!(controller.state().job_running);

        factory.open_gate();
        controller.wait_for_idle().await;

        let done = controller.state();
        assert!(!done.job_running);
        assert!(!done.paused);
        assert!(done.interactive_connected);
        let report = done.last_job.unwrap();
        assert_eq!(report.end, JobEnd::Completed);
        assert_eq!(report.last_status, Some(0));
    }

    #[tokio::test]
    async fn button_pause_then_resume_consumes_artifact_once() {
        let (factory, controller) = controller();
        factory.statuses([102]);
        plot_and_wait(&controller, LayerSelector::All).await;

        let paused = controller.state();
        assert!(paused.paused);
        assert!(paused.interactive_connected);

        factory.close_gate();
        controller.resume().unwrap();
        let err = controller.resume().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::JobAlreadyRunning);
        let running = controller.state();
        assert!(!running.paused);
        assert_exclusive(&running);

        factory.open_gate();
        controller.wait_for_idle().await;
        let done = controller.state();
        assert!(!done.paused);
        assert!(!done.job_running);

        let loads = factory.calls_matching("load");
        assert_eq!(loads.last().unwrap(), &format!("load {SVG}<!-- progress 102 -->"));
        assert_eq!(
            factory.calls_matching("configure").last().unwrap(),
            "configure res_plot pen 70/40 speed 75/25"
        );
        let err = controller.resume().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPausedArtifact);
    }

    #[tokio::test]
    async fn layer_sequence_pause_records_resume_layer() {
        let (factory, controller) = controller();
        factory.statuses([0, 102]);
        plot_and_wait(&controller, LayerSelector::Sequence(vec![2, 5, 1])).await;

        let state = controller.state();
        assert!(state.paused);
        let report = state.last_job.unwrap();
        assert_eq!(report.layers_attempted, vec![2, 5]);
        assert_eq!(
            report.end,
            JobEnd::Paused {
                cause: PauseCause::Button,
                resume_layer: Some(5)
            }
        );

        controller.resume().unwrap();
        controller.wait_for_idle().await;
        assert_eq!(
            factory.calls_matching("configure").last().unwrap(),
            "configure res_plot 5 pen 70/40 speed 75/25"
        );
        assert!(!controller.state().paused);
    }

    #[tokio::test]
    async fn failure_during_resume_discards_paused_artifact() {
        let (factory, controller) = controller();
        factory.statuses([103]);
        plot_and_wait(&controller, LayerSelector::One(3)).await;
        assert!(controller.state().paused);

        factory.script([Err(DriverError::Sdk("lost steps".into()))]);
        controller.resume().unwrap();
        controller.wait_for_idle().await;

        let state = controller.state();
        assert!(!state.paused);
        assert!(state.interactive_connected);
        assert!(matches!(state.last_job.unwrap().end, JobEnd::Failed { .. }));
    }

    #[tokio::test]
    async fn interrupt_releases_plotting_handle_once() {
        let (factory, controller) = controller();
        assert!(!controller.interrupt());
        factory.close_gate();
        controller
            .submit_plot(SVG, LayerSelector::All, PenParams::default())
            .unwrap();
        wait_for_runs(&factory, 1).await;

        assert!(controller.interrupt());
        controller.wait_for_idle().await;
        assert!(!controller.interrupt());

        let state = controller.state();
        assert!(state.paused);
        assert!(state.interactive_connected);
        assert_eq!(
            state.last_job.unwrap().end,
            JobEnd::Paused {
                cause: PauseCause::Interrupt,
                resume_layer: None
            }
        );
        assert_eq!(factory.calls_matching("disconnect").len(), 1);
        factory.open_gate();
    }

    #[tokio::test]
    async fn go_home_from_pause_clears_paused() {
        let (factory, controller) = controller();
        factory.statuses([102]);
        controller
            .submit_plot(
                SVG,
                LayerSelector::Sequence(vec![4]),
                PenParams {
                    pen_up: 90,
                    ..PenParams::default()
                },
            )
            .unwrap();
        controller.wait_for_idle().await;
        assert!(controller.state().paused);

        assert_eq!(
            controller.go_home().unwrap(),
            "Returned to home corner (0, 0)"
        );
        let state = controller.state();
        assert!(!state.paused);
        assert!(state.interactive_connected);
        assert_eq!(
            factory.calls_matching("configure").last().unwrap(),
            "configure res_home pen 90/40 speed 75/25"
        );
    }

    #[tokio::test]
    async fn nextdraw_home_uses_find_home() {
        let (factory, controller) = controller();
        controller.set_profile("nextdraw").unwrap();
        factory.statuses([102]);
        plot_and_wait(&controller, LayerSelector::All).await;

        controller.return_home_from_pause().unwrap();
        assert!(!controller.state().paused);
        assert!(factory
            .calls_matching("configure")
            .last()
            .unwrap()
            .starts_with("configure find_home"));
    }

    #[tokio::test]
    async fn failed_home_sequence_keeps_paused_artifact() {
        let (factory, controller) = controller();
        factory.statuses([102, 1]);
        plot_and_wait(&controller, LayerSelector::All).await;

        let err = controller.return_home_from_pause().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HardwareFailure);
        let state = controller.state();
        assert!(state.paused);
        assert!(state.interactive_connected);
    }

    #[tokio::test]
    async fn report_times_the_job_from_submission() {
        let (_, controller) = controller();
        let submitted = chrono::Utc::now();
        plot_and_wait(&controller, LayerSelector::All).await;

        let report = controller.state().last_job.unwrap();
        assert!(report.started_at >= submitted);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn go_home_without_pause_jogs_interactive_session() {
        let (factory, controller) = controller();
        let err = controller.go_home().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        let err = controller.return_home_from_pause().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPausedArtifact);

        controller.connect().unwrap();
        assert_eq!(controller.go_home().unwrap(), "moved to home (0, 0)");
        assert_eq!(factory.calls().last().unwrap(), "jog Home");
    }

    #[test]
    fn jog_requires_interactive_session() {
        let (_, controller) = controller();
        let err = controller.jog("moveto 1 2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);

        controller.connect().unwrap();
        assert_eq!(controller.jog("moveto 1 2").unwrap(), "moved to (1.0, 2.0)");
        assert_eq!(
            controller.jog("turtle_pos").unwrap(),
            "turtle_pos: (1.0000, 2.0000)"
        );
        assert_eq!(
            controller.jog("spin 3").unwrap_err().kind(),
            ErrorKind::InvalidCommand
        );
        assert_eq!(
            controller.jog("lineto 3").unwrap_err().kind(),
            ErrorKind::MalformedArguments
        );
    }

    #[tokio::test]
    async fn reconnect_failure_after_job_reports_not_connected() {
        let factory = ScriptedFactory::new().device_present(false);
        let controller =
            SessionController::new(Arc::new(factory.clone()), ControllerSettings::default());
        plot_and_wait(&controller, LayerSelector::All).await;

        let state = controller.state();
        assert!(!state.interactive_connected);
        assert!(!state.job_running);
        assert_eq!(state.last_job.unwrap().end, JobEnd::Completed);
    }

    #[tokio::test]
    async fn watchdog_does_not_cancel_long_jobs() {
        let factory = ScriptedFactory::new();
        let controller = SessionController::new(
            Arc::new(factory.clone()),
            ControllerSettings {
                watchdog: Some(Duration::from_millis(5)),
                ..ControllerSettings::default()
            },
        );
        factory.close_gate();
        controller
            .submit_plot(SVG, LayerSelector::All, PenParams::default())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(controller.state().job_running);

        factory.open_gate();
        controller.wait_for_idle().await;
        assert_eq!(controller.state().last_job.unwrap().end, JobEnd::Completed);
    }
}
