use chrono::Utc;
use tracing::{info, warn};

use crate::device::{DeviceSession, PlotOptions, PlotStatus, RunMode};
use crate::session::{JobOutcome, JobPlan, JobRun, PauseCause, PausedArtifact, PlotJob};
use crate::signal::InterruptFlag;

/// Executes one plot job on a plotting handle it owns for the job's duration.
pub struct PlotJobRunner<'a> {
    session: &'a DeviceSession,
    interrupt: &'a InterruptFlag,
}

/// The SDK run modes a job expands to, one per pass.
fn passes(plan: &JobPlan) -> Vec<RunMode> {
    match plan {
        JobPlan::Plot(selector) => {
            let layers = selector.passes();
            if layers.is_empty() {
                vec![RunMode::Plot]
            } else {
                layers.into_iter().map(RunMode::Layers).collect()
            }
        }
        JobPlan::Resume { layer } => vec![RunMode::ResumePlot { layer: *layer }],
    }
}

impl<'a> PlotJobRunner<'a> {
    pub fn new(session: &'a DeviceSession, interrupt: &'a InterruptFlag) -> Self {
        Self { session, interrupt }
    }

    /// Runs every pass of `job` in order, stopping at the first pause or
    /// failure, then releases the plotting handle.
    pub fn run(&self, job: &PlotJob) -> JobRun {
        let run = self.run_passes(job);
        self.session.release();
        match &run.outcome {
            JobOutcome::Completed => info!(job = %job.id, "Plot completed successfully"),
            JobOutcome::Paused(paused) => info!(
                job = %job.id,
                layer = ?paused.resume_layer,
                "Plot paused by {}",
                match paused.cause {
                    PauseCause::Button => "button press",
                    PauseCause::Interrupt => "interrupt",
                }
            ),
            JobOutcome::Failed(reason) => warn!(job = %job.id, "Plot failed: {reason}"),
        }
        run
    }

    fn run_passes(&self, job: &PlotJob) -> JobRun {
        let mut run = JobRun {
            outcome: JobOutcome::Completed,
            layers_attempted: Vec::new(),
            last_status: None,
        };

        if let Err(err) = self.session.load_artifact(&job.artifact) {
            run.outcome = JobOutcome::Failed(format!("could not load artifact: {err}"));
            return run;
        }

        for mode in passes(&job.plan) {
            if self.interrupt.is_triggered() {
                run.outcome = JobOutcome::Failed(format!(
                    "interrupted before {} pass started",
                    mode.sdk_name()
                ));
                return run;
            }
            if let Some(layer) = mode.layer() {
                run.layers_attempted.push(layer);
            }

            let options = PlotOptions { pen: job.pen, mode };
            if let Err(err) = self.session.configure(&options) {
                run.outcome = JobOutcome::Failed(format!("could not configure plot: {err}"));
                return run;
            }

            info!(job = %job.id, mode = mode.sdk_name(), layer = ?mode.layer(), "Starting pass");
            let plot_run = match self.session.run_plot(true) {
                Ok(plot_run) => plot_run,
                Err(err) => {
                    run.outcome = JobOutcome::Failed(format!("plot run failed: {err}"));
                    return run;
                }
            };

            let mut status = PlotStatus::from_code(plot_run.status_code);
            if self.interrupt.is_triggered()
                && !matches!(status, PlotStatus::Completed | PlotStatus::PausedByButton)
            {
                status = PlotStatus::PausedByInterrupt;
            }
            run.last_status = Some(status.code());

            if status == PlotStatus::Completed {
                continue;
            }
            let Some(cause) = PauseCause::from_status(status) else {
                run.outcome = JobOutcome::Failed(format!(
                    "plot ended with SDK status {}",
                    status.code()
                ));
                return run;
            };
            let artifact = plot_run.output.unwrap_or_else(|| {
                warn!(job = %job.id, "SDK returned no output on pause; keeping input artifact");
                job.artifact.clone()
            });
            run.outcome = JobOutcome::Paused(PausedArtifact {
                artifact,
                resume_layer: mode.layer(),
                pen: job.pen,
                cause,
                paused_at: Utc::now(),
            });
            return run;
        }

        run
    }
}
