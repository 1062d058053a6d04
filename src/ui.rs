//! Terminal output: a spinner while waiting on a job, colored results.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{Ack, ProfileInfo};
use crate::session::{JobEnd, JobReport, PauseCause, SessionState};

/// Spinner shown while `--wait` polls a running job.
pub struct JobProgress {
    // indicatif spinner, cleared when the job ends.
    pb: ProgressBar,
    // Completed plots.
    green: Style,
    // Failed plots.
    red: Style,
    // Paused plots and unknown outcomes.
    yellow: Style,
}

impl JobProgress {
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(description.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn update(&self, state: &SessionState) {
        self.pb.set_message(format!("{} ({})", state.label(), state.profile.display_name));
    }

    /// Stops the spinner and prints how the job ended.
    pub fn complete(&self, report: Option<&JobReport>) {
        self.pb.finish_and_clear();
        let Some(report) = report else {
            println!("  {} Job finished", self.yellow.apply_to("?"));
            return;
        };
        match &report.end {
            JobEnd::Completed => println!(
                "  {} Plot completed in {:.1}s",
                self.green.apply_to("✓"),
                report.duration_ms as f64 / 1000.0
            ),
            JobEnd::Paused {
                cause,
                resume_layer,
            } => {
                let cause = match cause {
                    PauseCause::Button => "pause button",
                    PauseCause::Interrupt => "interrupt",
                };
                let layer = resume_layer
                    .map(|layer| format!(" on layer {layer}"))
                    .unwrap_or_default();
                println!(
                    "  {} Plot paused by {cause}{layer}; run `plotctl resume` or `plotctl home`",
                    self.yellow.apply_to("‖")
                );
            }
            JobEnd::Failed { reason } => {
                println!("  {} Plot failed: {reason}", self.red.apply_to("✗"));
            }
        }
    }
}

pub fn print_ack(ack: &Ack) {
    let green = Style::new().green().bold();
    match ack.job_id {
        Some(job_id) => println!("  {} {} (job {job_id})", green.apply_to("✓"), ack.message),
        None => println!("  {} {}", green.apply_to("✓"), ack.message),
    }
}

pub fn print_error(message: &str) {
    eprintln!("  {} {message}", Style::new().red().bold().apply_to("✗"));
}

pub fn print_profile(info: &ProfileInfo) {
    let dim = Style::new().dim();
    println!(
        "{} {}",
        dim.apply_to("profile:"),
        info.profile.display_name
    );
    println!("{} {}", dim.apply_to("api:"), info.profile.api_name);
    println!(
        "{} {}",
        dim.apply_to("nextdraw installed:"),
        info.nextdraw_available
    );
}

pub fn print_state(state: &SessionState) {
    let label_style = match state.label() {
        "plotting" => Style::new().cyan().bold(),
        "paused" => Style::new().yellow().bold(),
        "connected" => Style::new().green().bold(),
        _ => Style::new().dim(),
    };
    let dim = Style::new().dim();
    println!(
        "{} {}",
        dim.apply_to("state:"),
        label_style.apply_to(state.label())
    );
    println!(
        "{} {}{}",
        dim.apply_to("profile:"),
        state.profile.display_name,
        if state.profile.available { "" } else { " (not installed)" }
    );
    println!(
        "{} {}",
        dim.apply_to("nextdraw installed:"),
        state.nextdraw_available
    );
    if let Some(report) = &state.last_job {
        println!();
        println!("{}", dim.apply_to("─── Last Job ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}
