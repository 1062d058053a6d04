//! Configuration loaded from `plotctl.toml`.
//!
//! Every field has a default, so a missing file yields a usable config.
//! The `PLOTCTL_SERVER` environment variable takes precedence over
//! `server_url` from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::device::PenParams;
use crate::device::sim::SimulatorSettings;
use crate::profile::ProfileKind;

pub const DEFAULT_PATH: &str = "plotctl.toml";
pub const SERVER_ENV: &str = "PLOTCTL_SERVER";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotctlConfig {
    /// Address `plotctl serve` binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Base URL the client subcommands talk to.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Profile selected at startup.
    #[serde(default = "default_profile")]
    pub profile: ProfileKind,

    /// Pen/speed values used when a plot request leaves them out.
    #[serde(default)]
    pub pen: PenParams,

    /// The NextDraw library counts as installed while this path exists.
    #[serde(default)]
    pub nextdraw_probe: Option<PathBuf>,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Warn when a job is still running after this many seconds.
    #[serde(default)]
    pub watchdog_warn_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_device_present")]
    pub device_present: bool,

    /// Delay per simulated path step, in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_profile() -> ProfileKind {
    ProfileKind::AxiDraw
}

fn default_device_present() -> bool {
    true
}

fn default_step_delay_ms() -> u64 {
    20
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device_present: default_device_present(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl Default for PlotctlConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            server_url: default_server_url(),
            profile: default_profile(),
            pen: PenParams::default(),
            nextdraw_probe: None,
            simulator: SimulatorConfig::default(),
            watchdog_warn_secs: None,
        }
    }
}

impl PlotctlConfig {
    /// Loads `path`, or `plotctl.toml` in the current directory when no path
    /// is given. An explicitly named file must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_PATH);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config file {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(SERVER_ENV).filter(|url| !url.trim().is_empty()) {
            self.server_url = url;
        }
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            device_present: self.simulator.device_present,
            step_delay: Duration::from_millis(self.simulator.step_delay_ms),
            nextdraw_probe: self.nextdraw_probe.clone(),
        }
    }

    pub fn watchdog(&self) -> Option<Duration> {
        self.watchdog_warn_secs.map(Duration::from_secs)
    }
}
