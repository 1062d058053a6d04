//! Hardware families the controller can drive and the per-family quirks of
//! their vendor SDKs.
//!
//! Two families are supported: AxiDraw (always present) and NextDraw (its
//! library may be missing). The quirks normalized here are raw command
//! framing and the run mode used to send the carriage home from a pause.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::device::{DriverFactory, RunMode};
use crate::error::SessionError;

/// Identifies which hardware family is targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    AxiDraw,
    NextDraw,
}

impl ProfileKind {
    /// The configuration/API spelling (`axidraw`, `nextdraw`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::AxiDraw => "axidraw",
            ProfileKind::NextDraw => "nextdraw",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProfileKind::AxiDraw => "AxiDraw",
            ProfileKind::NextDraw => "NextDraw",
        }
    }

    /// Name of the vendor library backing this family.
    pub fn api_name(&self) -> &'static str {
        match self {
            ProfileKind::AxiDraw => "PyAxidraw",
            ProfileKind::NextDraw => "NextDraw",
        }
    }

    /// Normalizes a raw low-level command or query for this family.
    ///
    /// AxiDraw expects a trailing carriage return; NextDraw appends its own
    /// and must not receive one.
    pub fn frame_command(&self, raw: &str) -> String {
        let bare = raw.strip_suffix('\r').unwrap_or(raw);
        match self {
            ProfileKind::AxiDraw => format!("{bare}\r"),
            ProfileKind::NextDraw => bare.to_string(),
        }
    }

    /// Run mode that walks the carriage back to the home corner from a pause.
    pub fn home_mode(&self) -> RunMode {
        match self {
            ProfileKind::AxiDraw => RunMode::ResumeHome,
            // res_home was removed from the NextDraw API.
            ProfileKind::NextDraw => RunMode::FindHome,
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "axidraw" => Ok(ProfileKind::AxiDraw),
            "nextdraw" => Ok(ProfileKind::NextDraw),
            _ => Err(SessionError::InvalidProfile(s.to_string())),
        }
    }
}

/// The selected hardware family plus its capability metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotterProfile {
    pub kind: ProfileKind,
    pub display_name: String,
    pub api_name: String,
    /// Whether the vendor library for this family can currently be loaded.
    pub available: bool,
}

impl PlotterProfile {
    /// Builds the profile for `kind`, probing library availability now.
    pub fn probe(kind: ProfileKind, factory: &dyn DriverFactory) -> Self {
        Self {
            kind,
            display_name: kind.display_name().to_string(),
            api_name: kind.api_name().to_string(),
            available: factory.is_available(kind),
        }
    }
}
