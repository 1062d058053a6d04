//! Command-line interface.
//!
//! `serve` runs the HTTP façade; every other subcommand is a thin client of a
//! running server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Pen plotter control server and client.
#[derive(Debug, Parser)]
#[command(name = "plotctl", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file to load instead of ./plotctl.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server URL for client subcommands (overrides config and PLOTCTL_SERVER).
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server against the built-in simulated plotter.
    Serve {
        /// Address to listen on (overrides config).
        #[arg(long)]
        listen: Option<String>,
    },

    /// Show the server's session state.
    Status,

    /// Open an interactive session with the plotter.
    Connect,

    /// Disable the motors and close the interactive session.
    Disconnect,

    /// Show or switch the plotter family.
    Profile {
        /// `axidraw` or `nextdraw`; omit to show the current profile.
        kind: Option<String>,
    },

    /// Plot an SVG file.
    Plot {
        /// The SVG file to plot.
        file: PathBuf,

        /// Layer to plot; repeat to plot several layers in order.
        #[arg(long = "layer")]
        layers: Vec<u32>,

        #[arg(long)]
        pen_up: Option<u32>,

        #[arg(long)]
        pen_down: Option<u32>,

        #[arg(long)]
        speed_up: Option<u32>,

        #[arg(long)]
        speed_down: Option<u32>,

        /// Wait for the plot to finish and print its outcome.
        #[arg(long)]
        wait: bool,
    },

    /// Resume the paused plot.
    Resume {
        /// Wait for the plot to finish and print its outcome.
        #[arg(long)]
        wait: bool,
    },

    /// Send the carriage home: from the paused plot if there is one,
    /// otherwise by jogging the connected session.
    Home {
        /// Fail unless a plot is paused.
        #[arg(long)]
        from_pause: bool,
    },

    /// Send a jog command, e.g. `jog moveto 10 20`.
    Jog {
        /// Command verb followed by its arguments.
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        words: Vec<String>,
    },
}
