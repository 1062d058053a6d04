mod driver;
mod jog;
mod session;
pub mod sim;
#[cfg(test)]
pub mod testing;

pub use driver::{
    DriverFactory, JogReply, PenParams, PlotOptions, PlotRun, PlotStatus, PlotterDriver, RunMode,
};
pub use jog::JogCommand;
pub use session::DeviceSession;
