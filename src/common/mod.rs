pub mod command;
pub mod config;
pub mod errors;
pub mod format;
pub mod host;
pub mod logging;
pub mod permissions;
pub mod safety;

pub use command::{CommandOutcome, CommandRunner, SystemRunner};
pub use host::Host;
pub use logging::RunLog;
