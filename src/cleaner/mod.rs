pub mod engine;
pub mod report;

pub use engine::{run_removal, RemovalOptions};
pub use report::{RemovalReport, RemovalStatus};
