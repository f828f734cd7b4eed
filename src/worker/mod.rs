pub mod controller;
mod run;
pub mod state;

pub use controller::WorkerController;
pub use state::{RunOutcome, RunReport, RunState};
