mod runner;
mod state;
#[cfg(test)]
mod tests;

pub use runner::ScanLoop;
pub use state::{ScanResult, ScanState};
