// Record processing engine: transform steps, chains and the fan-out runner

pub mod chain;
pub mod runner;
pub mod steps;
pub mod traits;

pub use chain::TransformChain;
pub use runner::{FanOutRun, FanOutRunner};
pub use traits::{RecordCallback, RecordSource, RecordStep};
