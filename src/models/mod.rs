mod change_event;
pub mod hmm;
mod signal;

pub use change_event::{ChangeEvent, Direction};
pub use hmm::GaussianHmm;
pub use signal::{Signal, signal_values};
