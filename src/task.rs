pub mod alert;
pub mod orchestrator;
pub mod transport;

pub use orchestrator::Orchestrator;
pub use transport::Transport;
