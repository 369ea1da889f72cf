pub mod config;
pub mod podman_adapter;
pub mod runner;

pub use podman_adapter::{PodmanAdapter, PodmanConnector};
pub use runner::{CancelToken, CommandRunner, Execution, OutputSink, RunnerSettings};
