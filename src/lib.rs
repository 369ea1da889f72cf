pub mod cli;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{
    ContainerRuntime, ContainerSpec, Endpoint, Mount, NetworkConfig, PodSpec, PullOptions,
    RuntimeConnector,
};
pub use error::{
    ConnectionError, CreateError, LaunchError, ProcessError, PullError, QueryError, RelayError,
    RunError,
};
pub use infra::{CancelToken, CommandRunner, Execution, OutputSink, PodmanAdapter};
pub use services::{AppContext, Connection, Session};
