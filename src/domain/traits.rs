use super::{
    ContainerHandle, ContainerSpec, ContainerSummary, Endpoint, ImageSummary, PodHandle, PodSpec,
    PodSummary, PullOptions,
};
use crate::error::EngineError;
use std::fmt::Debug;
use std::sync::Arc;

/// Version information returned by the connection handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonInfo {
    pub version: String,
    pub api_version: String,
}

/// Transport to one container-runtime daemon.
///
/// Implementations must be safe to call from several threads at once;
/// [`Connection`](crate::services::Connection) does not serialize calls.
pub trait ContainerRuntime: Send + Sync + Debug {
    /// Handshake: succeeds only when the daemon answers
    fn ping(&self) -> Result<DaemonInfo, EngineError>;

    fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError>;

    fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError>;

    fn list_pods(&self) -> Result<Vec<PodSummary>, EngineError>;

    /// Pull an image, returning the identifiers of what was pulled
    fn pull_image(&self, reference: &str, options: &PullOptions)
    -> Result<Vec<String>, EngineError>;

    fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, EngineError>;

    fn create_pod(&self, spec: &PodSpec) -> Result<PodHandle, EngineError>;
}

/// Builds the transport for an endpoint.
pub trait RuntimeConnector: Send + Sync + Debug {
    fn runtime_for(&self, endpoint: &Endpoint) -> Arc<dyn ContainerRuntime>;
}
