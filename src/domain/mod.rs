mod container;
mod endpoint;
mod image;
mod pod;
pub mod traits;

pub use container::{
    ContainerHandle, ContainerSpec, ContainerSummary, Mount, NetworkConfig, PortMapping, Protocol,
    SelinuxLabel, validate_name,
};
pub use endpoint::{
    Endpoint, EndpointKind, SYSTEM_SOCKET_URI, user_socket_uri, user_socket_uri_in,
};
pub use image::{
    DEFAULT_REGISTRIES, ImageReference, ImageSummary, PlatformOverride, PullOptions, RegistryAuth,
};
pub use pod::{PodHandle, PodMember, PodSpec, PodSummary};
pub use traits::{ContainerRuntime, DaemonInfo, RuntimeConnector};
