use crate::domain::{
    ContainerHandle, ContainerRuntime, ContainerSpec, ContainerSummary, DaemonInfo, Endpoint,
    ImageSummary, PodHandle, PodSpec, PodSummary, PullOptions, RuntimeConnector, validate_name,
};
use crate::error::{ConnectionError, CreateError, PullError, QueryError};
use std::io;
use std::sync::Arc;
use tracing::{debug, info};

/// An established channel to a container-runtime daemon.
///
/// Only [`Connection::open`] builds one, and only after the handshake
/// succeeded, so a value of this type always holds a live handle.
/// Clones share the same transport. Calls are not serialized: every
/// operation of the Podman transport runs in its own client process.
#[derive(Debug, Clone)]
pub struct Connection {
    endpoint: Endpoint,
    daemon: DaemonInfo,
    runtime: Arc<dyn ContainerRuntime>,
}

impl Connection {
    pub fn open(uri: &str, connector: &dyn RuntimeConnector) -> Result<Self, ConnectionError> {
        let endpoint = Endpoint::parse(uri)?;

        if let Some(path) = endpoint.socket_path() {
            match path.try_exists() {
                Ok(true) => {}
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    return Err(ConnectionError::PermissionDenied {
                        uri: endpoint.as_uri().to_string(),
                        source: Box::new(e),
                    });
                }
                _ => {
                    return Err(ConnectionError::SocketMissing {
                        path: path.display().to_string(),
                    });
                }
            }
        }

        let runtime = connector.runtime_for(&endpoint);
        Self::handshake(endpoint, runtime)
    }

    /// Wraps an already built transport, still requiring a successful handshake.
    pub fn with_runtime(
        uri: &str,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self, ConnectionError> {
        let endpoint = Endpoint::parse(uri)?;
        Self::handshake(endpoint, runtime)
    }

    fn handshake(
        endpoint: Endpoint,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self, ConnectionError> {
        debug!("Conectando a {endpoint}");

        let daemon = runtime.ping().map_err(|source| {
            let uri = endpoint.as_uri().to_string();
            if source.is_permission_denied() {
                ConnectionError::PermissionDenied {
                    uri,
                    source: Box::new(source),
                }
            } else {
                ConnectionError::Unreachable { uri, source }
            }
        })?;

        info!(
            "Conectado a {endpoint} (Podman {}, API {})",
            daemon.version, daemon.api_version
        );

        Ok(Self {
            endpoint,
            daemon,
            runtime,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn host(&self) -> &str {
        self.endpoint.as_uri()
    }

    pub fn daemon(&self) -> &DaemonInfo {
        &self.daemon
    }

    pub fn list_images(&self) -> Result<Vec<ImageSummary>, QueryError> {
        self.runtime.list_images().map_err(|source| QueryError {
            resource: "imagens",
            source,
        })
    }

    pub fn list_containers(&self) -> Result<Vec<ContainerSummary>, QueryError> {
        self.runtime.list_containers().map_err(|source| QueryError {
            resource: "containers",
            source,
        })
    }

    pub fn list_pods(&self) -> Result<Vec<PodSummary>, QueryError> {
        self.runtime.list_pods().map_err(|source| QueryError {
            resource: "pods",
            source,
        })
    }

    /// Pulls `reference`. An empty reference is rejected without contacting
    /// the daemon.
    pub fn pull_image(
        &self,
        reference: &str,
        options: &PullOptions,
    ) -> Result<Vec<String>, PullError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(PullError::EmptyReference);
        }
        options.validate().map_err(PullError::InvalidOptions)?;

        info!("Baixando imagem {reference}...");
        let ids = self
            .runtime
            .pull_image(reference, options)
            .map_err(|source| PullError::Daemon {
                reference: reference.to_string(),
                source,
            })?;
        info!("{reference}: {} imagem(ns) baixada(s)", ids.len());

        Ok(ids)
    }

    pub fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, CreateError> {
        if spec.image.trim().is_empty() {
            return Err(CreateError::EmptyImage);
        }

        if let Some(name) = spec.name() {
            validate_name(name).map_err(|reason| CreateError::InvalidName {
                name: name.to_string(),
                reason,
            })?;
        }

        if let Some(pod) = spec.pod() {
            if !spec.network.is_default() {
                return Err(CreateError::InvalidSpec(
                    "configurações de rede não se aplicam a containers dentro de um pod".into(),
                ));
            }

            let pods = self.list_pods().map_err(CreateError::PodLookup)?;
            if !pods.iter().any(|p| p.matches(pod)) {
                return Err(CreateError::PodNotFound(pod.to_string()));
            }
        }

        info!("Criando container a partir de {}...", spec.image.trim());
        self.runtime
            .create_container(spec)
            .map_err(|source| CreateError::Daemon {
                kind: "container",
                source,
            })
    }

    pub fn create_pod(&self, spec: &PodSpec) -> Result<PodHandle, CreateError> {
        if let Some(name) = spec.name() {
            validate_name(name).map_err(|reason| CreateError::InvalidName {
                name: name.to_string(),
                reason,
            })?;
        }

        info!("Criando pod {}...", spec.name().unwrap_or("<sem nome>"));
        self.runtime
            .create_pod(spec)
            .map_err(|source| CreateError::Daemon { kind: "pod", source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockConnector, MockRuntime};

    #[test]
    fn test_missing_socket_fails_before_handshake() {
        let mock = Arc::new(MockRuntime::new());
        let connector = MockConnector::new(mock.clone());

        let result = Connection::open("unix:///nonexistent/podman.sock", &connector);

        assert!(matches!(result, Err(ConnectionError::SocketMissing { .. })));
        assert!(mock.get_commands().is_empty());
    }

    #[test]
    fn test_unsearchable_socket_dir_is_permission_denied() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        // root bypasses directory permissions
        if nix::unistd::geteuid().is_root() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("podman");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let mock = Arc::new(MockRuntime::new());
        let uri = format!("unix://{}/podman.sock", locked.display());
        let result = Connection::open(&uri, &MockConnector::new(mock.clone()));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(ConnectionError::PermissionDenied { .. })));
        assert!(mock.get_commands().is_empty());
    }

    #[test]
    fn test_tcp_endpoint_goes_straight_to_handshake() {
        let mock = Arc::new(MockRuntime::new());
        let connector = MockConnector::new(mock.clone());

        let conn = Connection::open("tcp://127.0.0.1:8888", &connector).unwrap();

        assert_eq!(conn.host(), "tcp://127.0.0.1:8888");
        assert_eq!(mock.get_commands(), vec!["ping"]);
    }

    #[test]
    fn test_permission_denied_is_classified() {
        let mock = Arc::new(MockRuntime::new());
        mock.set_fail_on_with("ping", "dial unix: permission denied");

        let result = Connection::with_runtime("tcp://127.0.0.1:8888", mock);
        assert!(matches!(result, Err(ConnectionError::PermissionDenied { .. })));
    }

    #[test]
    fn test_clones_share_transport() {
        let mock = Arc::new(MockRuntime::new());
        let conn = Connection::with_runtime("tcp://127.0.0.1:8888", mock.clone()).unwrap();
        let clone = conn.clone();

        conn.list_images().unwrap();
        clone.list_pods().unwrap();

        assert_eq!(mock.get_commands(), vec!["ping", "list_images", "list_pods"]);
    }
}
