use crate::error::ConnectionError;
use std::fmt;
use std::path::{Path, PathBuf};

/// System-wide Podman socket installed by the distribution packages.
pub const SYSTEM_SOCKET_URI: &str = "unix:///run/podman/podman.sock";

/// Address of a Podman service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: String,
    kind: EndpointKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointKind {
    /// Local Unix domain socket
    Unix(PathBuf),
    /// Plain TCP service (`podman system service tcp://...`)
    Tcp { host: String, port: u16 },
    /// Remote socket tunneled over SSH
    Ssh { destination: String },
}

impl Endpoint {
    pub fn parse(uri: &str) -> Result<Self, ConnectionError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ConnectionError::EmptyUri);
        }

        let invalid = |reason: &str| ConnectionError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid("esquema ausente (use unix://, tcp:// ou ssh://)"))?;

        let kind = match scheme {
            "unix" => {
                if !rest.starts_with('/') {
                    return Err(invalid("caminho do socket deve ser absoluto"));
                }
                EndpointKind::Unix(PathBuf::from(rest))
            }
            "tcp" => {
                let (host, port) = rest
                    .trim_end_matches('/')
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("porta ausente"))?;
                if host.is_empty() {
                    return Err(invalid("host ausente"));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid("porta inválida"))?;
                EndpointKind::Tcp {
                    host: host.to_string(),
                    port,
                }
            }
            "ssh" => {
                if rest.is_empty() {
                    return Err(invalid("destino ssh ausente"));
                }
                EndpointKind::Ssh {
                    destination: rest.to_string(),
                }
            }
            other => return Err(invalid(&format!("esquema '{other}' não suportado"))),
        };

        Ok(Self {
            uri: uri.to_string(),
            kind,
        })
    }

    pub fn as_uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> &EndpointKind {
        &self.kind
    }

    /// Socket path for `unix://` endpoints
    pub fn socket_path(&self) -> Option<&Path> {
        match &self.kind {
            EndpointKind::Unix(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Rootless Podman socket of the current user, derived from `$XDG_RUNTIME_DIR`.
pub fn user_socket_uri() -> Result<String, ConnectionError> {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").ok_or(ConnectionError::RuntimeDirUnset)?;
    Ok(user_socket_uri_in(Path::new(&runtime_dir)))
}

pub fn user_socket_uri_in(runtime_dir: &Path) -> String {
    format!(
        "unix://{}",
        runtime_dir.join("podman").join("podman.sock").display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unix_socket() {
        let ep = Endpoint::parse("unix:///run/podman/podman.sock").unwrap();
        assert_eq!(ep.socket_path(), Some(Path::new("/run/podman/podman.sock")));
        assert_eq!(ep.as_uri(), SYSTEM_SOCKET_URI);
    }

    #[test]
    fn test_parse_tcp() {
        let ep = Endpoint::parse("tcp://localhost:8888").unwrap();
        assert_eq!(
            ep.kind(),
            &EndpointKind::Tcp {
                host: "localhost".into(),
                port: 8888
            }
        );
        assert!(ep.socket_path().is_none());
    }

    #[test]
    fn test_parse_ssh() {
        let ep = Endpoint::parse("ssh://core@10.0.0.2:22/run/podman/podman.sock").unwrap();
        assert!(matches!(ep.kind(), EndpointKind::Ssh { .. }));
    }

    #[test]
    fn test_empty_uri_is_rejected() {
        assert!(matches!(Endpoint::parse(""), Err(ConnectionError::EmptyUri)));
        assert!(matches!(
            Endpoint::parse("   "),
            Err(ConnectionError::EmptyUri)
        ));
    }

    #[test]
    fn test_invalid_uris() {
        for uri in [
            "/run/podman/podman.sock",
            "http://localhost:80",
            "unix://relative.sock",
            "tcp://localhost",
            "tcp://:80",
            "tcp://host:notaport",
            "ssh://",
        ] {
            assert!(
                matches!(Endpoint::parse(uri), Err(ConnectionError::InvalidUri { .. })),
                "{uri} deveria ser rejeitada"
            );
        }
    }

    #[test]
    fn test_user_socket_uri_in() {
        assert_eq!(
            user_socket_uri_in(Path::new("/run/user/1000")),
            "unix:///run/user/1000/podman/podman.sock"
        );
    }
}
