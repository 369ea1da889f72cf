use super::image::{null_as_empty, short_id};
use crate::error::ParseError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// One entry of `podman ps --all --format json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Names", default, deserialize_with = "null_as_empty")]
    pub names: Vec<String>,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Pod", default)]
    pub pod: String,
    #[serde(rename = "PodName", default)]
    pub pod_name: String,
}

impl ContainerSummary {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }
}

/// Storage attached to a container's filesystem namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mount {
    Bind {
        source: String,
        destination: String,
        read_only: bool,
    },
    Volume {
        name: String,
        destination: String,
        read_only: bool,
    },
    Tmpfs {
        destination: String,
        size: Option<String>,
    },
    Devpts {
        destination: String,
    },
}

impl Mount {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::Volume { .. } => "volume",
            Self::Tmpfs { .. } => "tmpfs",
            Self::Devpts { .. } => "devpts",
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            Self::Bind { destination, .. }
            | Self::Volume { destination, .. }
            | Self::Tmpfs { destination, .. }
            | Self::Devpts { destination } => destination,
        }
    }

    /// Host path or volume name; empty for ephemeral mounts.
    pub fn source(&self) -> &str {
        match self {
            Self::Bind { source, .. } => source,
            Self::Volume { name, .. } => name,
            Self::Tmpfs { .. } | Self::Devpts { .. } => "",
        }
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.source(), self.destination())
    }
}

/// Parses the `--mount` syntax: `type=bind,source=/host,destination=/ctr[,ro]`.
impl FromStr for Mount {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut kind = None;
        let mut source = None;
        let mut destination = None;
        let mut size = None;
        let mut read_only = false;

        for field in input.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let (key, value) = match field.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (field, None),
            };

            match (key, value) {
                ("type", Some(v)) => kind = Some(v),
                ("source" | "src", Some(v)) => source = Some(v.to_string()),
                ("destination" | "dst" | "target", Some(v)) => destination = Some(v.to_string()),
                ("tmpfs-size", Some(v)) => size = Some(v.to_string()),
                ("ro" | "readonly", None) => read_only = true,
                ("ro" | "readonly", Some(v)) => {
                    read_only = v
                        .parse::<bool>()
                        .map_err(|_| ParseError::new(input, format!("valor inválido para {key}")))?
                }
                _ => return Err(ParseError::new(input, format!("opção desconhecida '{field}'"))),
            }
        }

        let destination = destination
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ParseError::new(input, "destination ausente"))?;
        if !destination.starts_with('/') {
            return Err(ParseError::new(input, "destination deve ser um caminho absoluto"));
        }

        let require_source = |source: Option<String>| {
            source
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ParseError::new(input, "source ausente"))
        };

        match kind {
            Some("bind") => Ok(Self::Bind {
                source: require_source(source)?,
                destination,
                read_only,
            }),
            Some("volume") => Ok(Self::Volume {
                name: require_source(source)?,
                destination,
                read_only,
            }),
            Some("tmpfs") => Ok(Self::Tmpfs { destination, size }),
            Some("devpts") => Ok(Self::Devpts { destination }),
            Some(other) => Err(ParseError::new(input, format!("tipo '{other}' não suportado"))),
            None => Err(ParseError::new(input, "type ausente")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// A published port. Without `host_port` the daemon picks a free one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    pub fn new(container_port: u16, protocol: Protocol) -> Self {
        Self {
            host_ip: None,
            host_port: None,
            container_port,
            protocol,
        }
    }
}

/// Renders the `--publish` value.
impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.host_ip, self.host_port) {
            (Some(ip), Some(port)) => write!(f, "{ip}:{port}:")?,
            (Some(ip), None) => write!(f, "{ip}::")?,
            (None, Some(port)) => write!(f, "{port}:")?,
            (None, None) => {}
        }
        write!(f, "{}/{}", self.container_port, self.protocol)
    }
}

/// Parses `[[ip:]host:]container[/proto]`.
impl FromStr for PortMapping {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (ports, protocol) = match input.split_once('/') {
            Some((ports, "tcp")) => (ports, Protocol::Tcp),
            Some((ports, "udp")) => (ports, Protocol::Udp),
            Some((_, other)) => {
                return Err(ParseError::new(input, format!("protocolo '{other}' não suportado")));
            }
            None => (input, Protocol::Tcp),
        };

        let port = |text: &str| -> Result<u16, ParseError> {
            match text.parse::<u16>() {
                Ok(0) | Err(_) => Err(ParseError::new(input, format!("porta inválida '{text}'"))),
                Ok(p) => Ok(p),
            }
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let (host_ip, host_port, container_port) = match parts.as_slice() {
            [container] => (None, None, port(container)?),
            [host, container] => (None, Some(port(host)?), port(container)?),
            [ip, host, container] => {
                let host_port = if host.is_empty() { None } else { Some(port(host)?) };
                let ip = (!ip.is_empty()).then(|| ip.to_string());
                (ip, host_port, port(container)?)
            }
            _ => return Err(ParseError::new(input, "formato esperado [[ip:]host:]container[/proto]")),
        };

        Ok(Self {
            host_ip,
            host_port,
            container_port,
            protocol,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    /// `bridge`, `host`, `none`, `slirp4netns`, `container:<id>` or a network name
    pub mode: Option<String>,
    pub mac_address: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub dns_servers: Vec<String>,
    /// resolv.conf options, one per entry
    pub dns_options: Vec<String>,
    pub dns_search: Vec<String>,
    pub ports: Vec<PortMapping>,
}

impl NetworkConfig {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// SELinux labeling applied with `--security-opt label=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelinuxLabel {
    #[default]
    Default,
    Disable,
    Type(String),
    Level(String),
    User(String),
    Role(String),
}

impl SelinuxLabel {
    pub fn security_opt(&self) -> Option<String> {
        match self {
            Self::Default => None,
            Self::Disable => Some("label=disable".to_string()),
            Self::Type(v) => Some(format!("label=type:{v}")),
            Self::Level(v) => Some(format!("label=level:{v}")),
            Self::User(v) => Some(format!("label=user:{v}")),
            Self::Role(v) => Some(format!("label=role:{v}")),
        }
    }
}

impl FromStr for SelinuxLabel {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let value = |v: &str| -> Result<String, ParseError> {
            if v.is_empty() {
                Err(ParseError::new(input, "valor ausente"))
            } else {
                Ok(v.to_string())
            }
        };

        match input.split_once(':') {
            None if input.is_empty() || input == "default" => Ok(Self::Default),
            None if input == "disable" => Ok(Self::Disable),
            Some(("type", v)) => Ok(Self::Type(value(v)?)),
            Some(("level", v)) => Ok(Self::Level(value(v)?)),
            Some(("user", v)) => Ok(Self::User(value(v)?)),
            Some(("role", v)) => Ok(Self::Role(value(v)?)),
            _ => Err(ParseError::new(
                input,
                "use disable, type:X, level:X, user:X ou role:X",
            )),
        }
    }
}

/// Everything needed to create a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub name: Option<String>,
    pub detach: bool,
    pub interactive: bool,
    pub tty: bool,
    pub auto_remove: bool,
    pub privileged: bool,
    pub pod: Option<String>,
    pub mounts: Vec<Mount>,
    pub network: NetworkConfig,
    pub selinux_label: SelinuxLabel,
    pub env: Vec<String>,
    pub command: Vec<String>,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Pod membership, ignoring blank input.
    pub fn pod(&self) -> Option<&str> {
        self.pod.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: Option<String>,
    /// Whether the container was started right away (`--detach`)
    pub started: bool,
}

/// Container and pod names follow the same rules as the engine.
pub fn validate_name(name: &str) -> Result<(), String> {
    let Some(first_char) = name.chars().next() else {
        return Err("nome vazio".to_string());
    };

    if !first_char.is_ascii_alphanumeric() {
        return Err("deve começar com letra ou número".to_string());
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '.' && *c != '-')
    {
        return Err(format!("contém caractere inválido '{c}'"));
    }

    Ok(())
}
