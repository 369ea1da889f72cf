use crate::domain::{
    ContainerHandle, ContainerRuntime, ContainerSpec, ContainerSummary, DaemonInfo, Endpoint,
    ImageSummary, Mount, PodHandle, PodSpec, PodSummary, PullOptions, RuntimeConnector,
};
use crate::error::EngineError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PODMAN_BINARY: &str = "podman";

/// Talks to a Podman service through the `podman --remote` client.
#[derive(Debug, Clone)]
pub struct PodmanAdapter {
    binary: String,
    endpoint: Endpoint,
}

impl PodmanAdapter {
    pub fn new(binary: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            binary: binary.into(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn podman(&self, args: &[String], operation: &str) -> Result<String, EngineError> {
        debug!(
            "podman --url {} {}",
            self.endpoint,
            redact(args).join(" ")
        );

        let output = Command::new(&self.binary)
            .args(["--remote", "--url", self.endpoint.as_uri()])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| EngineError::Launch {
                program: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::Rejected {
                operation: operation.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn query<T: DeserializeOwned>(
        &self,
        args: &[&str],
        operation: &str,
    ) -> Result<Vec<T>, EngineError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let stdout = self.podman(&args, operation)?;
        decode_list(&stdout, operation)
    }
}

impl ContainerRuntime for PodmanAdapter {
    fn ping(&self) -> Result<DaemonInfo, EngineError> {
        let args = ["version", "--format", "json"].map(String::from);
        let stdout = self.podman(&args, "version")?;
        parse_version(&stdout)
    }

    fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        self.query(&["images", "--format", "json"], "images")
    }

    fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        self.query(&["ps", "--all", "--format", "json"], "ps")
    }

    fn list_pods(&self) -> Result<Vec<PodSummary>, EngineError> {
        self.query(&["pod", "ps", "--format", "json"], "pod ps")
    }

    fn pull_image(
        &self,
        reference: &str,
        options: &PullOptions,
    ) -> Result<Vec<String>, EngineError> {
        let stdout = self.podman(&pull_args(reference, options), "pull")?;
        let ids: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();

        if ids.is_empty() {
            return Err(EngineError::EmptyResponse {
                operation: "pull".to_string(),
            });
        }

        Ok(ids)
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, EngineError> {
        let operation = if spec.detach { "run" } else { "create" };
        let stdout = self.podman(&container_args(spec), operation)?;

        Ok(ContainerHandle {
            id: last_line(&stdout, operation)?,
            name: spec.name().map(String::from),
            started: spec.detach,
        })
    }

    fn create_pod(&self, spec: &PodSpec) -> Result<PodHandle, EngineError> {
        let stdout = self.podman(&pod_args(spec), "pod create")?;
        Ok(PodHandle {
            id: last_line(&stdout, "pod create")?,
        })
    }
}

/// Builds [`PodmanAdapter`]s with a configurable client binary.
#[derive(Debug, Clone)]
pub struct PodmanConnector {
    binary: String,
}

impl PodmanConnector {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PodmanConnector {
    fn default() -> Self {
        Self::new(DEFAULT_PODMAN_BINARY)
    }
}

impl RuntimeConnector for PodmanConnector {
    fn runtime_for(&self, endpoint: &Endpoint) -> Arc<dyn ContainerRuntime> {
        Arc::new(PodmanAdapter::new(self.binary.clone(), endpoint.clone()))
    }
}

#[derive(Deserialize)]
struct VersionReport {
    #[serde(rename = "Server")]
    server: Option<VersionComponent>,
}

#[derive(Deserialize)]
struct VersionComponent {
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "APIVersion", default)]
    api_version: String,
}

fn parse_version(stdout: &str) -> Result<DaemonInfo, EngineError> {
    let report: VersionReport =
        serde_json::from_str(stdout).map_err(|source| EngineError::Decode {
            operation: "version".to_string(),
            source,
        })?;

    let server = report.server.ok_or_else(|| EngineError::EmptyResponse {
        operation: "version".to_string(),
    })?;

    Ok(DaemonInfo {
        version: server.version,
        api_version: server.api_version,
    })
}

fn decode_list<T: DeserializeOwned>(stdout: &str, operation: &str) -> Result<Vec<T>, EngineError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }

    serde_json::from_str(trimmed).map_err(|source| EngineError::Decode {
        operation: operation.to_string(),
        source,
    })
}

fn last_line(stdout: &str, operation: &str) -> Result<String, EngineError> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(String::from)
        .ok_or_else(|| EngineError::EmptyResponse {
            operation: operation.to_string(),
        })
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        args.push(flag.into());
        args.push(value.into());
    }
}

fn push_each(args: &mut Vec<String>, flag: &str, values: &[String]) {
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        args.push(flag.into());
        args.push(value.into());
    }
}

pub fn pull_args(reference: &str, options: &PullOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["pull".into(), "--quiet".into()];
    let auth = &options.auth;

    if let (Some(username), Some(password)) = (auth.username(), auth.password()) {
        args.push(format!("--creds={username}:{password}"));
    }

    let auth_file = auth.auth_file.as_deref().map(expand);
    push_opt(&mut args, "--authfile", auth_file.as_deref());
    let cert_dir = auth.cert_dir.as_deref().map(expand);
    push_opt(&mut args, "--cert-dir", cert_dir.as_deref());

    push_opt(&mut args, "--arch", options.platform.arch.as_deref());
    push_opt(&mut args, "--os", options.platform.os.as_deref());
    push_opt(&mut args, "--variant", options.platform.variant.as_deref());

    if let Some(verify) = options.tls_verify {
        args.push(format!("--tls-verify={verify}"));
    }

    args.push(reference.trim().into());
    args
}

pub fn mount_arg(mount: &Mount) -> String {
    match mount {
        Mount::Bind {
            source,
            destination,
            read_only,
        } => {
            let mut arg = format!(
                "type=bind,source={},destination={destination}",
                expand(source)
            );
            if *read_only {
                arg.push_str(",ro=true");
            }
            arg
        }
        Mount::Volume {
            name,
            destination,
            read_only,
        } => {
            let mut arg = format!("type=volume,source={name},destination={destination}");
            if *read_only {
                arg.push_str(",ro=true");
            }
            arg
        }
        Mount::Tmpfs { destination, size } => match size {
            Some(size) => format!("type=tmpfs,destination={destination},tmpfs-size={size}"),
            None => format!("type=tmpfs,destination={destination}"),
        },
        Mount::Devpts { destination } => format!("type=devpts,destination={destination}"),
    }
}

pub fn container_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args: Vec<String> = if spec.detach {
        vec!["run".into(), "--detach".into()]
    } else {
        vec!["create".into()]
    };

    push_opt(&mut args, "--name", spec.name());
    push_opt(&mut args, "--pod", spec.pod());

    let flags = [
        (spec.interactive, "--interactive"),
        (spec.tty, "--tty"),
        (spec.auto_remove, "--rm"),
        (spec.privileged, "--privileged"),
    ];
    for (enabled, flag) in flags {
        if enabled {
            args.push(flag.into());
        }
    }

    for mount in &spec.mounts {
        args.push("--mount".into());
        args.push(mount_arg(mount));
    }

    let net = &spec.network;
    push_opt(&mut args, "--network", net.mode.as_deref());
    push_opt(&mut args, "--mac-address", net.mac_address.as_deref());
    push_opt(&mut args, "--ip", net.ipv4.as_deref());
    push_opt(&mut args, "--ip6", net.ipv6.as_deref());
    push_each(&mut args, "--dns", &net.dns_servers);
    push_each(&mut args, "--dns-option", &net.dns_options);
    push_each(&mut args, "--dns-search", &net.dns_search);
    for port in &net.ports {
        args.push("--publish".into());
        args.push(port.to_string());
    }

    push_each(&mut args, "--env", &spec.env);

    if let Some(label) = spec.selinux_label.security_opt() {
        args.push("--security-opt".into());
        args.push(label);
    }

    args.push(spec.image.trim().into());
    args.extend(spec.command.iter().cloned());
    args
}

pub fn pod_args(spec: &PodSpec) -> Vec<String> {
    let mut args: Vec<String> = vec!["pod".into(), "create".into()];

    push_opt(&mut args, "--name", spec.name());
    push_opt(&mut args, "--hostname", spec.hostname.as_deref());
    push_each(&mut args, "--label", &spec.labels);
    for port in &spec.ports {
        args.push("--publish".into());
        args.push(port.to_string());
    }
    if !spec.infra {
        args.push("--infra=false".into());
    }

    args
}

/// Hides registry credentials before arguments reach the logs.
fn redact(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            if arg.starts_with("--creds=") {
                "--creds=***".to_string()
            } else {
                arg.clone()
            }
        })
        .collect()
}
