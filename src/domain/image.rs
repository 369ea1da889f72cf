use serde::Deserialize;

/// Registries offered when composing a pull reference.
pub const DEFAULT_REGISTRIES: &[&str] = &["registry.redhat.io", "docker.io"];

/// One entry of `podman images --format json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ImageSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "RepoTags", default, deserialize_with = "null_as_empty")]
    pub repo_tags: Vec<String>,
    #[serde(rename = "Size", default)]
    pub size: u64,
    #[serde(rename = "Created", default)]
    pub created: i64,
    #[serde(rename = "Containers", default)]
    pub containers: u64,
}

impl ImageSummary {
    /// First tag, or `<none>` for dangling images
    pub fn display_name(&self) -> &str {
        self.repo_tags.first().map(String::as_str).unwrap_or("<none>")
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Credentials and TLS material for the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_file: Option<String>,
    pub cert_dir: Option<String>,
}

impl RegistryAuth {
    pub fn username(&self) -> Option<&str> {
        non_blank(&self.username)
    }

    pub fn password(&self) -> Option<&str> {
        non_blank(&self.password)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Pull an image for a platform other than the daemon's own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformOverride {
    pub arch: Option<String>,
    pub os: Option<String>,
    pub variant: Option<String>,
}

/// Unset fields fall back to whatever the daemon uses by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    pub auth: RegistryAuth,
    pub platform: PlatformOverride,
    pub tls_verify: Option<bool>,
}

impl PullOptions {
    /// Blank strings count as unset.
    pub fn validate(&self) -> Result<(), String> {
        match (self.auth.username(), self.auth.password()) {
            (None, Some(_)) => return Err("senha informada sem usuário".to_string()),
            (Some(_), None) => return Err("usuário informado sem senha".to_string()),
            _ => {}
        }
        if self.platform.variant.is_some() && self.platform.arch.is_none() {
            return Err("variante de plataforma exige arquitetura".to_string());
        }
        Ok(())
    }
}

pub struct ImageReference;

impl ImageReference {
    /// Joins `registry/image` unless the image already names a registry.
    pub fn compose(registry: Option<&str>, image: &str) -> String {
        let image = image.trim();
        let registry = registry.map(str::trim).filter(|r| !r.is_empty());

        match registry {
            Some(registry) if !Self::has_registry(image) => {
                format!("{}/{}", registry.trim_end_matches('/'), image)
            }
            _ => image.to_string(),
        }
    }

    /// Same heuristic as the container tools: the first path component is a
    /// registry when it contains a dot or a port, or is `localhost`.
    pub fn has_registry(image: &str) -> bool {
        match image.split_once('/') {
            Some((first, _)) => first.contains('.') || first.contains(':') || first == "localhost",
            None => false,
        }
    }
}
