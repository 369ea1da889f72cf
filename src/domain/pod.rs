use super::container::PortMapping;
use super::image::{null_as_empty, short_id};
use serde::Deserialize;

/// One entry of `podman pod ps --format json`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PodSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Containers", default, deserialize_with = "null_as_empty")]
    pub containers: Vec<PodMember>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PodMember {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl PodSummary {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// A pod is referenced either by name or by an id prefix.
    pub fn matches(&self, reference: &str) -> bool {
        self.name == reference || (!reference.is_empty() && self.id.starts_with(reference))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSpec {
    pub name: Option<String>,
    pub hostname: Option<String>,
    /// `KEY=VALUE` labels
    pub labels: Vec<String>,
    pub ports: Vec<PortMapping>,
    /// Create the infra container that holds the pod namespaces
    pub infra: bool,
}

impl Default for PodSpec {
    fn default() -> Self {
        Self {
            name: None,
            hostname: None,
            labels: Vec::new(),
            ports: Vec::new(),
            infra: true,
        }
    }
}

impl PodSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodHandle {
    pub id: String,
}
