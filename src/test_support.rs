use crate::domain::{
    ContainerHandle, ContainerRuntime, ContainerSpec, ContainerSummary, DaemonInfo, Endpoint,
    ImageSummary, PodHandle, PodSpec, PodSummary, PullOptions, RuntimeConnector,
};
use crate::error::EngineError;
use std::sync::{Arc, RwLock};

/// In-memory daemon that records every call as a string.
#[derive(Debug)]
pub struct MockRuntime {
    images: RwLock<Vec<ImageSummary>>,
    containers: RwLock<Vec<ContainerSummary>>,
    pods: RwLock<Vec<PodSummary>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Option<(String, String)>>,
    last_pull_options: RwLock<Option<PullOptions>>,
    last_container_spec: RwLock<Option<ContainerSpec>>,
    next_id: RwLock<u64>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(Vec::new()),
            containers: RwLock::new(Vec::new()),
            pods: RwLock::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            last_pull_options: RwLock::new(None),
            last_container_spec: RwLock::new(None),
            next_id: RwLock::new(1),
        }
    }

    pub fn add_image(&self, id: &str, tag: &str) {
        self.images.write().unwrap().push(ImageSummary {
            id: id.to_string(),
            repo_tags: vec![tag.to_string()],
            size: 0,
            created: 0,
            containers: 0,
        });
    }

    pub fn add_pod(&self, id: &str, name: &str) {
        self.pods.write().unwrap().push(PodSummary {
            id: id.to_string(),
            name: name.to_string(),
            status: "Running".to_string(),
            containers: Vec::new(),
        });
    }

    pub fn set_fail_on(&self, operation: &str) {
        self.set_fail_on_with(operation, &format!("Mock failure on: {operation}"));
    }

    pub fn set_fail_on_with(&self, operation: &str, message: &str) {
        *self.fail_on.write().unwrap() = Some((operation.to_string(), message.to_string()));
    }

    pub fn clear_failure(&self) {
        *self.fail_on.write().unwrap() = None;
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn containers(&self) -> Vec<ContainerSummary> {
        self.containers.read().unwrap().clone()
    }

    pub fn last_pull_options(&self) -> Option<PullOptions> {
        self.last_pull_options.read().unwrap().clone()
    }

    pub fn last_container_spec(&self) -> Option<ContainerSpec> {
        self.last_container_spec.read().unwrap().clone()
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<(), EngineError> {
        if let Some((ref fail_on, ref message)) = *self.fail_on.read().unwrap() {
            if fail_on == operation {
                return Err(EngineError::Other(message.clone()));
            }
        }
        Ok(())
    }

    fn next_id(&self) -> String {
        let mut next = self.next_id.write().unwrap();
        let id = format!("{:064x}", *next);
        *next += 1;
        id
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn ping(&self) -> Result<DaemonInfo, EngineError> {
        self.record_command("ping");
        self.check_fail("ping")?;
        Ok(DaemonInfo {
            version: "5.0.0-mock".to_string(),
            api_version: "5.0.0".to_string(),
        })
    }

    fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        self.record_command("list_images");
        self.check_fail("list_images")?;
        Ok(self.images.read().unwrap().clone())
    }

    fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        self.record_command("list_containers");
        self.check_fail("list_containers")?;
        Ok(self.containers())
    }

    fn list_pods(&self) -> Result<Vec<PodSummary>, EngineError> {
        self.record_command("list_pods");
        self.check_fail("list_pods")?;
        Ok(self.pods.read().unwrap().clone())
    }

    fn pull_image(
        &self,
        reference: &str,
        options: &PullOptions,
    ) -> Result<Vec<String>, EngineError> {
        self.record_command(&format!("pull:{reference}"));
        self.check_fail("pull")?;
        *self.last_pull_options.write().unwrap() = Some(options.clone());

        let id = self.next_id();
        self.add_image(&id, reference);
        Ok(vec![id])
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, EngineError> {
        self.record_command(&format!("create:{}", spec.name().unwrap_or(&spec.image)));
        self.check_fail("create")?;
        *self.last_container_spec.write().unwrap() = Some(spec.clone());

        let id = self.next_id();
        let pod_name = spec.pod().unwrap_or_default().to_string();
        self.containers.write().unwrap().push(ContainerSummary {
            id: id.clone(),
            image: spec.image.clone(),
            names: spec.name().map(String::from).into_iter().collect(),
            state: if spec.detach { "running" } else { "created" }.to_string(),
            status: String::new(),
            pod: String::new(),
            pod_name,
        });

        Ok(ContainerHandle {
            id,
            name: spec.name().map(String::from),
            started: spec.detach,
        })
    }

    fn create_pod(&self, spec: &PodSpec) -> Result<PodHandle, EngineError> {
        self.record_command(&format!("create_pod:{}", spec.name().unwrap_or("")));
        self.check_fail("create_pod")?;

        let id = self.next_id();
        self.add_pod(&id, spec.name().unwrap_or_default());
        Ok(PodHandle { id })
    }
}

/// Hands out the same [`MockRuntime`] for every endpoint.
#[derive(Debug, Clone)]
pub struct MockConnector {
    runtime: Arc<MockRuntime>,
}

impl MockConnector {
    pub fn new(runtime: Arc<MockRuntime>) -> Self {
        Self { runtime }
    }
}

impl RuntimeConnector for MockConnector {
    fn runtime_for(&self, _endpoint: &Endpoint) -> Arc<dyn ContainerRuntime> {
        self.runtime.clone()
    }
}
