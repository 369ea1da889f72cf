use super::Connection;
use crate::domain::RuntimeConnector;
use crate::error::ConnectionError;
use crate::infra::PodmanConnector;
use crate::infra::config::AppConfig;
use crate::infra::runner::CommandRunner;
use std::sync::Arc;
use tracing::info;

/// One live connection bound to the surface driving it.
#[derive(Debug)]
pub struct Session {
    connection: Connection,
}

impl Session {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Window/terminal title for this session
    pub fn title(&self) -> String {
        format!("{} - Contaiman", self.connection.host())
    }
}

/// Application-wide state, built once in `main` and passed to every handler.
#[derive(Debug)]
pub struct AppContext {
    config: AppConfig,
    connector: Arc<dyn RuntimeConnector>,
    runner: CommandRunner,
    session: Option<Session>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let connector = Arc::new(PodmanConnector::new(config.podman_binary()));
        Self::with_connector(config, connector)
    }

    pub fn with_connector(config: AppConfig, connector: Arc<dyn RuntimeConnector>) -> Self {
        let runner = CommandRunner::new(config.runner_settings());
        Self {
            config,
            connector,
            runner,
            session: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn require_session(&self) -> Result<&Session, ConnectionError> {
        self.session.as_ref().ok_or(ConnectionError::NotConnected)
    }

    /// Connects to `uri` and makes it the active session.
    ///
    /// The previous session is discarded only once the new connection is
    /// established; a failed attempt leaves it in place.
    pub fn open_session(&mut self, uri: &str) -> Result<&Session, ConnectionError> {
        let connection = Connection::open(uri, self.connector.as_ref())?;

        if let Some(old) = self.session.take() {
            info!("Encerrando sessão anterior em {}", old.connection().host());
        }

        Ok(self.session.insert(Session::new(connection)))
    }

    pub fn close_session(&mut self) -> Option<Session> {
        self.session.take()
    }
}
