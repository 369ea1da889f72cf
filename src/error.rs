//! Error types for the connection layer and the command runner.
//!
//! Every failure is returned to the immediate caller. Nothing here retries;
//! the CLI decides how to present each error.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`ContainerRuntime`](crate::domain::ContainerRuntime) transport.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("não foi possível executar {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("podman recusou '{operation}' ({status}): {stderr}")]
    Rejected {
        operation: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("resposta inválida para '{operation}': {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{operation}' não retornou nenhum identificador")]
    EmptyResponse { operation: String },

    /// Failure injected or reported by a non-Podman transport.
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Daemon or socket refused access to the caller.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Launch { source, .. } => source.kind() == io::ErrorKind::PermissionDenied,
            Self::Rejected { stderr, .. } => stderr.to_lowercase().contains("permission denied"),
            Self::Other(message) => message.to_lowercase().contains("permission denied"),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("URI de conexão vazia")]
    EmptyUri,

    #[error("URI inválida '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("socket {path} não existe (o daemon está rodando?)")]
    SocketMissing { path: String },

    /// Raised by the socket check (`io::Error`) or by the handshake (`EngineError`).
    #[error("permissão negada ao acessar {uri}: {source}")]
    PermissionDenied {
        uri: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("daemon inacessível em {uri}: {source}")]
    Unreachable {
        uri: String,
        #[source]
        source: EngineError,
    },

    #[error("variável de ambiente $XDG_RUNTIME_DIR não definida")]
    RuntimeDirUnset,

    #[error("nenhuma sessão ativa; conecte-se a uma instância do Podman primeiro")]
    NotConnected,
}

#[derive(Debug, Error)]
#[error("falha ao consultar {resource}: {source}")]
pub struct QueryError {
    pub resource: &'static str,
    #[source]
    pub source: EngineError,
}

#[derive(Debug, Error)]
pub enum PullError {
    #[error("referência de imagem vazia")]
    EmptyReference,

    #[error("opções de pull inválidas: {0}")]
    InvalidOptions(String),

    #[error("falha ao baixar {reference}: {source}")]
    Daemon {
        reference: String,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("imagem não informada")]
    EmptyImage,

    #[error("nome '{name}' inválido: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("pod '{0}' não existe")]
    PodNotFound(String),

    #[error("configuração inválida: {0}")]
    InvalidSpec(String),

    #[error("não foi possível verificar pods existentes: {0}")]
    PodLookup(#[source] QueryError),

    #[error("falha ao criar {kind}: {source}")]
    Daemon {
        kind: &'static str,
        #[source]
        source: EngineError,
    },
}

/// The process could not be started; no completion is reported.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("linha de comando vazia")]
    EmptyCommand,

    #[error("não foi possível criar o pipe de saída: {0}")]
    Pipe(#[source] io::Error),

    #[error("não foi possível iniciar {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: io::Error,
    },
}

/// The process ran but did not finish successfully.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("[ Processo terminou com status {code} ]")]
    Exited { code: i32 },

    #[error("[ Processo encerrado pelo sinal {signal} ]")]
    Signaled { signal: i32 },

    #[error("[ Processo cancelado ]")]
    Cancelled,

    #[error("[ Processo excedeu o tempo limite de {}s ]", .after.as_secs())]
    TimedOut { after: Duration },

    #[error("falha ao aguardar o processo: {0}")]
    Wait(#[source] io::Error),

    #[error("falha ao ler a saída do processo: {0}")]
    Read(#[source] io::Error),
}

/// Output could not be forwarded to the consumer.
#[derive(Debug, Error)]
#[error("falha ao repassar saída do processo: {source}")]
pub struct RelayError {
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Rejected textual input for mounts, ports and labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{input}': {reason}")]
pub struct ParseError {
    pub input: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
