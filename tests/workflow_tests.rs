use anyhow::Result;
use contaiman::AppContext;
use contaiman::cli::daemon::run_command;
use contaiman::error::ConnectionError;
use contaiman::infra::config::{
    AppConfig, CONFIG_FILE_NAME, install_default_config, load_app_config_from,
};
use contaiman::infra::runner::RelayPolicy;
use contaiman::test_support::{MockConnector, MockRuntime};
use contaiman::{CancelToken, CommandRunner};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

fn context_with(mock: Arc<MockRuntime>) -> AppContext {
    AppContext::with_connector(AppConfig::default(), Arc::new(MockConnector::new(mock)))
}

#[test]
fn test_workflow_connect_list_pull() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    let mut ctx = context_with(mock.clone());

    assert!(matches!(
        ctx.require_session(),
        Err(ConnectionError::NotConnected)
    ));

    let session = ctx.open_session("tcp://10.0.0.5:8080")?;
    assert_eq!(session.title(), "tcp://10.0.0.5:8080 - Contaiman");

    let conn = ctx.require_session()?.connection();
    assert!(conn.list_images()?.is_empty());

    conn.pull_image("docker.io/library/alpine:3.20", &Default::default())?;
    let images = conn.list_images()?;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].display_name(), "docker.io/library/alpine:3.20");

    assert_eq!(
        mock.get_commands(),
        vec![
            "ping",
            "list_images",
            "pull:docker.io/library/alpine:3.20",
            "list_images"
        ]
    );

    Ok(())
}

#[test]
fn test_new_session_replaces_old_one() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    let mut ctx = context_with(mock.clone());

    ctx.open_session("tcp://host-a:8080")?;
    ctx.open_session("ssh://core@host-b/run/podman/podman.sock")?;

    let session = ctx.require_session()?;
    assert_eq!(
        session.connection().host(),
        "ssh://core@host-b/run/podman/podman.sock"
    );
    Ok(())
}

#[test]
fn test_failed_connect_keeps_previous_session() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    let mut ctx = context_with(mock.clone());
    ctx.open_session("tcp://host-a:8080")?;

    assert!(matches!(
        ctx.open_session(""),
        Err(ConnectionError::EmptyUri)
    ));

    mock.set_fail_on("ping");
    assert!(ctx.open_session("tcp://host-b:8080").is_err());

    assert_eq!(ctx.require_session()?.connection().host(), "tcp://host-a:8080");

    mock.clear_failure();
    ctx.close_session();
    assert!(ctx.session().is_none());
    Ok(())
}

#[test]
fn test_config_init_and_load() -> Result<()> {
    let config_dir = tempfile::tempdir()?;
    let local_dir = tempfile::tempdir()?;

    assert!(install_default_config(config_dir.path())?);
    assert!(
        !install_default_config(config_dir.path())?,
        "não sobrescreve config existente"
    );

    let config = load_app_config_from(config_dir.path(), local_dir.path())?;
    assert!(config.connection.uri.is_none());
    assert_eq!(config.podman_binary(), "podman");

    fs::write(
        local_dir.path().join(CONFIG_FILE_NAME),
        r#"
[connection]
uri = "tcp://127.0.0.1:8888"

[runner]
timeout_secs = 15
relay_policy = "detach"

[pull]
registries = ["quay.io"]
"#,
    )?;

    let config = load_app_config_from(config_dir.path(), local_dir.path())?;
    assert_eq!(config.connection.uri.as_deref(), Some("tcp://127.0.0.1:8888"));
    assert_eq!(config.registries(), vec!["quay.io"]);

    let settings = config.runner_settings();
    assert_eq!(settings.shell, "sh");
    assert_eq!(settings.timeout, Some(Duration::from_secs(15)));
    assert_eq!(settings.relay_policy, RelayPolicy::Detach);

    Ok(())
}

#[test]
fn test_missing_config_falls_back_to_defaults() -> Result<()> {
    let config_dir = tempfile::tempdir()?;
    let local_dir = tempfile::tempdir()?;

    let config = load_app_config_from(config_dir.path(), local_dir.path())?;

    assert_eq!(config.registries(), vec!["registry.redhat.io", "docker.io"]);
    assert!(config.runner_settings().timeout.is_none());
    Ok(())
}

#[test]
fn test_broken_config_is_reported() -> Result<()> {
    let config_dir = tempfile::tempdir()?;
    let local_dir = tempfile::tempdir()?;
    fs::write(
        config_dir.path().join(CONFIG_FILE_NAME),
        "[runner]\nrelay_policy = \"explode\"\n",
    )?;

    let err = load_app_config_from(config_dir.path(), local_dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains(CONFIG_FILE_NAME));
    Ok(())
}

#[test]
fn test_exec_workflow_collects_output() -> Result<()> {
    let runner = CommandRunner::default();

    let exec = run_command(&runner, "echo from-exec", &CancelToken::new())?;

    assert!(exec.succeeded());
    assert_eq!(exec.command(), "echo from-exec");
    assert_eq!(exec.output_lossy(), "from-exec\n");
    Ok(())
}

#[test]
fn test_exec_workflow_rejects_empty_command() {
    let runner = CommandRunner::default();

    assert!(run_command(&runner, "", &CancelToken::new()).is_err());
}
