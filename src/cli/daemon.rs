use crate::domain::{SYSTEM_SOCKET_URI, user_socket_uri};
use crate::infra::runner::{DaemonScope, ExecutionStatus, Tee};
use crate::infra::{CancelToken, CommandRunner, Execution};
use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use std::io;
use std::time::Duration;
use tracing::warn;

#[derive(Subcommand, Debug)]
pub enum DaemonAction {
    /// Inicia o serviço do Podman via systemd
    Start {
        /// Serviço do sistema em vez do serviço do usuário
        #[arg(long)]
        system: bool,
    },
    /// Mostra os endereços de socket sugeridos
    Sockets,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Linha de comando executada pelo shell
    pub command_line: String,

    /// Tempo limite em segundos (sobrepõe a config)
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub fn run(runner: &CommandRunner, action: &DaemonAction) -> Result<()> {
    match action {
        DaemonAction::Start { system } => {
            let scope = if *system {
                DaemonScope::System
            } else {
                DaemonScope::User
            };
            execute(runner, scope.start_command())?;
            println!("✅ Serviço iniciado. Veja os sockets com 'contaiman daemon sockets'.");
            Ok(())
        }
        DaemonAction::Sockets => {
            sockets();
            Ok(())
        }
    }
}

pub fn sockets() {
    println!("🔌 Sockets sugeridos:");
    match user_socket_uri() {
        Ok(uri) => println!("- usuário: {uri}"),
        Err(e) => warn!("  Socket do usuário indisponível: {e}"),
    }
    println!("- sistema: {SYSTEM_SOCKET_URI}");
}

pub fn exec(runner: &CommandRunner, args: &ExecArgs) -> Result<()> {
    match args.timeout {
        Some(secs) => {
            let mut settings = runner.settings().clone();
            settings.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            execute(&CommandRunner::new(settings), &args.command_line)
        }
        None => execute(runner, &args.command_line),
    }
}

/// Runs a command line, mirroring its output to the terminal. Ctrl-C cancels it.
pub fn execute(runner: &CommandRunner, command_line: &str) -> Result<()> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("  Não foi possível instalar o handler de Ctrl-C: {e}");
    }

    println!("▶️  {command_line}");
    let execution = run_command(runner, command_line, &cancel)?;

    match execution.status() {
        ExecutionStatus::Succeeded => Ok(()),
        ExecutionStatus::Failed(e) => bail!("{e}"),
        ExecutionStatus::Running => bail!("execução não foi concluída"),
    }
}

pub fn run_command(
    runner: &CommandRunner,
    command_line: &str,
    cancel: &CancelToken,
) -> Result<Execution> {
    let mut sink = Tee::new(io::stdout(), Execution::new(command_line));
    runner
        .run(command_line, &mut sink, cancel)
        .with_context(|| format!("executando '{command_line}'"))?;
    Ok(sink.into_inner())
}
