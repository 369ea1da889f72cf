pub mod container;
pub mod daemon;
pub mod image;
mod output;
pub mod pod;

use crate::infra::config::{default_config_dir, install_default_config, load_app_config};
use crate::services::{AppContext, Connection};
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use container::CreateArgs;
use daemon::{DaemonAction, ExecArgs};
use image::PullArgs;
use pod::PodAction;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "contaiman",
    version,
    about = "Painel de controle para instâncias do Podman"
)]
pub struct Cli {
    /// Diretório de configuração (default: ~/.config/contaiman)
    #[arg(long, env = "CONTAIMAN_CONFIG_DIR", default_value_os_t = default_config_dir())]
    pub config_dir: PathBuf,

    /// URI da instância do Podman (unix://, tcp:// ou ssh://)
    #[arg(long, env = "CONTAIMAN_URL", global = true)]
    pub url: Option<String>,

    /// Logs detalhados
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Testa a conexão e mostra a versão do daemon
    Connect,
    /// Lista imagens
    Images,
    /// Lista containers
    Containers,
    /// Lista pods
    Pods,
    /// Baixa uma imagem
    Pull(PullArgs),
    /// Cria um container
    Create(CreateArgs),
    /// Operações com pods
    Pod {
        #[command(subcommand)]
        action: PodAction,
    },
    /// Ajuda para subir o serviço do Podman
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Executa uma linha de comando e mostra a saída
    Exec(ExecArgs),
    /// Gerencia o arquivo de configuração
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Sobre o Contaiman
    About,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Cria o contaiman.toml padrão
    Init,
    /// Mostra a configuração efetiva
    Show,
}

impl Commands {
    fn needs_connection(&self) -> bool {
        matches!(
            self,
            Self::Connect
                | Self::Images
                | Self::Containers
                | Self::Pods
                | Self::Pull(_)
                | Self::Create(_)
                | Self::Pod { .. }
        )
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    if let Commands::Config { action } = &cli.command {
        return config(action, &cli.config_dir);
    }

    let app_config = load_app_config(&cli.config_dir)?;
    let mut ctx = AppContext::new(app_config);

    if cli.command.needs_connection() {
        let uri = resolve_uri(cli.url.as_deref(), ctx.config().connection.uri.as_deref())?;
        let session = ctx.open_session(&uri)?;
        info!("Sessão: {}", session.title());
    }

    dispatch(&ctx, &cli.command, &cli.config_dir)
}

fn dispatch(ctx: &AppContext, command: &Commands, config_dir: &Path) -> Result<()> {
    match command {
        Commands::Connect => {
            let session = ctx.require_session()?;
            let daemon = session.connection().daemon();
            println!("🔗 {}", session.title());
            println!(
                "   Podman {} (API {})",
                daemon.version, daemon.api_version
            );
            Ok(())
        }
        Commands::Images => image::list(connection(ctx)?),
        Commands::Containers => container::list(connection(ctx)?),
        Commands::Pods => pod::list(connection(ctx)?),
        Commands::Pull(args) => image::pull(connection(ctx)?, args),
        Commands::Create(args) => container::create(connection(ctx)?, args),
        Commands::Pod { action } => pod::run(connection(ctx)?, action),
        Commands::Daemon { action } => daemon::run(ctx.runner(), action),
        Commands::Exec(args) => daemon::exec(ctx.runner(), args),
        Commands::Config { action } => config(action, config_dir),
        Commands::About => {
            about();
            Ok(())
        }
    }
}

fn connection(ctx: &AppContext) -> Result<&Connection> {
    Ok(ctx.require_session()?.connection())
}

/// `--url`/`CONTAIMAN_URL` wins over the configured URI.
pub fn resolve_uri(flag: Option<&str>, configured: Option<&str>) -> Result<String> {
    match flag.or(configured).map(str::trim).filter(|u| !u.is_empty()) {
        Some(uri) => Ok(uri.to_string()),
        None => bail!(
            "Nenhuma URI informada. Use --url ou defina connection.uri no contaiman.toml \
             (veja 'contaiman daemon sockets')."
        ),
    }
}

fn config(action: &ConfigAction, config_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Init => {
            if install_default_config(config_dir)? {
                println!("✅ Config criada em {:?}", config_dir);
            } else {
                println!("⚠️  Já existe uma config em {:?}", config_dir);
            }
        }
        ConfigAction::Show => {
            let app_config = load_app_config(config_dir)?;
            let settings = app_config.runner_settings();
            println!("⚙️  Configuração efetiva:");
            println!(
                "- uri:          {}",
                app_config.connection.uri.as_deref().unwrap_or("(não definida)")
            );
            println!("- podman:       {}", app_config.podman_binary());
            println!("- shell:        {}", settings.shell);
            println!(
                "- timeout:      {}",
                settings
                    .timeout
                    .map(|t| format!("{}s", t.as_secs()))
                    .unwrap_or_else(|| "nenhum".into())
            );
            println!("- relay:        {:?}", settings.relay_policy);
            println!("- registries:   {}", app_config.registries().join(", "));
        }
    }
    Ok(())
}

fn about() {
    println!("Contaiman {}", env!("CARGO_PKG_VERSION"));
    println!("Copyright © 2024 The Contaiman Author");
    println!("Autor:    Jelly Tea (https://github.com/jellytea)");
    println!("Licença:  Mozilla Public License 2.0 (https://mozilla.org/MPL/2.0/)");
}
