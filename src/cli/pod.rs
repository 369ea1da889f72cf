use super::output::print_list;
use crate::domain::{PodSpec, PortMapping};
use crate::services::Connection;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum PodAction {
    /// Lista pods
    List,
    /// Cria um pod
    Create(PodCreateArgs),
}

#[derive(Args, Debug)]
pub struct PodCreateArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub hostname: Option<String>,

    /// KEY=VALUE
    #[arg(long = "label", value_name = "KEY=VALUE")]
    pub labels: Vec<String>,

    #[arg(short = 'p', long = "publish", value_name = "PORT")]
    pub ports: Vec<PortMapping>,

    /// Não cria o container infra
    #[arg(long)]
    pub no_infra: bool,
}

impl PodCreateArgs {
    pub fn to_spec(&self) -> PodSpec {
        PodSpec {
            name: self.name.clone(),
            hostname: self.hostname.clone(),
            labels: self.labels.clone(),
            ports: self.ports.clone(),
            infra: !self.no_infra,
        }
    }
}

pub fn run(conn: &Connection, action: &PodAction) -> Result<()> {
    match action {
        PodAction::List => list(conn),
        PodAction::Create(args) => {
            let handle = conn.create_pod(&args.to_spec())?;
            println!("✅ Pod criado: {}", handle.id);
            Ok(())
        }
    }
}

pub fn list(conn: &Connection) -> Result<()> {
    let pods = conn.list_pods()?;

    print_list(
        "🫛 Pods:",
        pods.iter().map(|p| {
            format!(
                "{:<12} | {:<20} | {:<10} | {} container(s)",
                p.short_id(),
                p.name,
                p.status,
                p.containers.len()
            )
        }),
    );

    Ok(())
}
