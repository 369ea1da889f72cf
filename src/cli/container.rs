use super::output::print_list;
use crate::domain::{ContainerSpec, Mount, NetworkConfig, PortMapping, SelinuxLabel};
use crate::services::Connection;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Imagem base (nome ou ID)
    pub image: String,

    #[arg(long)]
    pub name: Option<String>,

    /// Pod ao qual o container pertence
    #[arg(long)]
    pub pod: Option<String>,

    /// Inicia o container logo após criar
    #[arg(short, long)]
    pub detach: bool,

    #[arg(short, long)]
    pub interactive: bool,

    #[arg(short, long)]
    pub tty: bool,

    /// Remove o container quando ele parar
    #[arg(long = "rm")]
    pub auto_remove: bool,

    #[arg(long)]
    pub privileged: bool,

    /// type=bind|volume|tmpfs|devpts,source=...,destination=...[,ro]
    #[arg(long = "mount", value_name = "SPEC")]
    pub mounts: Vec<Mount>,

    /// bridge, host, none, slirp4netns ou nome de uma rede
    #[arg(long)]
    pub network: Option<String>,

    #[arg(long)]
    pub ip: Option<String>,

    #[arg(long)]
    pub ip6: Option<String>,

    #[arg(long)]
    pub mac_address: Option<String>,

    #[arg(long = "dns", value_name = "SERVER")]
    pub dns_servers: Vec<String>,

    /// Opção do resolv.conf (ex: ndots:2)
    #[arg(long = "dns-option", value_name = "OPTION")]
    pub dns_options: Vec<String>,

    #[arg(long = "dns-search", value_name = "DOMAIN")]
    pub dns_search: Vec<String>,

    /// [[ip:]host:]container[/tcp|udp]
    #[arg(short = 'p', long = "publish", value_name = "PORT")]
    pub ports: Vec<PortMapping>,

    /// KEY=VALUE
    #[arg(short, long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// disable, type:X, level:X, user:X ou role:X
    #[arg(long)]
    pub selinux_label: Option<SelinuxLabel>,

    /// Comando executado no container
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl CreateArgs {
    pub fn to_spec(&self) -> ContainerSpec {
        ContainerSpec {
            image: self.image.clone(),
            name: self.name.clone(),
            detach: self.detach,
            interactive: self.interactive,
            tty: self.tty,
            auto_remove: self.auto_remove,
            privileged: self.privileged,
            pod: self.pod.clone(),
            mounts: self.mounts.clone(),
            network: NetworkConfig {
                mode: self.network.clone(),
                mac_address: self.mac_address.clone(),
                ipv4: self.ip.clone(),
                ipv6: self.ip6.clone(),
                dns_servers: self.dns_servers.clone(),
                dns_options: self.dns_options.clone(),
                dns_search: self.dns_search.clone(),
                ports: self.ports.clone(),
            },
            selinux_label: self.selinux_label.clone().unwrap_or_default(),
            env: self.env.clone(),
            command: self.command.clone(),
        }
    }
}

pub fn list(conn: &Connection) -> Result<()> {
    let containers = conn.list_containers()?;

    print_list(
        "📦 Containers:",
        containers.iter().map(|c| {
            let pod = if c.pod_name.is_empty() {
                String::new()
            } else {
                format!(" (pod {})", c.pod_name)
            };
            format!(
                "{:<12} | {:<20} | {:<10} | {}{}",
                c.short_id(),
                c.name(),
                c.state,
                c.image,
                pod
            )
        }),
    );

    Ok(())
}

pub fn create(conn: &Connection, args: &CreateArgs) -> Result<()> {
    let handle = conn.create_container(&args.to_spec())?;

    if handle.started {
        println!("🚀 Container iniciado: {}", handle.id);
    } else {
        println!("✅ Container criado: {}", handle.id);
    }

    Ok(())
}
