use super::output::{human_size, print_list};
use crate::domain::{ImageReference, PlatformOverride, PullOptions, RegistryAuth};
use crate::services::Connection;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Imagem a baixar (ex: library/alpine:latest)
    pub image: String,

    /// Registry prefixado quando a imagem não informa um
    #[arg(long)]
    pub registry: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long, env = "CONTAIMAN_REGISTRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Arquivo de autenticação (auth.json)
    #[arg(long)]
    pub authfile: Option<String>,

    /// Diretório com certificados do registry
    #[arg(long)]
    pub cert_dir: Option<String>,

    #[arg(long)]
    pub arch: Option<String>,

    #[arg(long)]
    pub os: Option<String>,

    #[arg(long)]
    pub variant: Option<String>,

    /// Verificar TLS do registry (padrão do daemon se omitido)
    #[arg(long)]
    pub tls_verify: Option<bool>,
}

impl PullArgs {
    pub fn reference(&self) -> String {
        ImageReference::compose(self.registry.as_deref(), &self.image)
    }

    pub fn options(&self) -> PullOptions {
        PullOptions {
            auth: RegistryAuth {
                username: self.username.clone(),
                password: self.password.clone(),
                auth_file: self.authfile.clone(),
                cert_dir: self.cert_dir.clone(),
            },
            platform: PlatformOverride {
                arch: self.arch.clone(),
                os: self.os.clone(),
                variant: self.variant.clone(),
            },
            tls_verify: self.tls_verify,
        }
    }
}

pub fn list(conn: &Connection) -> Result<()> {
    let images = conn.list_images()?;

    print_list(
        "🖼️  Imagens:",
        images.iter().map(|img| {
            format!(
                "{:<12} | {:<50} | {}",
                img.short_id(),
                img.display_name(),
                human_size(img.size)
            )
        }),
    );

    Ok(())
}

pub fn pull(conn: &Connection, args: &PullArgs) -> Result<()> {
    let reference = args.reference();
    println!("⬇️  Baixando {reference}...");

    let ids = conn.pull_image(&reference, &args.options())?;

    print_list("✅ Imagens baixadas:", ids.iter().cloned());
    Ok(())
}
