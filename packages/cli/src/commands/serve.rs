use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use mailcanvas_editor::EditSession;
use mailcanvas_preview::PreviewOptions;
use mailcanvas_workspace::{
    serve as serve_http, AppState, ControllerHandle, DirImageStore, FileTemplateStore,
    MemoryShareLinks,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Template to open (defaults to the configured skeleton)
    pub template: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Starting document when no template is given (overrides config)
    #[arg(short, long)]
    pub skeleton: Option<String>,
}

pub fn serve(args: ServeArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(skeleton) = args.skeleton {
        config.skeleton = skeleton;
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow!("Invalid address {}:{}: {}", config.host, config.port, e))?;

    let session = match &args.template {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "template".to_string());
            EditSession::new(id, &html, config.session_settings())
        }
        None => EditSession::with_skeleton("untitled", config.skeleton()?, config.session_settings()),
    };

    let data_dir = config.get_data_dir(cwd);
    let uploads_dir = data_dir.join("uploads");
    let templates = FileTemplateStore::new(data_dir.join("templates"))?;
    let images = DirImageStore::new(&uploads_dir, "/uploads")?;

    println!("{}", "✉️  Starting Mailcanvas editor...".bright_blue().bold());
    println!("   Data:   {}", data_dir.display());
    println!("   Editor: {}", format!("http://{}/", addr).cyan());
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let state = AppState {
            controller: ControllerHandle::spawn(session, PreviewOptions::interactive()),
            templates: Arc::new(templates),
            images: Arc::new(images),
            shares: Arc::new(MemoryShareLinks::new()),
            uploads_dir,
        };
        serve_http(addr, state)
            .await
            .with_context(|| format!("Server on {} stopped", addr))
    })
}
