use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use mailcanvas_editor::Skeleton;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Starting document (email, popup)
    #[arg(short, long, default_value = "email")]
    pub skeleton: String,

    /// Data directory for templates and uploads
    #[arg(short, long, default_value = ".mailcanvas")]
    pub data_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    // Reject typos before anything is written
    let skeleton: Skeleton = args.skeleton.parse()?;

    println!(
        "{}",
        "📝 Initializing Mailcanvas project...".bright_blue().bold()
    );

    let config = Config {
        skeleton: skeleton.to_string(),
        data_dir: args.data_dir.clone(),
        ..Config::default()
    };

    let data_dir = config.get_data_dir(cwd);
    for sub in ["templates", "uploads"] {
        let dir = data_dir.join(sub);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            println!("  {} Created {}/{}/", "✓".green(), args.data_dir, sub);
        }
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: mailcanvas serve");
    println!(
        "  2. Open http://{}:{}/ and drag content onto the canvas",
        config.host, config.port
    );

    Ok(())
}
