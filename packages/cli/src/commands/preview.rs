use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use mailcanvas_editor::Document;
use mailcanvas_preview::{compose, PreviewOptions, Viewport};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Template file
    pub input: PathBuf,

    /// Viewport (mobile, tablet, desktop, or WIDTHxHEIGHT)
    #[arg(short, long, default_value = "desktop")]
    pub viewport: Viewport,

    /// Page shown behind the template
    #[arg(long)]
    pub overlay: Option<String>,

    /// Include the editing bridge
    #[arg(long)]
    pub interactive: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn preview(args: PreviewArgs, cwd: &str) -> Result<()> {
    let input = PathBuf::from(cwd).join(&args.input);
    let html = fs::read_to_string(&input)
        .with_context(|| format!("Cannot read {}", input.display()))?;

    // Same cleanup a session applies on load
    let document = Document::load(&html).serialize();
    let options = PreviewOptions {
        external_page_url: args.overlay,
        viewport: args.viewport,
        interactive: args.interactive,
        ..PreviewOptions::default()
    };
    let page = compose(&document, &options)?;

    match args.output {
        Some(output) => {
            let output = PathBuf::from(cwd).join(output);
            fs::write(&output, page)?;
            eprintln!(
                "  {} {} → {} ({})",
                "✓".green(),
                args.input.display(),
                output.display(),
                options.viewport
            );
        }
        None => println!("{}", page),
    }

    Ok(())
}
