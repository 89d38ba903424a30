use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pdf_preview::{DocumentFormat, PreviewConfig, PreviewGenerator, PreviewRequest};

#[derive(Parser)]
#[command(name = "pdf-preview", about = "Builds the 5-page preview of a product PDF")]
struct Args {
    /// Source PDF
    input: PathBuf,

    /// Product identifier used in the preview key
    #[arg(long)]
    product_id: String,

    /// MIME type reported by the upload
    #[arg(long, default_value = "application/pdf")]
    mime_type: String,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blob store root directory (overrides config)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Public URL prefix (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Write the preview here instead of publishing it
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PreviewConfig::load(path)?,
        None => PreviewConfig::default(),
    };
    if let Some(dir) = args.store_dir {
        config.store_root = dir;
    }
    if let Some(url) = args.base_url {
        config.public_base_url = url;
    }

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let format = DocumentFormat::from_mime_type(&args.mime_type);
    let generator = PreviewGenerator::from_config(&config);

    if let Some(output) = args.output {
        let rendered = generator.render(&bytes, &format)?;
        let (revealed, locked) = (rendered.tier.revealed, rendered.tier.locked);
        for warning in &rendered.warnings {
            println!("  warning: {warning}");
        }
        let pdf = rendered.into_validated_bytes()?;
        std::fs::write(&output, &pdf)
            .with_context(|| format!("cannot write {}", output.display()))?;
        println!("  Preview: {} ({revealed} revealed, {locked} locked)", output.display());
        return Ok(());
    }

    let request = PreviewRequest {
        bytes: &bytes,
        format,
        product_id: &args.product_id,
    };
    let artifact = generator.generate(&request)?;
    println!("  Key:     {}", artifact.preview_key);
    println!("  URL:     {}", artifact.preview_url);
    println!(
        "  Pages:   {} source, {} revealed, {} locked",
        artifact.total_pages, artifact.preview_pages, artifact.locked_pages
    );
    Ok(())
}
