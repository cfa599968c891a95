//! Ask the completions API for ALT text for a single image URL.
//!
//!   describe_image https://example.org/uploads/cat.png

use altgen::completion::{AltTextGenerator, CompletionClient};
use altgen::constants::COMPLETIONS_URL;
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "describe_image")]
#[command(about = "Generate ALT text for a publicly reachable image URL")]
struct Args {
    /// Absolute URL of the image
    image_url: url::Url,

    /// OpenRouter API key
    #[arg(long, env = "ALTGEN_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Chat-completions endpoint
    #[arg(long, default_value = COMPLETIONS_URL, env = "ALTGEN_COMPLETIONS_URL")]
    completions_url: url::Url,

    /// Enable debug logging
    #[arg(long, env = "ALTGEN_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = altgen::config::setup_logging(args.debug);

    let client =
        CompletionClient::new(args.completions_url).context("Failed to build HTTP client")?;
    let alt_text = client
        .generate_alt_text(args.image_url.as_str(), &args.api_key)
        .await?;

    println!("{alt_text}");
    Ok(())
}
