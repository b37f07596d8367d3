use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "upscale-cli")]
#[command(about = "Client for the ESPCN upscaling service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and save the upscaled PNG
    Upscale {
        /// Image to upload
        image: PathBuf,
        /// Value sent as `uniqueId`; defaults to the file stem
        #[arg(long)]
        id: Option<String>,
        /// Where to write the result; defaults to `<id>-upscaled.png`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show service version and loaded model
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Upscale { image, id, output } => {
            let id = id.unwrap_or_else(|| {
                image
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string())
            });
            let file_name = image
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let bytes = tokio::fs::read(&image).await?;

            let form = Form::new()
                .part("image", Part::bytes(bytes).file_name(file_name))
                .text("uniqueId", id.clone());

            let res = client
                .post(format!("{}/upscale", cli.url))
                .multipart(form)
                .send()
                .await?;

            let png = ensure_success(res).await?.bytes().await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{id}-upscaled.png")));
            tokio::fs::write(&output, &png).await?;
            println!("Saved {} ({} bytes)", output.display(), png.len());
        }
        Commands::Status => {
            let res = client.get(format!("{}/status", cli.url)).send().await?;
            let json: Value = ensure_success(res).await?.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

/// Turn a non-2xx reply into an error carrying the body, so the process
/// exits non-zero.
async fn ensure_success(
    res: reqwest::Response,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    Err(format!("service returned status {status}: {text}").into())
}
