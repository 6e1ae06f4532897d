use std::path::PathBuf;

use anyhow::Context;
use auto_manim::config::Overrides;
use auto_manim::{
    Config, ConstrainedGenerator, FileCache, MemoryCache, OpenRouterClient, Result,
    ScriptPipeline, ScriptProcessor,
};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "auto-manim")]
#[command(about = "Generate a paced Manim animation script for a topic using AI", long_about = None)]
struct Args {
    /// Topic to explain in the animation
    #[arg(short, long)]
    topic: Option<String>,

    /// Repair and pace an existing script instead of generating one
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output script file path
    #[arg(short, long, default_value = "scene.py")]
    output: PathBuf,

    /// Print the script to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Directory for cached scripts (memory only when omitted)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// OpenRouter API key
    #[arg(long)]
    api_key: Option<String>,

    /// Model identifier passed to OpenRouter
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let script = if let Some(file_path) = &args.file {
        info!("Repairing existing script: {}", file_path.display());
        let raw = tokio::fs::read_to_string(file_path)
            .await
            .context(format!("Failed to read file: {}", file_path.display()))?;
        ScriptProcessor::default()
            .process(&raw)
            .context("Script failed structural validation")?
    } else if let Some(topic) = &args.topic {
        let config = Config::resolve(Overrides {
            api_key: args.api_key.clone(),
            model: args.model.clone(),
            base_url: None,
            cache_dir: args.cache_dir.clone(),
        })?;

        match run_generation(topic, &config).await {
            Ok(script) => script,
            Err(e) => {
                error!("Script generation failed: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        eprintln!("Error: Either --topic or --file must be provided");
        std::process::exit(1);
    };

    if args.stdout {
        println!("{}", script);
    } else {
        tokio::fs::write(&args.output, &script)
            .await
            .context(format!("Failed to write script: {}", args.output.display()))?;
        info!("Script written to: {}", args.output.display());
    }

    Ok(())
}

async fn run_generation(topic: &str, config: &Config) -> Result<String> {
    let client = OpenRouterClient::new(config)?;
    info!("Using model: {}", client.model());
    let generator = ConstrainedGenerator::new(client);

    match &config.cache_dir {
        Some(dir) => {
            ScriptPipeline::new(generator, FileCache::new(dir))
                .script_for(topic)
                .await
        }
        None => {
            ScriptPipeline::new(generator, MemoryCache::new())
                .script_for(topic)
                .await
        }
    }
}
