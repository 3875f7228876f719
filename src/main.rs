use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tryon::{
    logger::{self, LogLevel, LoggerConfig},
    render::render_text,
    Config, ImageEncoder, RequestState, Slot, Studio, TryOnClient,
};

#[derive(Debug, Parser)]
#[command(name = "tryon", version, about = "Virtual try-on with Gemini image generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Also append logs to this file
    #[arg(long, global = true, env = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Put the clothing from one image onto the person in another
    Generate {
        #[arg(long)]
        person: PathBuf,
        #[arg(long)]
        clothing: PathBuf,
        /// Replaces the default try-on instruction
        #[arg(long)]
        prompt: Option<String>,
        /// Where to write the generated image
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Serve the upload form and result over HTTP
    #[cfg(feature = "server")]
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LoggerConfig::development()
    } else {
        let level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|value| LogLevel::parse(&value))
            .unwrap_or(LogLevel::Info);
        LoggerConfig::new().with_level(level)
    };
    log_config = log_config.with_json_output(cli.json_logs);
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_file_output(&path.to_string_lossy());
    }
    logger::init_with_config(log_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    logger::log_config_info(&config);

    let client = match TryOnClient::from_config(&config.gemini) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to initialize Gemini client: {}", e);
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::from(2));
        }
    };

    match cli.command {
        Command::Generate {
            person,
            clothing,
            prompt,
            output,
        } => {
            let encoder = ImageEncoder::new().with_max_bytes(config.max_upload_bytes);
            let succeeded =
                run_generate(&client, encoder, person, clothing, prompt, output).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        #[cfg(feature = "server")]
        Command::Serve { port } => {
            let config = match port {
                Some(port) => config.with_port(port),
                None => config,
            };
            tryon::server::run(&config, client).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_generate(
    client: &TryOnClient,
    encoder: ImageEncoder,
    person: PathBuf,
    clothing: PathBuf,
    prompt: Option<String>,
    output: Option<PathBuf>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut studio = Studio::new(encoder);

    for (slot, path) in [(Slot::Person, person), (Slot::Clothing, clothing)] {
        if studio.select_image_file(slot, &path).await.is_err() {
            println!("{}", render_text(studio.state()));
            return Ok(false);
        }
    }
    if let Some(prompt) = prompt {
        studio.set_prompt(prompt);
    }

    log::info!("🎨 Generating virtual try-on with {}", client.model());
    if let Err(e) = studio.generate(client).await {
        println!("{}", e.user_message());
        return Ok(false);
    }
    println!("{}", render_text(studio.state()));

    let RequestState::Succeeded(image) = studio.state() else {
        return Ok(false);
    };
    let path = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "tryon_{}.{}",
            chrono::Utc::now().timestamp(),
            image.extension()
        ))
    });
    tokio::fs::write(&path, image.decode()?).await?;
    log::info!("💾 Image saved to: {}", path.display());
    println!("{}", path.display());
    Ok(true)
}
