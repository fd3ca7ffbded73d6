//! Image Previewer - on-demand image thumbnail service

use std::path::PathBuf;

use anyhow::Result;

use image_previewer::{Config, logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    match parse_args()? {
        Command::Serve { config } => serve(config).await,
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            println!("image-previewer {}", image_previewer::VERSION);
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Serve { config: Option<PathBuf> },
    Help,
    Version,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None => Ok(Command::Serve { config: None }),
        Some("-h" | "--help" | "help") => Ok(Command::Help),
        Some("-v" | "--version" | "version") => Ok(Command::Version),
        Some("-c" | "--config") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing path after --config"))?;
            Ok(Command::Serve {
                config: Some(PathBuf::from(path)),
            })
        }
        Some(other) => Err(anyhow::anyhow!(
            "Unknown argument: {other}\nRun 'image-previewer --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = image_previewer::paths::config_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"image-previewer - on-demand image thumbnails

USAGE:
    image-previewer                    Start the server
    image-previewer --config <path>    Start with a specific config file

OPTIONS:
    -c, --config <path>                Config file (TOML)
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENDPOINTS:
    GET /fill/<width>/<height>/<source.jpg>
      Example:
        curl http://localhost:8081/fill/300/200/example.com/photo.jpg

ENVIRONMENT:
    APP_LOG_LEVEL, HTTP_SERVER_LISTEN_ADDR, HTTP_SERVER_LISTEN_PORT,
    CACHE_DIR, CACHE_CAPACITY, FETCH_TIMEOUT_SECS override the config file.
    RUST_LOG overrides the log level.

CONFIG:
    {}
"#,
        config_path
    );
}

async fn serve(path: Option<PathBuf>) -> Result<()> {
    let mut config = match path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    config.apply_env()?;
    config.validate()?;

    logging::init(&config.app)?;

    server::run(&config).await
}
