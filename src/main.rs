use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use food_quality::api;
use food_quality::commands::{CommandFlow, CommandHandler};
use food_quality::config::ProviderConfig;
use food_quality::database::Database;
use food_quality::food::{DirectoryImageStore, FoodAnalyzer, FoodConfig};
use food_quality::providers::gemini::GeminiProvider;
use food_quality::providers::InferenceProvider;
use log::info;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gemini API key (falls back to GEMINI_API_KEY)
    #[arg(short, long)]
    api_key: Option<String>,

    /// Model name (falls back to GEMINI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// SQLite database file (falls back to FOOD_DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory uploaded images are kept in (falls back to FOOD_IMAGE_DIR)
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Serve the HTTP API instead of the interactive prompt
    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    colored::control::set_override(true);

    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let analyzer = build_analyzer(&args).await?;

    if args.api {
        run_api_server(analyzer, args.port).await
    } else {
        run_cli_mode(analyzer).await
    }
}

async fn build_analyzer(args: &Args) -> Result<FoodAnalyzer, Box<dyn std::error::Error + Send + Sync>> {
    let mut provider_config = match &args.api_key {
        Some(key) => ProviderConfig::from_lookup("gemini", |k| {
            if k == "GEMINI_API_KEY" {
                Some(key.clone())
            } else {
                std::env::var(k).ok()
            }
        })?,
        None => ProviderConfig::from_env("gemini")?,
    };
    if let Some(model) = &args.model {
        provider_config = provider_config.with_model(model.clone());
    }

    let mut food_config = FoodConfig::from_env();
    if let Some(path) = &args.db_path {
        food_config.database_path = path.clone();
    }
    if let Some(dir) = &args.image_dir {
        food_config.image_dir = dir.clone();
    }

    let provider = GeminiProvider::new(provider_config)?;
    info!("Using model {}", provider.get_model_info().await?);

    let db = Database::new(&food_config.database_path).await?;
    let images = DirectoryImageStore::new(&food_config.image_dir).await?;

    Ok(FoodAnalyzer::new(
        Arc::new(provider),
        Arc::new(db),
        Arc::new(images),
        food_config.analyzer_config(),
    ))
}

async fn run_cli_mode(analyzer: FoodAnalyzer) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut command_handler = CommandHandler::new(analyzer);

    command_handler.handle_command("help").await?;

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("🍽️  ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                match command_handler.handle_command(input).await {
                    Ok(CommandFlow::Exit) => break,
                    Ok(CommandFlow::Continue) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    command_handler.analyzer().shutdown();
    Ok(())
}

async fn run_api_server(analyzer: FoodAnalyzer, port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = api::create_api(analyzer);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    info!("Server successfully bound to {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
