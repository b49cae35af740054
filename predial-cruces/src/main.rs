//! Point d'entrée CLI pour predial-cruces

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::Commands;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Croiser des parcelles avec des couches réglementaires
#[derive(Parser)]
#[command(name = "predial-cruces")]
#[command(author, version)]
#[command(about = "Croiser des polygones de parcelles avec des couches réglementaires")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Analyze {
            input,
            layers_dir,
            output,
            config,
            srid,
            max_pairs,
            timeout,
            jobs,
        } => {
            info!(input = %input.display(), layers_dir = %layers_dir.display(), config = %config, "Analyse");
            cli::cmd_analyze(
                &input,
                &layers_dir,
                &output,
                &config,
                srid,
                max_pairs,
                timeout,
                jobs,
            )
            .await?;
        }
        Commands::Validate { input } => {
            cli::cmd_validate(&input)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
