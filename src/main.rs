mod config;
mod sum;
mod tftp;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "octetd")]
#[command(about = "Read-only single-payload TFTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TFTP server
    Serve {
        /// File served to every client, whatever filename they request
        #[arg(value_name = "PAYLOAD")]
        payload: Option<PathBuf>,

        /// Address to listen on
        #[arg(short, long)]
        address: Option<String>,

        /// Retransmissions per block before a session is abandoned
        #[arg(short, long)]
        retries: Option<u8>,

        /// Seconds to wait for an ACK before retransmitting
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Print SHA-512/256 digests of files
    Sum {
        /// Files to hash
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate configuration file (.octetd.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    // Try to load configuration file
    let config_path = ".octetd.toml";
    let app_config = if std::path::Path::new(config_path).exists() {
        match config::AppConfig::load_from_file(config_path) {
            Ok(cfg) => {
                let abs_path = std::fs::canonicalize(config_path)
                    .unwrap_or_else(|_| std::path::PathBuf::from(config_path));
                info!("Using configuration file: {}", abs_path.display());
                Some(cfg)
            }
            Err(e) => {
                error!("Failed to load configuration file: {}, using defaults", e);
                None
            }
        }
    } else {
        None
    };

    match cli.command {
        Commands::Serve {
            payload,
            address,
            retries,
            timeout,
        } => {
            tftp::server::run_with_config(
                address,
                payload,
                retries,
                timeout,
                app_config.as_ref().and_then(|c| c.serve.clone()),
            )?;
        }

        Commands::Sum { files } => {
            sum::run(&files)?;
        }

        Commands::Genconfig { force } => {
            if let Err(e) = config::AppConfig::generate_config_file(force) {
                error!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
