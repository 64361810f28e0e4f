//! Issue and inspect session tickets and password hashes from the shell.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use webdispatch::auth::{password, TicketCodec};
use webdispatch::config::AppConfig;
use webdispatch::logging;

/// Session ticket and password hash tool
#[derive(Parser)]
#[command(name = "ticket", version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "WEBDISPATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh random salt
    Salt,

    /// Hash a password with bcrypt
    Hash {
        password: String,

        /// Salt from `ticket salt`; generated when omitted
        #[arg(long)]
        salt: Option<String>,
    },

    /// Check a password against a stored hash
    Verify { password: String, hash: String },

    /// Issue a ticket carrying the given user data
    Issue {
        user_data: String,

        /// Lifetime in minutes (default from configuration)
        #[arg(long)]
        minutes: Option<i64>,
    },

    /// Print the user data of a valid ticket
    Check { token: String },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut app = match cli.config.as_deref() {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    logging::init(app.log_level.as_deref())?;
    app.apply_env();
    app.log_loaded(cli.config.as_deref());

    match cli.command {
        Commands::Salt => println!("{}", password::generate_salt()),
        Commands::Hash { password: plain, salt } => {
            let salt = salt.unwrap_or_else(password::generate_salt);
            let hash = password::hash_password(&plain, &salt, app.ticket.bcrypt_cost)
                .context("Failed to hash password")?;
            println!("salt: {salt}");
            println!("hash: {hash}");
        }
        Commands::Verify { password: plain, hash } => {
            if !password::matches(&plain, &hash) {
                eprintln!("password does not match");
                return Ok(ExitCode::FAILURE);
            }
            println!("ok");
        }
        Commands::Issue { user_data, minutes } => {
            let codec = TicketCodec::new(app.ticket_config()?)?;
            let minutes = minutes.unwrap_or(codec.config().expiry_minutes);
            println!("{}", codec.generate_token(&user_data, minutes)?);
        }
        Commands::Check { token } => {
            let codec = TicketCodec::new(app.ticket_config()?)?;
            match codec.authenticate_token(token.trim()) {
                Some(user_data) => println!("{user_data}"),
                None => {
                    eprintln!("ticket rejected");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
