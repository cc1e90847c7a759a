mod config;
mod console;
mod menu;

use std::io;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{Config, ConnectionTarget};
use console::Console;
use menu::App;

/// Console messenger: users, contact and block lists, chats and messages.
#[derive(Parser, Debug)]
#[command(name = "messenger", version, about)]
struct Cli {
    /// Database name (`<MESSENGER_DB_DIR>/<name>.db`), a path, or `:memory:`
    database: String,

    /// Port recorded in the connection URL
    port: u16,

    /// User recorded in the connection URL
    #[arg(value_parser = clap::builder::NonEmptyStringValueParser::new())]
    user: String,

    /// Debug logging for the messenger crates (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = Config::from_env();
    let target = ConnectionTarget::new(&cli.database, cli.port, cli.user, &config);

    greeting();
    println!("Connecting to database...");
    println!("Connection URL: {}", target);
    let db = match target.open() {
        Ok(db) => db,
        Err(err) => {
            error!(url = %target, error = %err, "connection failed");
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    println!("Done");
    info!(url = %target, "connected");

    let stdin = io::stdin();
    let result = App::new(&db, Console::new(stdin.lock(), io::stdout())).run();

    print!("Disconnecting from database...");
    drop(db);
    println!("Done\n\nBye !");
    result
}

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn,messenger_cli=debug,messenger_api=debug,messenger_db=debug")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

fn greeting() {
    println!(
        "\n\n*******************************************************\n\
         \x20             User Interface                         \n\
         *******************************************************\n"
    );
}
