pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gati")]
#[command(about = "GATI-C - inventory management server and admin tools")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    /// Server options when no subcommand is given.
    #[command(flatten)]
    pub serve: commands::serve::ServeArgs,

    /// Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create a user account")]
    CreateUser(commands::user::CreateUserArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        None => commands::serve::handle(cli.serve).await,
        Some(Commands::Serve(args)) => commands::serve::handle(args).await,
        Some(Commands::Migrate) => commands::migrate::handle(output_format).await,
        Some(Commands::CreateUser(args)) => commands::user::handle(args, output_format).await,
    }
}
