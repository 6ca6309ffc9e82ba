mod auth;
mod cache;
mod cli;
mod db;
mod error;
mod export;
mod fmt;
mod models;
mod registry;
mod reports;
mod session;
mod settings;
mod table;
mod transforms;
mod warehouse;

use clap::{CommandFactory, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, UsersCommands};

/// Logs go to stderr so report output on stdout stays clean. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            source,
            warehouse,
        } => cli::init::run(data_dir, source, warehouse),
        Commands::Demo => cli::demo::run(),
        Commands::Status => cli::status::run(),
        Commands::Reports { user } => cli::report::list(&user),
        Commands::Report {
            name,
            user,
            controls,
            export,
            output,
            format,
        } => cli::report::show(&name, &user, &controls, export, output, format),
        Commands::ExportAll {
            user,
            output_dir,
            format,
        } => cli::report::export_all(&user, output_dir, format),
        Commands::Shell { user } => cli::shell::run(&user),
        Commands::Users { command } => match command {
            UsersCommands::Hash => cli::users::hash(),
            UsersCommands::Add { username, name, role } => cli::users::add(&username, &name, role),
            UsersCommands::List => cli::users::list(),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "painel", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Erro: {e}");
        std::process::exit(1);
    }
}
