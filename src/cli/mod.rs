pub mod demo;
pub mod init;
pub mod render;
pub mod report;
pub mod shell;
pub mod status;
pub mod users;

use std::path::Path;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::auth;
use crate::error::{PainelError, Result};
use crate::export::ExportFormat;
use crate::fmt::parse_date;
use crate::models::DateWindow;
use crate::reports::Controls;
use crate::session::Session;
use crate::settings::{load_settings, SourceKind};
use crate::transforms::Filters;
use crate::warehouse;

#[derive(Parser)]
#[command(
    name = "painel",
    version,
    about = "Relatórios de vendas por perfil: estoque, inadimplência, contatos e comissões."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure the data directory and warehouse source.
    Init {
        /// Path for painel data (default: ~/Documents/painel)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Where datasets come from
        #[arg(long, value_enum)]
        source: Option<SourceKind>,
        /// SQLite warehouse file, or snapshot directory for --source snapshot
        #[arg(long)]
        warehouse: Option<String>,
    },
    /// Create a demo warehouse and demo users (ana, bruno, carla, gerencia).
    Demo,
    /// Show the current configuration and data source.
    Status,
    /// List the reports available to a user.
    Reports {
        /// Username from the credentials file
        #[arg(long)]
        user: String,
    },
    /// Show or export one report.
    Report {
        /// Report title or key (e.g. estoque, contatos, comissoes-mes)
        name: String,
        /// Username from the credentials file
        #[arg(long)]
        user: String,
        #[command(flatten)]
        controls: ControlArgs,
        /// Write a spreadsheet instead of printing
        #[arg(long)]
        export: bool,
        /// Output file path (implies --export)
        #[arg(long)]
        output: Option<String>,
        #[arg(long, value_enum, default_value = "xlsx")]
        format: ExportFormat,
    },
    /// Export every report available to a user with default controls.
    ExportAll {
        /// Username from the credentials file
        #[arg(long)]
        user: String,
        /// Output directory (default: <data_dir>/exports)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        #[arg(long, value_enum, default_value = "xlsx")]
        format: ExportFormat,
    },
    /// Interactive report browser.
    Shell {
        /// Username from the credentials file
        #[arg(long)]
        user: String,
    },
    /// Manage the credentials file.
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Print a salted hash for a password (prompted, or PAINEL_PASSWORD).
    Hash,
    /// Add or replace a user in the credentials file.
    Add {
        /// Login name
        username: String,
        /// Display name; for salespeople it must match the warehouse salesperson column
        #[arg(long)]
        name: String,
        /// Role name; "Gerência" sees every salesperson
        #[arg(long)]
        role: Option<String>,
    },
    /// List users in the credentials file.
    List,
}

/// Report controls as command-line flags.
#[derive(Args, Debug, Default, Clone)]
pub struct ControlArgs {
    /// Window start: DD/MM/YYYY or YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Window end: DD/MM/YYYY or YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Salesperson filter (management only)
    #[arg(long)]
    pub vendedor: Option<String>,
    /// "Fez telemarketing?" filter: Sim or Não (management only)
    #[arg(long)]
    pub telemarketing: Option<String>,
    /// "Cotou?" filter: Sim or Não (management only)
    #[arg(long)]
    pub cotacao: Option<String>,
    /// "Vendeu?" filter: Sim or Não (management only)
    #[arg(long)]
    pub venda: Option<String>,
    /// Only commissions settled this month
    #[arg(long = "mes-atual")]
    pub current_month: bool,
    /// Only customers whose best contact day is today
    #[arg(long = "melhor-dia")]
    pub best_day: bool,
}

pub(crate) fn parse_date_arg(flag: &str, raw: &str) -> Result<NaiveDate> {
    parse_date(raw).ok_or_else(|| {
        PainelError::Other(format!("data inválida para {flag}: '{raw}' (use DD/MM/AAAA)"))
    })
}

impl ControlArgs {
    /// A missing bound is taken from `default`, or today when the report has none.
    pub fn to_controls(&self, default: Option<DateWindow>, today: NaiveDate) -> Result<Controls> {
        let window = match (&self.from_date, &self.to_date) {
            (None, None) => None,
            (from, to) => {
                let start = match from {
                    Some(s) => parse_date_arg("--from", s)?,
                    None => default.map_or(today, |w| w.start()),
                };
                let end = match to {
                    Some(s) => parse_date_arg("--to", s)?,
                    None => default.map_or(today, |w| w.end()),
                };
                Some(DateWindow::new(start, end)?)
            }
        };
        Ok(Controls {
            window,
            filters: Filters {
                vendedor: self.vendedor.clone(),
                telemarketing: self.telemarketing.clone(),
                cotacao: self.cotacao.clone(),
                venda: self.venda.clone(),
                current_month_only: self.current_month,
                best_day_only: self.best_day,
            },
        })
    }
}

/// Log `username` in and open a session over the configured source. Datasets that
/// fail to load are reported here, once.
pub(crate) fn open_session(username: &str) -> Result<Session> {
    let settings = load_settings();
    let identity = auth::login(Path::new(&settings.credentials), username)?;
    let now = Local::now().naive_local();
    let session = Session::start(
        identity,
        warehouse::from_settings(&settings),
        settings.cache_ttl(),
        now.date(),
        now,
    );
    for failure in session.failures() {
        eprintln!("{} {}", "Aviso:".yellow().bold(), failure.message);
    }
    Ok(session)
}
