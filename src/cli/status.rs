use std::path::Path;

use colored::Colorize;

use crate::auth::load_credentials;
use crate::error::Result;
use crate::settings::{load_settings, SourceKind};
use crate::warehouse::{self, ALL_DATASETS};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let source = match settings.source {
        SourceKind::Sqlite => "sqlite",
        SourceKind::Snapshot => "snapshot",
    };
    let warehouse_path = Path::new(&settings.warehouse);
    let credentials = Path::new(&settings.credentials);

    println!("Dados:        {}", settings.data_dir);
    println!("Fonte:        {source}");
    println!("Warehouse:    {}", warehouse_path.display());
    println!("Credenciais:  {}", credentials.display());
    println!("Cache:        {} min", settings.cache_ttl_minutes);
    println!("Timeout:      {} s", settings.fetch_timeout_secs);
    println!();

    if !warehouse_path.exists() {
        println!("Warehouse não encontrado. Rode `painel demo` ou `painel init`.");
    } else {
        let source = warehouse::from_settings(&settings);
        for kind in ALL_DATASETS {
            match source.fetch(*kind) {
                Ok(table) => println!("  {:<14} {} linha(s)", kind.key(), table.len()),
                Err(e) => println!("  {:<14} {}", kind.key(), e.to_string().red()),
            }
        }
    }
    match load_credentials(credentials) {
        Ok(c) => println!("Usuários:     {}", c.users.len()),
        Err(_) => println!("Sem credenciais. Rode `painel users add` ou `painel demo`."),
    }
    Ok(())
}
