use std::path::PathBuf;

use chrono::Local;
use comfy_table::{Cell, Table};

use crate::auth::{demo_credentials, save_credentials};
use crate::db::{get_connection, init_db, seed_demo};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, SourceKind};

/// Build a demo warehouse dated around today and the matching demo users, then point
/// the settings at them.
pub fn run() -> Result<()> {
    let mut settings = load_settings();
    let data_dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let warehouse = data_dir.join("warehouse.db");
    let conn = get_connection(&warehouse)?;
    init_db(&conn)?;
    seed_demo(&conn, Local::now().date_naive())?;
    drop(conn);

    let credentials = data_dir.join("credentials.json");
    save_credentials(&credentials, &demo_credentials())?;

    settings.source = SourceKind::Sqlite;
    settings.warehouse = warehouse.to_string_lossy().to_string();
    settings.credentials = credentials.to_string_lossy().to_string();
    save_settings(&settings)?;

    let mut table = Table::new();
    table.set_header(vec!["Usuário", "Senha", "Perfil"]);
    for (user, role) in [
        ("ana", "Vendedor"),
        ("bruno", "Vendedor"),
        ("carla", "Vendedor"),
        ("gerencia", "Gerência"),
    ] {
        table.add_row(vec![Cell::new(user), Cell::new(format!("{user}123")), Cell::new(role)]);
    }
    println!("Dados de demonstração criados em {}", data_dir.display());
    println!("{table}");
    println!("Experimente: painel report estoque --user ana");
    Ok(())
}
