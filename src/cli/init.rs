use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path, Settings, SourceKind};

pub fn run(
    data_dir: Option<String>,
    source: Option<SourceKind>,
    warehouse: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        let fresh = Settings::for_data_dir(&shellexpand_path(&dir));
        settings.data_dir = fresh.data_dir;
        settings.warehouse = fresh.warehouse;
        settings.credentials = fresh.credentials;
    }
    if let Some(source) = source {
        settings.source = source;
    }
    if let Some(path) = warehouse {
        settings.warehouse = shellexpand_path(&path);
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(settings.exports_dir())?;

    match settings.source {
        SourceKind::Sqlite => {
            // An empty mirror with the expected tables, to be filled by the sync job.
            let conn = get_connection(&PathBuf::from(&settings.warehouse))?;
            init_db(&conn)?;
        }
        SourceKind::Snapshot => std::fs::create_dir_all(&settings.warehouse)?,
    }

    save_settings(&settings)?;
    tracing::info!(data_dir = %resolved.display(), "initialized");
    println!("Painel inicializado em {}", resolved.display());
    Ok(())
}
