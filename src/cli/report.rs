use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::render::format_report;
use crate::cli::{open_session, ControlArgs};
use crate::error::Result;
use crate::export::{ExportFile, ExportFormat};
use crate::reports::Controls;
use crate::settings::load_settings;

pub(crate) fn write_export(file: &ExportFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &file.bytes)?;
    println!("Arquivo salvo em {}", path.display());
    Ok(())
}

pub fn list(user: &str) -> Result<()> {
    let session = open_session(user)?;
    println!("Bem-vindo(a), {}!", session.identity().name);
    let registry = session.registry();
    if registry.is_empty() {
        println!("Nenhum relatório disponível.");
        return Ok(());
    }
    // Row counts use default controls, so the list doubles as a quick overview.
    for (kind, result) in registry.render_all() {
        let status = match result {
            Ok(rendered) => format!("{} registro(s)", rendered.table.len()).dimmed(),
            Err(_) => "erro ao gerar".red(),
        };
        println!(
            "  {} {:<32} {status}",
            format!("{:<18}", kind.key()).cyan(),
            kind.title()
        );
    }
    Ok(())
}

pub fn show(
    name: &str,
    user: &str,
    args: &ControlArgs,
    export: bool,
    output: Option<String>,
    format: ExportFormat,
) -> Result<()> {
    let session = open_session(user)?;
    let def = session.registry().get(name)?;
    let controls = args.to_controls(def.kind().default_window(session.today()), session.today())?;

    if export || output.is_some() {
        let file = def.export(&controls, format)?;
        let path = output
            .map(PathBuf::from)
            .unwrap_or_else(|| load_settings().exports_dir().join(&file.file_name));
        return write_export(&file, &path);
    }

    print!("{}", format_report(&def.render(&controls)?));
    Ok(())
}

/// Export every available report. A report that fails is reported and skipped.
pub fn export_all(user: &str, output_dir: Option<String>, format: ExportFormat) -> Result<()> {
    let session = open_session(user)?;
    let dir = output_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| load_settings().exports_dir());

    let mut failed = 0;
    for def in session.registry().reports() {
        match def.export(&Controls::default(), format) {
            Ok(file) => write_export(&file, &dir.join(&file.file_name))?,
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {e}", "Erro em".red(), def.title());
            }
        }
    }
    if failed > 0 {
        eprintln!("{failed} relatório(s) não exportado(s).");
    }
    Ok(())
}
