use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::Local;
use colored::Colorize;

use crate::cli::open_session;
use crate::cli::parse_date_arg;
use crate::cli::render::{format_controls, format_report};
use crate::error::{PainelError, Result};
use crate::export::ExportFormat;
use crate::models::DateWindow;
use crate::reports::Controls;
use crate::session::Session;
use crate::settings::load_settings;

const HELP: &str = "\
Comandos:
  lista                      relatórios disponíveis
  abrir <nome|número>        seleciona e mostra um relatório
  controles                  controles do relatório aberto
  periodo <de> <ate>         altera o período (DD/MM/AAAA)
  vendedor|telemarketing|cotacao|venda [valor]
                             filtro de gerência; sem valor limpa o filtro
  melhor-dia | mes-atual     liga/desliga o filtro
  limpar                     volta aos controles padrão
  exportar [xlsx|csv]        salva o relatório aberto
  recarregar                 busca os dados novamente
  sair
";

/// Interactive page browser. The open report and its control values live here and
/// in the session, never in globals.
pub struct Shell {
    session: Session,
    controls: Controls,
    exports_dir: PathBuf,
}

fn no_selection() -> PainelError {
    PainelError::Other("nenhum relatório aberto (use: abrir <nome>)".into())
}

impl Shell {
    pub fn new(session: Session, exports_dir: PathBuf) -> Self {
        Self {
            session,
            controls: Controls::default(),
            exports_dir,
        }
    }

    fn list(&self) -> String {
        let selected = self.session.selected().map(|d| d.kind());
        let mut out = String::new();
        for (i, def) in self.session.registry().reports().iter().enumerate() {
            let marker = if Some(def.kind()) == selected { "*" } else { " " };
            out.push_str(&format!("{marker} {}. {} ({})\n", i + 1, def.title(), def.kind().key()));
        }
        if out.is_empty() {
            out.push_str("Nenhum relatório disponível.\n");
        }
        out
    }

    fn show(&self) -> Result<String> {
        Ok(format_report(&self.session.render_selected(&self.controls)?))
    }

    fn open(&mut self, arg: &str) -> Result<String> {
        let name = match arg.parse::<usize>() {
            Ok(n) if n >= 1 => self
                .session
                .registry()
                .reports()
                .get(n - 1)
                .map(|d| d.kind().key().to_string())
                .unwrap_or_else(|| arg.to_string()),
            _ => arg.to_string(),
        };
        self.session.select(&name)?;
        self.controls = Controls::default();
        self.show()
    }

    fn set_period(&mut self, args: &[&str]) -> Result<String> {
        let [from, to] = args else {
            return Err(PainelError::Other("uso: periodo <de> <ate>".into()));
        };
        let def = self.session.selected().ok_or_else(no_selection)?;
        if def.kind().default_window(self.session.today()).is_none() {
            return Err(PainelError::Other(format!("'{}' não tem período", def.title())));
        }
        let window = DateWindow::new(parse_date_arg("de", from)?, parse_date_arg("ate", to)?)?;
        self.controls.window = Some(window);
        self.show()
    }

    fn set_filter(&mut self, key: &str, value: &str) -> Result<String> {
        self.session.selected().ok_or_else(no_selection)?;
        if !self.session.identity().is_management() {
            return Err(PainelError::Other("filtro disponível apenas para Gerência".into()));
        }
        let value = (!value.is_empty()).then(|| value.to_string());
        let filters = &mut self.controls.filters;
        match key {
            "vendedor" => filters.vendedor = value,
            "telemarketing" => filters.telemarketing = value,
            "cotacao" => filters.cotacao = value,
            _ => filters.venda = value,
        }
        self.show()
    }

    fn export(&self, format: Option<&str>) -> Result<String> {
        let format = match format {
            None | Some("xlsx") => ExportFormat::Xlsx,
            Some("csv") => ExportFormat::Csv,
            Some(other) => return Err(PainelError::Other(format!("formato desconhecido: {other}"))),
        };
        let def = self.session.selected().ok_or_else(no_selection)?;
        let file = def.export(&self.controls, format)?;
        std::fs::create_dir_all(&self.exports_dir)?;
        let path = self.exports_dir.join(&file.file_name);
        std::fs::write(&path, &file.bytes)?;
        Ok(format!("Arquivo salvo em {}\n", path.display()))
    }

    fn reload(&mut self) -> String {
        self.session.reload(Local::now().naive_local());
        let mut out = format!("Dados recarregados de {}.\n", self.session.source_description());
        for failure in self.session.failures() {
            out.push_str(&format!("Aviso: {}\n", failure.message));
        }
        out
    }

    /// Run one command line. `Ok(None)` means the user asked to leave.
    pub fn handle(&mut self, line: &str) -> Result<Option<String>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(Some(String::new()));
        };
        let rest = args.join(" ");
        // Datasets past their TTL are fetched again before anything is shown.
        self.session.refresh(Local::now().naive_local());
        let out = match command {
            "sair" | "q" => return Ok(None),
            "ajuda" | "?" => HELP.to_string(),
            "lista" => self.list(),
            "abrir" if !rest.is_empty() => self.open(&rest)?,
            "abrir" => return Err(PainelError::Other("uso: abrir <nome|número>".into())),
            "controles" => {
                let def = self.session.selected().ok_or_else(no_selection)?;
                format_controls(&def.controls()?)
            }
            "periodo" => self.set_period(args)?,
            "vendedor" | "telemarketing" | "cotacao" | "venda" => self.set_filter(command, &rest)?,
            "melhor-dia" => {
                self.session.selected().ok_or_else(no_selection)?;
                self.controls.filters.best_day_only = !self.controls.filters.best_day_only;
                self.show()?
            }
            "mes-atual" => {
                self.session.selected().ok_or_else(no_selection)?;
                let filters = &mut self.controls.filters;
                filters.current_month_only = !filters.current_month_only;
                self.show()?
            }
            "limpar" => {
                self.controls = Controls::default();
                self.show()?
            }
            "exportar" => self.export(args.first().copied())?,
            "recarregar" => self.reload(),
            other => {
                return Err(PainelError::Other(format!(
                    "comando desconhecido: {other} (digite ajuda)"
                )))
            }
        };
        Ok(Some(out))
    }
}

pub fn run(user: &str) -> Result<()> {
    let session = open_session(user)?;
    let mut shell = Shell::new(session, load_settings().exports_dir());

    println!("Bem-vindo(a), {}!", shell.session.identity().name.bold());
    print!("{}", shell.list());
    println!("Digite {} para ver os comandos.", "ajuda".cyan());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", "painel>".green());
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        match shell.handle(&line?) {
            Ok(Some(out)) => print!("{out}"),
            Ok(None) => break,
            Err(e) => eprintln!("{} {e}", "Erro:".red()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db;
    use crate::models::Identity;
    use crate::warehouse::SqliteWarehouse;

    fn shell_for(who: Identity) -> (tempfile::TempDir, Shell) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse.db");
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let conn = db::get_connection(&path).unwrap();
        db::init_db(&conn).unwrap();
        db::seed_demo(&conn, today).unwrap();
        drop(conn);

        let source = SqliteWarehouse::new(path, std::time::Duration::from_secs(1));
        let now = today.and_hms_opt(9, 0, 0).unwrap();
        let session = Session::start(
            who,
            Box::new(source),
            chrono::Duration::minutes(10),
            today,
            now,
        );
        let exports = dir.path().join("exports");
        (dir, Shell::new(session, exports))
    }

    #[test]
    fn test_open_by_number_and_name() {
        let (_dir, mut shell) = shell_for(Identity::management());
        let out = shell.handle("abrir 2").unwrap().unwrap();
        assert!(out.contains("Relatório de Inadimplência"));
        let out = shell.handle("abrir Resumo de Contatos").unwrap().unwrap();
        assert!(out.contains("% Contatado"));
        assert!(shell.handle("lista").unwrap().unwrap().contains("* 4. Resumo de Contatos"));
    }

    #[test]
    fn test_commands_need_selection() {
        let (_dir, mut shell) = shell_for(Identity::salesperson("Ana"));
        assert!(shell.handle("controles").is_err());
        assert!(shell.handle("exportar").is_err());
        assert!(shell.handle("melhor-dia").is_err());
    }

    #[test]
    fn test_salesperson_cannot_filter_or_open_management_report() {
        let (_dir, mut shell) = shell_for(Identity::salesperson("Ana"));
        shell.handle("abrir estoque").unwrap();
        assert!(shell.handle("vendedor BRUNO").is_err());
        let err = shell.handle("abrir resumo-contatos").unwrap_err();
        assert!(matches!(err, PainelError::ReportUnavailable(_)));
    }

    #[test]
    fn test_period_and_reset() {
        let (_dir, mut shell) = shell_for(Identity::management());
        shell.handle("abrir estoque").unwrap();
        shell.handle("periodo 14/06/2024 14/06/2024").unwrap();
        assert!(shell.controls.window.is_some());
        assert!(shell.handle("periodo 15/06/2024 01/06/2024").is_err());
        shell.handle("limpar").unwrap();
        assert_eq!(shell.controls, Controls::default());
        shell.handle("abrir contatos").unwrap();
        assert!(shell.handle("periodo 01/06/2024 14/06/2024").is_err());
    }

    #[test]
    fn test_filter_set_and_clear() {
        let (_dir, mut shell) = shell_for(Identity::management());
        shell.handle("abrir contatos").unwrap();
        shell.handle("vendedor BRUNO").unwrap();
        assert_eq!(shell.controls.filters.vendedor.as_deref(), Some("BRUNO"));
        shell.handle("vendedor").unwrap();
        assert_eq!(shell.controls.filters.vendedor, None);
        shell.handle("melhor-dia").unwrap();
        assert!(shell.controls.filters.best_day_only);
    }

    #[test]
    fn test_export_writes_file() {
        let (dir, mut shell) = shell_for(Identity::salesperson("Bruno"));
        shell.handle("abrir comissoes").unwrap();
        let out = shell.handle("exportar csv").unwrap().unwrap();
        assert!(out.contains("relatorio-de-comissoes-2024-06-14.csv"));
        assert!(dir.path().join("exports").join("relatorio-de-comissoes-2024-06-14.csv").exists());
    }

    #[test]
    fn test_quit_and_unknown() {
        let (_dir, mut shell) = shell_for(Identity::management());
        assert!(shell.handle("").unwrap().unwrap().is_empty());
        assert!(shell.handle("dançar").is_err());
        assert!(shell.handle("sair").unwrap().is_none());
    }
}
