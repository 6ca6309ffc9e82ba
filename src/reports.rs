use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::export::{self, ExportFile, ExportFormat};
use crate::models::{last_day_of_previous_month, months_back, DateWindow, Identity, MANAGEMENT};
use crate::table::Table;
use crate::transforms::{self, Filters};
use crate::warehouse::DatasetKind;

/// The report pages. Each variant fixes its dataset, title, default window and
/// transform; dispatch is a `match`, not a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Estoque,
    Inadimplencia,
    Contatos,
    ResumoContatos,
    Comissoes,
    ComissoesMensais,
}

/// Registration order, which is also the listing order.
pub const ALL_REPORTS: &[ReportKind] = &[
    ReportKind::Estoque,
    ReportKind::Inadimplencia,
    ReportKind::Contatos,
    ReportKind::ResumoContatos,
    ReportKind::Comissoes,
    ReportKind::ComissoesMensais,
];

impl ReportKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Estoque => "Cotações com falta de Estoque",
            Self::Inadimplencia => "Relatório de Inadimplência",
            Self::Contatos => "Relatório de Contatos",
            Self::ResumoContatos => "Resumo de Contatos",
            Self::Comissoes => "Relatório de Comissões",
            Self::ComissoesMensais => "Comissões por Mês",
        }
    }

    /// Short name accepted on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Estoque => "estoque",
            Self::Inadimplencia => "inadimplencia",
            Self::Contatos => "contatos",
            Self::ResumoContatos => "resumo-contatos",
            Self::Comissoes => "comissoes",
            Self::ComissoesMensais => "comissoes-mes",
        }
    }

    /// What the summary line calls this report.
    fn subject(&self) -> &'static str {
        match self {
            Self::Estoque => "relatório de estoque",
            Self::Inadimplencia => "relatório de inadimplência",
            Self::Contatos => "relatório de contatos",
            Self::ResumoContatos => "resumo de contatos por vendedor",
            Self::Comissoes => "relatório de comissões",
            Self::ComissoesMensais => "relatório de comissões por mês",
        }
    }

    pub fn dataset(&self) -> DatasetKind {
        match self {
            Self::Estoque => DatasetKind::Estoque,
            Self::Inadimplencia => DatasetKind::Inadimplencia,
            Self::Contatos | Self::ResumoContatos => DatasetKind::Contatos,
            Self::Comissoes | Self::ComissoesMensais => DatasetKind::Comissoes,
        }
    }

    fn salesperson_column(&self) -> &'static str {
        match self.dataset() {
            DatasetKind::Contatos => "apelido",
            _ => "vendedor",
        }
    }

    /// Roles (or display names) allowed to see the report; `None` means everyone.
    pub fn allowed(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::ResumoContatos => Some(&[MANAGEMENT]),
            _ => None,
        }
    }

    /// Initial value of the date-range control, for reports that have one.
    pub fn default_window(&self, today: NaiveDate) -> Option<DateWindow> {
        match self {
            Self::Estoque => Some(DateWindow::trailing_days(today, 30)),
            Self::Inadimplencia => DateWindow::new(
                today - chrono::Duration::days(180),
                last_day_of_previous_month(today),
            )
            .ok(),
            Self::Comissoes => DateWindow::new(months_back(today, 1), today).ok(),
            Self::Contatos | Self::ResumoContatos | Self::ComissoesMensais => None,
        }
    }

    /// Title, key, or anything that slugifies to the title.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        name == self.title()
            || name == self.key()
            || export::slugify(name) == export::slugify(self.title())
    }
}

/// Control values for one render. Unset fields fall back to the report defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controls {
    pub window: Option<DateWindow>,
    pub filters: Filters,
}

/// A widget the shell should offer for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    DateRange {
        label: &'static str,
        default: DateWindow,
    },
    Select {
        key: &'static str,
        label: &'static str,
        options: Vec<String>,
    },
    Toggle {
        key: &'static str,
        label: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub kind: ReportKind,
    pub title: String,
    pub summary: String,
    pub table: Table,
}

/// A report bound to its session's dataset, viewer and date. Cheap to build; every
/// render re-runs the transform over the shared table.
#[derive(Debug, Clone)]
pub struct ReportDefinition {
    kind: ReportKind,
    data: Arc<Table>,
    identity: Identity,
    today: NaiveDate,
}

impl ReportDefinition {
    pub fn new(kind: ReportKind, data: Arc<Table>, identity: &Identity, today: NaiveDate) -> Self {
        Self {
            kind,
            data,
            identity: identity.clone(),
            today,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    pub fn controls(&self) -> Result<Vec<Control>> {
        let mut out = Vec::new();
        if let Some(default) = self.kind.default_window(self.today) {
            out.push(Control::DateRange {
                label: "Período",
                default,
            });
        }
        if self.identity.is_management() {
            out.push(Control::Select {
                key: "vendedor",
                label: "Vendedor",
                options: self.data.distinct(self.kind.salesperson_column())?,
            });
            if self.kind == ReportKind::Contatos {
                for (key, label, column) in [
                    ("telemarketing", "Fez telemarketing?", "telemarketing_feito"),
                    ("cotacao", "Cotou?", "cotacao_feita"),
                    ("venda", "Vendeu?", "venda_feita"),
                ] {
                    out.push(Control::Select {
                        key,
                        label,
                        options: self.data.distinct(column)?,
                    });
                }
            }
        }
        match self.kind {
            ReportKind::Contatos => out.push(Control::Toggle {
                key: "melhor-dia",
                label: "Somente clientes com melhor dia hoje",
            }),
            ReportKind::Comissoes => out.push(Control::Toggle {
                key: "mes-atual",
                label: "Somente mês atual",
            }),
            _ => {}
        }
        Ok(out)
    }

    fn window(&self, controls: &Controls) -> DateWindow {
        controls
            .window
            .or_else(|| self.kind.default_window(self.today))
            .unwrap_or_else(|| DateWindow::single_day(self.today))
    }

    pub fn transform(&self, controls: &Controls) -> Result<Table> {
        let (who, filters, today) = (&self.identity, &controls.filters, self.today);
        match self.kind {
            ReportKind::Estoque => {
                transforms::estoque(&self.data, self.window(controls), who, filters)
            }
            ReportKind::Inadimplencia => {
                transforms::inadimplencia(&self.data, self.window(controls), who, filters)
            }
            ReportKind::Contatos => transforms::contatos(&self.data, who, filters, today),
            ReportKind::ResumoContatos => transforms::resumo_contatos(&self.data, who, filters),
            ReportKind::Comissoes => {
                transforms::comissoes(&self.data, self.window(controls), who, filters, today)
            }
            ReportKind::ComissoesMensais => {
                transforms::comissoes_mensais(&self.data, who, filters, today)
            }
        }
    }

    pub fn summary(&self) -> String {
        if self.identity.is_management() {
            format!("Abaixo está o {} em nível gerencial:", self.kind.subject())
        } else {
            format!(
                "Abaixo está o {} para a vendedora {}:",
                self.kind.subject(),
                self.identity.name
            )
        }
    }

    pub fn render(&self, controls: &Controls) -> Result<RenderedReport> {
        let table = self.transform(controls)?;
        Ok(RenderedReport {
            kind: self.kind,
            title: self.title().to_string(),
            summary: self.summary(),
            table,
        })
    }

    /// Encode exactly what [`ReportDefinition::render`] shows for these controls.
    pub fn export(&self, controls: &Controls, format: ExportFormat) -> Result<ExportFile> {
        let rendered = self.render(controls)?;
        let bytes = export::encode(&rendered.table, format)?;
        let file_name = export::file_name(self.title(), self.today, format);
        tracing::info!(
            report = self.kind.key(),
            file = %file_name,
            rows = rendered.table.len(),
            "report exported"
        );
        Ok(ExportFile { file_name, bytes })
    }
}
