use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::error::{PainelError, Result};
use crate::settings::{Settings, SourceKind};
use crate::table::{Table, Value};

// ---------------------------------------------------------------------------
// Datasets and their fixed queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    Estoque,
    Inadimplencia,
    Contatos,
    Comissoes,
}

pub const ALL_DATASETS: &[DatasetKind] = &[
    DatasetKind::Estoque,
    DatasetKind::Inadimplencia,
    DatasetKind::Contatos,
    DatasetKind::Comissoes,
];

impl DatasetKind {
    /// Table name in the warehouse mirror and file stem for snapshots.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Estoque => "estoque",
            Self::Inadimplencia => "inadimplencia",
            Self::Contatos => "contatos",
            Self::Comissoes => "comissoes",
        }
    }

    /// Raw columns, in query order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Estoque => &[
                "n_da_nota",
                "valor_da_nota",
                "data_cotada",
                "cliente",
                "vendedor",
                "empresa",
                "produto",
                "caracteristica",
                "cotado",
                "estoque",
                "pos_cotacao",
            ],
            Self::Inadimplencia => &[
                "codigo_parceiro",
                "nome_parceiro",
                "vendedor",
                "data_de_vencimento",
                "numero_da_nota",
                "valor_da_nota",
                "descricao_oper",
                "numero_parcela",
                "tipo_de_titulo",
                "dias_vencidos",
                "valor_parcela",
            ],
            Self::Contatos => &[
                "codparc",
                "apelido",
                "nomeparc",
                "telemarketing_feito",
                "cotacao_feita",
                "contactou_ou_nao",
                "ult_tele",
                "ult_cotacao",
                "ult_venda",
                "venda_feita",
                "melhor_dia",
            ],
            Self::Comissoes => &[
                "vendedor",
                "numero_da_nota",
                "nome_parceiro",
                "data_da_baixa",
                "valor_da_nota",
                "valor_comissao",
            ],
        }
    }

    pub fn query(&self) -> String {
        format!("SELECT {} FROM {}", self.columns().join(", "), self.key())
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Read-only access to the warehouse: one fixed query per dataset.
pub trait DataSource {
    fn describe(&self) -> String;
    fn fetch(&self, kind: DatasetKind) -> Result<Table>;
}

pub fn from_settings(settings: &Settings) -> Box<dyn DataSource> {
    let path = PathBuf::from(&settings.warehouse);
    match settings.source {
        SourceKind::Sqlite => Box::new(SqliteWarehouse::new(
            path,
            Duration::from_secs(settings.fetch_timeout_secs),
        )),
        SourceKind::Snapshot => Box::new(SnapshotDir::new(path)),
    }
}

fn fetch_error(kind: DatasetKind, reason: impl ToString) -> PainelError {
    PainelError::Fetch {
        dataset: kind.key().to_string(),
        reason: reason.to_string(),
    }
}

/// Local SQLite mirror of the warehouse.
pub struct SqliteWarehouse {
    path: PathBuf,
    timeout: Duration,
}

impl SqliteWarehouse {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }

    fn open(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(PainelError::Settings(format!(
                "warehouse não encontrado: {} (rode `painel demo` ou `painel init`)",
                self.path.display()
            )));
        }
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        // A locked database must fail visibly instead of blocking forever.
        conn.busy_timeout(self.timeout)?;
        Ok(conn)
    }
}

impl DataSource for SqliteWarehouse {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn fetch(&self, kind: DatasetKind) -> Result<Table> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&kind.query()).map_err(|e| fetch_error(kind, e))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut table = Table::new(kind.key(), columns);

        let mut rows = stmt.query([]).map_err(|e| fetch_error(kind, e))?;
        while let Some(row) = rows.next().map_err(|e| fetch_error(kind, e))? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(n) => Value::Int(n),
                    ValueRef::Real(f) => Value::Float(f),
                    ValueRef::Text(bytes) => {
                        Value::Text(String::from_utf8_lossy(bytes).into_owned())
                    }
                    ValueRef::Blob(_) => {
                        return Err(fetch_error(kind, format!("coluna {i} contém dados binários")))
                    }
                });
            }
            table.push_row(values)?;
        }
        tracing::debug!(dataset = kind.key(), rows = table.len(), "fetched from sqlite");
        Ok(table)
    }
}

/// Directory holding one `<dataset>.csv` (or `.xlsx`) export per dataset.
pub struct SnapshotDir {
    dir: PathBuf,
}

impl SnapshotDir {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DataSource for SnapshotDir {
    fn describe(&self) -> String {
        format!("snapshot:{}", self.dir.display())
    }

    fn fetch(&self, kind: DatasetKind) -> Result<Table> {
        let csv_path = self.dir.join(format!("{}.csv", kind.key()));
        if csv_path.exists() {
            return read_csv(kind, &csv_path);
        }
        #[cfg(feature = "xlsx")]
        {
            let xlsx_path = self.dir.join(format!("{}.xlsx", kind.key()));
            if xlsx_path.exists() {
                return read_xlsx(kind, &xlsx_path);
            }
        }
        Err(fetch_error(
            kind,
            format!("nenhum arquivo {}.csv em {}", kind.key(), self.dir.display()),
        ))
    }
}

/// Exports from Brazilian spreadsheets use `;` because `,` is the decimal mark.
fn sniff_delimiter(header: &str) -> u8 {
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

fn read_csv(kind: DatasetKind, path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    let header = content.lines().next().unwrap_or_default();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(header))
        .from_reader(content.as_bytes());

    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut table = Table::new(kind.key(), columns);
    for result in rdr.records() {
        let record = result?;
        let row = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Value::Null
                } else {
                    Value::text(field)
                }
            })
            .collect();
        table.push_row(row)?;
    }
    tracing::debug!(dataset = kind.key(), rows = table.len(), "fetched from csv snapshot");
    Ok(table)
}

#[cfg(feature = "xlsx")]
fn xlsx_cell(cell: &calamine::Data) -> Value {
    use calamine::Data;

    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => Value::text(s.as_str()),
        Data::Bool(b) => Value::text(if *b { "Sim" } else { "Não" }),
        Data::DateTime(dt) => crate::fmt::excel_serial_to_date(dt.as_f64())
            .map(Value::Date)
            .unwrap_or(Value::Null),
        other => Value::text(other.to_string()),
    }
}

#[cfg(feature = "xlsx")]
fn read_xlsx(kind: DatasetKind, path: &Path) -> Result<Table> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| fetch_error(kind, "planilha sem abas"))??;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(Table::with_columns(kind.key(), kind.columns())),
    };
    let mut table = Table::new(kind.key(), columns);
    for row in rows {
        table.push_row(row.iter().map(xlsx_cell).collect())?;
    }
    tracing::debug!(dataset = kind.key(), rows = table.len(), "fetched from xlsx snapshot");
    Ok(table)
}
