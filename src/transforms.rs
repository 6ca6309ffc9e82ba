//! Pure transforms from raw warehouse tables to display tables.
//!
//! Every function takes the raw table by reference and returns a new table, so the
//! same input always yields the same output and the cached dataset is never touched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::Result;
use crate::fmt::money_br;
use crate::models::{first_day_of_month, months_back, DateWindow, Identity};
use crate::table::{Table, Value};
use crate::warehouse::DatasetKind;

pub const CONTACTED: &str = "Contactou";
pub const NOT_CONTACTED: &str = "Não contactou";
pub const YES: &str = "Sim";

/// Months covered by the commission pivot, including the current one.
pub const COMMISSION_MONTHS: u32 = 6;

// ---------------------------------------------------------------------------
// Display labels
// ---------------------------------------------------------------------------

pub const ESTOQUE_LABELS: &[(&str, &str)] = &[
    ("n_da_nota", "N. da Nota"),
    ("valor_da_nota", "Valor da Nota(R$)"),
    ("data_cotada", "Data Cotada"),
    ("cliente", "Cliente"),
    ("vendedor", "Vendedor"),
    ("empresa", "Empresa"),
    ("produto", "Produto"),
    ("caracteristica", "Característica"),
    ("cotado", "Cotado"),
    ("estoque", "Estoque"),
    ("pos_cotacao", "Pós-Cotação"),
];

pub const INADIMPLENCIA_LABELS: &[(&str, &str)] = &[
    ("codigo_parceiro", "Código Parceiro"),
    ("nome_parceiro", "Nome Parceiro"),
    ("vendedor", "Vendedor"),
    ("data_de_vencimento", "Data de Vencimento"),
    ("numero_da_nota", "N. da Nota"),
    ("valor_da_nota", "Valor da Nota(R$)"),
    ("descricao_oper", "Descrição da Operação"),
    ("numero_parcela", "N. da Parcela"),
    ("tipo_de_titulo", "Tipo de Título"),
    ("dias_vencidos", "Dias Vencidos"),
    ("valor_parcela", "Valor da Parcela(R$)"),
];

pub const CONTATOS_LABELS: &[(&str, &str)] = &[
    ("codparc", "Código Parceiro"),
    ("apelido", "Vendedor"),
    ("nomeparc", "Nome do Parceiro"),
    ("telemarketing_feito", "Fez telemarketing?"),
    ("cotacao_feita", "Cotou?"),
    ("contactou_ou_nao", "Fez contato esse mês?"),
    ("ult_tele", "Último Telemarketing"),
    ("ult_cotacao", "Última Cotação"),
    ("ult_venda", "Última Venda"),
    ("venda_feita", "Vendeu?"),
    ("melhor_dia", "Melhor Dia"),
];

pub const COMISSOES_LABELS: &[(&str, &str)] = &[
    ("vendedor", "Vendedor"),
    ("numero_da_nota", "N. da Nota"),
    ("nome_parceiro", "Nome Parceiro"),
    ("data_da_baixa", "Data da Baixa"),
    ("valor_da_nota", "Valor da Nota(R$)"),
    ("valor_comissao", "Comissão(R$)"),
];

pub const RESUMO_LABELS: &[(&str, &str)] = &[
    ("vendedor", "Vendedor"),
    ("carteira", "Carteira"),
    ("contatos", "Contatos Feitos"),
    ("telemarketing", "Telemarketing Feito"),
    ("cotacoes", "Cotações Feitas"),
    ("vendas", "Vendas Feitas"),
    ("restantes", "Contatos Restantes"),
    ("pct", "% Contatado"),
];

/// Optional selector filters and toggles. Selects only apply to management; a
/// salesperson is always scoped to their own rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub vendedor: Option<String>,
    pub telemarketing: Option<String>,
    pub cotacao: Option<String>,
    pub venda: Option<String>,
    pub current_month_only: bool,
    pub best_day_only: bool,
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

fn parse_dates(table: &Table, columns: &[&str]) -> Result<Table> {
    let mut out = table.clone();
    for column in columns {
        out = out.map_column(column, |row, v| {
            Ok(v.to_date(column, row)?.map(Value::Date).unwrap_or(Value::Null))
        })?;
    }
    Ok(out)
}

fn parse_numbers(table: &Table, columns: &[&str]) -> Result<Table> {
    let mut out = table.clone();
    for column in columns {
        out = out.map_column(column, |row, v| {
            Ok(v.to_f64(column, row)?.map(Value::Float).unwrap_or(Value::Null))
        })?;
    }
    Ok(out)
}

fn parse_integers(table: &Table, columns: &[&str]) -> Result<Table> {
    let mut out = table.clone();
    for column in columns {
        out = out.map_column(column, |row, v| {
            Ok(v.to_i64(column, row)?.map(Value::Int).unwrap_or(Value::Null))
        })?;
    }
    Ok(out)
}

fn as_identifiers(table: &Table, columns: &[&str]) -> Result<Table> {
    let mut out = table.clone();
    for column in columns {
        out = out.map_column(column, |_, v| Ok(v.to_identifier()))?;
    }
    Ok(out)
}

fn format_money(table: &Table, columns: &[&str]) -> Result<Table> {
    let mut out = table.clone();
    for column in columns {
        out = out.map_column(column, |_, v| {
            Ok(match v {
                Value::Float(f) => Value::Text(money_br(*f)),
                Value::Int(i) => Value::Text(money_br(*i as f64)),
                other => other.clone(),
            })
        })?;
    }
    Ok(out)
}

/// Rows whose (already parsed) date column falls inside the window. Rows with no
/// date are outside every window.
fn in_window(table: &Table, column: &str, window: DateWindow) -> Result<Table> {
    let idx = table.column_index(column)?;
    Ok(table.filter(|r| matches!(r[idx], Value::Date(d) if window.contains(d))))
}

fn on_or_after(table: &Table, column: &str, since: NaiveDate) -> Result<Table> {
    let idx = table.column_index(column)?;
    Ok(table.filter(|r| matches!(r[idx], Value::Date(d) if d >= since)))
}

/// Role scoping: management sees everything (narrowed by the optional salesperson
/// select); anyone else sees only their own rows, without the salesperson column.
fn scope(table: &Table, column: &str, who: &Identity, vendedor: Option<&str>) -> Result<Table> {
    if who.is_management() {
        return table.filter_eq(column, vendedor);
    }
    let idx = table.column_index(column)?;
    table
        .filter(|r| r[idx].as_str().is_some_and(|v| who.matches_salesperson(v)))
        .drop_columns(&[column])
}

pub fn weekday_pt(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Segunda",
        Weekday::Tue => "Terça",
        Weekday::Wed => "Quarta",
        Weekday::Thu => "Quinta",
        Weekday::Fri => "Sexta",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

fn normalize_weekday(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .trim_end_matches("-feira")
        .trim_end_matches(" feira")
        .replace('ç', "c")
        .replace('á', "a")
}

fn is_best_day(value: &Value, today: NaiveDate) -> bool {
    value
        .as_str()
        .is_some_and(|v| normalize_weekday(v) == normalize_weekday(weekday_pt(today)))
}

// ---------------------------------------------------------------------------
// Inventory shortfalls
// ---------------------------------------------------------------------------

/// Quotes in the window whose quantity exceeded stock (`pos_cotacao < 0`).
pub fn estoque(
    raw: &Table,
    window: DateWindow,
    who: &Identity,
    filters: &Filters,
) -> Result<Table> {
    raw.require(DatasetKind::Estoque.columns())?;
    let t = parse_dates(raw, &["data_cotada"])?;
    let t = parse_numbers(&t, &["valor_da_nota", "cotado", "estoque", "pos_cotacao"])?;
    let t = in_window(&t, "data_cotada", window)?;

    let pos = t.column_index("pos_cotacao")?;
    let t = t.filter(|r| matches!(r[pos], Value::Float(v) if v < 0.0));

    let t = scope(&t, "vendedor", who, filters.vendedor.as_deref())?;
    let t = format_money(&t, &["valor_da_nota", "cotado", "estoque", "pos_cotacao"])?;
    let t = as_identifiers(&t, &["n_da_nota"])?;
    t.relabel(ESTOQUE_LABELS)
}

// ---------------------------------------------------------------------------
// Overdue receivables
// ---------------------------------------------------------------------------

pub fn inadimplencia(
    raw: &Table,
    window: DateWindow,
    who: &Identity,
    filters: &Filters,
) -> Result<Table> {
    raw.require(DatasetKind::Inadimplencia.columns())?;
    let t = parse_dates(raw, &["data_de_vencimento"])?;
    let t = parse_numbers(&t, &["valor_da_nota", "valor_parcela"])?;
    let t = parse_integers(&t, &["dias_vencidos", "numero_parcela"])?;
    let t = in_window(&t, "data_de_vencimento", window)?;

    let t = t.drop_columns(&["valor_da_nota"])?;
    let t = scope(&t, "vendedor", who, filters.vendedor.as_deref())?;
    let t = format_money(&t, &["valor_parcela"])?;
    let t = as_identifiers(&t, &["codigo_parceiro", "numero_da_nota"])?;
    t.relabel(INADIMPLENCIA_LABELS)
}

// ---------------------------------------------------------------------------
// Customer contacts
// ---------------------------------------------------------------------------

/// Salespeople get their own customers not yet contacted this month; management
/// gets the whole portfolio narrowed by the status selects.
pub fn contatos(raw: &Table, who: &Identity, filters: &Filters, today: NaiveDate) -> Result<Table> {
    raw.require(DatasetKind::Contatos.columns())?;
    let t = parse_dates(raw, &["ult_tele", "ult_cotacao", "ult_venda"])?;
    let t = as_identifiers(&t, &["codparc"])?;

    let t = if filters.best_day_only {
        let idx = t.column_index("melhor_dia")?;
        t.filter(|r| is_best_day(&r[idx], today))
    } else {
        t
    };

    let t = if who.is_management() {
        t.filter_eq("apelido", filters.vendedor.as_deref())?
            .filter_eq("telemarketing_feito", filters.telemarketing.as_deref())?
            .filter_eq("cotacao_feita", filters.cotacao.as_deref())?
            .filter_eq("venda_feita", filters.venda.as_deref())?
    } else {
        let status = t.column_index("contactou_ou_nao")?;
        let t = t.filter(|r| r[status].eq_filter(NOT_CONTACTED));
        scope(&t, "apelido", who, None)?.drop_columns(&[
            "cotacao_feita",
            "telemarketing_feito",
            "contactou_ou_nao",
            "venda_feita",
        ])?
    };
    t.relabel(CONTATOS_LABELS)
}

#[derive(Debug, Default, Clone, Copy)]
struct ContactCounts {
    portfolio: i64,
    contacts: i64,
    telemarketing: i64,
    quotes: i64,
    sales: i64,
}

/// Per-salesperson progress over the contact portfolio, best coverage first.
pub fn resumo_contatos(raw: &Table, who: &Identity, filters: &Filters) -> Result<Table> {
    raw.require(DatasetKind::Contatos.columns())?;
    let t = if who.is_management() {
        raw.filter_eq("apelido", filters.vendedor.as_deref())?
    } else {
        let idx = raw.column_index("apelido")?;
        raw.filter(|r| r[idx].as_str().is_some_and(|v| who.matches_salesperson(v)))
    };

    let seller = t.column_index("apelido")?;
    let contacted = t.column_index("contactou_ou_nao")?;
    let tele = t.column_index("telemarketing_feito")?;
    let quoted = t.column_index("cotacao_feita")?;
    let sold = t.column_index("venda_feita")?;

    let mut groups: BTreeMap<String, ContactCounts> = BTreeMap::new();
    // Customers with no salesperson assigned belong to nobody's portfolio.
    for row in t.rows() {
        let name = row[seller].to_string();
        if name.trim().is_empty() {
            continue;
        }
        let c = groups.entry(name).or_default();
        c.portfolio += 1;
        c.contacts += row[contacted].eq_filter(CONTACTED) as i64;
        c.telemarketing += row[tele].eq_filter(YES) as i64;
        c.quotes += row[quoted].eq_filter(YES) as i64;
        c.sales += row[sold].eq_filter(YES) as i64;
    }

    let raw_columns: Vec<&str> = RESUMO_LABELS.iter().map(|(raw, _)| *raw).collect();
    let mut out = Table::with_columns(t.name(), &raw_columns);
    for (vendedor, c) in &groups {
        let pct = c.contacts as f64 / c.portfolio as f64 * 100.0;
        out.push_row(vec![
            Value::text(vendedor.as_str()),
            Value::Int(c.portfolio),
            Value::Int(c.contacts),
            Value::Int(c.telemarketing),
            Value::Int(c.quotes),
            Value::Int(c.sales),
            Value::Int(c.portfolio - c.contacts),
            Value::Float(pct),
        ])?;
    }
    let pct = out.column_index("pct")?;
    let out = out.sort_by(|a, b| b[pct].compare(&a[pct]).then_with(|| a[0].compare(&b[0])));

    let out = if who.is_management() {
        out
    } else {
        out.drop_columns(&["vendedor"])?
    };
    out.relabel(RESUMO_LABELS)
}

// ---------------------------------------------------------------------------
// Commissions
// ---------------------------------------------------------------------------

pub fn comissoes(
    raw: &Table,
    window: DateWindow,
    who: &Identity,
    filters: &Filters,
    today: NaiveDate,
) -> Result<Table> {
    raw.require(DatasetKind::Comissoes.columns())?;
    let t = parse_dates(raw, &["data_da_baixa"])?;
    let t = parse_numbers(&t, &["valor_da_nota", "valor_comissao"])?;
    let t = in_window(&t, "data_da_baixa", window)?;
    let t = if filters.current_month_only {
        on_or_after(&t, "data_da_baixa", first_day_of_month(today))?
    } else {
        t
    };

    let t = scope(&t, "vendedor", who, filters.vendedor.as_deref())?;
    let t = format_money(&t, &["valor_da_nota", "valor_comissao"])?;
    let t = as_identifiers(&t, &["numero_da_nota"])?;
    t.relabel(COMISSOES_LABELS)
}

/// Window of the monthly pivot: first day of the month five months back, through today.
pub fn commission_window(today: NaiveDate) -> DateWindow {
    DateWindow::new(months_back(today, COMMISSION_MONTHS - 1), today)
        .unwrap_or_else(|_| DateWindow::single_day(today))
}

/// Summed commission per salesperson, one column per month that has any settlement
/// in the trailing window. Missing salesperson/month pairs are zero.
pub fn comissoes_mensais(
    raw: &Table,
    who: &Identity,
    filters: &Filters,
    today: NaiveDate,
) -> Result<Table> {
    raw.require(DatasetKind::Comissoes.columns())?;
    let t = parse_dates(raw, &["data_da_baixa"])?;
    let t = parse_numbers(&t, &["valor_comissao"])?;
    let t = in_window(&t, "data_da_baixa", commission_window(today))?;
    let t = if who.is_management() {
        t.filter_eq("vendedor", filters.vendedor.as_deref())?
    } else {
        let idx = t.column_index("vendedor")?;
        t.filter(|r| r[idx].as_str().is_some_and(|v| who.matches_salesperson(v)))
    };

    let seller = t.column_index("vendedor")?;
    let date = t.column_index("data_da_baixa")?;
    let amount = t.column_index("valor_comissao")?;

    let mut months: BTreeSet<(i32, u32)> = BTreeSet::new();
    let mut sums: BTreeMap<String, BTreeMap<(i32, u32), f64>> = BTreeMap::new();
    for row in t.rows() {
        let Value::Date(d) = row[date] else { continue };
        let name = row[seller].to_string();
        if name.trim().is_empty() {
            continue;
        }
        let key = (d.year(), d.month());
        months.insert(key);
        let value = match row[amount] {
            Value::Float(f) => f,
            _ => 0.0,
        };
        *sums
            .entry(name)
            .or_default()
            .entry(key)
            .or_default() += value;
    }

    let month_keys: Vec<String> = months.iter().map(|(y, m)| format!("{y:04}-{m:02}")).collect();
    let mut columns = vec!["vendedor".to_string()];
    columns.extend(month_keys.iter().cloned());
    let mut out = Table::new(t.name(), columns);
    for (vendedor, by_month) in &sums {
        let mut row = vec![Value::text(vendedor.as_str())];
        for key in &months {
            row.push(Value::Text(money_br(by_month.get(key).copied().unwrap_or(0.0))));
        }
        out.push_row(row)?;
    }

    let month_labels: Vec<String> = months.iter().map(|(y, m)| format!("{m:02}/{y:04}")).collect();
    let mut labels: Vec<(&str, &str)> = vec![("vendedor", "Vendedor")];
    labels.extend(
        month_keys
            .iter()
            .map(String::as_str)
            .zip(month_labels.iter().map(String::as_str)),
    );

    let out = if who.is_management() {
        out
    } else {
        out.drop_columns(&["vendedor"])?
    };
    out.relabel(&labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PainelError;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(a: NaiveDate, b: NaiveDate) -> DateWindow {
        DateWindow::new(a, b).unwrap()
    }

    fn estoque_row(nota: i64, data: &str, vendedor: &str, pos: f64) -> Vec<Value> {
        vec![
            Value::Int(nota),
            Value::Float(1234.5),
            Value::text(data),
            Value::text("Padaria Sol"),
            Value::text(vendedor),
            Value::text("Matriz"),
            Value::text("Farinha"),
            Value::text("Tipo 1"),
            Value::Float(100.0),
            Value::Float(100.0 + pos),
            Value::Float(pos),
        ]
    }

    fn estoque_table(rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::with_columns("estoque", DatasetKind::Estoque.columns());
        for r in rows {
            t.push_row(r).unwrap();
        }
        t
    }

    fn column_names(t: &Table) -> Vec<&str> {
        t.columns().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_estoque_salesperson_scenario() {
        let raw = estoque_table(vec![
            estoque_row(1, "05/01/2024", "ANA", -10.0),
            estoque_row(2, "15/01/2024", "ANA", -5.0),
            estoque_row(3, "01/02/2024", "ANA", -1.0),
        ]);
        let out = estoque(
            &raw,
            window(d(2024, 1, 1), d(2024, 1, 31)),
            &Identity::salesperson("Ana"),
            &Filters::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(!out.has_column("Vendedor"));
        assert_eq!(out.value(0, 0), &Value::text("1"));
        assert_eq!(out.value(0, 1), &Value::text("1.234,50"));
        assert_eq!(out.value(0, 2), &Value::Date(d(2024, 1, 5)));
    }

    #[test]
    fn test_estoque_only_other_salespeople_is_empty_not_error() {
        let raw = estoque_table(vec![estoque_row(1, "05/01/2024", "BRUNO", -10.0)]);
        let out = estoque(
            &raw,
            window(d(2024, 1, 1), d(2024, 1, 31)),
            &Identity::salesperson("Ana"),
            &Filters::default(),
        )
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns().len(), 10);
    }

    #[test]
    fn test_estoque_management_sees_window_and_keeps_vendedor() {
        let raw = estoque_table(vec![
            estoque_row(1, "05/01/2024", "ANA", -10.0),
            estoque_row(2, "06/01/2024", "BRUNO", -3.0),
            estoque_row(3, "07/01/2024", "BRUNO", 4.0),
            estoque_row(4, "01/03/2024", "CARLA", -3.0),
        ]);
        let w = window(d(2024, 1, 1), d(2024, 1, 31));
        let out = estoque(&raw, w, &Identity::management(), &Filters::default()).unwrap();
        assert_eq!(out.len(), 2, "covered quote and out-of-window row excluded");
        assert!(out.has_column("Vendedor"));

        let only_bruno = Filters {
            vendedor: Some("BRUNO".into()),
            ..Filters::default()
        };
        let out = estoque(&raw, w, &Identity::management(), &only_bruno).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, 0), &Value::text("2"));
    }

    #[test]
    fn test_estoque_labels_exact() {
        let raw = estoque_table(vec![]);
        let out = estoque(
            &raw,
            window(d(2024, 1, 1), d(2024, 1, 31)),
            &Identity::management(),
            &Filters::default(),
        )
        .unwrap();
        assert_eq!(
            column_names(&out),
            vec![
                "N. da Nota",
                "Valor da Nota(R$)",
                "Data Cotada",
                "Cliente",
                "Vendedor",
                "Empresa",
                "Produto",
                "Característica",
                "Cotado",
                "Estoque",
                "Pós-Cotação",
            ]
        );
    }

    #[test]
    fn test_single_day_window_is_inclusive() {
        let raw = estoque_table(vec![
            estoque_row(1, "15/01/2024", "ANA", -1.0),
            estoque_row(2, "2024-01-15", "ANA", -1.0),
            estoque_row(3, "16/01/2024", "ANA", -1.0),
        ]);
        let out = estoque(
            &raw,
            DateWindow::single_day(d(2024, 1, 15)),
            &Identity::management(),
            &Filters::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_unparseable_date_fails_loudly() {
        let raw = estoque_table(vec![
            estoque_row(1, "05/01/2024", "ANA", -1.0),
            estoque_row(2, "ontem", "ANA", -1.0),
        ]);
        let err = estoque(
            &raw,
            window(d(2024, 1, 1), d(2024, 1, 31)),
            &Identity::management(),
            &Filters::default(),
        )
        .unwrap_err();
        match err {
            PainelError::Parse { column, row, value } => {
                assert_eq!(column, "data_cotada");
                assert_eq!(row, 2);
                assert_eq!(value, "ontem");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let t = Table::with_columns("estoque", &["n_da_nota", "data_cotada"]);
        let err = estoque(
            &t,
            window(d(2024, 1, 1), d(2024, 1, 31)),
            &Identity::management(),
            &Filters::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PainelError::Schema { .. }));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let raw = estoque_table(vec![
            estoque_row(1, "05/01/2024", "ANA", -10.0),
            estoque_row(2, "06/01/2024", "BRUNO", -3.0),
        ]);
        let snapshot = raw.clone();
        let w = window(d(2024, 1, 1), d(2024, 1, 31));
        let who = Identity::salesperson("bruno");
        let a = estoque(&raw, w, &who, &Filters::default()).unwrap();
        let b = estoque(&raw, w, &who, &Filters::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(raw, snapshot);
    }

    fn inadimplencia_table() -> Table {
        let mut t = Table::with_columns("inadimplencia", DatasetKind::Inadimplencia.columns());
        let rows = [
            ("ANA", "2024-01-10"),
            ("BRUNO", "2024-01-20"),
            ("ANA", "2023-06-01"),
        ];
        for (i, (vendedor, venc)) in rows.iter().enumerate() {
            t.push_row(vec![
                Value::Int(300 + i as i64),
                Value::text("Mercado Bom Preço"),
                Value::text(*vendedor),
                Value::text(*venc),
                Value::Float(7000.0 + i as f64),
                Value::Float(3000.0),
                Value::text("Venda"),
                Value::Int(1),
                Value::text("Boleto"),
                Value::text("45"),
                Value::Float(1000.0),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn test_inadimplencia_drops_invoice_value() {
        let raw = inadimplencia_table();
        let w = window(d(2024, 1, 1), d(2024, 1, 31));
        let out = inadimplencia(&raw, w, &Identity::management(), &Filters::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert!(!out.has_column("Valor da Nota(R$)"));
        let dias = out.column_index("Dias Vencidos").unwrap();
        assert_eq!(out.value(0, dias), &Value::Int(45));
        let nota = out.column_index("N. da Nota").unwrap();
        assert_eq!(out.value(0, nota), &Value::text("7000"));
        let parcela = out.column_index("Valor da Parcela(R$)").unwrap();
        assert_eq!(out.value(0, parcela), &Value::text("1.000,00"));

        let ana = inadimplencia(
            &raw,
            w,
            &Identity::salesperson("Ana"),
            &Filters::default(),
        )
        .unwrap();
        assert_eq!(ana.len(), 1);
        assert!(!ana.has_column("Vendedor"));
    }

    fn contatos_table() -> Table {
        let mut t = Table::with_columns("contatos", DatasetKind::Contatos.columns());
        let rows = [
            ("ANA", "Sim", "Sim", CONTACTED, "Não", "Segunda"),
            ("ANA", "Não", "Não", NOT_CONTACTED, "Não", "Terça-feira"),
            ("ANA", "Não", "Sim", NOT_CONTACTED, "Não", "Segunda"),
            ("BRUNO", "Sim", "Sim", CONTACTED, "Sim", "Quarta"),
            ("BRUNO", "Não", "Não", NOT_CONTACTED, "Não", "Segunda"),
        ];
        for (i, (apelido, tele, cot, status, venda, dia)) in rows.iter().enumerate() {
            t.push_row(vec![
                Value::Int(900 + i as i64),
                Value::text(*apelido),
                Value::text(format!("Cliente {i}")),
                Value::text(*tele),
                Value::text(*cot),
                Value::text(*status),
                Value::text("2024-01-02"),
                Value::Null,
                Value::text("03/01/2024"),
                Value::text(*venda),
                Value::text(*dia),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn test_contatos_salesperson_sees_pending_only() {
        let today = d(2024, 1, 16); // a Tuesday
        let out = contatos(
            &contatos_table(),
            &Identity::salesperson("ana"),
            &Filters::default(),
            today,
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(
            column_names(&out),
            vec![
                "Código Parceiro",
                "Nome do Parceiro",
                "Último Telemarketing",
                "Última Cotação",
                "Última Venda",
                "Melhor Dia",
            ]
        );
        assert_eq!(out.value(0, 2), &Value::Date(d(2024, 1, 2)));
        assert_eq!(out.value(0, 3), &Value::Null);
    }

    #[test]
    fn test_contatos_best_day_toggle() {
        let today = d(2024, 1, 16); // Tuesday
        let filters = Filters {
            best_day_only: true,
            ..Filters::default()
        };
        let out = contatos(
            &contatos_table(),
            &Identity::salesperson("Ana"),
            &filters,
            today,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, 0), &Value::text("901"));
    }

    #[test]
    fn test_contatos_management_status_filters() {
        let today = d(2024, 1, 16);
        let all = contatos(
            &contatos_table(),
            &Identity::management(),
            &Filters::default(),
            today,
        )
        .unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.has_column("Vendedor"));

        let filters = Filters {
            telemarketing: Some("Sim".into()),
            cotacao: Some("Sim".into()),
            ..Filters::default()
        };
        let out = contatos(&contatos_table(), &Identity::management(), &filters, today).unwrap();
        assert_eq!(out.len(), 2);

        let filters = Filters {
            vendedor: Some("BRUNO".into()),
            venda: Some("Sim".into()),
            ..Filters::default()
        };
        let out = contatos(&contatos_table(), &Identity::management(), &filters, today).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_resumo_contatos_invariants() {
        let out = resumo_contatos(
            &contatos_table(),
            &Identity::management(),
            &Filters::default(),
        )
        .unwrap();
        assert_eq!(
            column_names(&out),
            vec![
                "Vendedor",
                "Carteira",
                "Contatos Feitos",
                "Telemarketing Feito",
                "Cotações Feitas",
                "Vendas Feitas",
                "Contatos Restantes",
                "% Contatado",
            ]
        );
        assert_eq!(out.len(), 2);
        // BRUNO 1/2 = 50% before ANA 1/3
        assert_eq!(out.value(0, 0), &Value::text("BRUNO"));
        for row in out.rows() {
            let (Value::Int(portfolio), Value::Int(contacts)) = (&row[1], &row[2]) else {
                panic!("unexpected row types: {row:?}");
            };
            let (Value::Int(remaining), Value::Float(pct)) = (&row[6], &row[7]) else {
                panic!("unexpected row types: {row:?}");
            };
            assert_eq!(*remaining, portfolio - contacts);
            assert!((0.0..=100.0).contains(pct));
        }
        assert_eq!(out.value(1, 1), &Value::Int(3));
        assert_eq!(out.value(1, 4), &Value::Int(2));
    }

    #[test]
    fn test_resumo_contatos_salesperson_gets_own_row_without_name() {
        let out = resumo_contatos(
            &contatos_table(),
            &Identity::salesperson("Bruno"),
            &Filters::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out.has_column("Vendedor"));
        assert_eq!(out.value(0, 0), &Value::Int(2));
    }

    #[test]
    fn test_resumo_contatos_skips_unassigned_customers() {
        let mut raw = contatos_table();
        let width = DatasetKind::Contatos.columns().len();
        for apelido in [Value::Null, Value::text("  ")] {
            let mut row = vec![Value::Null; width];
            row[0] = Value::Int(990);
            row[1] = apelido;
            row[5] = Value::text(CONTACTED);
            raw.push_row(row).unwrap();
        }
        let out = resumo_contatos(&raw, &Identity::management(), &Filters::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.rows().iter().all(|r| !r[0].to_string().trim().is_empty()));
    }

    fn comissoes_table(rows: &[(&str, &str, f64)]) -> Table {
        let mut t = Table::with_columns("comissoes", DatasetKind::Comissoes.columns());
        for (i, (vendedor, data, valor)) in rows.iter().enumerate() {
            t.push_row(vec![
                Value::text(*vendedor),
                Value::Int(8000 + i as i64),
                Value::text("Hotel Vista Mar"),
                Value::text(*data),
                Value::Float(valor * 20.0),
                Value::Float(*valor),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn test_comissoes_current_month_toggle() {
        let raw = comissoes_table(&[
            ("ANA", "2024-02-20", 10.0),
            ("ANA", "2024-03-02", 20.0),
            ("BRUNO", "2024-03-05", 30.0),
        ]);
        let today = d(2024, 3, 10);
        let w = window(d(2024, 2, 1), today);
        let out = comissoes(
            &raw,
            w,
            &Identity::salesperson("Ana"),
            &Filters::default(),
            today,
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert!(!out.has_column("Vendedor"));

        let filters = Filters {
            current_month_only: true,
            ..Filters::default()
        };
        let out = comissoes(&raw, w, &Identity::salesperson("Ana"), &filters, today).unwrap();
        assert_eq!(out.len(), 1);
        let valor = out.column_index("Comissão(R$)").unwrap();
        assert_eq!(out.value(0, valor), &Value::text("20,00"));
    }

    #[test]
    fn test_comissoes_mensais_pivot() {
        let raw = comissoes_table(&[
            ("A", "2024-01-10", 100.0),
            ("A", "2024-01-20", 50.5),
            ("B", "2024-02-03", 200.0),
            ("A", "2024-03-01", 10.0),
            ("B", "2023-01-01", 999.0),
        ]);
        let today = d(2024, 3, 15);
        let out = comissoes_mensais(
            &raw,
            &Identity::management(),
            &Filters::default(),
            today,
        )
        .unwrap();
        assert_eq!(column_names(&out), vec!["Vendedor", "01/2024", "02/2024", "03/2024"]);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out.rows()[0],
            vec![
                Value::text("A"),
                Value::text("150,50"),
                Value::text("0,00"),
                Value::text("10,00"),
            ]
        );
        assert_eq!(
            out.rows()[1],
            vec![
                Value::text("B"),
                Value::text("0,00"),
                Value::text("200,00"),
                Value::text("0,00"),
            ]
        );
    }

    #[test]
    fn test_comissoes_mensais_salesperson_row() {
        let raw = comissoes_table(&[("A", "2024-01-10", 100.0), ("B", "2024-02-03", 200.0)]);
        let out = comissoes_mensais(
            &raw,
            &Identity::salesperson("b"),
            &Filters::default(),
            d(2024, 3, 15),
        )
        .unwrap();
        assert_eq!(column_names(&out), vec!["02/2024"]);
        assert_eq!(out.rows()[0], vec![Value::text("200,00")]);
    }

    #[test]
    fn test_comissoes_mensais_skips_unassigned_rows() {
        let raw = comissoes_table(&[("A", "2024-01-10", 100.0), ("", "2024-02-03", 200.0)]);
        let out = comissoes_mensais(
            &raw,
            &Identity::management(),
            &Filters::default(),
            d(2024, 3, 15),
        )
        .unwrap();
        assert_eq!(column_names(&out), vec!["Vendedor", "01/2024"]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_commission_window_spans_six_months() {
        let w = commission_window(d(2024, 3, 15));
        assert_eq!(w.start(), d(2023, 10, 1));
        assert_eq!(w.end(), d(2024, 3, 15));
    }

    #[test]
    fn test_every_dataset_column_has_a_label() {
        for (kind, labels) in [
            (DatasetKind::Estoque, ESTOQUE_LABELS),
            (DatasetKind::Inadimplencia, INADIMPLENCIA_LABELS),
            (DatasetKind::Contatos, CONTATOS_LABELS),
            (DatasetKind::Comissoes, COMISSOES_LABELS),
        ] {
            for col in kind.columns() {
                assert!(labels.iter().any(|(raw, _)| raw == col), "{col} unlabeled");
            }
            assert_eq!(labels.len(), kind.columns().len());
        }
    }

    #[test]
    fn test_weekday_normalization() {
        assert_eq!(weekday_pt(d(2024, 1, 16)), "Terça");
        assert!(is_best_day(&Value::text("terça-feira"), d(2024, 1, 16)));
        assert!(is_best_day(&Value::text("TERCA"), d(2024, 1, 16)));
        assert!(!is_best_day(&Value::text("Quarta"), d(2024, 1, 16)));
        assert!(!is_best_day(&Value::Null, d(2024, 1, 16)));
    }
}
