use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{PainelError, Result};
use crate::fmt::{date_br, number_br, parse_date};

/// One cell of a fetched or transformed table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Equality used by the select filters: text compares trimmed, numbers by their
    /// rendered form.
    pub fn eq_filter(&self, wanted: &str) -> bool {
        match self {
            Self::Null => false,
            Self::Text(s) => s.trim() == wanted.trim(),
            other => other.to_string() == wanted.trim(),
        }
    }

    /// Interpret the cell as a date. Null stays `None`; anything unparseable is an error.
    pub fn to_date(&self, column: &str, row: usize) -> Result<Option<NaiveDate>> {
        match self {
            Self::Null => Ok(None),
            Self::Date(d) => Ok(Some(*d)),
            Self::Text(s) if s.trim().is_empty() => Ok(None),
            Self::Text(s) => parse_date(s)
                .map(Some)
                .ok_or_else(|| parse_error(column, row, s)),
            other => Err(parse_error(column, row, &other.to_string())),
        }
    }

    pub fn to_f64(&self, column: &str, row: usize) -> Result<Option<f64>> {
        match self {
            Self::Null => Ok(None),
            Self::Int(i) => Ok(Some(*i as f64)),
            Self::Float(f) => Ok(Some(*f)),
            Self::Text(s) if s.trim().is_empty() => Ok(None),
            Self::Text(s) => parse_number(s)
                .map(Some)
                .ok_or_else(|| parse_error(column, row, s)),
            Self::Date(d) => Err(parse_error(column, row, &date_br(*d))),
        }
    }

    pub fn to_i64(&self, column: &str, row: usize) -> Result<Option<i64>> {
        match self {
            Self::Int(i) => Ok(Some(*i)),
            Self::Float(f) if f.fract() == 0.0 => Ok(Some(*f as i64)),
            Self::Text(s) if !s.trim().is_empty() => s
                .trim()
                .replace('.', "")
                .parse::<i64>()
                .ok()
                .filter(|_| !s.contains('.') || is_grouped_integer(s.trim()))
                .map(Some)
                .ok_or_else(|| parse_error(column, row, s)),
            Self::Null | Self::Text(_) => Ok(None),
            other => Err(parse_error(column, row, &other.to_string())),
        }
    }

    /// Identifier columns (invoice numbers, partner codes) are shown as plain text.
    pub fn to_identifier(&self) -> Value {
        match self {
            Self::Float(f) if f.fract() == 0.0 => Self::Text(format!("{}", *f as i64)),
            Self::Null => Self::Null,
            other => Self::Text(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Date(_) => 2,
            Self::Text(_) => 3,
        }
    }

    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&number_br(*v, 2)),
            Self::Date(d) => f.write_str(&date_br(*d)),
        }
    }
}

fn parse_error(column: &str, row: usize, value: &str) -> PainelError {
    PainelError::Parse {
        column: column.to_string(),
        row: row + 1,
        value: value.to_string(),
    }
}

/// `2.000` or `-1.500.000`: periods that only ever group three digits.
fn is_grouped_integer(s: &str) -> bool {
    static GROUPED: OnceLock<Option<Regex>> = OnceLock::new();
    GROUPED
        .get_or_init(|| Regex::new(r"^-?\d{1,3}(\.\d{3})+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// Plain `1234.5`, Brazilian `1.234,50`, or Brazilian grouped integers like `2.000`.
fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.contains(',') {
        return s.replace('.', "").replace(',', ".").parse().ok();
    }
    if is_grouped_integer(s) {
        return s.replace('.', "").parse().ok();
    }
    s.parse().ok()
}

/// Rectangular, named-column table. Every operation returns a new table; the
/// receiver is never modified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_columns(name: &str, columns: &[&str]) -> Self {
        Self::new(name, columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PainelError::Other(format!(
                "'{}': linha com {} valores, esperado {}",
                self.name,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PainelError::Schema {
                dataset: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn require(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(PainelError::Schema {
                dataset: self.name.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    /// Distinct non-empty values of a column, sorted; feeds the select controls.
    pub fn distinct(&self, column: &str) -> Result<Vec<String>> {
        let idx = self.column_index(column)?;
        let mut values: Vec<String> = self
            .rows
            .iter()
            .map(|r| r[idx].to_string())
            .filter(|s| !s.trim().is_empty())
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    fn derive(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn filter<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self.rows.iter().filter(|r| pred(r.as_slice())).cloned().collect();
        self.derive(rows)
    }

    /// Keep rows whose `column` equals `wanted`, or everything when no filter is set.
    pub fn filter_eq(&self, column: &str, wanted: Option<&str>) -> Result<Self> {
        let Some(wanted) = wanted.filter(|w| !w.trim().is_empty()) else {
            return Ok(self.clone());
        };
        let idx = self.column_index(column)?;
        Ok(self.filter(|r| r[idx].eq_filter(wanted)))
    }

    pub fn map_column<F>(&self, column: &str, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, &Value) -> Result<Value>,
    {
        let idx = self.column_index(column)?;
        let mut rows = self.rows.clone();
        for (i, row) in rows.iter_mut().enumerate() {
            row[idx] = f(i, &row[idx])?;
        }
        Ok(self.derive(rows))
    }

    pub fn drop_columns(&self, columns: &[&str]) -> Result<Self> {
        let mut drop = Vec::new();
        for column in columns {
            drop.push(self.column_index(column)?);
        }
        let keep: Vec<usize> = (0..self.columns.len()).filter(|i| !drop.contains(i)).collect();
        Ok(Self {
            name: self.name.clone(),
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    /// Rename every column through `labels`. A column without a label is an error.
    pub fn relabel(&self, labels: &[(&str, &str)]) -> Result<Self> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let label = labels
                .iter()
                .find(|(raw, _)| raw == column)
                .map(|(_, label)| label.to_string())
                .ok_or_else(|| PainelError::UnlabeledColumn(column.clone()))?;
            columns.push(label);
        }
        Ok(Self {
            name: self.name.clone(),
            columns,
            rows: self.rows.clone(),
        })
    }

    pub fn sort_by<F>(&self, mut cmp: F) -> Self
    where
        F: FnMut(&[Value], &[Value]) -> Ordering,
    {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| cmp(a, b));
        self.derive(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::with_columns("amostra", &["vendedor", "valor"]);
        t.push_row(vec![Value::text("ANA"), Value::Float(10.0)]).unwrap();
        t.push_row(vec![Value::text("BRUNO"), Value::Int(3)]).unwrap();
        t.push_row(vec![Value::text("ANA"), Value::Null]).unwrap();
        t
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut t = Table::with_columns("x", &["a", "b"]);
        assert!(t.push_row(vec![Value::Null]).is_err());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let t = sample();
        let err = t.column_index("cliente").unwrap_err();
        match err {
            PainelError::Schema { dataset, column } => {
                assert_eq!(dataset, "amostra");
                assert_eq!(column, "cliente");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_filter_eq_ignores_unset_filter() {
        let t = sample();
        assert_eq!(t.filter_eq("vendedor", None).unwrap().len(), 3);
        assert_eq!(t.filter_eq("vendedor", Some("")).unwrap().len(), 3);
        assert_eq!(t.filter_eq("vendedor", Some("ANA")).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_leaves_source_untouched() {
        let t = sample();
        let before = t.clone();
        let _ = t.filter(|r| r[0].eq_filter("BRUNO"));
        let _ = t.drop_columns(&["valor"]).unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn test_relabel_requires_total_mapping() {
        let t = sample();
        let ok = t.relabel(&[("vendedor", "Vendedor"), ("valor", "Valor")]).unwrap();
        assert_eq!(ok.columns(), &["Vendedor".to_string(), "Valor".to_string()]);
        let err = t.relabel(&[("vendedor", "Vendedor")]).unwrap_err();
        assert!(matches!(err, PainelError::UnlabeledColumn(c) if c == "valor"));
    }

    #[test]
    fn test_drop_columns() {
        let t = sample().drop_columns(&["vendedor"]).unwrap();
        assert_eq!(t.columns(), &["valor".to_string()]);
        assert_eq!(t.value(1, 0), &Value::Int(3));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::text("1.234,50").to_f64("v", 0).unwrap(), Some(1234.5));
        assert_eq!(Value::text("1234.5").to_f64("v", 0).unwrap(), Some(1234.5));
        assert_eq!(Value::Null.to_f64("v", 0).unwrap(), None);
        assert!(Value::text("abc").to_f64("v", 0).is_err());
        assert_eq!(Value::Float(12.0).to_identifier(), Value::text("12"));
        assert_eq!(Value::Int(7).to_identifier(), Value::text("7"));
    }

    #[test]
    fn test_grouped_integers_use_brazilian_thousands() {
        assert_eq!(Value::text("2.000").to_f64("valor_da_nota", 0).unwrap(), Some(2000.0));
        assert_eq!(Value::text("-1.500").to_f64("pos_cotacao", 0).unwrap(), Some(-1500.0));
        assert_eq!(Value::text("1.500.000").to_f64("v", 0).unwrap(), Some(1_500_000.0));
        assert_eq!(Value::text("2.5").to_f64("v", 0).unwrap(), Some(2.5));
        assert_eq!(Value::text("12.3456").to_f64("v", 0).unwrap(), Some(12.3456));
        assert_eq!(Value::text("1.200").to_i64("dias_vencidos", 0).unwrap(), Some(1200));
        assert!(Value::text("1.20").to_i64("dias_vencidos", 0).is_err());
    }

    #[test]
    fn test_bad_date_reports_row_and_value() {
        let err = Value::text("32/13/2024").to_date("data_cotada", 4).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("data_cotada"), "got: {msg}");
        assert!(msg.contains("linha 5"), "got: {msg}");
        assert!(msg.contains("32/13/2024"), "got: {msg}");
    }

    #[test]
    fn test_distinct_sorted() {
        assert_eq!(sample().distinct("vendedor").unwrap(), vec!["ANA", "BRUNO"]);
    }
}
