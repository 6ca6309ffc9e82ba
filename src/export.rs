//! Spreadsheet encoding of rendered report tables.
//!
//! The XLSX writer emits the smallest package Excel and LibreOffice accept: one
//! worksheet with inline strings, a bold header row and a `dd/mm/yyyy` date style.

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use chrono::NaiveDate;
use quick_xml::escape::escape;
use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::fmt::date_to_excel_serial;
use crate::table::{Table, Value};

pub const SHEET_NAME: &str = "Relatório";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// Encoded report ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn fold_accents(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// "Relatório de Comissões" -> "relatorio-de-comissoes"
pub fn slugify(title: &str) -> String {
    let folded: String = title.to_lowercase().chars().map(fold_accents).collect();
    match Regex::new(r"[^a-z0-9]+") {
        Ok(re) => re.replace_all(&folded, "-").trim_matches('-').to_string(),
        Err(_) => folded,
    }
}

pub fn file_name(title: &str, today: NaiveDate, format: ExportFormat) -> String {
    format!("{}-{}.{}", slugify(title), today.format("%Y-%m-%d"), format.extension())
}

pub fn encode(table: &Table, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => to_xlsx(table),
        ExportFormat::Csv => to_csv(table),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// `;`-delimited, values rendered exactly as displayed.
pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    Ok(wtr.into_inner().map_err(|e| e.into_error())?)
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Style 0: default, 1: bold header, 2: date.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

const HEADER_STYLE: u8 = 1;
const DATE_STYLE: u8 = 2;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(SHEET_NAME)
    )
}

/// Zero-based column index to its letter reference: 0 -> A, 26 -> AA.
fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn push_text_cell(out: &mut String, cell_ref: &str, text: &str, style: Option<u8>) {
    let style = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    let _ = write!(
        out,
        r#"<c r="{cell_ref}" t="inlineStr"{style}><is><t xml:space="preserve">{}</t></is></c>"#,
        escape(text)
    );
}

fn push_value_cell(out: &mut String, cell_ref: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Text(s) => push_text_cell(out, cell_ref, s, None),
        Value::Int(i) => {
            let _ = write!(out, r#"<c r="{cell_ref}"><v>{i}</v></c>"#);
        }
        Value::Float(f) if f.is_finite() => {
            let _ = write!(out, r#"<c r="{cell_ref}"><v>{f}</v></c>"#);
        }
        Value::Float(_) => {}
        Value::Date(d) => {
            let _ = write!(
                out,
                r#"<c r="{cell_ref}" s="{DATE_STYLE}"><v>{}</v></c>"#,
                date_to_excel_serial(*d)
            );
        }
    }
}

fn sheet_xml(table: &Table) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    let letters: Vec<String> = (0..table.columns().len()).map(column_letter).collect();

    out.push_str(r#"<row r="1">"#);
    for (col, label) in table.columns().iter().enumerate() {
        push_text_cell(&mut out, &format!("{}1", letters[col]), label, Some(HEADER_STYLE));
    }
    out.push_str("</row>");

    for (i, row) in table.rows().iter().enumerate() {
        let r = i + 2;
        let _ = write!(out, r#"<row r="{r}">"#);
        for (col, value) in row.iter().enumerate() {
            push_value_cell(&mut out, &format!("{}{r}", letters[col]), value);
        }
        out.push_str("</row>");
    }
    out.push_str("</sheetData></worksheet>");
    out
}

/// Single-sheet workbook named [`SHEET_NAME`]: header row of display labels, then
/// one row per table row. No index column.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, String); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)),
    ];
    for (name, body) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    let cursor = zip.finish()?;
    tracing::debug!(rows = table.len(), "xlsx encoded");
    Ok(cursor.into_inner())
}
