use chrono::NaiveDate;

/// Format a number with Brazilian separators: 1234.5 -> 1.234,50
pub fn money_br(val: f64) -> String {
    number_br(val, 2)
}

/// Brazilian-convention number with `decimals` places: period groups thousands,
/// comma separates decimals.
pub fn number_br(val: f64, decimals: usize) -> String {
    let rounded = format!("{:.*}", decimals, val.abs());
    let (int_part, dec_part) = match rounded.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (rounded.as_str(), None),
    };

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    // -0,00 reads as a bug in a report
    let negative = val < 0.0 && rounded.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match dec_part {
        Some(d) => format!("{sign}{with_dots},{d}"),
        None => format!("{sign}{with_dots}"),
    }
}

pub fn date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Accepts the two date-only layouts the warehouse emits.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

pub fn date_to_excel_serial(date: NaiveDate) -> i64 {
    NaiveDate::from_ymd_opt(1899, 12, 30).map_or(0, |base| (date - base).num_days())
}
