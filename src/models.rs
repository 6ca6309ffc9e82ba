use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PainelError, Result};

/// Role name with unrestricted visibility.
pub const MANAGEMENT: &str = "Gerência";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Management,
    Salesperson,
}

impl Role {
    pub fn from_name(name: &str) -> Self {
        if name.trim() == MANAGEMENT {
            Self::Management
        } else {
            Self::Salesperson
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Management => MANAGEMENT,
            Self::Salesperson => "Vendedor",
        }
    }
}

/// Who is looking at the reports, as handed over by the login step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(name: &str, role: Role) -> Self {
        Self {
            name: name.trim().to_string(),
            role,
        }
    }

    pub fn management() -> Self {
        Self::new(MANAGEMENT, Role::Management)
    }

    pub fn salesperson(name: &str) -> Self {
        Self::new(name, Role::Salesperson)
    }

    pub fn is_management(&self) -> bool {
        self.role == Role::Management
    }

    /// Key compared against salesperson columns, which the warehouse stores uppercased.
    pub fn salesperson_key(&self) -> String {
        self.name.to_uppercase()
    }

    pub fn matches_salesperson(&self, value: &str) -> bool {
        value.trim().to_uppercase() == self.salesperson_key()
    }
}

/// Inclusive date range. Construction rejects `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PainelError::InvalidWindow {
                start: crate::fmt::date_br(start),
                end: crate::fmt::date_br(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// [today - days, today]
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_previous_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date) - Duration::days(1)
}

/// First day of the month `months` calendar months before `date`'s month.
pub fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 - months as i32;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(date)
}
