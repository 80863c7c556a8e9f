use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};

use crate::error::DeskError;

#[derive(Debug, Clone)]
pub struct BankAccount {
    pub id: i64,
    pub name: String,
    pub iban: Option<String>,
    pub institution: Option<String>,
}

/// One entry of the category taxonomy. `path` is the breadcrumb from the
/// top-level group down to this category, e.g. `["Operating", "Software"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub path: Vec<String>,
}

impl Category {
    pub fn breadcrumb(&self) -> String {
        if self.path.is_empty() {
            return self.label.clone();
        }
        self.path.join(" \u{203a} ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorizedBy {
    Ai,
    Manual,
}

impl CategorizedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Manual => "manual",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ai" => Some(Self::Ai),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    /// Positive = inflow, negative = outflow.
    pub amount: f64,
    pub sender: String,
    pub recipient: String,
    pub reference: String,
    pub bank_id: i64,
    pub category: Option<String>,
    pub categorized_by: Option<CategorizedBy>,
    pub has_attachment: bool,
    pub is_private: bool,
}

impl Transaction {
    pub fn is_inflow(&self) -> bool {
        self.amount > 0.0
    }

    /// The other party: sender for inflows, recipient for outflows.
    pub fn counterparty(&self) -> &str {
        if self.is_inflow() {
            &self.sender
        } else {
            &self.recipient
        }
    }

    pub fn gross(&self) -> f64 {
        self.amount.abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub id: i64,
    pub vendor_name: String,
    pub invoice_number: String,
    /// Always non-negative.
    pub amount: f64,
    pub date: NaiveDate,
    pub issue_date: Option<NaiveDate>,
    pub matched: bool,
}

impl Receipt {
    /// Date used for proximity scoring: issue date when known, else the
    /// upload/document date.
    pub fn effective_date(&self) -> NaiveDate {
        self.issue_date.unwrap_or(self.date)
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub id: i64,
    pub pattern: String,
    pub match_type: String,
    pub category: String,
    pub priority: i64,
}

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        next.and_then(|d| d.pred_opt()).unwrap_or_default()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DeskError::InvalidMonth(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = y.parse().map_err(|_| err())?;
        let month: u32 = m.parse().map_err(|_| err())?;
        Month::new(year, month).ok_or_else(err)
    }
}
