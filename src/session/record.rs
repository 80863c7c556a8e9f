use crate::models::CategorizedBy;
use crate::session::split::SplitLine;

pub const PRIVATE_CATEGORY: &str = "Private";

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Single { category: String, is_private: bool },
    Split(Vec<SplitLine>),
}

/// The outcome of reviewing one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizationRecord {
    pub assignment: Assignment,
    pub note: String,
    pub tax_rate: f64,
    pub categorized_by: CategorizedBy,
    pub receipt_id: Option<i64>,
    /// Set by "I don't have a receipt".
    pub needs_receipt: bool,
}

impl CategorizationRecord {
    pub fn private() -> Self {
        Self {
            assignment: Assignment::Single {
                category: PRIVATE_CATEGORY.to_string(),
                is_private: true,
            },
            note: String::new(),
            tax_rate: 0.0,
            categorized_by: CategorizedBy::Manual,
            receipt_id: None,
            needs_receipt: false,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self.assignment, Assignment::Single { is_private: true, .. })
    }

    /// Category written to the transaction row. Splits use their largest
    /// share (first on ties).
    pub fn primary_category(&self) -> &str {
        match &self.assignment {
            Assignment::Single { category, .. } => category,
            Assignment::Split(lines) => lines
                .iter()
                .fold(None::<&SplitLine>, |best, l| match best {
                    Some(b) if b.percentage >= l.percentage => Some(b),
                    _ => Some(l),
                })
                .map(|l| l.category.as_str())
                .unwrap_or_default(),
        }
    }
}

/// Instructions for the data layer. The session never writes to shared
/// collections itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Categorized {
        transaction_id: i64,
        record: CategorizationRecord,
    },
    ReceiptLinked {
        transaction_id: i64,
        receipt_id: i64,
    },
    FollowUp {
        transaction_id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(category: &str, percentage: u32) -> SplitLine {
        SplitLine {
            category: category.to_string(),
            percentage,
            amount: 0.0,
        }
    }

    #[test]
    fn test_private_record() {
        let r = CategorizationRecord::private();
        assert!(r.is_private());
        assert_eq!(r.primary_category(), "Private");
        assert_eq!(r.tax_rate, 0.0);
    }

    #[test]
    fn test_split_primary_category() {
        let mut r = CategorizationRecord::private();
        r.assignment = Assignment::Split(vec![line("Travel", 30), line("Software", 70)]);
        assert_eq!(r.primary_category(), "Software");
        assert!(!r.is_private());
        r.assignment = Assignment::Split(vec![line("Travel", 50), line("Software", 50)]);
        assert_eq!(r.primary_category(), "Travel");
    }
}
