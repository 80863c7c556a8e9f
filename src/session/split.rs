const MIN_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitRow {
    pub category: Option<String>,
    pub percentage: u32,
}

/// Editor for dividing one transaction across several categories.
/// With exactly two rows, editing one percentage balances the other.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitEditor {
    rows: Vec<SplitRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitLine {
    pub category: String,
    pub percentage: u32,
    pub amount: f64,
}

fn cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl SplitEditor {
    /// Two rows at 50/50, the first seeded with `first_category`.
    pub fn new(first_category: Option<String>) -> Self {
        Self {
            rows: vec![
                SplitRow {
                    category: first_category,
                    percentage: 50,
                },
                SplitRow {
                    category: None,
                    percentage: 50,
                },
            ],
        }
    }

    pub fn rows(&self) -> &[SplitRow] {
        &self.rows
    }

    pub fn total(&self) -> u32 {
        self.rows.iter().map(|r| r.percentage).sum()
    }

    pub fn add_row(&mut self) {
        let remaining = 100u32.saturating_sub(self.total());
        self.rows.push(SplitRow {
            category: None,
            percentage: remaining,
        });
    }

    pub fn remove_row(&mut self, index: usize) -> bool {
        if self.rows.len() <= MIN_ROWS || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    pub fn set_percentage(&mut self, index: usize, percentage: i64) -> bool {
        if index >= self.rows.len() {
            return false;
        }
        let p = percentage.clamp(0, 100) as u32;
        self.rows[index].percentage = p;
        if self.rows.len() == 2 {
            self.rows[1 - index].percentage = 100 - p;
        }
        true
    }

    pub fn set_category(&mut self, index: usize, category: &str) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.category = Some(category.to_string());
                true
            }
            None => false,
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.total() == 100 && self.rows.iter().all(|r| r.category.is_some())
    }

    /// Resolved lines for `gross`, or `None` while the editor is incomplete.
    pub fn lines(&self, gross: f64) -> Option<Vec<SplitLine>> {
        if !self.can_confirm() {
            return None;
        }
        let gross = gross.abs();
        self.rows
            .iter()
            .map(|r| {
                Some(SplitLine {
                    category: r.category.clone()?,
                    percentage: r.percentage,
                    amount: cents(gross * r.percentage as f64 / 100.0),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_rows_auto_balance() {
        let mut s = SplitEditor::new(Some("Software".into()));
        s.set_percentage(0, 70);
        assert_eq!(s.rows()[1].percentage, 30);
        s.set_percentage(1, 85);
        assert_eq!(s.rows()[0].percentage, 15);
    }

    #[test]
    fn test_auto_balance_clamps() {
        let mut s = SplitEditor::new(None);
        for (input, a, b) in [(150, 100, 0), (-20, 0, 100), (0, 0, 100), (100, 100, 0)] {
            s.set_percentage(0, input);
            assert_eq!((s.rows()[0].percentage, s.rows()[1].percentage), (a, b));
        }
    }

    #[test]
    fn test_three_rows_no_balance() {
        let mut s = SplitEditor::new(None);
        s.set_percentage(0, 70);
        s.add_row();
        assert_eq!(s.rows()[2].percentage, 0);
        s.set_percentage(0, 40);
        assert_eq!(s.rows()[1].percentage, 30);
        assert_eq!(s.rows()[2].percentage, 0);
        assert_eq!(s.total(), 70);
    }

    #[test]
    fn test_new_row_takes_remainder() {
        let mut s = SplitEditor::new(None);
        s.add_row();
        s.set_percentage(0, 20);
        s.add_row();
        assert_eq!(s.rows()[3].percentage, 30);
    }

    #[test]
    fn test_confirm_requires_total_and_categories() {
        let mut s = SplitEditor::new(Some("Software".into()));
        assert!(!s.can_confirm());
        s.set_category(1, "Travel");
        assert!(s.can_confirm());
        s.add_row();
        s.set_percentage(2, 10);
        assert!(!s.can_confirm());
        s.set_category(2, "Meals");
        assert!(!s.can_confirm());
        s.set_percentage(0, 40);
        assert!(s.can_confirm());
    }

    #[test]
    fn test_lines_amounts() {
        let mut s = SplitEditor::new(Some("Software".into()));
        s.set_category(1, "Travel");
        s.set_percentage(0, 70);
        let lines = s.lines(-200.0).unwrap();
        assert_eq!(lines[0].amount, 140.0);
        assert_eq!(lines[1].amount, 60.0);
        assert_eq!(lines[1].category, "Travel");
    }

    #[test]
    fn test_remove_keeps_minimum() {
        let mut s = SplitEditor::new(None);
        assert!(!s.remove_row(0));
        s.add_row();
        assert!(s.remove_row(2));
        assert_eq!(s.rows().len(), 2);
        assert!(!s.remove_row(5));
    }
}
