use std::collections::HashSet;

use crate::fmt::money;
use crate::models::{Receipt, Transaction};

const EXACT_AMOUNT_POINTS: i32 = 50;
const CLOSE_AMOUNT_POINTS: i32 = 35;
const NEAR_AMOUNT_POINTS: i32 = 15;
const COUNTERPARTY_POINTS: i32 = 40;
const REFERENCE_POINTS: i32 = 25;
const WEEK_POINTS: i32 = 20;
const MONTH_POINTS: i32 = 8;

/// Minimum confidence for a candidate to be recommended on its own.
pub const BEST_MATCH_CONFIDENCE: i32 = 80;
/// Lead the best candidate must hold over the runner-up.
pub const BEST_MATCH_LEAD: i32 = 15;

const MAX_OTHER_WITH_BEST: usize = 3;
const MAX_OTHER_WITHOUT_BEST: usize = 4;
const MAX_PARTIAL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    Amount,
    Counterparty,
    Reference,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchReason {
    pub kind: ReasonKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub receipt: Receipt,
    pub score: i32,
    pub reasons: Vec<MatchReason>,
    /// `score` capped at 100.
    pub confidence: i32,
    pub is_partial_match: bool,
    pub coverage_percent: i64,
    /// Absolute difference between receipt amount and |transaction amount|.
    pub amount_diff: f64,
    /// Transaction date minus receipt date, in days. Positive means the
    /// receipt was issued before the transaction.
    pub days_diff: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub best_match: Option<MatchCandidate>,
    pub other_matches: Vec<MatchCandidate>,
    pub partial_matches: Vec<MatchCandidate>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.best_match.is_none() && self.other_matches.is_empty() && self.partial_matches.is_empty()
    }

    /// Every candidate in display order: best, others, partials.
    pub fn all(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.best_match
            .iter()
            .chain(self.other_matches.iter())
            .chain(self.partial_matches.iter())
    }
}

fn words(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

fn counterparty_matches(vendor: &str, counterparty: &str) -> bool {
    let vendor = vendor.trim().to_lowercase();
    let counterparty = counterparty.trim().to_lowercase();
    if vendor.is_empty() || counterparty.is_empty() {
        return false;
    }
    if vendor.contains(&counterparty) {
        return true;
    }
    if let Some(first) = vendor.split_whitespace().next() {
        if counterparty.contains(first) {
            return true;
        }
    }
    let vendor_words: HashSet<String> = words(&vendor).into_iter().collect();
    words(&counterparty).iter().any(|w| vendor_words.contains(w))
}

fn reference_matches(invoice_number: &str, reference: &str) -> bool {
    let a = invoice_number.trim().to_lowercase();
    let b = reference.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn score_one(txn: &Transaction, receipt: &Receipt) -> MatchCandidate {
    let gross = txn.gross();
    let mut score = 0;
    let mut reasons = Vec::new();

    let amount_diff = (receipt.amount - gross).abs();
    // tier bounds are inclusive, compared in whole cents
    let gross_c = cents(gross);
    let diff_c = cents(amount_diff);
    if diff_c * 100 <= gross_c {
        score += EXACT_AMOUNT_POINTS;
        reasons.push(MatchReason {
            kind: ReasonKind::Amount,
            label: "Exact amount".to_string(),
        });
    } else if diff_c * 5 <= gross_c {
        score += if diff_c * 20 <= gross_c {
            CLOSE_AMOUNT_POINTS
        } else {
            NEAR_AMOUNT_POINTS
        };
        reasons.push(MatchReason {
            kind: ReasonKind::Amount,
            label: format!("Amount differs {}", money(amount_diff)),
        });
    }

    if counterparty_matches(&receipt.vendor_name, txn.counterparty()) {
        score += COUNTERPARTY_POINTS;
        reasons.push(MatchReason {
            kind: ReasonKind::Counterparty,
            label: "Same counterparty".to_string(),
        });
    }

    if reference_matches(&receipt.invoice_number, &txn.reference) {
        score += REFERENCE_POINTS;
        reasons.push(MatchReason {
            kind: ReasonKind::Reference,
            label: "Reference match".to_string(),
        });
    }

    let days_diff = (txn.date - receipt.effective_date()).num_days();
    let days = days_diff.abs();
    if days <= 7 {
        score += WEEK_POINTS;
        let label = match days_diff {
            0 => "Same day".to_string(),
            d if d > 0 => format!("Issued {d}d before"),
            d => format!("Issued {}d after", -d),
        };
        reasons.push(MatchReason {
            kind: ReasonKind::Date,
            label,
        });
    } else if days <= 30 {
        score += MONTH_POINTS;
    }

    let coverage = if gross > 0.0 { receipt.amount / gross } else { 0.0 };
    let receipt_c = cents(receipt.amount);

    MatchCandidate {
        receipt: receipt.clone(),
        score,
        reasons,
        confidence: score.min(100),
        is_partial_match: receipt_c * 10 > gross_c && receipt_c * 10 < gross_c * 9,
        coverage_percent: (coverage * 100.0).round() as i64,
        amount_diff,
        days_diff,
    }
}

/// Score every unmatched receipt in `pool` against `txn`, drop those with
/// no signal at all and rank the rest by score. Ties keep pool order.
pub fn score_candidates(txn: &Transaction, pool: &[Receipt]) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = pool
        .iter()
        .filter(|r| !r.matched)
        .map(|r| score_one(txn, r))
        .filter(|c| c.score > 0)
        .collect();
    // sort_by is stable
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Partition ranked candidates. A best match is only named when it covers
/// the full amount, clears the confidence bar and leads the runner-up by a
/// clear margin.
pub fn pick_best_match(candidates: &[MatchCandidate]) -> MatchResult {
    let first = candidates.first();
    let second = candidates.get(1);

    let accepted = first.filter(|f| {
        f.confidence >= BEST_MATCH_CONFIDENCE
            && second.map_or(true, |s| f.confidence - s.confidence >= BEST_MATCH_LEAD)
            && !f.is_partial_match
    });

    let partial_matches: Vec<MatchCandidate> = candidates
        .iter()
        .filter(|c| c.is_partial_match)
        .take(MAX_PARTIAL)
        .cloned()
        .collect();

    match accepted {
        Some(best) => MatchResult {
            best_match: Some(best.clone()),
            other_matches: candidates
                .iter()
                .skip(1)
                .filter(|c| !c.is_partial_match)
                .take(MAX_OTHER_WITH_BEST)
                .cloned()
                .collect(),
            partial_matches,
        },
        None => MatchResult {
            best_match: None,
            other_matches: candidates
                .iter()
                .filter(|c| !c.is_partial_match)
                .take(MAX_OTHER_WITHOUT_BEST)
                .cloned()
                .collect(),
            partial_matches,
        },
    }
}

pub fn best_match_for(txn: &Transaction, pool: &[Receipt]) -> MatchResult {
    pick_best_match(&score_candidates(txn, pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn outflow(amount: f64, recipient: &str, reference: &str, on: &str) -> Transaction {
        Transaction {
            id: 1,
            date: date(on),
            amount: -amount,
            sender: "Studio Nord GmbH".to_string(),
            recipient: recipient.to_string(),
            reference: reference.to_string(),
            bank_id: 1,
            category: None,
            categorized_by: None,
            has_attachment: false,
            is_private: false,
        }
    }

    fn receipt(id: i64, vendor: &str, invoice: &str, amount: f64, issued: &str) -> Receipt {
        Receipt {
            id,
            vendor_name: vendor.to_string(),
            invoice_number: invoice.to_string(),
            amount,
            date: date(issued),
            issue_date: Some(date(issued)),
            matched: false,
        }
    }

    fn labels(c: &MatchCandidate) -> Vec<&str> {
        c.reasons.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn test_linkedin_exact_match_is_best() {
        let txn = outflow(79.99, "LinkedIn", "", "2025-03-12");
        let pool = vec![
            receipt(1, "Adobe Systems", "A-1", 54.99, "2025-02-01"),
            receipt(2, "LinkedIn Ireland", "LI-2025-03", 79.99, "2025-03-10"),
        ];
        let result = best_match_for(&txn, &pool);
        let best = result.best_match.expect("expected a best match");
        assert_eq!(best.receipt.id, 2);
        assert!(best.confidence >= 80);
        assert_eq!(best.score, 110);
        assert_eq!(best.confidence, 100);
        let l = labels(&best);
        assert!(l.contains(&"Exact amount"));
        assert!(l.contains(&"Same counterparty"));
        assert!(l.contains(&"Issued 2d before"));
    }

    #[test]
    fn test_partial_receipt_never_best() {
        let txn = outflow(16660.00, "Bauer Consulting", "", "2025-03-05");
        let pool = vec![receipt(7, "Bauer Consulting", "RE-118", 7140.00, "2025-03-01")];
        let candidates = score_candidates(&txn, &pool);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_partial_match);
        assert_eq!(candidates[0].coverage_percent, 43);

        let result = pick_best_match(&candidates);
        assert!(result.best_match.is_none());
        assert_eq!(result.partial_matches.len(), 1);
        assert_eq!(result.partial_matches[0].receipt.id, 7);
        assert!(result.other_matches.is_empty());
    }

    #[test]
    fn test_no_clear_leader_means_no_best() {
        let txn = outflow(100.00, "Hetzner Online", "INV-42", "2025-03-01");
        let pool = vec![
            // exact amount + reference + within a month = 83
            receipt(1, "Some Vendor", "INV-42", 100.00, "2025-03-20"),
            // close amount + counterparty = 75
            receipt(2, "Hetzner Online", "X", 97.00, "2025-05-01"),
        ];
        let candidates = score_candidates(&txn, &pool);
        assert_eq!(candidates[0].confidence, 83);
        assert_eq!(candidates[1].confidence, 75);
        let result = pick_best_match(&candidates);
        assert!(result.best_match.is_none());
        assert_eq!(result.other_matches.len(), 2);
    }

    fn ranked(id: i64, confidence: i32, is_partial_match: bool) -> MatchCandidate {
        MatchCandidate {
            receipt: receipt(id, "Zed", "", 1.0, "2025-03-01"),
            score: confidence,
            reasons: Vec::new(),
            confidence,
            is_partial_match,
            coverage_percent: if is_partial_match { 50 } else { 100 },
            amount_diff: 0.0,
            days_diff: 0,
        }
    }

    #[test]
    fn test_best_match_thresholds_inclusive() {
        // (confidences in rank order, expected best id)
        let cases: &[(&[i32], Option<i64>)] = &[
            (&[80], Some(1)),
            (&[79], None),
            (&[95, 80], Some(1)),
            (&[94, 80], None),
            (&[80, 65], Some(1)),
            (&[80, 66], None),
        ];
        for (confidences, expected) in cases {
            let candidates: Vec<MatchCandidate> = confidences
                .iter()
                .enumerate()
                .map(|(i, &c)| ranked(i as i64 + 1, c, false))
                .collect();
            let best = pick_best_match(&candidates).best_match.map(|c| c.receipt.id);
            assert_eq!(best, *expected, "confidences {confidences:?}");
        }
    }

    #[test]
    fn test_result_caps_with_best() {
        let mut candidates = vec![ranked(1, 100, false)];
        candidates.extend((2..=6).map(|id| ranked(id, 50, false)));
        candidates.extend((7..=9).map(|id| ranked(id, 40, true)));
        let result = pick_best_match(&candidates);
        assert_eq!(result.best_match.map(|c| c.receipt.id), Some(1));
        let others: Vec<i64> = result.other_matches.iter().map(|c| c.receipt.id).collect();
        assert_eq!(others, vec![2, 3, 4]);
        let partials: Vec<i64> = result.partial_matches.iter().map(|c| c.receipt.id).collect();
        assert_eq!(partials, vec![7, 8]);
    }

    #[test]
    fn test_result_caps_without_best() {
        let mut candidates: Vec<MatchCandidate> = (1..=6).map(|id| ranked(id, 60, false)).collect();
        candidates.extend((7..=9).map(|id| ranked(id, 40, true)));
        let result = pick_best_match(&candidates);
        assert!(result.best_match.is_none());
        let others: Vec<i64> = result.other_matches.iter().map(|c| c.receipt.id).collect();
        assert_eq!(others, vec![1, 2, 3, 4]);
        assert_eq!(result.partial_matches.len(), 2);
    }

    #[test]
    fn test_partial_bounds_exclusive() {
        let txn = outflow(100.00, "Nobody", "", "2025-04-10");
        let partial = |amount: f64| score_one(&txn, &receipt(1, "Zed", "", amount, "2025-04-10")).is_partial_match;
        assert!(!partial(10.00));
        assert!(partial(10.01));
        assert!(partial(89.99));
        assert!(!partial(90.00));
    }

    #[test]
    fn test_top_partial_blocks_best_regardless_of_score() {
        let txn = outflow(1000.00, "Acme", "PO-9", "2025-03-01");
        let pool = vec![receipt(1, "Acme", "PO-9", 500.00, "2025-03-01")];
        let candidates = score_candidates(&txn, &pool);
        assert!(candidates[0].confidence >= 80);
        assert!(pick_best_match(&candidates).best_match.is_none());
    }

    #[test]
    fn test_best_excluded_from_other_lists() {
        let txn = outflow(79.99, "LinkedIn", "", "2025-03-12");
        let pool = vec![
            receipt(1, "LinkedIn Ireland", "", 79.99, "2025-03-12"),
            receipt(2, "Other", "", 79.99, "2025-06-30"),
            receipt(3, "Other", "", 30.00, "2025-03-12"),
        ];
        let result = best_match_for(&txn, &pool);
        let best = result.best_match.clone().unwrap();
        assert!(result.other_matches.iter().all(|c| c.receipt.id != best.receipt.id));
        assert!(result.partial_matches.iter().all(|c| c.receipt.id != best.receipt.id));
        assert_eq!(result.other_matches.len(), 1);
        assert_eq!(result.partial_matches.len(), 1);
    }

    #[test]
    fn test_scores_positive_and_sorted() {
        let txn = outflow(250.00, "Deutsche Bahn", "ticket 4411", "2025-04-10");
        let pool = vec![
            receipt(1, "Nothing Alike", "", 9999.0, "2024-01-01"),
            receipt(2, "Deutsche Bahn Fernverkehr", "", 250.00, "2025-04-10"),
            receipt(3, "Bahn", "4411", 240.00, "2025-04-30"),
            receipt(4, "Random", "", 210.00, "2025-05-01"),
            receipt(5, "Random", "", 250.00, "2025-01-01"),
        ];
        let candidates = score_candidates(&txn, &pool);
        assert!(candidates.iter().all(|c| c.score > 0));
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(candidates.iter().all(|c| c.receipt.id != 1));
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let txn = outflow(50.00, "Nobody", "", "2025-04-10");
        let pool = vec![
            receipt(9, "Vendor One", "", 50.00, "2024-01-01"),
            receipt(3, "Vendor Two", "", 50.00, "2024-01-01"),
            receipt(5, "Vendor Three", "", 50.00, "2024-01-01"),
        ];
        let ids: Vec<i64> = score_candidates(&txn, &pool).iter().map(|c| c.receipt.id).collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }

    #[test]
    fn test_matched_receipts_excluded() {
        let txn = outflow(79.99, "LinkedIn", "", "2025-03-12");
        let mut r = receipt(1, "LinkedIn", "", 79.99, "2025-03-12");
        r.matched = true;
        assert!(score_candidates(&txn, &[r]).is_empty());
    }

    #[test]
    fn test_scoring_is_pure() {
        let txn = outflow(120.00, "Figma", "F-1", "2025-03-12");
        let pool = vec![
            receipt(1, "Figma Inc", "F-1", 120.00, "2025-03-09"),
            receipt(2, "Notion", "", 118.00, "2025-03-01"),
        ];
        let before = pool.clone();
        assert_eq!(score_candidates(&txn, &pool), score_candidates(&txn, &pool));
        assert_eq!(pool, before);
    }

    #[test]
    fn test_empty_pool() {
        let txn = outflow(10.0, "X", "", "2025-03-12");
        let result = best_match_for(&txn, &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_amount_tiers() {
        let txn = outflow(100.00, "Nobody", "", "2025-04-10");
        let far = "2024-01-01";
        let score = |amount: f64| score_candidates(&txn, &[receipt(1, "Zed", "", amount, far)]);
        assert_eq!(score(100.50)[0].score, 50);
        let close = score(104.00);
        assert_eq!(close[0].score, 35);
        assert_eq!(labels(&close[0]), vec!["Amount differs €4.00"]);
        assert_eq!(score(85.00)[0].score, 15);
        assert!(score(60.00).is_empty());
    }

    #[test]
    fn test_amount_tiers_on_exact_cent_boundaries() {
        let far = "2024-01-01";
        let scored = |gross: f64, amount: f64| {
            let txn = outflow(gross, "Nobody", "", "2025-04-10");
            score_candidates(&txn, &[receipt(1, "Zed", "", amount, far)])
        };
        // 1%
        let exact = scored(14.00, 14.14);
        assert_eq!(exact[0].score, 50);
        assert_eq!(labels(&exact[0]), vec!["Exact amount"]);
        // 5%
        assert_eq!(scored(11.00, 11.55)[0].score, 35);
        // 20%
        let near = scored(14.00, 11.20);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].score, 15);
        assert!(scored(14.00, 11.19).is_empty());
    }

    #[test]
    fn test_date_labels() {
        let txn = outflow(100.00, "Nobody", "", "2025-04-10");
        let date_label = |issued: &str| {
            let c = score_candidates(&txn, &[receipt(1, "Zed", "", 1.0, issued)]);
            (c[0].score, labels(&c[0]).first().map(|s| s.to_string()))
        };
        assert_eq!(date_label("2025-04-10"), (20, Some("Same day".to_string())));
        assert_eq!(date_label("2025-04-13"), (20, Some("Issued 3d after".to_string())));
        assert_eq!(date_label("2025-04-03"), (20, Some("Issued 7d before".to_string())));
        assert_eq!(date_label("2025-04-25"), (8, None));
    }

    #[test]
    fn test_date_falls_back_to_upload_date() {
        let txn = outflow(100.00, "Nobody", "", "2025-04-10");
        let mut r = receipt(1, "Zed", "", 1.0, "2025-04-10");
        r.issue_date = None;
        r.date = date("2025-04-09");
        let c = score_candidates(&txn, &[r]);
        assert_eq!(labels(&c[0]), vec!["Issued 1d before"]);
    }

    #[test]
    fn test_counterparty_fuzzy_rules() {
        assert!(counterparty_matches("Amazon Web Services EMEA", "amazon web services"));
        assert!(counterparty_matches("Hetzner Online GmbH", "HETZNER"));
        assert!(counterparty_matches("Google Cloud", "Payment to Google Ireland"));
        assert!(counterparty_matches("The Coffee Roasters", "coffee roasters berlin"));
        assert!(!counterparty_matches("Figma", "Notion Labs"));
        assert!(!counterparty_matches("Figma", ""));
    }

    #[test]
    fn test_inflow_uses_sender() {
        let mut txn = outflow(500.0, "Nobody", "", "2025-04-10");
        txn.amount = 500.0;
        txn.sender = "Kunde AG".to_string();
        let c = score_candidates(&txn, &[receipt(1, "Kunde AG", "", 500.0, "2024-01-01")]);
        assert!(labels(&c[0]).contains(&"Same counterparty"));
    }
}
