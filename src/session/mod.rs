//! Review pass over one month's uncategorized transactions.
//!
//! Each transaction moves through `CategorySelect` (pick a category or a
//! split, set tax) and then `DocumentLink` (optionally attach a receipt)
//! before the queue advances. Actions whose preconditions do not hold are
//! no-ops and return `false`.

pub mod record;
pub mod split;
pub mod tax;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::matcher::{best_match_for, MatchResult};
use crate::models::{CategorizedBy, Category, Month, Receipt, Rule, Transaction};
use crate::suggest::{suggest, Suggestion};

use record::{Assignment, CategorizationRecord, SessionEvent, PRIVATE_CATEGORY};
use split::SplitEditor;
use tax::TaxFields;

/// Taxonomy and suggestion rules the session consults.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub taxonomy: Vec<Category>,
    pub rules: Vec<Rule>,
}

impl Catalog {
    pub fn has_category(&self, label: &str) -> bool {
        self.taxonomy.iter().any(|c| c.label == label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftMode {
    Single { category: Option<String> },
    Split(SplitEditor),
}

/// Working fields while a category is being chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub mode: DraftMode,
    pub tax: TaxFields,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Linking {
    pub selected: Option<i64>,
    pub linked: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    CategorySelect(Draft),
    DocumentLink(Linking),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Browsing,
    Reviewing(Step),
    Success,
}

/// Transactions of `month` that still lack a category, by date then id.
pub fn needs_review(transactions: &[Transaction], month: Month) -> Vec<Transaction> {
    let mut queue: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.category.is_none() && month.contains(t.date))
        .cloned()
        .collect();
    queue.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    queue
}

pub struct CategorizationSession {
    month: Month,
    queue: Vec<Transaction>,
    catalog: Catalog,
    default_tax_rate: f64,
    index: usize,
    phase: Phase,
    skipped: BTreeSet<i64>,
    records: BTreeMap<i64, CategorizationRecord>,
    used_receipts: BTreeSet<i64>,
    events: Vec<SessionEvent>,
}

impl CategorizationSession {
    pub fn new(month: Month, transactions: &[Transaction], catalog: Catalog, default_tax_rate: f64) -> Self {
        Self {
            month,
            queue: needs_review(transactions, month),
            catalog,
            default_tax_rate,
            index: 0,
            phase: Phase::Browsing,
            skipped: BTreeSet::new(),
            records: BTreeMap::new(),
            used_receipts: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn queue(&self) -> &[Transaction] {
        &self.queue
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current(&self) -> Option<&Transaction> {
        match self.phase {
            Phase::Reviewing(_) => self.queue.get(self.index),
            _ => None,
        }
    }

    pub fn skipped(&self) -> &BTreeSet<i64> {
        &self.skipped
    }

    pub fn records(&self) -> &BTreeMap<i64, CategorizationRecord> {
        &self.records
    }

    pub fn draft(&self) -> Option<&Draft> {
        match &self.phase {
            Phase::Reviewing(Step::CategorySelect(d)) => Some(d),
            _ => None,
        }
    }

    pub fn linking(&self) -> Option<&Linking> {
        match &self.phase {
            Phase::Reviewing(Step::DocumentLink(l)) => Some(l),
            _ => None,
        }
    }

    pub fn is_split_mode(&self) -> bool {
        matches!(self.draft(), Some(Draft { mode: DraftMode::Split(_), .. }))
    }

    pub fn is_tax_rate_valid(&self) -> bool {
        self.draft().is_some_and(|d| d.tax.is_rate_valid())
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        match self.current() {
            Some(txn) => suggest(txn, &self.catalog.rules, &self.catalog.taxonomy),
            None => Vec::new(),
        }
    }

    /// Category that confirming would commit: the explicit choice, else the
    /// first suggestion.
    pub fn effective_category(&self) -> Option<(String, CategorizedBy)> {
        match &self.draft()?.mode {
            DraftMode::Single { category: Some(c) } => Some((c.clone(), CategorizedBy::Manual)),
            DraftMode::Single { category: None } => self
                .suggestions()
                .into_iter()
                .next()
                .map(|s| (s.category, CategorizedBy::Ai)),
            DraftMode::Split(_) => None,
        }
    }

    pub fn can_confirm(&self) -> bool {
        let Some(draft) = self.draft() else {
            return false;
        };
        if !draft.tax.is_rate_valid() {
            return false;
        }
        match &draft.mode {
            DraftMode::Single { .. } => self.effective_category().is_some(),
            DraftMode::Split(editor) => editor.can_confirm(),
        }
    }

    /// Candidate receipts for the current transaction. Receipts already
    /// linked earlier in this pass are left out.
    pub fn match_result(&self, pool: &[Receipt]) -> MatchResult {
        let Some(txn) = self.current() else {
            return MatchResult::default();
        };
        let available: Vec<Receipt> = pool
            .iter()
            .filter(|r| !self.used_receipts.contains(&r.id) || self.linking().and_then(|l| l.linked) == Some(r.id))
            .cloned()
            .collect();
        best_match_for(txn, &available)
    }

    /// (reviewed so far, total in queue)
    pub fn progress(&self) -> (usize, usize) {
        (self.index.min(self.queue.len()), self.queue.len())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Browsing || self.queue.is_empty() {
            return false;
        }
        self.index = 0;
        self.phase = Phase::Reviewing(Step::CategorySelect(self.fresh_draft()));
        debug!(month = %self.month, queued = self.queue.len(), "review started");
        true
    }

    fn fresh_draft(&self) -> Draft {
        let gross = self.queue.get(self.index).map(|t| t.gross()).unwrap_or_default();
        Draft {
            mode: DraftMode::Single { category: None },
            tax: TaxFields::new(gross, self.default_tax_rate),
            note: String::new(),
        }
    }

    fn current_id(&self) -> Option<i64> {
        self.current().map(|t| t.id)
    }

    fn draft_mut(&mut self) -> Option<&mut Draft> {
        match &mut self.phase {
            Phase::Reviewing(Step::CategorySelect(d)) => Some(d),
            _ => None,
        }
    }

    fn linking_mut(&mut self) -> Option<&mut Linking> {
        match &mut self.phase {
            Phase::Reviewing(Step::DocumentLink(l)) => Some(l),
            _ => None,
        }
    }

    fn split_mut(&mut self) -> Option<&mut SplitEditor> {
        match self.draft_mut() {
            Some(Draft { mode: DraftMode::Split(editor), .. }) => Some(editor),
            _ => None,
        }
    }

    /// Move to the next transaction; past the end the pass is done.
    fn next(&mut self) {
        self.index += 1;
        if self.index >= self.queue.len() {
            self.phase = Phase::Success;
            debug!(month = %self.month, committed = self.records.len(), skipped = self.skipped.len(), "review finished");
        } else {
            self.phase = Phase::Reviewing(Step::CategorySelect(self.fresh_draft()));
        }
    }

    fn emit_current(&mut self) {
        let Some(id) = self.current_id() else {
            return;
        };
        let Some(record) = self.records.get(&id).cloned() else {
            return;
        };
        let receipt_id = record.receipt_id;
        let needs_receipt = record.needs_receipt;
        self.events.push(SessionEvent::Categorized {
            transaction_id: id,
            record,
        });
        if let Some(receipt_id) = receipt_id {
            self.events.push(SessionEvent::ReceiptLinked {
                transaction_id: id,
                receipt_id,
            });
        }
        if needs_receipt {
            self.events.push(SessionEvent::FollowUp { transaction_id: id });
        }
    }

    // -----------------------------------------------------------------------
    // Category selection
    // -----------------------------------------------------------------------

    pub fn select_category(&mut self, label: &str) -> bool {
        if !self.catalog.has_category(label) {
            return false;
        }
        match self.draft_mut() {
            Some(Draft { mode: DraftMode::Single { category }, .. }) => {
                *category = Some(label.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn set_tax_rate(&mut self, rate: f64) -> bool {
        match self.draft_mut() {
            Some(d) => {
                d.tax.set_rate(rate);
                true
            }
            None => false,
        }
    }

    pub fn set_net_amount(&mut self, net: f64) -> bool {
        match self.draft_mut() {
            Some(d) => {
                d.tax.set_net(net);
                true
            }
            None => false,
        }
    }

    pub fn set_note(&mut self, note: &str) -> bool {
        match self.draft_mut() {
            Some(d) => {
                d.note = note.to_string();
                true
            }
            None => false,
        }
    }

    pub fn toggle_split(&mut self) -> bool {
        let Some(draft) = self.draft_mut() else {
            return false;
        };
        draft.mode = match &draft.mode {
            DraftMode::Single { category } => DraftMode::Split(SplitEditor::new(category.clone())),
            DraftMode::Split(editor) => DraftMode::Single {
                category: editor.rows().first().and_then(|r| r.category.clone()),
            },
        };
        true
    }

    pub fn add_split_row(&mut self) -> bool {
        match self.split_mut() {
            Some(editor) => {
                editor.add_row();
                true
            }
            None => false,
        }
    }

    pub fn remove_split_row(&mut self, index: usize) -> bool {
        self.split_mut().is_some_and(|e| e.remove_row(index))
    }

    pub fn set_split_percentage(&mut self, index: usize, percentage: i64) -> bool {
        self.split_mut().is_some_and(|e| e.set_percentage(index, percentage))
    }

    pub fn set_split_category(&mut self, index: usize, label: &str) -> bool {
        if !self.catalog.has_category(label) {
            return false;
        }
        self.split_mut().is_some_and(|e| e.set_category(index, label))
    }

    /// Write the interim record and move on to document linking.
    pub fn confirm_category(&mut self) -> bool {
        if !self.can_confirm() {
            return false;
        }
        let (Some(txn), Some(draft)) = (self.current(), self.draft()) else {
            return false;
        };
        let (assignment, categorized_by) = match &draft.mode {
            DraftMode::Split(editor) => match editor.lines(txn.amount) {
                Some(lines) => (Assignment::Split(lines), CategorizedBy::Manual),
                None => return false,
            },
            DraftMode::Single { .. } => match self.effective_category() {
                Some((category, by)) => (
                    Assignment::Single {
                        is_private: category == PRIVATE_CATEGORY,
                        category,
                    },
                    by,
                ),
                None => return false,
            },
        };
        let id = txn.id;
        let record = CategorizationRecord {
            assignment,
            note: draft.note.trim().to_string(),
            tax_rate: draft.tax.rate(),
            categorized_by,
            receipt_id: None,
            needs_receipt: false,
        };
        debug!(transaction_id = id, category = record.primary_category(), "category confirmed");
        self.records.insert(id, record);
        self.phase = Phase::Reviewing(Step::DocumentLink(Linking::default()));
        true
    }

    pub fn confirm_split(&mut self) -> bool {
        self.is_split_mode() && self.confirm_category()
    }

    // -----------------------------------------------------------------------
    // Document linking
    // -----------------------------------------------------------------------

    pub fn select_receipt(&mut self, receipt_id: i64) -> bool {
        if self.used_receipts.contains(&receipt_id) {
            return false;
        }
        match self.linking_mut() {
            Some(l) if l.linked.is_none() => {
                l.selected = Some(receipt_id);
                true
            }
            _ => false,
        }
    }

    pub fn match_receipt(&mut self) -> bool {
        let Some(id) = self.current_id() else {
            return false;
        };
        let receipt_id = match self.linking_mut() {
            Some(l) if l.linked.is_none() => match l.selected {
                Some(r) => {
                    l.linked = Some(r);
                    r
                }
                None => return false,
            },
            _ => return false,
        };
        if let Some(record) = self.records.get_mut(&id) {
            record.receipt_id = Some(receipt_id);
        }
        self.used_receipts.insert(receipt_id);
        debug!(transaction_id = id, receipt_id, "receipt matched");
        true
    }

    /// Drop the most recent link of the current transaction.
    pub fn undo_match(&mut self) -> bool {
        let Some(id) = self.current_id() else {
            return false;
        };
        let receipt_id = match self.linking_mut() {
            Some(l) => match l.linked.take() {
                Some(r) => r,
                None => return false,
            },
            None => return false,
        };
        if let Some(record) = self.records.get_mut(&id) {
            record.receipt_id = None;
        }
        self.used_receipts.remove(&receipt_id);
        debug!(transaction_id = id, receipt_id, "match undone");
        true
    }

    /// Commit the current record and move to the next transaction.
    pub fn advance(&mut self) -> bool {
        if self.linking().is_none() {
            return false;
        }
        self.emit_current();
        self.next();
        true
    }

    /// Leave linking for later.
    pub fn later(&mut self) -> bool {
        match self.linking() {
            Some(l) if l.linked.is_none() => self.advance(),
            _ => false,
        }
    }

    /// No receipt exists; flag the transaction for follow-up and advance.
    pub fn no_receipt(&mut self) -> bool {
        match self.linking() {
            Some(l) if l.linked.is_none() => {}
            _ => return false,
        }
        if let Some(id) = self.current_id() {
            if let Some(record) = self.records.get_mut(&id) {
                record.needs_receipt = true;
            }
        }
        self.advance()
    }

    // -----------------------------------------------------------------------
    // Shortcuts
    // -----------------------------------------------------------------------

    pub fn skip(&mut self) -> bool {
        let Some(id) = self.current_id() else {
            return false;
        };
        if let Some(receipt_id) = self.linking().and_then(|l| l.linked) {
            self.used_receipts.remove(&receipt_id);
        }
        self.records.remove(&id);
        self.skipped.insert(id);
        debug!(transaction_id = id, "skipped");
        self.next();
        true
    }

    pub fn mark_private(&mut self) -> bool {
        if self.draft().is_none() {
            return false;
        }
        let Some(id) = self.current_id() else {
            return false;
        };
        self.records.insert(id, CategorizationRecord::private());
        debug!(transaction_id = id, "marked private");
        self.emit_current();
        self.next();
        true
    }
}
