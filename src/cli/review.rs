use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{LineGauge, Paragraph},
    Frame,
};

use crate::cli::{open_db, parse_month_opt};
use crate::error::Result;
use crate::fmt::{money, rate};
use crate::matcher::MatchCandidate;
use crate::models::{Category, Receipt};
use crate::reviewer::{apply_events, list_transactions_needing_categorization, list_unmatched_receipts, load_catalog};
use crate::session::tax::parse_decimal;
use crate::session::record::SessionEvent;
use crate::session::{CategorizationSession, DraftMode, Phase, Step};
use crate::settings::load_settings;
use crate::tui::{
    confidence_style, money_span, run_screen, score_span, wrap_text, ScreenAction, Screen, ERROR_STYLE, FOOTER_STYLE,
    HEADER_STYLE, SELECTED_STYLE,
};

const MAX_FILTERED: usize = 6;
const SPLIT_STEP: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Category,
    Split,
    TaxRate,
    Net,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Browsing,
    Draft,
    Link,
    Done,
}

/// Key handling and rendering around a [`CategorizationSession`]. Every key
/// maps onto one named session operation; the session itself never sees
/// key events.
struct ReviewScreen {
    session: CategorizationSession,
    pool: Vec<Receipt>,
    focus: Focus,
    query: String,
    query_selection: usize,
    input: String,
    split_cursor: usize,
    link_cursor: usize,
    seen: (View, usize),
    notice: Option<String>,
}

impl ReviewScreen {
    fn new(session: CategorizationSession, pool: Vec<Receipt>) -> Self {
        let index = session.index();
        Self {
            session,
            pool,
            focus: Focus::Category,
            query: String::new(),
            query_selection: 0,
            input: String::new(),
            split_cursor: 0,
            link_cursor: 0,
            seen: (View::Browsing, index),
            notice: None,
        }
    }

    fn view(&self) -> View {
        match self.session.phase() {
            Phase::Browsing => View::Browsing,
            Phase::Reviewing(Step::CategorySelect(_)) => View::Draft,
            Phase::Reviewing(Step::DocumentLink(_)) => View::Link,
            Phase::Success => View::Done,
        }
    }

    /// Reset per-step input state whenever the session moved on.
    fn sync(&mut self) {
        let now = (self.view(), self.session.index());
        if now == self.seen {
            return;
        }
        self.seen = now;
        self.focus = Focus::Category;
        self.query.clear();
        self.query_selection = 0;
        self.input.clear();
        self.split_cursor = 0;
        self.link_cursor = 0;
        if now.0 == View::Link {
            if let Some(best) = self.session.match_result(&self.pool).best_match {
                self.session.select_receipt(best.receipt.id);
            }
        }
    }

    fn candidates(&self) -> Vec<MatchCandidate> {
        self.session.match_result(&self.pool).all().cloned().collect()
    }

    fn filtered_categories(&self) -> Vec<&Category> {
        if self.query.is_empty() {
            return vec![];
        }
        let q = self.query.to_lowercase();
        self.session
            .catalog()
            .taxonomy
            .iter()
            .filter(|c| c.label.to_lowercase().contains(&q) || c.breadcrumb().to_lowercase().contains(&q))
            .take(MAX_FILTERED)
            .collect()
    }

    fn split_rows(&self) -> usize {
        match self.session.draft().map(|d| &d.mode) {
            Some(DraftMode::Split(editor)) => editor.rows().len(),
            _ => 0,
        }
    }

    fn focus_order(&self) -> Vec<Focus> {
        if self.session.is_split_mode() {
            vec![Focus::Category, Focus::Split, Focus::TaxRate, Focus::Net, Focus::Note]
        } else {
            vec![Focus::Category, Focus::TaxRate, Focus::Net, Focus::Note]
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.load_input();
    }

    /// Seed the edit buffer of the focused field from the draft.
    fn load_input(&mut self) {
        let Some(draft) = self.session.draft() else {
            self.input.clear();
            return;
        };
        self.input = match self.focus {
            Focus::TaxRate => draft.tax.rate().to_string(),
            Focus::Net => format!("{:.2}", draft.tax.net()),
            Focus::Note => draft.note.clone(),
            Focus::Split => match &draft.mode {
                DraftMode::Split(editor) => editor
                    .rows()
                    .get(self.split_cursor)
                    .map(|r| r.percentage.to_string())
                    .unwrap_or_default(),
                DraftMode::Single { .. } => String::new(),
            },
            Focus::Category => String::new(),
        };
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        self.set_focus(order[next]);
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    fn browsing_key(&mut self, code: KeyCode) -> ScreenAction {
        match code {
            KeyCode::Enter => {
                if !self.session.start() {
                    self.notice = Some("Nothing to review.".into());
                }
                ScreenAction::Continue
            }
            KeyCode::Esc | KeyCode::Char('q') => ScreenAction::Close,
            _ => ScreenAction::Continue,
        }
    }

    fn draft_key(&mut self, key: KeyEvent) -> ScreenAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    self.session.toggle_split();
                    self.split_cursor = 0;
                    self.set_focus(Focus::Category);
                }
                KeyCode::Char('p') => {
                    self.session.mark_private();
                }
                KeyCode::Char('k') => {
                    self.session.skip();
                }
                KeyCode::Char('n') => {
                    if self.session.add_split_row() {
                        self.split_cursor = self.split_rows().saturating_sub(1);
                        self.set_focus(Focus::Split);
                    }
                }
                KeyCode::Char('d') => {
                    if self.session.remove_split_row(self.split_cursor) {
                        self.split_cursor = self.split_cursor.min(self.split_rows().saturating_sub(1));
                        self.load_input();
                    } else {
                        self.notice = Some("A split needs at least two rows.".into());
                    }
                }
                _ => {}
            }
            return ScreenAction::Continue;
        }

        match key.code {
            KeyCode::Esc => return ScreenAction::Close,
            KeyCode::Tab => self.cycle_focus(true),
            KeyCode::BackTab => self.cycle_focus(false),
            KeyCode::Enter => self.submit(),
            code => match self.focus {
                Focus::Category => self.category_key(code),
                Focus::Split => self.split_key(code),
                Focus::TaxRate | Focus::Net => self.number_key(code),
                Focus::Note => self.note_key(code),
            },
        }
        ScreenAction::Continue
    }

    fn category_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => {
                self.query.push(c);
                self.query_selection = 0;
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.query_selection = 0;
            }
            KeyCode::Up => self.query_selection = self.query_selection.saturating_sub(1),
            KeyCode::Down => {
                let n = self.filtered_categories().len();
                if n > 0 {
                    self.query_selection = (self.query_selection + 1).min(n - 1);
                }
            }
            _ => {}
        }
    }

    fn split_key(&mut self, code: KeyCode) {
        let current = self.input.parse::<i64>().unwrap_or(0);
        match code {
            KeyCode::Up => {
                self.split_cursor = self.split_cursor.saturating_sub(1);
                self.load_input();
            }
            KeyCode::Down => {
                self.split_cursor = (self.split_cursor + 1).min(self.split_rows().saturating_sub(1));
                self.load_input();
            }
            KeyCode::Left | KeyCode::Right => {
                let delta = if code == KeyCode::Left { -SPLIT_STEP } else { SPLIT_STEP };
                self.session.set_split_percentage(self.split_cursor, current + delta);
                self.load_input();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.input.push(c);
                let value = self.input.parse::<i64>().unwrap_or(0);
                self.session.set_split_percentage(self.split_cursor, value);
                self.load_input();
            }
            KeyCode::Backspace => {
                self.input.pop();
                let value = self.input.parse::<i64>().unwrap_or(0);
                self.session.set_split_percentage(self.split_cursor, value);
                if !self.input.is_empty() {
                    self.load_input();
                }
            }
            _ => {}
        }
    }

    fn number_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() || c == ',' || c == '.' => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            _ => return,
        }
        let Some(value) = parse_decimal(&self.input) else {
            return;
        };
        if self.focus == Focus::TaxRate {
            self.session.set_tax_rate(value);
        } else {
            self.session.set_net_amount(value);
        }
    }

    fn note_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            _ => return,
        }
        let note = self.input.clone();
        self.session.set_note(&note);
    }

    /// Enter picks the highlighted category when filtering, otherwise tries
    /// to confirm the draft.
    fn submit(&mut self) {
        if self.focus == Focus::Category && !self.query.is_empty() {
            let picked = self
                .filtered_categories()
                .get(self.query_selection)
                .map(|c| c.label.clone());
            if let Some(label) = picked {
                if self.session.is_split_mode() {
                    self.session.set_split_category(self.split_cursor, &label);
                } else {
                    self.session.select_category(&label);
                }
                self.query.clear();
                self.query_selection = 0;
            }
            return;
        }

        let confirmed = if self.session.is_split_mode() {
            self.session.confirm_split()
        } else {
            self.session.confirm_category()
        };
        if !confirmed {
            self.notice = Some(if !self.session.is_tax_rate_valid() {
                "Tax rate must be between 0 and 100.".into()
            } else if self.session.is_split_mode() {
                "Split rows must total 100% and each needs a category.".into()
            } else {
                "Pick a category first (type to search).".into()
            });
        }
    }

    fn link_key(&mut self, key: KeyEvent) -> ScreenAction {
        let linked = self.session.linking().and_then(|l| l.linked);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return ScreenAction::Close,
            KeyCode::Char('k') if ctrl => {
                self.session.skip();
            }
            KeyCode::Up | KeyCode::Down if linked.is_none() => {
                let candidates = self.candidates();
                if candidates.is_empty() {
                    return ScreenAction::Continue;
                }
                self.link_cursor = if key.code == KeyCode::Up {
                    self.link_cursor.saturating_sub(1)
                } else {
                    (self.link_cursor + 1).min(candidates.len() - 1)
                };
                self.session.select_receipt(candidates[self.link_cursor].receipt.id);
            }
            KeyCode::Enter => {
                if linked.is_some() {
                    self.session.advance();
                } else if !self.session.match_receipt() {
                    self.notice = Some("Select a receipt, or press l (later) / n (no receipt).".into());
                }
            }
            KeyCode::Char('u') => {
                self.session.undo_match();
            }
            KeyCode::Char('l') => {
                if !self.session.later() {
                    self.notice = Some("Undo the match first (u), or Enter to continue.".into());
                }
            }
            KeyCode::Char('n') => {
                if !self.session.no_receipt() {
                    self.notice = Some("Undo the match first (u), or Enter to continue.".into());
                }
            }
            _ => {}
        }
        ScreenAction::Continue
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let (done, total) = self.session.progress();
        let ratio = if total == 0 { 1.0 } else { done as f64 / total as f64 };
        let [title_area, gauge_area] =
            Layout::horizontal([Constraint::Length(22), Constraint::Fill(1)]).areas(area);
        frame.render_widget(
            Paragraph::new(Span::styled(format!("Review {}", self.session.month()), HEADER_STYLE)),
            title_area,
        );
        let gauge = LineGauge::default()
            .label(format!("{done} of {total}"))
            .ratio(ratio)
            .filled_style(Style::default().fg(Color::Green).bold())
            .unfilled_style(Style::default().fg(Color::DarkGray))
            .line_set(ratatui::symbols::line::THICK);
        frame.render_widget(gauge, gauge_area);
    }

    fn detail_lines(&self) -> Vec<Line<'static>> {
        let Some(txn) = self.session.current() else {
            return vec![];
        };
        vec![
            Line::from(""),
            Line::from(format!("  Date:          {}", txn.date)),
            Line::from(format!("  Counterparty:  {}", txn.counterparty())),
            Line::from(format!("  Reference:     {}", txn.reference)),
            Line::from(vec![Span::raw("  Amount:        "), money_span(txn.amount)]),
            Line::from(""),
        ]
    }

    fn field_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            SELECTED_STYLE
        } else {
            Style::default()
        }
    }

    fn draft_lines(&self) -> Vec<Line<'static>> {
        let Some(draft) = self.session.draft() else {
            return vec![];
        };
        let mut lines = Vec::new();

        let suggestions = self.session.suggestions();
        if suggestions.is_empty() {
            lines.push(Line::from(Span::styled("  No suggestions", FOOTER_STYLE)));
        } else {
            let mut spans = vec![Span::raw("  Suggested: ")];
            for (i, s) in suggestions.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw("  "));
                }
                spans.push(Span::raw(s.category.clone()));
                spans.push(Span::styled(format!(" ({})", s.confidence.label()), confidence_style(s.confidence)));
            }
            lines.push(Line::from(spans));
        }

        match &draft.mode {
            DraftMode::Single { .. } => {
                let chosen = match self.session.effective_category() {
                    Some((label, by)) => format!("{label} [{}]", by.as_str()),
                    None => "(none)".to_string(),
                };
                lines.push(Line::from(format!("  Category:    {chosen}")));
            }
            DraftMode::Split(editor) => {
                let total_style = if editor.total() == 100 { Style::default() } else { ERROR_STYLE };
                lines.push(Line::from(vec![
                    Span::raw("  Split        "),
                    Span::styled(format!("total {}%", editor.total()), total_style),
                ]));
                for (i, row) in editor.rows().iter().enumerate() {
                    let marker = if i == self.split_cursor { ">" } else { " " };
                    let style = if i == self.split_cursor && self.focus == Focus::Split {
                        SELECTED_STYLE
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(Span::styled(
                        format!(
                            "  {marker} {:>3}%  {}",
                            row.percentage,
                            row.category.as_deref().unwrap_or("(pick a category)")
                        ),
                        style,
                    )));
                }
            }
        }

        let rate_style = if draft.tax.is_rate_valid() {
            self.field_style(Focus::TaxRate)
        } else {
            ERROR_STYLE
        };
        let rate_text = if self.focus == Focus::TaxRate {
            format!("{}\u{2588}", self.input)
        } else {
            rate(draft.tax.rate())
        };
        let net_text = if self.focus == Focus::Net {
            format!("{}\u{2588}", self.input)
        } else {
            money(draft.tax.net())
        };
        let mut tax_line = vec![
            Span::raw("  Tax rate:    "),
            Span::styled(rate_text, rate_style),
            Span::raw("   Net: "),
            Span::styled(net_text, self.field_style(Focus::Net)),
            Span::raw(format!("   Tax: {}", money(draft.tax.tax_amount()))),
        ];
        if draft.tax.net_exceeds_gross() {
            tax_line.push(Span::styled("  net exceeds gross", Style::default().fg(Color::Yellow)));
        }
        lines.push(Line::from(tax_line));

        let note_text = if self.focus == Focus::Note {
            format!("{}\u{2588}", self.input)
        } else {
            draft.note.clone()
        };
        lines.push(Line::from(vec![
            Span::raw("  Note:        "),
            Span::styled(note_text, self.field_style(Focus::Note)),
        ]));

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("  Search: "),
            Span::styled(format!("{}\u{2588}", self.query), self.field_style(Focus::Category)),
        ]));
        let matches = self.filtered_categories();
        if !self.query.is_empty() && matches.is_empty() {
            lines.push(Line::from(Span::styled("    (no matches)", FOOTER_STYLE)));
        }
        for (i, cat) in matches.iter().enumerate() {
            let marker = if i == self.query_selection { ">" } else { " " };
            lines.push(Line::from(format!("  {marker} {} {}  ({})", cat.icon, cat.label, cat.breadcrumb())));
        }
        lines
    }

    fn link_lines(&self, width: usize) -> Vec<Line<'static>> {
        let Some(linking) = self.session.linking() else {
            return vec![];
        };
        let candidates = self.candidates();
        let mut lines = vec![Line::from(Span::styled("  Attach a receipt", HEADER_STYLE))];
        if candidates.is_empty() {
            lines.push(Line::from(Span::styled("  No receipt candidates.", FOOTER_STYLE)));
        }
        for (i, c) in candidates.iter().enumerate() {
            let id = c.receipt.id;
            let marker = if linking.linked == Some(id) {
                "\u{2713}"
            } else if linking.selected == Some(id) {
                ">"
            } else {
                " "
            };
            let style = if i == self.link_cursor { SELECTED_STYLE } else { Style::default() };
            let mut spans = vec![
                Span::raw(format!("  {marker} ")),
                score_span(c.confidence),
                Span::styled(
                    format!(
                        "  {:<24} {:<12} {:>12}",
                        c.receipt.vendor_name,
                        c.receipt.invoice_number,
                        money(c.receipt.amount)
                    ),
                    style,
                ),
            ];
            if c.is_partial_match {
                spans.push(Span::styled(
                    format!("  partial {}%", c.coverage_percent),
                    Style::default().fg(Color::Yellow),
                ));
            }
            lines.push(Line::from(spans));
        }
        if let Some(c) = candidates.get(self.link_cursor) {
            let reasons = c.reasons.iter().map(|r| r.label.as_str()).collect::<Vec<_>>().join(", ");
            let (wrapped, _) = wrap_text(&reasons, width.saturating_sub(6));
            lines.push(Line::from(""));
            for l in wrapped.lines() {
                lines.push(Line::from(Span::styled(format!("    {l}"), FOOTER_STYLE)));
            }
        }
        lines
    }

    fn done_lines(&self) -> Vec<Line<'static>> {
        let (_, total) = self.session.progress();
        vec![
            Line::from(""),
            Line::from(Span::styled("  All done!", HEADER_STYLE)),
            Line::from(format!("  Categorized: {}", self.session.records().len())),
            Line::from(format!("  Skipped:     {}", self.session.skipped().len())),
            Line::from(format!("  In queue:    {total}")),
        ]
    }

    fn hints(&self) -> &'static str {
        match self.view() {
            View::Browsing => "Enter=start, Esc=quit",
            View::Draft => {
                "Type to search, Enter=select/confirm, Tab=next field, Ctrl+S=split, Ctrl+N/D=add/remove row, \
                 Ctrl+P=private, Ctrl+K=skip, Esc=quit"
            }
            View::Link => "Up/Down=select, Enter=match/continue, u=undo, l=later, n=no receipt, Ctrl+K=skip, Esc=quit",
            View::Done => "Enter=finish",
        }
    }
}

impl Screen for ReviewScreen {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, detail_area, body_area, notice_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(6),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .areas(area);

        self.draw_header(frame, header_area);
        frame.render_widget(Paragraph::new(self.detail_lines()), detail_area);

        let body = match self.view() {
            View::Browsing => {
                let (_, total) = self.session.progress();
                vec![
                    Line::from(""),
                    Line::from(format!("  {total} transactions need a category.")),
                ]
            }
            View::Draft => self.draft_lines(),
            View::Link => self.link_lines(body_area.width as usize),
            View::Done => self.done_lines(),
        };
        frame.render_widget(Paragraph::new(body), body_area);

        if let Some(notice) = &self.notice {
            frame.render_widget(Paragraph::new(Span::styled(format!("  {notice}"), ERROR_STYLE)), notice_area);
        }
        let (hints, _) = wrap_text(self.hints(), hints_area.width as usize);
        frame.render_widget(Paragraph::new(hints).style(FOOTER_STYLE), hints_area);
    }

    fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ScreenAction::Close;
        }
        self.notice = None;
        let action = match self.view() {
            View::Browsing => self.browsing_key(key.code),
            View::Draft => self.draft_key(key),
            View::Link => self.link_key(key),
            View::Done => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => ScreenAction::Close,
                _ => ScreenAction::Continue,
            },
        };
        self.sync();
        action
    }
}

/// Transactions left without a committed category after the pass.
fn still_open(total: usize, events: &[SessionEvent]) -> usize {
    let done: HashSet<i64> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Categorized { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        })
        .collect();
    total.saturating_sub(done.len())
}

pub fn run(month: Option<&str>) -> Result<()> {
    let month = parse_month_opt(month)?;
    let settings = load_settings();
    let mut conn = open_db()?;

    let open = list_transactions_needing_categorization(&conn, month)?;
    if open.is_empty() {
        println!("Nothing to review in {month}.");
        return Ok(());
    }
    let catalog = load_catalog(&conn)?;
    let pool = list_unmatched_receipts(&conn)?;
    let session = CategorizationSession::new(month, &open, catalog, settings.default_tax_rate);

    let mut screen = ReviewScreen::new(session, pool);
    let ui_result = run_screen(&mut screen);

    // whatever was finished before quitting is kept
    let events = screen.session.drain_events();
    let applied = apply_events(&mut conn, &events)?;
    ui_result?;

    println!(
        "{} categorized, {} receipts linked, {} flagged for follow-up",
        applied.categorized, applied.linked, applied.flagged
    );
    let remaining = still_open(open.len(), &events);
    if remaining > 0 {
        println!("{remaining} still open in {month}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Month, Rule, Transaction};
    use crate::session::record::Assignment;
    use crate::session::Catalog;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn txn(id: i64, day: u32, amount: f64, recipient: &str) -> Transaction {
        Transaction {
            id,
            date: date(day),
            amount,
            sender: "Studio Nord".to_string(),
            recipient: recipient.to_string(),
            reference: String::new(),
            bank_id: 1,
            category: None,
            categorized_by: None,
            has_attachment: false,
            is_private: false,
        }
    }

    fn cat(label: &str) -> Category {
        Category {
            id: label.to_lowercase(),
            label: label.to_string(),
            icon: String::new(),
            path: vec!["Operating".to_string(), label.to_string()],
        }
    }

    fn screen() -> ReviewScreen {
        let catalog = Catalog {
            taxonomy: vec![cat("Advertising & Marketing"), cat("Travel"), cat("Meals"), cat("Private")],
            rules: vec![Rule {
                id: 1,
                pattern: "linkedin".to_string(),
                match_type: "contains".to_string(),
                category: "Advertising & Marketing".to_string(),
                priority: 10,
            }],
        };
        let txns = vec![txn(1, 12, -79.99, "LinkedIn Ireland"), txn(2, 18, -129.90, "DB Fernverkehr")];
        let pool = vec![Receipt {
            id: 10,
            vendor_name: "LinkedIn Ireland".to_string(),
            invoice_number: "LI-7781".to_string(),
            amount: 79.99,
            date: date(10),
            issue_date: None,
            matched: false,
        }];
        let session = CategorizationSession::new(Month::new(2025, 3).unwrap(), &txns, catalog, 19.0);
        ReviewScreen::new(session, pool)
    }

    fn press(s: &mut ReviewScreen, code: KeyCode) -> ScreenAction {
        s.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(s: &mut ReviewScreen, c: char) {
        s.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_str(s: &mut ReviewScreen, text: &str) {
        for c in text.chars() {
            press(s, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_suggested_category_and_best_match_flow() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Draft);

        // Enter with empty search confirms the suggested default
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Link);
        assert_eq!(s.session.linking().unwrap().selected, Some(10));

        press(&mut s, KeyCode::Enter);
        assert_eq!(s.session.linking().unwrap().linked, Some(10));
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Draft);
        assert_eq!(s.session.index(), 1);

        let events = s.session.drain_events();
        assert!(events.contains(&SessionEvent::ReceiptLinked {
            transaction_id: 1,
            receipt_id: 10
        }));
    }

    #[test]
    fn test_search_selects_category() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        type_str(&mut s, "trav");
        assert_eq!(s.filtered_categories().len(), 1);
        press(&mut s, KeyCode::Enter);
        assert!(s.query.is_empty());
        assert_eq!(s.session.effective_category().map(|(c, _)| c), Some("Travel".to_string()));
    }

    #[test]
    fn test_invalid_tax_rate_blocks_confirm() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Tab);
        assert_eq!(s.focus, Focus::TaxRate);
        assert_eq!(s.input, "19");
        press(&mut s, KeyCode::Backspace);
        press(&mut s, KeyCode::Backspace);
        type_str(&mut s, "150");
        assert!(!s.session.is_tax_rate_valid());

        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Draft);
        assert!(s.notice.is_some());

        press(&mut s, KeyCode::Backspace);
        press(&mut s, KeyCode::Backspace);
        type_str(&mut s, "0");
        assert!(s.session.is_tax_rate_valid());
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Link);
    }

    #[test]
    fn test_split_keys() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        ctrl(&mut s, 's');
        assert!(s.session.is_split_mode());

        type_str(&mut s, "adv");
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Tab);
        assert_eq!(s.focus, Focus::Split);
        press(&mut s, KeyCode::Right);
        assert_eq!(s.input, "55");

        press(&mut s, KeyCode::Down);
        assert_eq!(s.input, "45");
        press(&mut s, KeyCode::BackTab);
        type_str(&mut s, "meal");
        press(&mut s, KeyCode::Enter);

        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Link);
        match &s.session.records()[&1].assignment {
            Assignment::Split(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[0].percentage, 55);
                assert_eq!(lines[1].category, "Meals");
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn test_private_skip_and_finish() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        ctrl(&mut s, 'p');
        assert_eq!(s.session.index(), 1);
        ctrl(&mut s, 'k');
        assert_eq!(s.view(), View::Done);
        assert!(s.session.skipped().contains(&2));
        assert!(matches!(press(&mut s, KeyCode::Enter), ScreenAction::Close));
    }

    #[test]
    fn test_no_receipt_flags_follow_up() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Link);
        press(&mut s, KeyCode::Char('n'));
        assert_eq!(s.session.index(), 1);
        assert!(s
            .session
            .drain_events()
            .contains(&SessionEvent::FollowUp { transaction_id: 1 }));
    }

    #[test]
    fn test_quit_while_linking_leaves_transaction_open() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.view(), View::Link);
        assert!(s.session.records().contains_key(&1));
        assert!(matches!(press(&mut s, KeyCode::Esc), ScreenAction::Close));

        let events = s.session.drain_events();
        assert!(events.is_empty());
        assert_eq!(still_open(2, &events), 2);
    }

    #[test]
    fn test_still_open_counts_categorized_once() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Enter);
        press(&mut s, KeyCode::Char('n'));
        let events = s.session.drain_events();
        assert!(events.len() > 1);
        assert_eq!(still_open(2, &events), 1);
    }

    #[test]
    fn test_ctrl_c_closes_anywhere() {
        let mut s = screen();
        press(&mut s, KeyCode::Enter);
        let action = s.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(matches!(action, ScreenAction::Close));
    }
}
