use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Tabs, Wrap};
use ratatui::{Frame, Terminal};

use crate::core::time::display_timestamp;
use crate::core::types::{EventType, LabelKind, RiskTier};
use crate::pipeline::classifier::{badge_label, confidence_display, TierScheme};
use crate::session::export::{ExportClock, ExportEvent, ExportOption, ExportStage};
use crate::session::navigation::{Payload, Session, View};

const TABS: [View; 5] = [
    View::Dashboard,
    View::Timeline,
    View::Chat,
    View::Media,
    View::Poi,
];

pub fn run_tui(session: Session) -> Result<()> {
    let mut app = App::new(session);
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| draw(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key.code) {
                    break;
                }
            }
        }

        app.poll_export(Instant::now());
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            app.tick = app.tick.wrapping_add(1);
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

struct App {
    session: Session,
    selected: usize,
    status: String,
    show_detail: bool,
    show_help: bool,
    editing_search: bool,
    /// Row of `ExportOption::ALL` under the cursor in the export panel.
    export_cursor: usize,
    export_clock: Option<ExportClock>,
    tick: usize,
}

impl App {
    fn new(session: Session) -> Self {
        Self {
            session,
            selected: 0,
            status: "←/→ view | ↑/↓ move | Enter detail | e export | ? help | q quit".to_string(),
            show_detail: false,
            show_help: false,
            editing_search: false,
            export_cursor: 0,
            export_clock: None,
            tick: 0,
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_search {
            self.edit_search(code);
            return false;
        }
        if self.session.export().is_some() {
            return self.handle_export_key(code);
        }
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                self.show_detail = false;
                self.show_help = false;
            }
            KeyCode::Right | KeyCode::Tab => self.cycle_view(1),
            KeyCode::Left | KeyCode::BackTab => self.cycle_view(TABS.len() - 1),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.go(TABS[idx], Payload::None);
            }
            KeyCode::Up => self.prev(),
            KeyCode::Down => self.next(),
            KeyCode::Enter => self.activate(),
            KeyCode::Char('s') => self.toggle_suspicious(),
            KeyCode::Char('/') if self.session.current_view() == View::Chat => {
                self.editing_search = true;
                self.status = "search: type, Enter to finish".to_string();
            }
            KeyCode::Char('t') if self.session.current_view() == View::Timeline => {
                self.cycle_event_types()
            }
            KeyCode::Char('l') if self.session.current_view() == View::Media => {
                self.cycle_labels()
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_threshold(5),
            KeyCode::Char('-') => self.adjust_threshold(-5),
            KeyCode::Char('b') | KeyCode::Backspace => self.back(),
            KeyCode::Char('e') => {
                self.export_cursor = 0;
                self.go(View::Export, Payload::None);
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                if self.show_help {
                    self.show_detail = false;
                }
            }
            _ => {}
        }
        false
    }

    fn handle_export_key(&mut self, code: KeyCode) -> bool {
        let stage = self.session.export().map(|j| j.stage());
        let result = match (code, stage) {
            (KeyCode::Char('g'), Some(ExportStage::Config)) => {
                let started = self.session.export_mut().map(|job| job.generate());
                match self.session.export().map(|j| (j.stage(), j.error())) {
                    Some((ExportStage::Progress, _)) => {
                        self.export_clock = Some(ExportClock::start(Instant::now()));
                    }
                    Some((ExportStage::Error, Some(reason))) => {
                        self.status = format!("export failed: {reason}");
                    }
                    _ => {}
                }
                started.unwrap_or(Ok(()))
            }
            (KeyCode::Up, Some(ExportStage::Config)) => {
                self.export_cursor = self
                    .export_cursor
                    .checked_sub(1)
                    .unwrap_or(ExportOption::ALL.len() - 1);
                Ok(())
            }
            (KeyCode::Down, Some(ExportStage::Config)) => {
                self.export_cursor = (self.export_cursor + 1) % ExportOption::ALL.len();
                Ok(())
            }
            (KeyCode::Char(' '), Some(ExportStage::Config)) => {
                let option = ExportOption::ALL[self.export_cursor % ExportOption::ALL.len()];
                self.session
                    .export_mut()
                    .map(|job| {
                        let on = job.options().get(option);
                        job.set_option(option, !on)
                    })
                    .unwrap_or(Ok(()))
            }
            (KeyCode::Char('f'), Some(ExportStage::Config)) => self
                .session
                .export_mut()
                .map(|job| {
                    let next = job.format().next();
                    job.set_format(next)
                })
                .unwrap_or(Ok(())),
            (KeyCode::Char('r'), Some(ExportStage::Complete | ExportStage::Error)) => {
                self.export_clock = None;
                self.session
                    .export_mut()
                    .map(|job| job.reset())
                    .unwrap_or(Ok(()))
            }
            (KeyCode::Esc | KeyCode::Char('c'), Some(stage)) if stage != ExportStage::Progress => {
                self.session.close_export();
                self.export_clock = None;
                Ok(())
            }
            (KeyCode::Char('q'), Some(stage)) if stage != ExportStage::Progress => return true,
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.status = e.to_string();
        }
        false
    }

    fn edit_search(&mut self, code: KeyCode) {
        let chat = self.session.chat_mut();
        match code {
            KeyCode::Enter | KeyCode::Esc => {
                self.editing_search = false;
                self.status = format!("search: \"{}\"", chat.filter.search);
            }
            KeyCode::Backspace => {
                let mut text = chat.filter.search.clone();
                text.pop();
                chat.set_search(text);
            }
            KeyCode::Char(c) => {
                let mut text = chat.filter.search.clone();
                text.push(c);
                chat.set_search(text);
            }
            _ => {}
        }
        self.selected = 0;
    }

    fn poll_export(&mut self, now: Instant) {
        let (Some(clock), Some(job)) = (self.export_clock.as_mut(), self.session.export_mut())
        else {
            return;
        };
        match clock.poll(job, now) {
            Ok(Some(ExportEvent::Completed { files })) => {
                self.status = format!("export complete: {} file(s)", files.len());
                self.export_clock = None;
            }
            Ok(Some(ExportEvent::Failed { reason })) => {
                self.status = format!("export failed: {reason}");
                self.export_clock = None;
            }
            Ok(_) => {}
            Err(e) => {
                self.status = e.to_string();
                self.export_clock = None;
            }
        }
    }

    fn go(&mut self, view: View, payload: Payload) {
        let previous = self.session.current_view();
        match self.session.navigate(view, payload) {
            Ok(_) => {
                if view.is_page() && view != previous {
                    self.selected = 0;
                    self.show_detail = false;
                }
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn back(&mut self) {
        let previous = self.session.current_view();
        self.session.back();
        if previous != View::Dashboard {
            self.selected = 0;
            self.show_detail = false;
        }
    }

    fn cycle_view(&mut self, step: usize) {
        let current = TABS
            .iter()
            .position(|v| *v == self.session.current_view())
            .unwrap_or(0);
        self.go(TABS[(current + step) % TABS.len()], Payload::None);
    }

    fn item_count(&self) -> usize {
        match self.session.current_view() {
            View::Dashboard => self.session.summary().top_pois.len(),
            View::Timeline => self.session.timeline_results().len(),
            View::Chat => self.session.message_results().len(),
            View::Media => self.session.media_results().len(),
            View::Poi => self.session.store().pois().len(),
            View::Export | View::ImportFile => 0,
        }
    }

    fn prev(&mut self) {
        let len = self.item_count();
        if len == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            len - 1
        } else {
            self.selected - 1
        };
        self.sync_poi_selection();
    }

    fn next(&mut self) {
        let len = self.item_count();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1) % len;
        self.sync_poi_selection();
    }

    fn sync_poi_selection(&mut self) {
        if self.session.current_view() != View::Poi {
            return;
        }
        let id = self
            .session
            .store()
            .pois()
            .get(self.selected)
            .map(|p| p.id.clone());
        if let Some(id) = id {
            if let Err(e) = self.session.select_poi(&id) {
                self.status = e.to_string();
            }
        }
    }

    fn activate(&mut self) {
        match self.session.current_view() {
            View::Dashboard => {
                let id = self
                    .session
                    .summary()
                    .top_pois
                    .get(self.selected)
                    .map(|p| p.id.clone());
                if let Some(id) = id {
                    self.go(View::Poi, Payload::Poi(id.clone()));
                    self.selected = self
                        .session
                        .store()
                        .pois()
                        .iter()
                        .position(|p| p.id == id)
                        .unwrap_or(0);
                }
            }
            View::Timeline => {
                let id = self
                    .session
                    .timeline_results()
                    .items()
                    .and_then(|items| items.get(self.selected).map(|e| e.id.clone()));
                if let Some(id) = id {
                    self.session.timeline_mut().toggle_expanded(&id);
                }
                self.show_detail = self.session.timeline().expanded_event.is_some();
            }
            View::Media => {
                let id = self
                    .session
                    .media_results()
                    .items()
                    .and_then(|items| items.get(self.selected).map(|m| m.id.clone()));
                if let Some(id) = id {
                    self.go(View::Media, Payload::Media(id));
                    self.show_detail = true;
                }
            }
            _ => self.show_detail = !self.show_detail,
        }
    }

    fn toggle_suspicious(&mut self) {
        match self.session.current_view() {
            View::Chat => self.session.chat_mut().toggle_suspicious(),
            View::Timeline => self.session.timeline_mut().toggle_suspicious(),
            _ => return,
        }
        self.selected = 0;
    }

    /// All types, then each type alone, then back to all.
    fn cycle_event_types(&mut self) {
        let filter = &mut self.session.timeline_mut().filter;
        let next = if filter.types.len() == EventType::ALL.len() {
            Some(EventType::ALL[0])
        } else {
            filter
                .types
                .iter()
                .next()
                .and_then(|t| EventType::ALL.iter().position(|x| x == t))
                .and_then(|pos| EventType::ALL.get(pos + 1).copied())
        };
        filter.types = match next {
            Some(t) => [t].into_iter().collect(),
            None => EventType::ALL.into_iter().collect(),
        };
        self.selected = 0;
    }

    fn cycle_labels(&mut self) {
        let filter = &mut self.session.media_mut().filter;
        let next = if filter.labels.len() == LabelKind::ALL.len() {
            Some(LabelKind::ALL[0])
        } else {
            filter
                .labels
                .iter()
                .next()
                .and_then(|l| LabelKind::ALL.iter().position(|x| x == l))
                .and_then(|pos| LabelKind::ALL.get(pos + 1).copied())
        };
        filter.labels = match next {
            Some(l) => [l].into_iter().collect(),
            None => LabelKind::ALL.into_iter().collect(),
        };
        self.selected = 0;
    }

    fn adjust_threshold(&mut self, delta: i16) {
        if self.session.current_view() != View::Media {
            return;
        }
        let media = self.session.media_mut();
        let next = (i16::from(media.filter.threshold) + delta).clamp(0, 100) as u8;
        media.set_threshold(next);
        self.selected = 0;
    }
}

fn draw(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ]
            .as_ref(),
        )
        .split(f.size());

    draw_header(f, layout[0], app);
    draw_body(f, layout[1], app);
    draw_footer(f, layout[2], app);

    if app.show_help {
        draw_help_modal(f);
    }
    if app.session.export().is_some() {
        draw_export_modal(f, app);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &App) {
    let titles: Vec<Line> = TABS
        .iter()
        .enumerate()
        .map(|(i, v)| Line::from(format!("{} {}", i + 1, tab_title(*v))))
        .collect();
    let current = TABS
        .iter()
        .position(|v| *v == app.session.current_view())
        .unwrap_or(0);
    let case = app.session.store().case();
    let tabs = Tabs::new(titles)
        .select(current)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} SHERLOCK | {} | {} ",
            spinner(app.tick),
            case.id,
            case.device_owner
        )))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    f.render_widget(tabs, area);
}

fn tab_title(view: View) -> &'static str {
    match view {
        View::Dashboard => "Dashboard",
        View::Timeline => "Timeline",
        View::Chat => "Chat Explorer",
        View::Media => "Media Gallery",
        View::Poi => "POI Insights",
        View::Export => "Export",
        View::ImportFile => "Import",
    }
}

fn draw_body(f: &mut Frame<'_>, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let (title, items) = list_items(app);
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("➤ ");
    let mut state = ratatui::widgets::ListState::default();
    if app.item_count() > 0 {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(list, columns[0], &mut state);

    let detail = Paragraph::new(detail_lines(app))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(detail, columns[1]);
}

fn list_items(app: &App) -> (String, Vec<ListItem<'static>>) {
    let s = &app.session;
    match s.current_view() {
        View::Dashboard => {
            let items = s
                .summary()
                .top_pois
                .iter()
                .map(|p| {
                    let tier = TierScheme::Card.classify(p.score);
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{:<20} ", p.name)),
                        Span::styled(format!("{:>3}", p.score), Style::default().fg(tier_color(tier))),
                    ]))
                })
                .collect();
            ("Top persons of interest".to_string(), items)
        }
        View::Timeline => {
            let filter = &s.timeline().filter;
            let items = s
                .timeline_results()
                .items()
                .unwrap_or_default()
                .iter()
                .map(|e| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{} ", display_timestamp(&e.timestamp)),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::styled(
                            format!("{:<12} ", e.event_type.display_name()),
                            Style::default().fg(Color::Cyan),
                        ),
                        Span::styled(e.label.clone(), Style::default().fg(tier_color(e.risk_level))),
                    ]))
                })
                .collect();
            let types: Vec<&str> = filter.types.iter().map(|t| t.display_name()).collect();
            (
                format!(
                    "Timeline [{}{}]",
                    if filter.suspicious_only { "suspicious | " } else { "" },
                    types.join(", ")
                ),
                items,
            )
        }
        View::Chat => {
            let chat = s.chat();
            let items = s
                .message_results()
                .items()
                .unwrap_or_default()
                .iter()
                .map(|m| {
                    let color = m.risk_level.map(tier_color).unwrap_or(Color::Gray);
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:<16} ", m.sender_name), Style::default().fg(color)),
                        Span::raw(m.text.clone()),
                    ]))
                })
                .collect();
            (
                format!(
                    "Messages [{}search: \"{}\"]",
                    if chat.filter.suspicious_only { "suspicious | " } else { "" },
                    chat.filter.search
                ),
                items,
            )
        }
        View::Media => {
            let filter = &s.media().filter;
            let items = s
                .media_results()
                .items()
                .unwrap_or_default()
                .iter()
                .map(|m| {
                    let labels: Vec<String> = m
                        .labels
                        .iter()
                        .map(|l| format!("{} {}%", l.label, confidence_display(l.confidence)))
                        .collect();
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:<22} ", m.file_name),
                            Style::default().fg(tier_color(m.risk_level)),
                        ),
                        Span::raw(labels.join(", ")),
                    ]))
                })
                .collect();
            let labels: Vec<&str> = filter.labels.iter().map(|l| l.as_str()).collect();
            (
                format!("Media [{} | ≥{}%]", labels.join(", "), filter.threshold),
                items,
            )
        }
        View::Poi => {
            let items = s
                .store()
                .pois()
                .iter()
                .map(|p| {
                    let tier = TierScheme::Detail.classify(p.score);
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{:<20} ", p.name)),
                        Span::styled(
                            format!("{:>3} {}", p.score, badge_label(tier)),
                            Style::default().fg(tier_color(tier)),
                        ),
                    ]))
                })
                .collect();
            ("Persons of interest".to_string(), items)
        }
        View::Export | View::ImportFile => (String::new(), Vec::new()),
    }
}

fn detail_lines(app: &App) -> Vec<Line<'static>> {
    let s = &app.session;
    let mut lines = Vec::new();
    match s.current_view() {
        View::Dashboard => {
            let summary = s.summary();
            let c = &summary.summary;
            lines.push(bold(format!("Case {}", summary.case_id)));
            lines.push(Line::from(format!(
                "Extracted {}",
                display_timestamp(&summary.extraction_date)
            )));
            lines.push(Line::from(format!(
                "Messages {} ({} suspicious)",
                c.total_messages, c.suspicious_messages
            )));
            lines.push(Line::from(format!("Contacts {}", c.total_contacts)));
            lines.push(Line::from(format!(
                "Media {} ({} flagged)",
                c.total_media, c.flagged_media
            )));
            lines.push(Line::from(format!("POIs {}", c.poi_count)));
            if let Some(error) = &s.dashboard().upload_error {
                lines.push(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::from(""));
            lines.push(bold("Recent suspicious activity".to_string()));
            for e in &summary.timeline_preview {
                lines.push(Line::from(format!(
                    "{} {}",
                    display_timestamp(&e.timestamp),
                    e.label
                )));
            }
        }
        View::Timeline => match s.expanded_event_evidence() {
            Ok(Some(evidence)) => {
                if let Some(event) = s
                    .timeline()
                    .expanded_event
                    .as_deref()
                    .and_then(|id| s.store().event(id))
                {
                    lines.push(bold(event.label.clone()));
                    if let Some(preview) = &event.preview {
                        lines.push(Line::from(preview.clone()));
                    }
                    lines.push(Line::from(format!(
                        "{}% confidence ({})",
                        confidence_display(event.explain.confidence),
                        event.explain.model
                    )));
                    for rule in event.explain.rules_triggered.iter().flatten() {
                        lines.push(Line::from(format!("rule: {rule}")));
                    }
                }
                for m in evidence.messages {
                    lines.push(Line::from(format!("msg {}: {}", m.sender_name, m.text)));
                }
                for m in evidence.media {
                    lines.push(Line::from(format!("media {}", m.file_name)));
                }
                for c in evidence.contacts {
                    lines.push(Line::from(format!("contact {}", c.name)));
                }
            }
            Ok(None) => lines.push(Line::from("Enter expands an event")),
            Err(e) => lines.push(Line::from(e.to_string())),
        },
        View::Chat => {
            let page = s.message_results();
            if let Some(m) = page
                .items()
                .and_then(|items| items.get(app.selected))
                .filter(|_| app.show_detail)
            {
                lines.push(bold(format!("{} → {}", m.sender_name, m.recipient_name)));
                lines.push(Line::from(format!(
                    "{} via {}",
                    display_timestamp(&m.timestamp),
                    m.source_app
                )));
                lines.push(Line::from(m.text.clone()));
                if let Some(cluster) = &m.cluster_label {
                    lines.push(Line::from(format!("cluster: {cluster}")));
                }
                for rule in &m.rules_triggered {
                    lines.push(Line::from(format!(
                        "{} {}%: {}",
                        rule.rule,
                        confidence_display(rule.confidence),
                        rule.description
                    )));
                }
                match s.resolver().message_media(m) {
                    Ok(media) => {
                        for item in media {
                            lines.push(Line::from(format!("attachment {}", item.file_name)));
                        }
                    }
                    Err(e) => lines.push(Line::from(e.to_string())),
                }
            } else {
                lines.push(Line::from("Enter shows message detail, / searches"));
            }
        }
        View::Media => {
            let item = s
                .media()
                .selected_media
                .as_deref()
                .and_then(|id| s.store().media_item(id));
            match item {
                Some(m) => {
                    lines.push(bold(m.file_name.clone()));
                    lines.push(Line::from(format!(
                        "{} via {}",
                        display_timestamp(&m.timestamp),
                        m.source_app
                    )));
                    lines.push(Line::from(format!("sha256 {}", m.sha256)));
                    for l in &m.labels {
                        lines.push(Line::from(format!(
                            "{} {}% ({})",
                            l.label,
                            confidence_display(l.confidence),
                            l.model
                        )));
                    }
                    for c in &m.linked_contacts {
                        lines.push(Line::from(format!("linked {}", c.name)));
                    }
                    if let Ok(messages) = s.resolver().media_messages(m) {
                        for msg in messages {
                            lines.push(Line::from(format!("shared in: {}", msg.text)));
                        }
                    }
                }
                None => lines.push(Line::from("Enter opens the selected media")),
            }
        }
        View::Poi => match (s.selected_poi(), s.poi_evidence()) {
            (Some(poi), Ok(Some(evidence))) => {
                let tier = TierScheme::Detail.classify(poi.score);
                lines.push(bold(format!("{} ({})", poi.name, poi.phone)));
                lines.push(Line::from(Span::styled(
                    format!("{} {}", poi.score, badge_label(tier)),
                    Style::default().fg(tier_color(tier)),
                )));
                let fb = &poi.feature_breakdown;
                lines.push(Line::from(format!(
                    "{} messages, {} suspicious, {} flagged media",
                    fb.total_messages, fb.suspicious_msg_count, fb.flagged_media_assoc
                )));
                lines.push(Line::from(format!(
                    "time anomaly {}%, unusual hours {:.0}%",
                    confidence_display(fb.time_anomaly_score),
                    fb.unusual_hour_pct
                )));
                for m in evidence.messages.iter().take(3) {
                    lines.push(Line::from(format!("msg: {}", m.text)));
                }
                for m in evidence.media.iter().take(3) {
                    lines.push(Line::from(format!("media: {}", m.file_name)));
                }
                for e in evidence.events {
                    lines.push(Line::from(format!("event: {}", e.label)));
                }
            }
            (_, Err(e)) => lines.push(Line::from(e.to_string())),
            _ => lines.push(Line::from("No POI selected")),
        },
        View::Export | View::ImportFile => {}
    }
    lines
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &App) {
    let line1 = Line::from(vec![
        Span::styled("Keys: ", Style::default().fg(Color::Cyan)),
        Span::raw("←/→ view  "),
        Span::raw("↑/↓ move  "),
        Span::raw("Enter detail  "),
        Span::raw("s suspicious  "),
        Span::raw("/ search  "),
        Span::raw("t types  "),
        Span::raw("l labels  "),
        Span::raw("+/- threshold  "),
        Span::raw("e export  "),
        Span::raw("q quit"),
    ]);
    let line2 = Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::Green)),
        Span::styled(app.status.clone(), Style::default().fg(Color::Yellow)),
    ]);
    let footer = Paragraph::new(vec![line1, line2]).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn draw_export_modal(f: &mut Frame<'_>, app: &App) {
    let Some(job) = app.session.export() else {
        return;
    };
    let area = centered_rect(60, 60, f.size());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Export {} ", job.case_id()));

    match job.stage() {
        ExportStage::Progress => {
            let inner = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(1)].as_ref())
                .split(block.inner(area));
            f.render_widget(block, area);
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Progress"))
                .gauge_style(Style::default().fg(Color::Blue))
                .percent(u16::from(job.progress()));
            f.render_widget(gauge, inner[0]);
            let eta = Paragraph::new(format!(
                "Estimated time remaining: {} seconds",
                job.seconds_remaining()
            ));
            f.render_widget(eta, inner[1]);
        }
        stage => {
            let mut lines = Vec::new();
            match stage {
                ExportStage::Config => {
                    lines.push(bold(format!("Format: {}  (f to change)", job.format())));
                    for (row, option) in ExportOption::ALL.iter().enumerate() {
                        let mark = if job.options().get(*option) { "x" } else { " " };
                        let text = format!("[{mark}] {}", option.as_str());
                        if row == app.export_cursor {
                            lines.push(Line::from(Span::styled(
                                format!("> {text}"),
                                Style::default().fg(Color::Black).bg(Color::Cyan),
                            )));
                        } else {
                            lines.push(Line::from(format!("  {text}")));
                        }
                    }
                    lines.push(Line::from(""));
                    lines.push(Line::from("↑/↓ move | space toggle | g generate | c close"));
                }
                ExportStage::Complete => {
                    lines.push(bold("Export complete".to_string()));
                    for file in job.files() {
                        lines.push(Line::from(file.name.clone()));
                        lines.push(Line::from(format!("  sha256 {}", file.sha256)));
                    }
                    lines.push(Line::from(""));
                    lines.push(Line::from("r generate another | c close"));
                }
                ExportStage::Error => {
                    lines.push(Line::from(Span::styled(
                        format!("Export failed: {}", job.error().unwrap_or("unknown")),
                        Style::default().fg(Color::Red),
                    )));
                    lines.push(Line::from("r reset | c close"));
                }
                ExportStage::Progress => {}
            }
            f.render_widget(Paragraph::new(lines).block(block), area);
        }
    }
}

fn draw_help_modal(f: &mut Frame<'_>) {
    let area = centered_rect(70, 60, f.size());
    let content = vec![
        Line::from(Span::styled(
            "◈ Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("←/→ or 1-5 : switch view"),
        Line::from("↑/↓ : move selection"),
        Line::from("Enter : open detail / expand event / open media"),
        Line::from("s   : toggle suspicious only (chat, timeline)"),
        Line::from("/   : edit chat search"),
        Line::from("t   : cycle event types (timeline)"),
        Line::from("l   : cycle labels (media)"),
        Line::from("+/- : confidence threshold (media)"),
        Line::from("b   : back to dashboard"),
        Line::from("e   : open export panel (↑/↓ + space toggle options)"),
        Line::from("?   : toggle this help"),
        Line::from("q   : quit"),
    ];
    let para = Paragraph::new(content).block(
        Block::default()
            .title("Help (press ? to close)")
            .borders(Borders::ALL),
    );
    f.render_widget(Clear, area);
    f.render_widget(para, area);
}

fn bold(text: String) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

fn tier_color(tier: RiskTier) -> Color {
    match tier {
        RiskTier::Low => Color::Green,
        RiskTier::Medium => Color::Yellow,
        RiskTier::High => Color::LightRed,
        RiskTier::Critical => Color::Red,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn spinner(tick: usize) -> &'static str {
    const FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];
    FRAMES[tick % FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::store::EvidenceStore;
    use crate::session::SessionSettings;

    const CASE: &str = r#"{
        "case": { "id": "C-9", "device_owner": "Owner", "extraction_date": "2024-03-18T09:30:00Z" },
        "messages": [
            { "id": "m1", "timestamp": "2024-03-10T22:14:00Z", "sender_id": "c1", "sender_name": "Marcus",
              "recipient_id": "owner", "recipient_name": "Owner", "text": "pickup tonight", "suspicious": true,
              "risk_level": "high", "source_app": "SMS" },
            { "id": "m2", "timestamp": "2024-03-10T22:15:00Z", "sender_id": "owner", "sender_name": "Owner",
              "recipient_id": "c1", "recipient_name": "Marcus", "text": "ok", "suspicious": false,
              "source_app": "SMS" }
        ]
    }"#;

    fn app() -> App {
        let store = EvidenceStore::from_json(CASE).unwrap();
        App::new(Session::new(Arc::new(store), SessionSettings::default()))
    }

    #[test]
    fn tabs_cycle_and_reset_views() {
        let mut app = app();
        app.handle_key(KeyCode::Right);
        assert_eq!(app.session.current_view(), View::Timeline);
        app.handle_key(KeyCode::Char('3'));
        assert_eq!(app.session.current_view(), View::Chat);
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.item_count(), 2);
        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.item_count(), 1);
    }

    #[test]
    fn search_typing_filters_chat() {
        let mut app = app();
        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Char('s'));
        app.handle_key(KeyCode::Char('/'));
        for c in "OK".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.session.chat().filter.search, "OK");
        assert_eq!(app.item_count(), 1);
        // 'q' while editing is text, not quit
        app.handle_key(KeyCode::Char('/'));
        assert!(!app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn export_cursor_toggles_options_in_panel_order() {
        let mut app = app();
        app.handle_key(KeyCode::Char('e'));
        let defaults = app.session.export().map(|j| j.options().clone());

        // space on the first row flips the first option
        app.handle_key(KeyCode::Char(' '));
        let first = ExportOption::ALL[0];
        assert_eq!(
            app.session.export().map(|j| j.options().get(first)),
            defaults.as_ref().map(|o| !o.get(first))
        );
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.session.export().map(|j| j.options().clone()), defaults);

        app.handle_key(KeyCode::Up);
        assert_eq!(app.export_cursor, ExportOption::ALL.len() - 1);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.export_cursor, 0);

        for (row, option) in ExportOption::ALL.iter().enumerate() {
            let on = app.session.export().is_some_and(|j| j.options().get(*option));
            if option.is_evidence() && on {
                while app.export_cursor != row {
                    app.handle_key(KeyCode::Down);
                }
                app.handle_key(KeyCode::Char(' '));
            }
        }
        let job = app.session.export().unwrap();
        assert!(ExportOption::ALL
            .iter()
            .filter(|o| o.is_evidence())
            .all(|o| !job.options().get(*o)));

        app.handle_key(KeyCode::Char('g'));
        assert_eq!(app.session.export().map(|j| j.stage()), Some(ExportStage::Error));
        assert!(app.export_clock.is_none());
        assert_eq!(app.status, "export failed: no evidence selected");
        // toggling is a config-stage action only
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.session.export().map(|j| j.stage()), Some(ExportStage::Error));
    }

    #[test]
    fn export_panel_lists_options_in_declared_order() {
        let mut app = app();
        app.handle_key(KeyCode::Char('e'));
        let backend = ratatui::backend::TestBackend::new(100, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let rows: Vec<String> = (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.get(x, y).symbol().to_string())
                    .collect()
            })
            .collect();
        let positions: Vec<usize> = ExportOption::ALL
            .iter()
            .map(|o| {
                rows.iter()
                    .position(|r| r.contains(&format!("] {}", o.as_str())))
                    .unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn back_key_returns_to_dashboard() {
        let mut app = app();
        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected, 1);
        app.handle_key(KeyCode::Char('b'));
        assert_eq!(app.session.current_view(), View::Dashboard);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn export_panel_runs_to_completion() {
        let mut app = app();
        app.handle_key(KeyCode::Char('e'));
        assert_eq!(app.session.export().map(|j| j.stage()), Some(ExportStage::Config));
        app.handle_key(KeyCode::Char('g'));
        assert_eq!(app.session.export().map(|j| j.stage()), Some(ExportStage::Progress));
        assert!(!app.handle_key(KeyCode::Char('q')));

        let mut now = Instant::now();
        for _ in 0..10 {
            now += Duration::from_millis(800);
            app.poll_export(now);
        }
        assert_eq!(app.session.export().map(|j| j.stage()), Some(ExportStage::Complete));
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.session.export().map(|j| j.stage()), Some(ExportStage::Config));
        app.handle_key(KeyCode::Char('c'));
        assert!(app.session.export().is_none());
    }
}
