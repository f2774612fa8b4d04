pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::clock::SessionPhase;
use crate::diff::CharStatus;
use crate::engine::Snapshot;
use crate::item::Comparator;
use crate::time_series::as_tuples;
use crate::util::format_clock;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Everything the terminal draws for one frame
pub struct SessionView<'a> {
    pub snapshot: &'a Snapshot,
    /// best WPM recorded before this session, for the results screen
    pub best_wpm: Option<u32>,
}

impl<'a> SessionView<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            best_wpm: None,
        }
    }

    pub fn with_best_wpm(mut self, best_wpm: Option<u32>) -> Self {
        self.best_wpm = best_wpm;
        self
    }
}

fn comparator(snap: &Snapshot) -> Comparator {
    snap.practice_type.unit().comparator
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

impl Widget for &SessionView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.snapshot.phase {
            SessionPhase::Complete => render_results(self, area, buf),
            SessionPhase::Paused => {
                Paragraph::new(Span::styled(
                    "PAUSED - ctrl-p to resume",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::ITALIC),
                ))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(area, buf);
            }
            SessionPhase::NotStarted | SessionPhase::Active => render_typing(self.snapshot, area, buf),
        }
    }
}

fn header_line(snap: &Snapshot) -> Line<'static> {
    let clock = match snap.remaining_ms {
        Some(ms) => format_clock(ms),
        None => format_clock(snap.metrics.elapsed_ms),
    };
    Line::from(vec![
        Span::styled(format!("{}  ", snap.practice_type), dim_bold()),
        Span::styled(
            format!("{}/{}  ", snap.item_index + 1, snap.pool_len),
            dim_bold(),
        ),
        Span::styled(clock, bold()),
    ])
}

fn metrics_line(snap: &Snapshot) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!("{} wpm   {}% acc", snap.metrics.wpm, snap.metrics.accuracy),
        bold(),
    )];
    if !snap.feedback.is_empty() {
        spans.push(Span::styled(
            format!("   {}% this item", snap.live_accuracy),
            Style::default().add_modifier(Modifier::ITALIC),
        ));
    }
    Line::from(spans)
}

/// Coloured target text, one span per character
pub fn prompt_spans(snap: &Snapshot) -> Vec<Span<'static>> {
    let green_bold = bold().fg(Color::Green);
    let red_bold = bold().fg(Color::Red);
    let underlined_dim_bold = dim_bold().add_modifier(Modifier::UNDERLINED);

    snap.feedback
        .iter()
        .map(|cell| match cell.status {
            CharStatus::Correct => Span::styled(cell.expected.to_string(), green_bold),
            CharStatus::Incorrect => Span::styled(
                match cell.typed {
                    Some(' ') | None => "·".to_owned(),
                    Some(c) => c.to_string(),
                },
                red_bold,
            ),
            CharStatus::Current => Span::styled(cell.expected.to_string(), underlined_dim_bold),
            CharStatus::Pending => Span::styled(cell.expected.to_string(), dim_bold()),
        })
        .collect()
}

fn speech_spans(snap: &Snapshot) -> Option<Line<'static>> {
    let speech = snap.last_speech.as_ref()?;
    let mut spans: Vec<Span> = speech
        .tokens
        .iter()
        .map(|token| {
            let word = token
                .heard
                .clone()
                .unwrap_or_else(|| "_".repeat(token.expected.as_ref().map_or(1, |e| e.width())));
            let style = if token.matched {
                bold().fg(Color::Green)
            } else {
                bold().fg(Color::Red)
            };
            Span::styled(format!("{word} "), style)
        })
        .collect();
    spans.push(Span::styled(
        format!(" {}%", speech.accuracy),
        bold().fg(Color::Cyan),
    ));
    Some(Line::from(spans))
}

fn legend(snap: &Snapshot) -> &'static str {
    match comparator(snap) {
        Comparator::Token => "(enter) submit / (tab) skip / (ctrl-l) listen / (ctrl-p) pause / (esc) finish",
        Comparator::Character => "(tab) skip / (←/→) browse / (ctrl-p) pause / (ctrl-l) listen / (esc) finish",
    }
}

fn render_typing(snap: &Snapshot, area: Rect, buf: &mut Buffer) {
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_width = snap.item.content.width();
    let prompt_lines = if prompt_width <= max_chars_per_line as usize {
        1
    } else {
        ((prompt_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(prompt_lines + 6) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(padding),
                Constraint::Length(1), // header
                Constraint::Length(1), // metrics
                Constraint::Length(1),
                Constraint::Length(prompt_lines),
                Constraint::Length(2), // typed input / speech result
                Constraint::Length(1), // notice
                Constraint::Min(0),
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(area);

    Paragraph::new(header_line(snap))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    Paragraph::new(metrics_line(snap))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let alignment = if prompt_lines == 1 {
        Alignment::Center
    } else {
        Alignment::Left
    };

    match comparator(snap) {
        Comparator::Character => {
            Paragraph::new(Line::from(prompt_spans(snap)))
                .alignment(alignment)
                .wrap(Wrap { trim: true })
                .render(chunks[4], buf);

            if snap.composing {
                Paragraph::new(Span::styled(
                    snap.input.clone(),
                    Style::default().add_modifier(Modifier::UNDERLINED),
                ))
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
            }
        }
        Comparator::Token => {
            Paragraph::new(Span::styled(snap.item.content.clone(), bold()))
                .alignment(alignment)
                .wrap(Wrap { trim: true })
                .render(chunks[4], buf);

            let mut lines = vec![Line::from(Span::styled(
                format!("> {}", snap.input),
                Style::default().add_modifier(Modifier::ITALIC),
            ))];
            lines.extend(speech_spans(snap));
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        }
    }

    let status = match (&snap.notice, snap.speaking) {
        (Some(notice), _) => Some(Span::styled(notice.clone(), Style::default().fg(Color::Yellow))),
        (None, true) => Some(Span::styled("speaking…", Style::default().fg(Color::Cyan))),
        (None, false) => None,
    };
    if let Some(status) = status {
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }

    Paragraph::new(Span::styled(
        legend(snap),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[8], buf);
}

fn render_results(view: &SessionView<'_>, area: Rect, buf: &mut Buffer) {
    let snap = view.snapshot;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(1),    // chart
                Constraint::Length(1), // stats
                Constraint::Length(1), // totals
                Constraint::Length(1), // best
                Constraint::Length(1),
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(area);

    let (overall_duration, highest_wpm) =
        charting::compute_chart_params(&snap.wpm_samples, snap.metrics.elapsed_ms);
    let tuples = as_tuples(&snap.wpm_samples);
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_wpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {:.2} sd",
            snap.metrics.wpm, snap.metrics.accuracy, snap.wpm_std_dev
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let totals = match comparator(snap) {
        Comparator::Character => format!(
            "{} items   {}/{} chars   {}",
            snap.stats.total_items,
            snap.stats.correct_characters,
            snap.stats.total_characters,
            format_clock(snap.metrics.elapsed_ms)
        ),
        Comparator::Token => format!(
            "{} read aloud   last score {}%   {}",
            snap.speech_attempts,
            snap.last_speech.as_ref().map_or(0, |s| s.accuracy),
            format_clock(snap.metrics.elapsed_ms)
        ),
    };
    Paragraph::new(Span::styled(
        totals,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let best = match view.best_wpm {
        Some(best) if snap.metrics.wpm > best => format!("new best! previous {best} wpm"),
        Some(best) => format!("best {best} wpm"),
        None if snap.stats.total_items > 0 => "first recorded session".to_string(),
        None => String::new(),
    };
    Paragraph::new(Span::styled(best, Style::default().fg(Color::Gray)))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(r)estart / (q)uit",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[5], buf);
}
