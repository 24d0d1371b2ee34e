//! Scrolling terminal table of persisted samples.
//!
//! The view is output-only. It uses the alternate screen but leaves the
//! terminal in cooked mode, so Ctrl-C still reaches the process as SIGINT
//! and stops the run through the normal stop signal.

use super::RecordSink;
use crate::error::Result;
use crate::ring_buffer::RingBuffer;
use crate::types::{Sample, COLUMNS};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Row, Table, Widget};
use ratatui::Terminal;
use std::io::{self, stdout, Stdout};
use std::iter::once;

/// Header, top border and bottom border.
const CHROME_ROWS: u16 = 3;

/// Table model: a title and a bounded tail of persisted rows.
#[derive(Debug, Clone)]
pub struct LiveTable {
    title: String,
    rows: RingBuffer<(u64, Sample)>,
}

impl LiveTable {
    /// Creates an empty table keeping at most `history_rows` rows.
    ///
    /// # Panics
    ///
    /// Panics if `history_rows` is 0.
    #[must_use]
    pub fn new(title: impl Into<String>, history_rows: usize) -> Self {
        Self { title: title.into(), rows: RingBuffer::new(history_rows) }
    }

    /// Title for a run over `target` (a program name or `PID n`).
    #[must_use]
    pub fn title_for(target: &str) -> String {
        format!("Performance Monitor for {target}")
    }

    /// Appends a row.
    pub fn push(&mut self, index: u64, sample: Sample) {
        self.rows.push((index, sample));
    }

    /// Table title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Rows currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows have been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total rows pushed over the run.
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.rows.total_pushed()
    }
}

impl Widget for &LiveTable {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Autoscroll: always show the newest rows that fit.
        let visible = usize::from(area.height.saturating_sub(CHROME_ROWS));

        let header = Row::new(once("Index").chain(COLUMNS))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let rows = self
            .rows
            .tail(visible)
            .map(|(index, sample)| Row::new(once(index.to_string()).chain(sample.row())));

        let widths = [
            Constraint::Length(7), // Index
            Constraint::Fill(1),   // Time
            Constraint::Fill(1),   // CPU
            Constraint::Fill(1),   // RAM
            Constraint::Fill(1),   // GPU
            Constraint::Fill(1),   // VRAM
        ];

        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Blue));

        Table::new(rows, widths).header(header).block(block).render(area, buf);
    }
}

/// Redraws a [`LiveTable`] on stdout after each persisted sample.
pub struct LiveTableSink {
    table: LiveTable,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
}

impl LiveTableSink {
    /// Switches stdout to the alternate screen and draws an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be set up.
    pub fn open(table: LiveTable) -> Result<Self> {
        stdout().execute(EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        terminal.hide_cursor()?;

        let mut sink = Self { table, terminal: Some(terminal) };
        sink.draw()?;
        Ok(sink)
    }

    /// The table being displayed.
    #[must_use]
    pub fn table(&self) -> &LiveTable {
        &self.table
    }

    fn draw(&mut self) -> io::Result<()> {
        let table = &self.table;
        if let Some(terminal) = self.terminal.as_mut() {
            terminal.draw(|frame| frame.render_widget(table, frame.area()))?;
        }
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        if let Some(mut terminal) = self.terminal.take() {
            stdout().execute(LeaveAlternateScreen)?;
            terminal.show_cursor()?;
        }
        Ok(())
    }
}

impl RecordSink for LiveTableSink {
    fn id(&self) -> &'static str {
        "live"
    }

    fn record(&mut self, index: u64, sample: &Sample) -> Result<()> {
        self.table.push(index, *sample);
        self.draw()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.restore()?;
        Ok(())
    }
}

impl Drop for LiveTableSink {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!("failed to restore terminal: {e}");
        }
    }
}

impl std::fmt::Debug for LiveTableSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTableSink")
            .field("table", &self.table)
            .field("active", &self.terminal.is_some())
            .finish()
    }
}
