//! Terminal rendering of the queue dashboard.
//!
//! The poll loop hands a [`RenderPlan`] to a [`Renderer`] once per cycle.
//! [`TerminalRenderer`] draws it with ratatui; tests substitute their own
//! renderer or a ratatui `TestBackend`.
//!
//! ## Layout
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ Title │ generated at │ totals              │  header bar
//! ├────────────────────────────────────────────┤
//! │ Queue  Messages  Msgs/s  Remaining  Concl. │
//! │ GROUP A                                    │
//! │ q1     ...                                 │  queue table
//! │                                            │
//! │ NOT GROUPED                                │
//! │ q3     ...                                 │
//! ├────────────────────────────────────────────┤
//! │ source │ cycle │ tracked │ unrefreshed     │  status bar
//! └────────────────────────────────────────────┘
//! ```

pub mod common;
pub mod table;
pub mod theme;

pub use theme::Theme;

use std::io::{self, Stdout};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use crate::data::PlanRow;

/// Minimum terminal size for usable display
const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 8;

/// Everything a renderer needs to draw one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub title: String,
    /// Description of the queue source.
    pub source: String,
    pub generated_at: DateTime<Local>,
    /// Cycles since the last reset.
    pub cycle: u64,
    /// Reset threshold, 0 when resets are disabled.
    pub reset_every: u64,
    pub rows: Vec<PlanRow>,
    /// Number of tracked queues, including hidden ones.
    pub tracked: usize,
    /// Queues that could not be refreshed this cycle.
    pub unrefreshed: Vec<String>,
    pub export_file: Option<PathBuf>,
}

impl RenderPlan {
    /// Total messages across the visible queue rows.
    pub fn total_messages(&self) -> u64 {
        self.rows
            .iter()
            .filter_map(PlanRow::as_queue)
            .map(|r| r.current_count)
            .sum()
    }
}

/// Draws render plans.
pub trait Renderer: Send {
    fn render(&mut self, plan: &RenderPlan) -> io::Result<()>;
}

/// Draw a full plan into a frame.
pub fn draw(frame: &mut Frame, plan: &RenderPlan, theme: &Theme) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));
        let centered = Rect::new(
            0,
            area.height.saturating_sub(5) / 2,
            area.width,
            area.height.min(5),
        );
        frame.render_widget(paragraph, centered);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Min(3),    // Queue table
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, plan, theme, chunks[0]);
    table::render(frame, plan, theme, chunks[1]);
    common::render_status_bar(frame, plan, chunks[2]);
}

/// Renders plans to a ratatui terminal.
pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,
    theme: Theme,
}

impl<B: Backend> TerminalRenderer<B> {
    pub fn new(terminal: Terminal<B>, theme: Theme) -> Self {
        Self { terminal, theme }
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }
}

impl TerminalRenderer<CrosstermBackend<Stdout>> {
    /// Draw to stdout with a theme matching the terminal background.
    ///
    /// Expects a [`TerminalSession`] to be active.
    pub fn stdout() -> io::Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self::new(terminal, Theme::auto_detect()))
    }
}

/// Raw mode and the alternate screen for as long as the value lives.
///
/// Dropping it restores the terminal. A panic hook does the same before the
/// default hook prints the panic message.
#[derive(Debug)]
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter(title: &str) -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, SetTitle(title), Hide)?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
            original_hook(panic);
        }));

        Ok(Self { _private: () })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

impl<B: Backend + Send> Renderer for TerminalRenderer<B> {
    fn render(&mut self, plan: &RenderPlan) -> io::Result<()> {
        let theme = &self.theme;
        self.terminal.draw(|frame| draw(frame, plan, theme))?;
        Ok(())
    }
}
