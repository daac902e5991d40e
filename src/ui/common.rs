//! Header and status bars.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{RenderPlan, Theme};
use crate::data::labels::format_count;

/// Render the header bar with the window title, generation time and totals.
pub fn render_header(frame: &mut Frame, plan: &RenderPlan, theme: &Theme, area: Rect) {
    let visible = plan.rows.iter().filter(|r| r.as_queue().is_some()).count();

    let line = Line::from(vec![
        Span::styled(format!(" {} ", plan.title), theme.title),
        Span::raw("│ "),
        Span::raw(plan.generated_at.format("%d/%m %H:%M:%S").to_string()),
        Span::raw(" │ "),
        Span::styled(
            format!("{}", visible),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" queues │ "),
        Span::styled(
            format_count(plan.total_messages()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" messages"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows the source, the cycle counter, how many queues are tracked and
/// which ones could not be refreshed this cycle.
pub fn render_status_bar(frame: &mut Frame, plan: &RenderPlan, area: Rect) {
    let cycle = if plan.reset_every > 0 {
        format!("cycle {}/{}", plan.cycle, plan.reset_every)
    } else {
        format!("cycle {}", plan.cycle)
    };

    let mut status = format!(" {} │ {} │ {} tracked", plan.source, cycle, plan.tracked);

    if !plan.unrefreshed.is_empty() {
        status.push_str(&format!(" │ unrefreshed: {}", plan.unrefreshed.join(", ")));
    }
    if let Some(ref path) = plan.export_file {
        status.push_str(&format!(" │ export: {}", path.display()));
    }
    status.push_str(" │ q:quit");

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}
