//! Queue table rendering.
//!
//! One row per [`PlanRow`]: group headers and spacers span no metrics,
//! queue rows are styled by their colour class.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use super::{RenderPlan, Theme};
use crate::data::PlanRow;

/// Render the queue table.
pub fn render(frame: &mut Frame, plan: &RenderPlan, theme: &Theme, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Queue"),
        Cell::from("Messages"),
        Cell::from("Msgs/s"),
        Cell::from("Remaining Time"),
        Cell::from("Est. Conclusion"),
    ])
    .height(1)
    .style(theme.header);

    let rows: Vec<Row> = plan
        .rows
        .iter()
        .map(|row| match row {
            PlanRow::Spacer => Row::new(vec![Cell::from("")]),
            PlanRow::GroupHeader(name) => {
                Row::new(vec![Cell::from(name.clone())]).style(theme.group)
            }
            PlanRow::Queue(q) => Row::new(vec![
                Cell::from(q.name.clone()),
                Cell::from(q.current_count.to_string()),
                Cell::from(q.speed.clone()),
                Cell::from(q.remaining.clone()),
                Cell::from(q.conclusion.clone()),
            ])
            .style(theme.row_style(q.color)),
        })
        .collect();

    let widths = [
        Constraint::Fill(3),    // Queue - takes the remaining space
        Constraint::Length(10), // Messages
        Constraint::Length(8),  // Msgs/s
        Constraint::Length(15), // Remaining Time
        Constraint::Length(16), // Est. Conclusion
    ];

    let visible = plan.rows.iter().filter(|r| r.as_queue().is_some()).count();
    let title = format!(" Queues ({}/{}) ", visible, plan.tracked);

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.border)),
    );

    frame.render_widget(table, area);
}
