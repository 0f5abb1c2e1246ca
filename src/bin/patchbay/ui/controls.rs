//! Control list - value, range bar and effective value per control

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use patchbay::ModulationManager;

const BAR_WIDTH: usize = 20;

fn bar(normalized: f32) -> String {
    let filled = (normalized.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn render_controls(
    frame: &mut Frame,
    area: Rect,
    modulation: &ModulationManager,
    selected: usize,
) {
    let block = Block::default().title(" Controls ").borders(Borders::ALL);

    let items: Vec<ListItem> = modulation
        .controls()
        .iter()
        .map(|(_, control)| {
            let routed = modulation
                .connections_to(control.name())
                .map(|routes| !routes.is_empty())
                .unwrap_or(false);
            let effective = modulation
                .effective_value(control.name(), None)
                .unwrap_or_else(|_| control.value());

            let mut spans = vec![
                Span::raw(format!("{:<18}", control.name())),
                Span::styled(bar(control.normalized()), Style::default().fg(Color::Cyan)),
                Span::raw(format!(" {:>8.3}", control.value())),
            ];
            if routed {
                spans.push(Span::styled(
                    format!("  ~ {:>8.3}", effective),
                    Style::default().fg(Color::Yellow),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}
