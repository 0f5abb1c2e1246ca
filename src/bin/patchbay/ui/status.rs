//! Status bar - route count, route picker selection and output level

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use patchbay::ModulationManager;

pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    modulation: &ModulationManager,
    stats: &AudioStats,
    route: &str,
    last_error: Option<&str>,
) {
    let block = Block::default().title(" patchbay ").borders(Borders::ALL);

    let mut spans = vec![
        Span::styled(
            format!(" Routes: {}  ", modulation.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format!("{route}  "), Style::default().fg(Color::Yellow)),
        Span::styled(
            format!("LFO1: {:+.2}  ", modulation.outputs().value("lfo1").unwrap_or(0.0)),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}  ", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ];
    if let Some(err) = last_error {
        spans.push(Span::styled(err.to_string(), Style::default().fg(Color::Red)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
