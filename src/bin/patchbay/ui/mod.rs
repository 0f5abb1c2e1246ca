//! TUI for patchbay
//!
//! Shows the oscilloscope memory, the control list and the live routes, and
//! turns key presses into parameter edits, note messages and route changes.

mod controls;
mod routes;
mod status;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use std::time::Duration;

use patchbay::{synth::SynthMessage, EngineHandles, Notification};

use controls::render_controls;
use routes::RoutePicker;
use status::{render_status, AudioStats};
use waveform::render_waveform;

/// Samples shown by the oscilloscope.
const VIS_BUFFER_SIZE: usize = 512;

/// Adjustments per full range for continuous controls.
const FINE_STEPS: f32 = 100.0;

/// Keyboard row mapped to a C major scale from middle C.
const NOTE_KEYS: [(char, u8); 8] = [
    ('a', 60),
    ('s', 62),
    ('d', 64),
    ('f', 65),
    ('g', 67),
    ('h', 69),
    ('j', 71),
    ('k', 72),
];

pub struct PatchApp {
    handles: EngineHandles,
    /// Control names in registry order.
    names: Vec<String>,
    selected: usize,
    scope_buffer: Vec<f32>,
    held_note: Option<u8>,
    routes: RoutePicker,
    last_error: Option<String>,
    should_quit: bool,
}

impl PatchApp {
    pub fn new(handles: EngineHandles) -> Self {
        let names = handles
            .params
            .registry()
            .iter()
            .map(|(_, control)| control.name().to_string())
            .collect();
        Self {
            handles,
            names,
            selected: 0,
            scope_buffer: vec![0.0; VIS_BUFFER_SIZE],
            held_note: None,
            routes: RoutePicker::new(),
            last_error: None,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.scope_buffer.resize(VIS_BUFFER_SIZE, 0.0);
            let filled = self.handles.scope.snapshot_into(&mut self.scope_buffer);
            self.scope_buffer.truncate(filled);

            terminal.draw(|frame| self.render(frame))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        let _ = self.handles.notes.push(SynthMessage::AllNotesOff);
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                self.selected = (self.selected + 1).min(self.names.len().saturating_sub(1));
            }
            KeyCode::Left => self.nudge(-1.0),
            KeyCode::Right => self.nudge(1.0),
            KeyCode::Char('r') => {
                self.handles
                    .params
                    .registry()
                    .reset_to_defaults(Notification::Send);
            }
            KeyCode::Char('[') => self.routes.cycle_source(&self.handles.modulation, -1),
            KeyCode::Char(']') => self.routes.cycle_source(&self.handles.modulation, 1),
            KeyCode::Char(',') => self.routes.cycle_destination(&self.handles.modulation, -1),
            KeyCode::Char('.') => self.routes.cycle_destination(&self.handles.modulation, 1),
            KeyCode::Char('m') => {
                if let Err(err) = self.routes.toggle(&mut self.handles.modulation) {
                    self.last_error = Some(err.to_string());
                }
            }
            KeyCode::Char(' ') => {
                self.held_note = None;
                let _ = self.handles.notes.push(SynthMessage::AllNotesOff);
            }
            KeyCode::Char(c) => {
                if let Some(&(_, note)) = NOTE_KEYS.iter().find(|(key, _)| *key == c) {
                    self.play(note);
                }
            }
            _ => {}
        }
    }

    /// Move the selected control by one step (or 1/100 of its range).
    fn nudge(&mut self, direction: f32) {
        let Some(name) = self.names.get(self.selected) else {
            return;
        };
        let Ok(control) = self.handles.params.registry().get(name) else {
            return;
        };
        let spec = control.spec();
        let step = match spec.steps {
            Some(steps) => (spec.max - spec.min) / (steps - 1) as f32,
            None => (spec.max - spec.min) / FINE_STEPS,
        };
        let target = control.value() + direction * step;
        if let Err(err) = self.handles.params.send(name, target, Notification::Send) {
            self.last_error = Some(err.to_string());
        }
    }

    /// Terminals report presses only, so a new note releases the previous one.
    fn play(&mut self, note: u8) {
        if let Some(previous) = self.held_note.take() {
            let _ = self.handles.notes.push(SynthMessage::NoteOff { note: previous });
            if previous == note {
                return;
            }
        }
        if self
            .handles
            .notes
            .push(SynthMessage::NoteOn { note, velocity: 100 })
            .is_ok()
        {
            self.held_note = Some(note);
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Status bar
                Constraint::Length(10), // Waveform
                Constraint::Min(6),     // Controls
                Constraint::Length(1),  // Help bar
            ])
            .split(frame.area());

        render_status(
            frame,
            chunks[0],
            &self.handles.modulation,
            &AudioStats::from_buffer(&self.scope_buffer),
            &self.routes.label(&self.handles.modulation),
            self.last_error.as_deref(),
        );
        render_waveform(frame, chunks[1], &self.scope_buffer);
        render_controls(frame, chunks[2], &self.handles.modulation, self.selected);

        let help = Paragraph::new(
            " [Q] Quit  [↑↓] Select  [←→] Adjust  [A-K] Play  [Space] Release  [[ ]] Source  [, .] Dest  [M] Route  [R] Reset",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
