use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

use crate::shared::{KeyLight, PianoKey};

// One terminal column per key; black keys stop a row short like on a real
// keyboard, and every C gets its octave label underneath.
pub fn draw_keyboard(frame: &mut Frame, area: Rect, keys: &[PianoKey]) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Length(1); keys.len()])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Length(1); keys.len()])
        .split(rows[1]);

    for (i, key) in keys.iter().enumerate() {
        frame.render_widget(Block::default().style(key_style(key)), cols[i]);
        // black keys are shorter: their bottom row shows the plain white bed
        let bottom_style = if key.black { Style::default().bg(Color::Gray) } else { key_style(key) };
        frame.render_widget(Block::default().style(bottom_style), bottom[i]);
    }

    frame.render_widget(Paragraph::new(Line::from(octave_labels(keys))), rows[2]);
}

pub fn key_style(key: &PianoKey) -> Style {
    let bg = match (key.light, key.black) {
        (KeyLight::Chord, true) => Color::Red,
        (KeyLight::Chord, false) => Color::LightRed,
        (KeyLight::Solo, true) => Color::Green,
        (KeyLight::Solo, false) => Color::LightGreen,
        (KeyLight::Off, true) => Color::DarkGray,
        (KeyLight::Off, false) => Color::White,
    };
    Style::default().bg(bg)
}

// "C1" under each C, padded so labels line up with their key column
fn octave_labels(keys: &[PianoKey]) -> String {
    let mut row = vec![' '; keys.len()];
    for (i, key) in keys.iter().enumerate() {
        if key.note.starts_with('C') && !key.black {
            for (j, c) in key.note.chars().enumerate() {
                if let Some(slot) = row.get_mut(i + j) {
                    *slot = c;
                }
            }
        }
    }
    row.into_iter().collect()
}
