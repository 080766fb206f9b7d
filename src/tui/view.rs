use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::pipeline::progression::ListKind;
use crate::shared::DisplayState;

use super::keyboard::draw_keyboard;

const ACCENT: Color = Color::Rgb(79, 70, 229);

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title + current chord
            Constraint::Length(7), // keyboard
            Constraint::Length(5), // transport
            Constraint::Length(3), // generation prompt
            Constraint::Min(6),    // lists + info
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    let keyboard = Block::bordered();
    draw_keyboard(frame, keyboard.inner(sections[1]), &state.keys);
    frame.render_widget(keyboard, sections[1]);
    draw_transport(frame, sections[2], state);
    draw_prompt(frame, sections[3], state);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(20)])
        .split(sections[4]);
    draw_lists(frame, bottom[0], state);
    draw_info(frame, bottom[1], state);

    if let Some(text) = &state.notice {
        draw_notice(frame, area, text);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let title = Line::from(Span::styled(
        "Interactive Piano Chord Progression Visualizer",
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    ))
    .centered();

    let mut now = vec![Span::styled(
        state.current_chord.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if !state.current_solo.is_empty() {
        now.push(Span::styled(
            format!(" (Solo: {})", state.current_solo),
            Style::default().fg(Color::Green),
        ));
    }

    frame.render_widget(Paragraph::new(vec![title, Line::from(now).centered()]), area);
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let chords = state.progression.as_ref().map(|p| p.chords.as_str()).unwrap_or("");
    let play = if state.playing { "■ Stop" } else { "▶ Play" };

    let lines = vec![
        Line::from(vec![
            Span::styled(format!("[space] {play}"), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
            Span::raw("   Progression: "),
            Span::styled(chords.to_string(), Style::default().fg(Color::Gray)),
        ]),
        Line::from(format!(
            "Speed [ ]: {:.1}x    Animation Mode (m): {}",
            state.speed,
            state.animation.label()
        )),
        Line::from(format!(
            "Delay Time (d/D): {:.1}s    Reverb Level (v/V): {:.1}",
            state.delay_time, state.reverb_level
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(" Transport ")), area);
}

fn draw_prompt(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let (text, style) = if state.generating {
        ("Generating...".to_string(), Style::default().fg(Color::Gray))
    } else if state.editing_prompt {
        (format!("{}▏", state.prompt), Style::default())
    } else if state.prompt.is_empty() {
        ("Describe a chord progression... (press /)".to_string(), Style::default().fg(Color::DarkGray))
    } else {
        (state.prompt.clone(), Style::default())
    };
    let border = if state.editing_prompt { Style::default().fg(ACCENT) } else { Style::default() };
    let block = Block::bordered()
        .title(" Generate Custom Progression ")
        .border_style(border);
    frame.render_widget(Paragraph::new(Span::styled(text, style)).block(block), area);
}

fn draw_lists(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let jazz_title = if state.fetching { " Jazz Progressions (fetching) " } else { " Jazz Progressions (f) " };
    draw_list(frame, halves[0], jazz_title, &state.jazz, state, ListKind::Jazz);
    draw_list(frame, halves[1], " Custom Progressions ", &state.custom, state, ListKind::Custom);
}

fn draw_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    names: &[String],
    state: &DisplayState,
    kind: ListKind,
) {
    let focused = state.focus == kind;
    let items: Vec<ListItem> = names.iter().map(|n| ListItem::new(n.as_str())).collect();
    let border = if focused { Style::default().fg(ACCENT) } else { Style::default() };
    let list = List::new(items)
        .block(Block::bordered().title(title.to_string()).border_style(border))
        .highlight_style(Style::default().bg(ACCENT).fg(Color::White))
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if focused && !names.is_empty() {
        list_state.select(Some(state.selected));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_info(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let block = Block::bordered().title(" Progression Information ");
    let body = match &state.progression {
        Some(p) => vec![
            Line::from(vec![
                Span::styled("Chords: ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
                Span::raw(p.chords.clone()),
            ]),
            Line::from(vec![
                Span::styled("Solo: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::raw(p.solo.clone()),
            ]),
            Line::from(""),
            Line::from(p.info.clone()),
        ],
        None => vec![Line::from(Span::styled(
            "Select a progression to see details.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))],
    };
    frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: true }).block(block), area);
}

fn draw_notice(frame: &mut Frame, area: Rect, text: &str) {
    let popup = centered(area, 60, 5);
    frame.render_widget(Clear, popup);
    let body = vec![Line::from(text.to_string()), Line::from(""), Line::from("(press any key)").centered()];
    frame.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title(" Notice ").border_style(Style::default().fg(Color::Red))),
        popup,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
