use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::{InputEvent, EFFECT_STEP, SPEED_STEP};
use super::mode::TuiState;

// poll for input from the terminal and resolve key presses into input
// events for the backend, based on what the tui is currently showing
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    if ts.notice_shown { // a modal notice swallows the key
        ts.notice_shown = false;
        return vec![InputEvent::Dismiss];
    }
    if ts.editing_prompt {
        return handle_prompt_key(code, ts);
    }

    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::TogglePlay],

        // progression lists
        KeyCode::Up => vec![InputEvent::SelectPrev],
        KeyCode::Down => vec![InputEvent::SelectNext],
        KeyCode::Tab => vec![InputEvent::SwitchList],
        KeyCode::Enter => vec![InputEvent::LoadSelected],
        KeyCode::Char('f') => vec![InputEvent::Refetch],

        // sliders, lowercase = down and shifted = up
        KeyCode::Char('[') => vec![InputEvent::AdjustSpeed(-SPEED_STEP)],
        KeyCode::Char(']') => vec![InputEvent::AdjustSpeed(SPEED_STEP)],
        KeyCode::Char('d') => vec![InputEvent::AdjustDelay(-EFFECT_STEP)],
        KeyCode::Char('D') => vec![InputEvent::AdjustDelay(EFFECT_STEP)],
        KeyCode::Char('v') => vec![InputEvent::AdjustReverb(-EFFECT_STEP)],
        KeyCode::Char('V') => vec![InputEvent::AdjustReverb(EFFECT_STEP)],
        KeyCode::Char('m') => vec![InputEvent::CycleAnimation],

        KeyCode::Char('/') => {
            ts.editing_prompt = true;
            vec![InputEvent::BeginPrompt]
        }

        _ => vec![],
    }
}

fn handle_prompt_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Enter => {
            ts.editing_prompt = false;
            vec![InputEvent::SubmitPrompt]
        }
        KeyCode::Esc => {
            ts.editing_prompt = false;
            vec![InputEvent::CancelPrompt]
        }
        KeyCode::Backspace => vec![InputEvent::PromptBackspace],
        KeyCode::Char(c) => vec![InputEvent::PromptChar(c)],
        _ => vec![],
    }
}
