use crate::model::Scene;
use crate::sim::PlayerAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, alive: bool, ev: &InputEvent) -> Option<PlayerAction> {
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(PlayerAction::Quit);
    }

    match scene {
        Scene::NameEntry => match ev.key {
            KeyCode::Enter => Some(PlayerAction::Start),
            KeyCode::Esc => Some(PlayerAction::Quit),
            KeyCode::Backspace => Some(PlayerAction::NameBackspace),
            KeyCode::Char(ch) if !ch.is_control() => Some(PlayerAction::NameChar(ch)),
            _ => None,
        },
        Scene::Main => match ev.key {
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(PlayerAction::Quit),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(PlayerAction::HelpToggle),
            KeyCode::Char('n') | KeyCode::Char('N') if !alive => Some(PlayerAction::NewGame),
            _ if !alive => None,
            KeyCode::Char('f') | KeyCode::Char('F') => Some(PlayerAction::Feed),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(PlayerAction::Play),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(PlayerAction::Sleep),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(PlayerAction::Clean),
            _ => None,
        },
        Scene::Help => match ev.key {
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(PlayerAction::Quit),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(PlayerAction::HelpToggle),
            KeyCode::Esc => Some(PlayerAction::Back),
            _ => None,
        },
    }
}
