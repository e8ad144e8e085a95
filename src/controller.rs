use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crate::domain::{PTConfig, PTError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &PTConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, PTError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                _ => None,
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('+') => Some(Message::CyclePageSize),
            KeyCode::Char(' ') => Some(Message::ToggleSelect),
            KeyCode::Char('a') => Some(Message::ToggleSelectPage),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('r') => Some(Message::Reload),
            KeyCode::Tab => Some(Message::NextTab),
            KeyCode::Char(c @ '1'..='9') => c
                .to_digit(10)
                .map(|d| Message::Action(d as usize - 1)),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode) -> Option<Message> {
        let controller = Controller::new(&PTConfig::default());
        controller.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn maps_digits_to_zero_based_actions() {
        assert!(matches!(map(KeyCode::Char('1')), Some(Message::Action(0))));
        assert!(matches!(map(KeyCode::Char('9')), Some(Message::Action(8))));
        assert!(map(KeyCode::Char('0')).is_none());
    }

    #[test]
    fn maps_navigation_keys() {
        assert!(matches!(map(KeyCode::Char('/')), Some(Message::Search)));
        assert!(matches!(map(KeyCode::PageDown), Some(Message::NextPage)));
        assert!(matches!(map(KeyCode::Char('G')), Some(Message::LastPage)));
        assert!(matches!(map(KeyCode::Tab), Some(Message::NextTab)));
    }

    #[test]
    fn ctrl_c_quits() {
        let controller = Controller::new(&PTConfig::default());
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(controller.handle_key(key), Some(Message::Quit)));
    }
}
