//! Terminal input reader.
//!
//! Crossterm events are polled on a background task and forwarded into the
//! loop as [`AppAction`]s over the same channel as task completions.

use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::app::{AppAction, AppActionDispatcher};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Map a terminal event onto the loop's input vocabulary.
pub fn translate(event: Event) -> Option<AppAction> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppAction::Key(key)),
        Event::Paste(text) => Some(AppAction::Paste(text)),
        Event::Resize(width, height) => Some(AppAction::Resize { width, height }),
        _ => None,
    }
}

/// Poll until `stop` fires. Stopping is required before anything else reads
/// from the terminal.
pub fn spawn_event_reader(
    dispatcher: AppActionDispatcher,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while !stop.is_cancelled() {
            if let Ok(true) = event::poll(POLL_INTERVAL) {
                match event::read() {
                    Ok(ev) => {
                        if let Some(action) = translate(ev) {
                            dispatcher.dispatch(action);
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

    #[test]
    fn key_presses_become_key_actions() {
        let key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(matches!(
            translate(Event::Key(key)),
            Some(AppAction::Key(k)) if k.code == KeyCode::Char('a')
        ));
    }

    #[test]
    fn key_releases_are_dropped() {
        let key = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert!(translate(Event::Key(key)).is_none());
        assert!(translate(Event::FocusGained).is_none());
    }

    #[test]
    fn paste_and_resize_are_forwarded() {
        assert!(matches!(
            translate(Event::Paste("hi".into())),
            Some(AppAction::Paste(text)) if text == "hi"
        ));
        assert!(matches!(
            translate(Event::Resize(100, 40)),
            Some(AppAction::Resize {
                width: 100,
                height: 40
            })
        ));
    }
}
