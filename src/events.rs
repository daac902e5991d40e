//! Keyboard and signal handling.
//!
//! Both listeners translate a quit request into a cancelled
//! [`CancellationToken`]; the poll loop notices it at its next check.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> std::io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// `q`, `Esc` or `Ctrl+C`. Raw mode delivers Ctrl+C as a key, not a signal.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Watch the terminal for a quit key on a dedicated thread.
///
/// The thread exits once `cancel` fires, whoever cancelled it.
pub fn spawn_key_listener(cancel: CancellationToken) -> JoinHandle<()> {
    thread::spawn(move || {
        while !cancel.is_cancelled() {
            match poll_event(POLL_TIMEOUT) {
                Ok(Some(Event::Key(key))) if is_quit_key(&key) => {
                    debug!("Quit requested from keyboard");
                    cancel.cancel();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Stopped reading keyboard input: {}", e);
                    break;
                }
            }
        }
    })
}

/// Cancel on SIGINT / Ctrl+C delivered as a signal.
pub async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                debug!("Interrupt received");
                cancel.cancel();
            }
            Err(e) => warn!("Cannot listen for interrupts: {}", e),
        },
        _ = cancel.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn other_keys_ignored() {
        assert!(!is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&key(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!is_quit_key(&key(KeyCode::Char('r'), KeyModifiers::NONE)));
    }

    #[test]
    fn releases_are_ignored() {
        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!is_quit_key(&release));
    }

    #[tokio::test]
    async fn ctrl_c_listener_exits_when_cancelled_elsewhere() {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

        cancel.cancel();
        task.await.unwrap();
    }
}
