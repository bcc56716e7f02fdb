//! Terminal input pump
//!
//! Reads crossterm events on a background thread, publishes interactions on
//! an [`InteractionBus`] and forwards key presses to the caller.

use std::io::stdout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, KeyboardEnhancementFlags, MouseEventKind, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement},
};
use tokio::sync::mpsc;

use super::{Interaction, InteractionBus};

/// Key activity forwarded to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Press(char),
    Release(char),
    Quit,
}

/// Split a terminal event into an interaction and a key input
pub fn translate(event: &Event) -> (Option<Interaction>, Option<KeyInput>) {
    match event {
        Event::Key(key) => {
            let interaction = match key.kind {
                KeyEventKind::Press => Some(Interaction::KeyDown),
                KeyEventKind::Release => Some(Interaction::KeyUp),
                KeyEventKind::Repeat => None,
            };

            let input = match (key.code, key.kind) {
                (KeyCode::Esc, KeyEventKind::Press) => Some(KeyInput::Quit),
                (KeyCode::Char('c'), KeyEventKind::Press)
                    if key.modifiers.contains(KeyModifiers::CONTROL) =>
                {
                    Some(KeyInput::Quit)
                }
                (KeyCode::Char(c), KeyEventKind::Press) => Some(KeyInput::Press(c.to_ascii_lowercase())),
                (KeyCode::Char(c), KeyEventKind::Release) => {
                    Some(KeyInput::Release(c.to_ascii_lowercase()))
                }
                _ => None,
            };

            (interaction, input)
        }
        Event::Mouse(mouse) => {
            let interaction = match mouse.kind {
                MouseEventKind::Down(_) => Some(Interaction::PointerDown),
                MouseEventKind::Up(_) => Some(Interaction::PointerUp),
                _ => None,
            };
            (interaction, None)
        }
        _ => (None, None),
    }
}

/// Raw-mode terminal reader running on its own thread
pub struct TerminalInput {
    running: Arc<AtomicBool>,
    reports_releases: bool,
    thread: Option<JoinHandle<()>>,
}

impl TerminalInput {
    /// Put the terminal in raw mode and start reading events
    pub fn start(bus: InteractionBus) -> Result<(Self, mpsc::UnboundedReceiver<KeyInput>)> {
        enable_raw_mode()?;
        execute!(stdout(), EnableMouseCapture)?;

        let reports_releases = supports_keyboard_enhancement().unwrap_or(false);
        if reports_releases {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        log::debug!("terminal input started, key releases reported: {}", reports_releases);

        let running = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = mpsc::unbounded_channel();

        let thread = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match event::poll(Duration::from_millis(50)) {
                        Ok(false) => continue,
                        Ok(true) => {}
                        Err(e) => {
                            log::warn!("terminal poll failed: {}", e);
                            break;
                        }
                    }

                    let event = match event::read() {
                        Ok(event) => event,
                        Err(e) => {
                            log::warn!("terminal read failed: {}", e);
                            break;
                        }
                    };

                    // Queue the key before announcing the interaction, so the
                    // press that opens the gate is already pending when it opens
                    let (interaction, input) = translate(&event);
                    if let Some(input) = input {
                        if sender.send(input).is_err() {
                            break;
                        }
                    }
                    if let Some(interaction) = interaction {
                        bus.emit(interaction);
                    }
                }
            })
        };

        Ok((
            Self {
                running,
                reports_releases,
                thread: Some(thread),
            },
            receiver,
        ))
    }

    /// Whether key release events arrive
    pub fn reports_releases(&self) -> bool {
        self.reports_releases
    }

    /// Stop reading and restore the terminal
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();

            if self.reports_releases {
                let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
            }
            let _ = execute!(stdout(), DisableMouseCapture);
            let _ = disable_raw_mode();
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        self.stop();
    }
}
