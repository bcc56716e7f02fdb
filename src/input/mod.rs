//! User input: interaction events and note sources
//!
//! Interactions (pointer or key, down or up) unlock audio output. The
//! keyboard layout turns computer keys into notes.

mod keyboard;
mod session;
pub mod terminal;

pub use keyboard::{KeyAction, KeyboardLayout};
pub use session::{KeySession, SessionEvent, REPEAT_WINDOW};

use tokio::sync::broadcast;

/// A user gesture that may unlock audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    PointerDown,
    PointerUp,
    KeyDown,
    KeyUp,
}

impl Interaction {
    /// All interaction kinds
    pub const ALL: [Interaction; 4] = [
        Interaction::PointerDown,
        Interaction::PointerUp,
        Interaction::KeyDown,
        Interaction::KeyUp,
    ];
}

/// Broadcast channel carrying interactions to any number of listeners
#[derive(Debug, Clone)]
pub struct InteractionBus {
    sender: broadcast::Sender<Interaction>,
}

impl InteractionBus {
    /// Create a bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Publish an interaction (dropped if nobody listens)
    pub fn emit(&self, interaction: Interaction) {
        let _ = self.sender.send(interaction);
    }

    /// Listen for interactions published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Interaction> {
        self.sender.subscribe()
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InteractionBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bus_delivers_to_all_listeners() {
        let bus = InteractionBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(Interaction::KeyDown);

        assert_eq!(first.recv().await.unwrap(), Interaction::KeyDown);
        assert_eq!(second.recv().await.unwrap(), Interaction::KeyDown);
    }

    #[test]
    fn test_emit_without_listeners() {
        let bus = InteractionBus::new();
        bus.emit(Interaction::PointerUp);
        assert_eq!(bus.listener_count(), 0);
    }
}
