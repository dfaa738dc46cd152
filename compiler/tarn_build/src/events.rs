//! Progress and change notifications.
//!
//! Status messages are phase labels (`Loading <file>`, `Parsing <file>`,
//! `Compiling headers`, `Generating code`, `Done`, `ERROR: <n> errors`,
//! `Compiler failure: <message>`). A file-updated event with an empty path
//! means every file changed.

use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildEvent {
    Status(String),
    FileUpdated(String),
}

/// Receives build events. Called from pipeline tasks, never under a lock.
pub trait BuildObserver: Send + Sync {
    fn status(&self, message: &str);

    fn file_updated(&self, path: &str);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl BuildObserver for NullObserver {
    fn status(&self, _message: &str) {}

    fn file_updated(&self, _path: &str) {}
}

/// Forwards events into an unbounded channel for pull-based consumers.
#[derive(Clone, Debug)]
pub struct EventChannel {
    sender: mpsc::UnboundedSender<BuildEvent>,
}

impl EventChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BuildEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventChannel { sender }, receiver)
    }

    fn send(&self, event: BuildEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

impl BuildObserver for EventChannel {
    fn status(&self, message: &str) {
        self.send(BuildEvent::Status(message.to_string()));
    }

    fn file_updated(&self, path: &str) {
        self.send(BuildEvent::FileUpdated(path.to_string()));
    }
}
