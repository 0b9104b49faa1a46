use tokio::sync::watch;
use tracing::info;

use crate::domain::Navigator;

/// Navigator for a terminal front end: there is no page to swap, so the
/// current location is published on a watch channel for whoever renders.
pub struct TerminalNavigator {
    location: watch::Sender<String>,
}

impl TerminalNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        let (location, _) = watch::channel(start.into());
        Self { location }
    }

    pub fn current(&self) -> String {
        self.location.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "navigate");
        self.location.send_replace(path.to_string());
    }
}
