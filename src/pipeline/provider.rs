// Where the built-in list comes from. Today it is a fixed pair of standards
// behind an artificial delay; anything that can answer `fetch_progressions`
// (a real HTTP source, a test double) can stand in without the caller
// noticing.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use super::progression::Progression;

pub trait ProgressionProvider: Send + Sync {
    fn fetch_progressions(&self) -> anyhow::Result<Vec<Progression>>;
}

pub struct BuiltinProvider {
    latency: Duration,
}

impl BuiltinProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl ProgressionProvider for BuiltinProvider {
    fn fetch_progressions(&self) -> anyhow::Result<Vec<Progression>> {
        thread::sleep(self.latency);
        Ok(builtin_jazz())
    }
}

pub fn builtin_jazz() -> Vec<Progression> {
    vec![
        Progression::new(
            "ii-V-I",
            "Dm7 G7 Cmaj7",
            "F4 B4 E5",
            "The most common jazz progression. Forms the basis for many standards like 'All The Things You Are'.",
        ),
        Progression::new(
            "I-vi-ii-V",
            "Cmaj7 Am7 Dm7 G7",
            "E5 C5 F5 B4",
            "Known as the 'rhythm changes' progression. It's the basis for Gershwin's 'I Got Rhythm'.",
        ),
    ]
}

/// Run one fetch on its own thread; the result shows up on `tx`.
pub fn spawn_fetch(
    provider: std::sync::Arc<dyn ProgressionProvider>,
    tx: Sender<anyhow::Result<Vec<Progression>>>,
) {
    thread::spawn(move || {
        debug!("fetching built-in progressions");
        let result = provider.fetch_progressions();
        if tx.send(result).is_err() {
            warn!("fetch finished after the app stopped listening");
        }
    });
}

pub fn fetch_channel() -> (
    Sender<anyhow::Result<Vec<Progression>>>,
    Receiver<anyhow::Result<Vec<Progression>>>,
) {
    crossbeam_channel::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn builtin_provider_returns_the_two_standards() {
        let list = BuiltinProvider::new(Duration::ZERO).fetch_progressions().unwrap();
        let names: Vec<&str> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ii-V-I", "I-vi-ii-V"]);
        assert_eq!(list[1].chords, "Cmaj7 Am7 Dm7 G7");
    }

    #[test]
    fn spawned_fetch_reports_back() {
        let (tx, rx) = fetch_channel();
        spawn_fetch(Arc::new(BuiltinProvider::new(Duration::from_millis(5))), tx);
        let got = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(got.len(), 2);
    }
}
