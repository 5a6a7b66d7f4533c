//! Process-wide default journal.
//!
//! Everything in axon takes a [`Journal`] explicitly. [`global`] is a
//! shortcut for programs that only ever need one in-memory journal; it is
//! the same facade over the same adapter contract, nothing more.

use axon_journal::Journal;
use axon_journal_memory::MemoryJournal;
use std::sync::OnceLock;

static GLOBAL: OnceLock<Journal> = OnceLock::new();

/// The process-wide journal, created over a [`MemoryJournal`] on first use.
///
/// Cloning the returned handle is cheap; every clone talks to the same
/// store. No telemetry sink is attached.
pub fn global() -> &'static Journal {
    GLOBAL.get_or_init(|| Journal::new(MemoryJournal::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::Signal;

    #[test]
    fn same_instance_every_time() {
        assert!(std::ptr::eq(global(), global()));
    }

    #[tokio::test]
    async fn clones_share_the_store() {
        let signal = Signal::builder("global.unit").build().unwrap();
        global().clone().put_signal(signal.clone()).await.unwrap();
        assert_eq!(global().get_signal(signal.id()).await.unwrap(), Some(signal));
    }
}
