//! Bookkeeping for in-flight outbound transactions.
//!
//! Every failure-report chunk (and every keep-alive probe) registers the
//! transaction id it was sent under together with the message id it
//! belongs to, so inbound responses and REPORTs can be correlated back
//! to the right message and content kind. Entries that never see a
//! response are swept out once they pass the expiry age, and entries
//! whose timestamp sits in the future (the wall clock stepped backwards)
//! are evicted on the same pass.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, SystemTime},
};

use log::debug;

use crate::listener::ChunkKind;

/// What the session remembers about one transmitted chunk.
#[derive(Clone, Debug)]
pub struct TransactionInfo {
    pub transaction_id: String,
    /// Message id written on the wire.
    pub message_id: String,
    /// Caller-level message id, reported back on delivery failures.
    pub caller_message_id: Option<String>,
    pub kind: ChunkKind,
    created: SystemTime,
}

#[derive(Debug, Default)]
struct Inner {
    by_transaction: HashMap<String, TransactionInfo>,
    by_message: HashMap<String, String>,
}

/// Correlation table keyed by transaction id and by message id.
#[derive(Debug, Default)]
pub struct TransactionStore {
    inner: Mutex<Inner>,
}

impl TransactionStore {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a transmitted chunk for later correlation.
    pub fn insert(
        &self,
        transaction_id: &str,
        message_id: &str,
        caller_message_id: Option<&str>,
        kind: ChunkKind,
    ) {
        let info = TransactionInfo {
            transaction_id: transaction_id.to_owned(),
            message_id: message_id.to_owned(),
            caller_message_id: caller_message_id.map(str::to_owned),
            kind,
            created: SystemTime::now(),
        };
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .by_message
                .insert(message_id.to_owned(), transaction_id.to_owned());
            inner.by_transaction.insert(transaction_id.to_owned(), info);
        }
    }

    /// Entry for a transaction id, typically while handling a response.
    #[must_use]
    pub fn by_transaction(&self, transaction_id: &str) -> Option<TransactionInfo> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.by_transaction.get(transaction_id).cloned())
    }

    /// Entry for a message id, typically while handling a REPORT.
    #[must_use]
    pub fn by_message(&self, message_id: &str) -> Option<TransactionInfo> {
        self.inner.lock().ok().and_then(|inner| {
            let transaction_id = inner.by_message.get(message_id)?;
            inner.by_transaction.get(transaction_id).cloned()
        })
    }

    /// Drop the entry for a transaction id, along with its message key.
    pub fn remove(&self, transaction_id: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(info) = inner.by_transaction.remove(transaction_id) {
                inner.by_message.remove(&info.message_id);
            }
        }
    }

    /// Evict entries older than `expiry` or stamped in the future.
    pub fn sweep(&self, expiry: Duration) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let now = SystemTime::now();
        let stale: Vec<String> = inner
            .by_transaction
            .values()
            .filter(|info| match now.duration_since(info.created) {
                Ok(age) => age > expiry,
                // Created in the future; the clock moved underneath us.
                Err(_) => true,
            })
            .map(|info| info.transaction_id.clone())
            .collect();
        for transaction_id in stale {
            debug!("sweeping expired transaction {transaction_id}");
            if let Some(info) = inner.by_transaction.remove(&transaction_id) {
                inner.by_message.remove(&info.message_id);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.by_transaction.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlates_by_both_keys() {
        let store = TransactionStore::new();
        store.insert("tx1", "msg1", Some("caller1"), ChunkKind::TextMessage);
        assert_eq!(store.by_transaction("tx1").unwrap().message_id, "msg1");
        assert_eq!(
            store.by_message("msg1").unwrap().caller_message_id.as_deref(),
            Some("caller1")
        );
        assert_eq!(store.by_message("msg1").unwrap().transaction_id, "tx1");
        assert!(store.by_transaction("tx2").is_none());
    }

    #[test]
    fn remove_clears_both_keys() {
        let store = TransactionStore::new();
        store.insert("tx1", "msg1", None, ChunkKind::EmptyChunk);
        store.remove("tx1");
        assert!(store.by_transaction("tx1").is_none());
        assert!(store.by_message("msg1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_only_evicts_expired_entries() {
        let store = TransactionStore::new();
        store.insert("tx1", "msg1", None, ChunkKind::TextMessage);
        store.sweep(Duration::from_secs(30));
        assert_eq!(store.len(), 1);
        std::thread::sleep(Duration::from_millis(5));
        store.sweep(Duration::ZERO);
        assert!(store.is_empty());
    }
}
