// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Append-only in-memory transaction store.
//!
//! Shared by the interception pipeline (writer) and the live view server
//! (reader). A single reader/writer lock guards the sequence: many concurrent
//! snapshots, exclusive appends, no partially-appended record observable.
//! Grows unboundedly for the process lifetime; eviction is out of scope.

use std::sync::RwLock;

use crate::transaction::Transaction;

#[derive(Debug, Default)]
pub struct TransactionStore {
    inner: RwLock<Vec<Transaction>>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record under exclusive access.
    pub fn append(&self, tx: Transaction) {
        match self.inner.write() {
            Ok(mut records) => records.push(tx),
            Err(_) => {
                tracing::warn!("transaction store lock poisoned during append");
            }
        }
    }

    /// Full copy of the current sequence under shared access.
    pub fn snapshot(&self) -> Vec<Transaction> {
        match self.inner.read() {
            Ok(records) => records.clone(),
            Err(_) => {
                tracing::warn!("transaction store lock poisoned during snapshot");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(records) => records.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
