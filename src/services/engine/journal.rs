// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::engine::ledger::Asset;
use alloy::primitives::{Address, B256, U256};

/// Previous value of one piece of world state, recorded before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JournalEntry {
    Balance {
        account: Address,
        asset: Asset,
        previous: U256,
    },
    Allowance {
        owner: Address,
        spender: Address,
        asset: Asset,
        previous: U256,
    },
    Storage {
        address: Address,
        slot: B256,
        previous: U256,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Undo log for the in-flight outer call.
///
/// Writes are only recorded while at least one checkpoint is open; once the
/// outermost checkpoint closes nothing can be reverted any more and the log is
/// dropped.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    open: usize,
}

impl Journal {
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open += 1;
        Checkpoint(self.entries.len())
    }

    pub fn record(&mut self, entry: JournalEntry) {
        if self.open > 0 {
            self.entries.push(entry);
        }
    }

    /// Keep everything written since `checkpoint`.
    pub fn commit(&mut self, _checkpoint: Checkpoint) {
        self.close();
    }

    /// Hand back the entries written since `checkpoint`, newest first.
    pub fn revert(&mut self, checkpoint: Checkpoint) -> Vec<JournalEntry> {
        let mut undone = self.entries.split_off(checkpoint.0.min(self.entries.len()));
        undone.reverse();
        self.close();
        undone
    }

    pub fn depth(&self) -> usize {
        self.open
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn close(&mut self) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.entries.clear();
        }
    }
}
