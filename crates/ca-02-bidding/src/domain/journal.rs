//! # Undo Journal
//!
//! Bounded stacks of outcome-changing actions. Each entry keeps the touched
//! players and teams as they were before and after the action, plus the id
//! of the audit record that logged it, so undo and redo can be written as
//! compensating records pointing back at what they revert.

use ca_01_ledger::{AuditAction, LedgerPatch};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub action: AuditAction,
    /// Audit record of the forward action, or of the last redo.
    pub audit_id: u64,
    pub before: LedgerPatch,
    pub after: LedgerPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoJournal {
    depth: usize,
    undo: VecDeque<JournalEntry>,
    redo: Vec<JournalEntry>,
}

impl UndoJournal {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            undo: VecDeque::with_capacity(depth),
            redo: Vec::new(),
        }
    }

    /// Record a forward action. Clears the redo stack; the oldest entry
    /// falls off once the stack is at depth.
    pub fn record(&mut self, entry: JournalEntry) {
        self.redo.clear();
        self.push_undo(entry);
    }

    fn push_undo(&mut self, entry: JournalEntry) {
        if self.depth == 0 {
            return;
        }
        while self.undo.len() >= self.depth {
            self.undo.pop_front();
        }
        self.undo.push_back(entry);
    }

    pub fn peek_undo(&self) -> Option<&JournalEntry> {
        self.undo.back()
    }

    pub fn peek_redo(&self) -> Option<&JournalEntry> {
        self.redo.last()
    }

    /// Move the newest entry to the redo stack, tagged with the audit id of
    /// the undo record.
    pub fn commit_undo(&mut self, undo_audit_id: u64) -> Option<JournalEntry> {
        let mut entry = self.undo.pop_back()?;
        entry.audit_id = undo_audit_id;
        self.redo.push(entry.clone());
        Some(entry)
    }

    /// Move the newest redo entry back onto the undo stack.
    pub fn commit_redo(&mut self, redo_audit_id: u64) -> Option<JournalEntry> {
        let mut entry = self.redo.pop()?;
        entry.audit_id = redo_audit_id;
        self.push_undo(entry.clone());
        Some(entry)
    }

    /// Forget everything, e.g. when a new round starts.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}
