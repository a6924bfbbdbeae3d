use crate::error::Result;
use crate::store::{ClipStore, StoreSnapshot};

/// A command that can be executed, undone, and described.
pub trait Command: std::fmt::Debug {
    fn execute(&self, store: &mut ClipStore) -> Result<()>;
    fn undo(&self, store: &mut ClipStore) -> Result<()>;
    fn description(&self) -> &str;
}

// ---------------------------------------------------------------------------
// EditCommand
// ---------------------------------------------------------------------------

/// One committed edit, captured as the store contents before and after it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditCommand {
    description: String,
    before: StoreSnapshot,
    after: StoreSnapshot,
}

impl EditCommand {
    pub fn new(
        description: impl Into<String>,
        before: StoreSnapshot,
        after: StoreSnapshot,
    ) -> Self {
        Self {
            description: description.into(),
            before,
            after,
        }
    }

    pub fn before(&self) -> &StoreSnapshot {
        &self.before
    }

    pub fn after(&self) -> &StoreSnapshot {
        &self.after
    }
}

impl Command for EditCommand {
    fn execute(&self, store: &mut ClipStore) -> Result<()> {
        store.restore(self.after.clone());
        Ok(())
    }

    fn undo(&self, store: &mut ClipStore) -> Result<()> {
        store.restore(self.before.clone());
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

// ---------------------------------------------------------------------------
// HistoryHook
// ---------------------------------------------------------------------------

/// Undo/redo storage owned by the host. The editor records every commit and
/// asks for the snapshot to restore when the user undoes or redoes.
pub trait HistoryHook {
    fn record(&mut self, command: EditCommand);

    /// Step back. Returns the store contents to restore.
    fn undo(&mut self) -> Option<StoreSnapshot>;

    /// Step forward again. Returns the store contents to restore.
    fn redo(&mut self) -> Option<StoreSnapshot>;
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Bounded undo/redo stacks of committed edits.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|cmd| cmd.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|cmd| cmd.description())
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HistoryHook for History {
    /// Push a commit. Clears the redo stack and drops the oldest entry past
    /// `max_size`.
    fn record(&mut self, command: EditCommand) {
        self.redo_stack.clear();
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }

    fn undo(&mut self) -> Option<StoreSnapshot> {
        let cmd = self.undo_stack.pop()?;
        let snapshot = cmd.before().clone();
        self.redo_stack.push(cmd);
        Some(snapshot)
    }

    fn redo(&mut self) -> Option<StoreSnapshot> {
        let cmd = self.redo_stack.pop()?;
        let snapshot = cmd.after().clone();
        self.undo_stack.push(cmd);
        Some(snapshot)
    }
}

/// Discards everything; for hosts without undo.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl HistoryHook for NoHistory {
    fn record(&mut self, _command: EditCommand) {}

    fn undo(&mut self) -> Option<StoreSnapshot> {
        None
    }

    fn redo(&mut self) -> Option<StoreSnapshot> {
        None
    }
}
