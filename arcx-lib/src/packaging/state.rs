use std::fmt;

use crate::error::{ArchiveError, Result};

/// Where an archive writer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// `create` has not been called yet.
    Uninitialized,
    /// Output file and encoder are ready for entries.
    Open,
    /// The archive was finalized; nothing more can be written.
    Closed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterState::Uninitialized => write!(f, "not created yet"),
            WriterState::Open => write!(f, "already open"),
            WriterState::Closed => write!(f, "already closed"),
        }
    }
}

/// Slot holding an encoder through Uninitialized -> Open -> Closed.
pub(crate) enum Lifecycle<W> {
    Uninitialized,
    Open(W),
    Closed,
}

impl<W> Default for Lifecycle<W> {
    fn default() -> Self {
        Lifecycle::Uninitialized
    }
}

impl<W> Lifecycle<W> {
    pub(crate) fn state(&self) -> WriterState {
        match self {
            Lifecycle::Uninitialized => WriterState::Uninitialized,
            Lifecycle::Open(_) => WriterState::Open,
            Lifecycle::Closed => WriterState::Closed,
        }
    }

    /// Fails unless nothing has been created yet.
    pub(crate) fn ensure_uninitialized(&self, operation: &'static str) -> Result<()> {
        match self {
            Lifecycle::Uninitialized => Ok(()),
            other => Err(ArchiveError::InvalidState {
                state: other.state(),
                operation,
            }),
        }
    }

    pub(crate) fn open(&mut self, encoder: W) {
        *self = Lifecycle::Open(encoder);
    }

    /// Borrows the encoder of an open writer.
    pub(crate) fn encoder_mut(&mut self, operation: &'static str) -> Result<&mut W> {
        match self {
            Lifecycle::Open(encoder) => Ok(encoder),
            other => Err(ArchiveError::InvalidState {
                state: other.state(),
                operation,
            }),
        }
    }

    /// Takes the encoder out for finalization, leaving the slot Closed.
    ///
    /// The slot is Closed even if finalizing the returned encoder fails later;
    /// a half-finished encoder cannot be resumed.
    pub(crate) fn take_for_close(&mut self) -> Result<W> {
        match std::mem::replace(self, Lifecycle::Closed) {
            Lifecycle::Open(encoder) => Ok(encoder),
            previous => {
                let state = previous.state();
                *self = previous;
                Err(ArchiveError::InvalidState {
                    state,
                    operation: "close",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let mut slot: Lifecycle<u8> = Lifecycle::default();
        assert_eq!(slot.state(), WriterState::Uninitialized);
        assert!(slot.encoder_mut("add").is_err());
        assert!(slot.take_for_close().is_err());
        assert_eq!(slot.state(), WriterState::Uninitialized);

        slot.ensure_uninitialized("create").unwrap();
        slot.open(7);
        assert_eq!(*slot.encoder_mut("add").unwrap(), 7);
        assert!(slot.ensure_uninitialized("create").is_err());

        assert_eq!(slot.take_for_close().unwrap(), 7);
        assert_eq!(slot.state(), WriterState::Closed);

        let err = slot.take_for_close().unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::InvalidState {
                state: WriterState::Closed,
                operation: "close"
            }
        ));
    }
}
