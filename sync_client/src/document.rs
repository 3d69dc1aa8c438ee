use collab_ot::{Operation, Selection, create_operations_from_diff, transform_selection};
use log::debug;
use uuid::Uuid;

use crate::errors::ClientError;

/// Local edits the server hasn't confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingState {
    Synchronized,

    /// One operation has been sent and not acknowledged.
    AwaitingAck(Operation),

    /// Edits made while waiting are composed into the buffer, which is sent
    /// once the outstanding operation is acknowledged.
    AwaitingWithBuffer(Operation, Operation),
}

impl PendingState {
    fn contains(&self, operation_id: Uuid) -> bool {
        match self {
            PendingState::Synchronized => false,
            PendingState::AwaitingAck(outstanding) => outstanding.id == operation_id,
            PendingState::AwaitingWithBuffer(outstanding, buffer) => {
                outstanding.id == operation_id || buffer.id == operation_id
            }
        }
    }
}

/// A client's copy of a shared document.
///
/// `revision` is the last server revision reflected in `content`; local edits
/// on top of it are tracked in `pending` until the server acknowledges them.
/// Nothing here does IO, the caller transmits what the methods return.
#[derive(Debug, Clone)]
pub struct ClientDocument {
    author_id: String,
    file_id: String,
    content: String,
    revision: u64,
    pending: PendingState,
    selection: Selection,
}

impl ClientDocument {
    pub fn new(author_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            file_id: file_id.into(),
            content: String::new(),
            revision: 0,
            pending: PendingState::Synchronized,
            selection: Selection::default(),
        }
    }

    pub fn content(&self) -> &str { &self.content }

    pub fn revision(&self) -> u64 { self.revision }

    pub fn pending(&self) -> &PendingState { &self.pending }

    pub fn selection(&self) -> Selection { self.selection }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.clamp_selection();
    }

    /// Records the editor's new content.
    ///
    /// Returns the operation to submit if nothing is in flight. Otherwise
    /// the edit is kept back until the outstanding operation is acknowledged.
    pub fn local_change(&mut self, new_content: &str) -> Result<Option<Operation>, ClientError> {
        if new_content == self.content {
            return Ok(None);
        }

        let operation = create_operations_from_diff(
            &self.content,
            new_content,
            &self.author_id,
            &self.file_id,
            self.revision,
        );

        let (pending, to_send) = match &self.pending {
            PendingState::Synchronized => (
                PendingState::AwaitingAck(operation.clone()),
                Some(operation),
            ),
            PendingState::AwaitingAck(outstanding) => (
                PendingState::AwaitingWithBuffer(outstanding.clone(), operation),
                None,
            ),
            PendingState::AwaitingWithBuffer(outstanding, buffer) => (
                PendingState::AwaitingWithBuffer(outstanding.clone(), buffer.compose(&operation)?),
                None,
            ),
        };

        new_content.clone_into(&mut self.content);
        self.pending = pending;
        self.clamp_selection();

        Ok(to_send)
    }

    /// Applies an operation accepted by the server from someone else.
    ///
    /// It is transformed through the local pending edits first, which in turn
    /// get transformed so they still apply after it. The caret and selection
    /// follow the text they pointed at. Returns whether the content changed.
    pub fn apply_remote(&mut self, operation: &Operation) -> Result<bool, ClientError> {
        if self.pending.contains(operation.id) {
            return Ok(false);
        }

        if operation.revision < self.revision {
            debug!(
                "Ignoring operation {} based on revision {}, already at {}",
                operation.id, operation.revision, self.revision
            );
            return Ok(false);
        }

        if operation.revision > self.revision {
            return Err(ClientError::RevisionGap {
                expected: self.revision,
                received: operation.revision,
            });
        }

        let (pending, remote) = match &self.pending {
            PendingState::Synchronized => (PendingState::Synchronized, operation.clone()),
            PendingState::AwaitingAck(outstanding) => {
                let (outstanding, remote) = outstanding.transform(operation)?;
                (PendingState::AwaitingAck(outstanding), remote)
            }
            PendingState::AwaitingWithBuffer(outstanding, buffer) => {
                let (outstanding, remote) = outstanding.transform(operation)?;
                let (buffer, remote) = buffer.transform(&remote)?;
                (PendingState::AwaitingWithBuffer(outstanding, buffer), remote)
            }
        };

        self.content = remote.apply(&self.content)?;
        self.selection = transform_selection(self.selection, &remote.operations, false);
        self.revision += 1;
        self.pending = pending;

        Ok(!remote.is_noop())
    }

    /// Confirms that the outstanding operation became `revision`.
    ///
    /// Returns the buffered edits, rebased onto `revision`, when they are due
    /// to be sent next. Acknowledgements older than the current revision
    /// belong to edits a snapshot already replaced and are ignored.
    pub fn acknowledge(
        &mut self,
        operation_id: Uuid,
        revision: u64,
    ) -> Result<Option<Operation>, ClientError> {
        if revision <= self.revision {
            debug!("Ignoring stale acknowledgement of {operation_id} at revision {revision}");
            return Ok(None);
        }

        let is_outstanding = match &self.pending {
            PendingState::AwaitingAck(outstanding)
            | PendingState::AwaitingWithBuffer(outstanding, _) => outstanding.id == operation_id,
            PendingState::Synchronized => false,
        };

        if !is_outstanding || revision != self.revision + 1 {
            return Err(ClientError::UnexpectedAck {
                operation_id,
                revision,
            });
        }

        self.revision = revision;

        match std::mem::replace(&mut self.pending, PendingState::Synchronized) {
            PendingState::AwaitingWithBuffer(_, buffer) => {
                let next = buffer.rebased(revision);
                self.pending = PendingState::AwaitingAck(next.clone());

                Ok(Some(next))
            }
            PendingState::AwaitingAck(_) | PendingState::Synchronized => Ok(None),
        }
    }

    /// Replaces everything with the server's state. Pending edits are
    /// dropped.
    pub fn adopt_sync(&mut self, content: String, revision: u64) {
        if !matches!(self.pending, PendingState::Synchronized) {
            debug!("Discarding pending edits in favour of revision {revision}");
        }

        self.content = content;
        self.revision = revision;
        self.pending = PendingState::Synchronized;
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let length = self.content.chars().count();

        self.selection = Selection::new(
            self.selection.start.min(length),
            self.selection.end.min(length),
        );
    }
}

#[cfg(test)]
mod tests {
    use collab_ot::TextOperation;
    use pretty_assertions::assert_eq;

    use super::*;

    fn synced(content: &str, revision: u64) -> ClientDocument {
        let mut document = ClientDocument::new("alice", "file");
        document.adopt_sync(content.to_owned(), revision);
        document
    }

    fn remote_insert(revision: u64, position: usize, text: &str, length: usize) -> Operation {
        Operation::new(
            "bob",
            "file",
            revision,
            vec![
                TextOperation::Retain(position),
                TextOperation::Insert(text.to_owned()),
                TextOperation::Retain(length - position),
            ],
        )
    }

    #[test]
    fn test_first_edit_is_sent_and_later_ones_buffered() {
        let mut document = synced("abc", 4);

        let first = document.local_change("abcd").unwrap().unwrap();
        assert_eq!(first.revision, 4);
        assert_eq!(first.author_id, "alice");

        assert_eq!(document.local_change("abcde").unwrap(), None);
        assert_eq!(document.local_change("xabcde").unwrap(), None);
        assert_eq!(document.local_change("xabcde").unwrap(), None);

        let PendingState::AwaitingWithBuffer(_, buffer) = document.pending().clone() else {
            panic!("Expected buffered edits");
        };
        assert_eq!(buffer.apply("abcd").unwrap(), "xabcde");

        let next = document.acknowledge(first.id, 5).unwrap().unwrap();
        assert_eq!(next.id, buffer.id);
        assert_eq!(next.revision, 5);
        assert_eq!(document.revision(), 5);

        assert_eq!(document.acknowledge(next.id, 6).unwrap(), None);
        assert_eq!(document.pending(), &PendingState::Synchronized);
    }

    #[test]
    fn test_remote_operation_is_transformed_through_pending_edits() {
        let mut document = synced("hello", 0);
        document.local_change("hello world").unwrap();
        document.local_change("hello world?").unwrap();

        let changed = document.apply_remote(&remote_insert(0, 0, ">> ", 5)).unwrap();

        assert!(changed);
        assert_eq!(document.content(), ">> hello world?");
        assert_eq!(document.revision(), 1);

        let PendingState::AwaitingWithBuffer(outstanding, buffer) = document.pending().clone()
        else {
            panic!("Expected buffered edits");
        };
        assert_eq!(outstanding.apply(">> hello").unwrap(), ">> hello world");
        assert_eq!(buffer.apply(">> hello world").unwrap(), ">> hello world?");
    }

    #[test]
    fn test_caret_follows_remote_insert() {
        let mut document = synced("hello", 0);
        document.set_selection(Selection::new(2, 4));

        document.apply_remote(&remote_insert(0, 1, "__", 5)).unwrap();

        assert_eq!(document.selection(), Selection::new(4, 6));
    }

    #[test]
    fn test_duplicate_and_own_operations_are_ignored() {
        let mut document = synced("abc", 3);
        let own = document.local_change("abcd").unwrap().unwrap();

        assert!(!document.apply_remote(&own).unwrap());
        assert!(!document.apply_remote(&remote_insert(2, 0, "x", 3)).unwrap());
        assert_eq!(document.content(), "abcd");
        assert_eq!(document.revision(), 3);
    }

    #[test]
    fn test_revision_gap_is_an_error() {
        let mut document = synced("abc", 3);

        let result = document.apply_remote(&remote_insert(5, 0, "x", 3));

        assert!(matches!(
            result,
            Err(ClientError::RevisionGap {
                expected: 3,
                received: 5
            })
        ));
        assert_eq!(document.content(), "abc");
    }

    #[test]
    fn test_structural_mismatch_leaves_the_document_untouched() {
        let mut document = synced("abc", 3);

        let result = document.apply_remote(&remote_insert(3, 0, "x", 10));

        assert!(matches!(result, Err(ClientError::Operation(_))));
        assert_eq!(document.content(), "abc");
        assert_eq!(document.revision(), 3);
    }

    #[test]
    fn test_unknown_ack_is_an_error() {
        let mut document = synced("abc", 3);

        assert!(matches!(
            document.acknowledge(Uuid::new_v4(), 4),
            Err(ClientError::UnexpectedAck { revision: 4, .. })
        ));
        assert_eq!(document.acknowledge(Uuid::new_v4(), 2).unwrap(), None);
    }

    #[test]
    fn test_sync_wins_over_pending_edits() {
        let mut document = synced("draft", 2);
        document.set_selection(Selection::new(5, 5));
        document.local_change("draft one").unwrap();
        document.local_change("draft one two").unwrap();

        document.adopt_sync("done".to_owned(), 7);

        assert_eq!(document.content(), "done");
        assert_eq!(document.revision(), 7);
        assert_eq!(document.pending(), &PendingState::Synchronized);
        assert_eq!(document.selection(), Selection::new(4, 4));
    }
}
