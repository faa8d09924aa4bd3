//! Per-user workflow session: state machine and attachment registry.
//!
//! Everything here is pure state manipulation. Handlers feed inbound events
//! through the methods below and turn the returned outcomes into Telegram
//! replies; no I/O happens in this module.

use std::path::PathBuf;
use teloxide::types::{FileId, MessageId};
use thiserror::Error;

/// Telegram user identifier, the session key.
pub type UserId = i64;

/// Recoverable workflow violations surfaced to the user as guidance.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A document arrived before the title and body were both set.
    #[error("title and body must be set before uploading documents")]
    SequenceViolation,
    /// /finish was requested with nothing to deliver.
    #[error("no attachments to deliver")]
    EmptyFinalization,
}

/// Workflow progress. Title and body only exist once the session has
/// advanced past them, so a body without a title is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Fresh session; the next plain text becomes the post title.
    AwaitingTitle,
    /// Title captured; the next plain text becomes the post body.
    AwaitingBody {
        /// The captured post title.
        title: String,
    },
    /// Title and body captured; documents are accepted.
    Collecting {
        /// The captured post title.
        title: String,
        /// The captured post body.
        body: String,
    },
}

/// Delivery state of one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentStatus {
    /// Uploaded, not yet named.
    Pending,
    /// Renamed and materialized on disk, ready for batch delivery.
    Finalized {
        /// Where the renamed file lives on disk.
        path: PathBuf,
        /// The destination-visible file name.
        display_name: String,
    },
}

/// One uploaded document, tracked from upload to finalization.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Telegram file id of the upload.
    pub file_id: FileId,
    /// Message that carried the upload; rename replies correlate on it.
    pub upload_msg_id: MessageId,
    /// Upload → rename lifecycle state.
    pub status: AttachmentStatus,
}

impl Attachment {
    /// Whether this attachment still needs a name.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == AttachmentStatus::Pending
    }
}

/// Outcome of feeding one plain text message into a session.
#[derive(Debug, PartialEq, Eq)]
pub enum TextOutcome {
    /// The text was consumed as the new document prefix.
    PrefixSet(String),
    /// The text became the post title; the body is expected next.
    TitleSet,
    /// The text became the post body; uploads are now accepted.
    BodySet,
    /// Nothing left to capture; the session is ready for uploads or /finish.
    Ready,
}

/// One step of a finish run, in delivery order.
#[derive(Debug, PartialEq, Eq)]
pub enum FinishStep {
    /// The upload was never named; report it and deliver nothing.
    Warn {
        /// Id of the message that carried the unnamed upload.
        upload_msg_id: MessageId,
    },
    /// Deliver the materialized file.
    Deliver {
        /// Where the renamed file lives on disk.
        path: PathBuf,
        /// The destination-visible file name.
        display_name: String,
        /// Whether the composed caption rides on this document. True only
        /// for the attachment at the original last index.
        with_caption: bool,
    },
}

/// Everything a finish run needs from the session, computed up front.
#[derive(Debug)]
pub struct FinishPlan {
    /// The session title, for caption composition.
    pub title: String,
    /// The session body, for caption composition.
    pub body: String,
    /// Warn/deliver steps in upload order.
    pub steps: Vec<FinishStep>,
}

/// Per-user workflow state.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    doc_prefix: String,
    awaiting_prefix: bool,
    thumbnail: Option<FileId>,
    attachments: Vec<Attachment>,
}

impl Session {
    /// Fresh session with the given default document prefix.
    #[must_use]
    pub fn new(doc_prefix: impl Into<String>) -> Self {
        Self {
            phase: Phase::AwaitingTitle,
            doc_prefix: doc_prefix.into(),
            awaiting_prefix: false,
            thumbnail: None,
            attachments: Vec::new(),
        }
    }

    /// Current workflow phase.
    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current document name prefix.
    #[must_use]
    pub fn doc_prefix(&self) -> &str {
        &self.doc_prefix
    }

    /// Whether the next text message will be consumed as the prefix.
    #[must_use]
    pub fn awaiting_prefix(&self) -> bool {
        self.awaiting_prefix
    }

    /// Attachments in upload order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Thumbnail used for every outgoing document, if one was set.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&FileId> {
        self.thumbnail.as_ref()
    }

    /// Arm the prefix side-channel: the next text message becomes the
    /// prefix, whatever the current phase is.
    pub fn expect_prefix(&mut self) {
        self.awaiting_prefix = true;
    }

    /// Store the display thumbnail for outgoing documents.
    pub fn set_thumbnail(&mut self, file_id: FileId) {
        self.thumbnail = Some(file_id);
    }

    /// Apply one plain text message.
    ///
    /// A pending prefix capture wins over everything else and leaves the
    /// phase untouched; afterwards text drives the title → body
    /// progression. In `Collecting`, plain text is a no-op status ping.
    pub fn apply_text(&mut self, text: &str) -> TextOutcome {
        if self.awaiting_prefix {
            self.doc_prefix = text.to_string();
            self.awaiting_prefix = false;
            return TextOutcome::PrefixSet(self.doc_prefix.clone());
        }

        match &self.phase {
            Phase::AwaitingTitle => {
                self.phase = Phase::AwaitingBody {
                    title: text.to_string(),
                };
                TextOutcome::TitleSet
            }
            Phase::AwaitingBody { title } => {
                self.phase = Phase::Collecting {
                    title: title.clone(),
                    body: text.to_string(),
                };
                TextOutcome::BodySet
            }
            Phase::Collecting { .. } => TextOutcome::Ready,
        }
    }

    /// Accept a document upload into the registry.
    ///
    /// Rejected until both title and body are set. The upload order of
    /// accepted documents is the delivery order of /finish.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SequenceViolation`] outside `Collecting`;
    /// no attachment is created in that case.
    pub fn accept_document(
        &mut self,
        file_id: FileId,
        upload_msg_id: MessageId,
    ) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::Collecting { .. }) {
            return Err(SessionError::SequenceViolation);
        }
        self.attachments.push(Attachment {
            file_id,
            upload_msg_id,
            status: AttachmentStatus::Pending,
        });
        Ok(())
    }

    /// Index of the earliest pending attachment uploaded via
    /// `upload_msg_id`, if any. Later attachments sharing the same id stay
    /// untouched.
    #[must_use]
    pub fn find_pending(&self, upload_msg_id: MessageId) -> Option<usize> {
        self.attachments
            .iter()
            .position(|a| a.upload_msg_id == upload_msg_id && a.is_pending())
    }

    /// Destination-visible name for a rename: prefix + base + the fixed
    /// document extension.
    #[must_use]
    pub fn display_name_for(&self, base: &str) -> String {
        format!("{}{base}.pdf", self.doc_prefix)
    }

    /// Mark an attachment renamed and materialized. Finalization is
    /// one-way; an out-of-range index is ignored.
    pub fn finalize_attachment(&mut self, index: usize, path: PathBuf, display_name: String) {
        if let Some(attachment) = self.attachments.get_mut(index) {
            attachment.status = AttachmentStatus::Finalized { path, display_name };
        }
    }

    /// Plan a finish run: a warn step for every pending attachment, a
    /// deliver step for every finalized one, the caption only on the
    /// original last slot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyFinalization`] when the session has no
    /// attachments.
    pub fn finish_plan(&self) -> Result<FinishPlan, SessionError> {
        let Phase::Collecting { title, body } = &self.phase else {
            // Attachments only exist in Collecting, so any earlier phase
            // has nothing to deliver.
            return Err(SessionError::EmptyFinalization);
        };
        if self.attachments.is_empty() {
            return Err(SessionError::EmptyFinalization);
        }

        let last = self.attachments.len() - 1;
        let steps = self
            .attachments
            .iter()
            .enumerate()
            .map(|(i, attachment)| match &attachment.status {
                AttachmentStatus::Pending => FinishStep::Warn {
                    upload_msg_id: attachment.upload_msg_id,
                },
                AttachmentStatus::Finalized { path, display_name } => FinishStep::Deliver {
                    path: path.clone(),
                    display_name: display_name.clone(),
                    with_caption: i == last,
                },
            })
            .collect();

        Ok(FinishPlan {
            title: title.clone(),
            body: body.clone(),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> FileId {
        FileId(id.to_string())
    }

    fn collecting_session() -> Session {
        let mut session = Session::new("DOC-UPDATE_");
        session.apply_text("Update 1");
        session.apply_text("See attached");
        session
    }

    #[test]
    fn test_title_before_body() {
        let mut session = Session::new("DOC-UPDATE_");
        assert_eq!(session.phase(), &Phase::AwaitingTitle);

        assert_eq!(session.apply_text("Update 1"), TextOutcome::TitleSet);
        assert_eq!(
            session.phase(),
            &Phase::AwaitingBody {
                title: "Update 1".to_string()
            }
        );

        assert_eq!(session.apply_text("See attached"), TextOutcome::BodySet);
        assert_eq!(
            session.phase(),
            &Phase::Collecting {
                title: "Update 1".to_string(),
                body: "See attached".to_string()
            }
        );

        // Further text in Collecting is a status ping, not a mutation.
        assert_eq!(session.apply_text("anything"), TextOutcome::Ready);
        assert_eq!(
            session.phase(),
            &Phase::Collecting {
                title: "Update 1".to_string(),
                body: "See attached".to_string()
            }
        );
    }

    #[test]
    fn test_document_rejected_before_collecting() {
        let mut session = Session::new("DOC-UPDATE_");
        assert_eq!(
            session.accept_document(file("f1"), MessageId(10)),
            Err(SessionError::SequenceViolation)
        );
        assert!(session.attachments().is_empty());

        session.apply_text("title");
        assert_eq!(
            session.accept_document(file("f1"), MessageId(10)),
            Err(SessionError::SequenceViolation)
        );
        assert!(session.attachments().is_empty());

        session.apply_text("body");
        assert_eq!(session.accept_document(file("f1"), MessageId(10)), Ok(()));
        assert_eq!(session.attachments().len(), 1);
    }

    #[test]
    fn test_prefix_capture_has_priority_and_keeps_phase() {
        let mut session = Session::new("DOC-UPDATE_");
        session.expect_prefix();

        assert_eq!(
            session.apply_text("SOT -"),
            TextOutcome::PrefixSet("SOT -".to_string())
        );
        assert!(!session.awaiting_prefix());
        // The text was consumed as the prefix, not as the title.
        assert_eq!(session.phase(), &Phase::AwaitingTitle);
        assert_eq!(session.display_name_for("Notes"), "SOT -Notes.pdf");
    }

    #[test]
    fn test_prefix_overwritable_any_number_of_times() {
        let mut session = collecting_session();
        session.expect_prefix();
        session.apply_text("A-");
        session.expect_prefix();
        session.apply_text("B-");
        assert_eq!(session.doc_prefix(), "B-");
    }

    #[test]
    fn test_rename_matches_earliest_pending_on_id_collision() {
        let mut session = collecting_session();
        session
            .accept_document(file("f1"), MessageId(10))
            .expect("collecting accepts documents");
        session
            .accept_document(file("f2"), MessageId(10))
            .expect("collecting accepts documents");

        assert_eq!(session.find_pending(MessageId(10)), Some(0));
        session.finalize_attachment(0, PathBuf::from("/tmp/a.pdf"), "a.pdf".to_string());

        // The first is finalized; the duplicate id now resolves to the second.
        assert_eq!(session.find_pending(MessageId(10)), Some(1));
        assert!(session.attachments()[1].is_pending());
    }

    #[test]
    fn test_unmatched_rename_is_none() {
        let mut session = collecting_session();
        session
            .accept_document(file("f1"), MessageId(10))
            .expect("collecting accepts documents");
        assert_eq!(session.find_pending(MessageId(99)), None);
    }

    #[test]
    fn test_finish_plan_empty_session() {
        let session = Session::new("DOC-UPDATE_");
        assert_eq!(
            session.finish_plan().map(|_| ()),
            Err(SessionError::EmptyFinalization)
        );

        let session = collecting_session();
        assert_eq!(
            session.finish_plan().map(|_| ()),
            Err(SessionError::EmptyFinalization)
        );
    }

    #[test]
    fn test_finish_plan_orders_and_captions_last() {
        let mut session = collecting_session();
        session
            .accept_document(file("f1"), MessageId(10))
            .expect("collecting accepts documents");
        session
            .accept_document(file("f2"), MessageId(11))
            .expect("collecting accepts documents");
        session.finalize_attachment(0, PathBuf::from("/tmp/a.pdf"), "a.pdf".to_string());
        session.finalize_attachment(1, PathBuf::from("/tmp/b.pdf"), "b.pdf".to_string());

        let plan = session.finish_plan().expect("two attachments to deliver");
        assert_eq!(plan.title, "Update 1");
        assert_eq!(plan.body, "See attached");
        assert_eq!(
            plan.steps,
            vec![
                FinishStep::Deliver {
                    path: PathBuf::from("/tmp/a.pdf"),
                    display_name: "a.pdf".to_string(),
                    with_caption: false,
                },
                FinishStep::Deliver {
                    path: PathBuf::from("/tmp/b.pdf"),
                    display_name: "b.pdf".to_string(),
                    with_caption: true,
                },
            ]
        );
    }

    #[test]
    fn test_finish_plan_skips_pending_and_drops_caption_with_last_unfinalized() {
        let mut session = collecting_session();
        session
            .accept_document(file("f1"), MessageId(10))
            .expect("collecting accepts documents");
        session
            .accept_document(file("f2"), MessageId(11))
            .expect("collecting accepts documents");
        session.finalize_attachment(0, PathBuf::from("/tmp/a.pdf"), "a.pdf".to_string());

        let plan = session.finish_plan().expect("one attachment to deliver");
        // The last upload was never named: it is warned about, and since the
        // caption belongs to the original last index, no caption goes out.
        assert_eq!(
            plan.steps,
            vec![
                FinishStep::Deliver {
                    path: PathBuf::from("/tmp/a.pdf"),
                    display_name: "a.pdf".to_string(),
                    with_caption: false,
                },
                FinishStep::Warn {
                    upload_msg_id: MessageId(11),
                },
            ]
        );
    }

    #[test]
    fn test_finalization_is_one_way() {
        let mut session = collecting_session();
        session
            .accept_document(file("f1"), MessageId(10))
            .expect("collecting accepts documents");
        session.finalize_attachment(0, PathBuf::from("/tmp/a.pdf"), "a.pdf".to_string());

        // The finalized attachment no longer matches rename replies.
        assert_eq!(session.find_pending(MessageId(10)), None);
    }
}
