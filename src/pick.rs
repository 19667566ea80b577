//! Document picking: the host-side picker collaborator and the single slot
//! holding the request that is waiting for its answer.

use std::sync::Mutex;

use log::debug;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{
    errors::{Result, TransferError},
    id::ResourceId,
};

/// MIME filter accepting documents of any type.
pub const MIME_ANY: &str = "*/*";

/// What the picker is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    /// Correlates the picker's answer with this request.
    pub token: Uuid,
    pub mime_type: String,
    /// Only offer documents that can be opened as byte streams.
    pub openable: bool,
}

impl PickRequest {
    pub fn any_document() -> Self {
        Self {
            token: Uuid::new_v4(),
            mime_type: MIME_ANY.to_string(),
            openable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(ResourceId),
    /// The picker reported success but carried no document.
    NoSelection,
    Cancelled,
}

/// The host's document picker.
///
/// `launch` only has to show the UI. The user's choice is delivered later
/// through [`crate::TransferService::complete_pick`] together with
/// `request.token`.
pub trait Picker: Send + Sync {
    fn launch(&self, request: &PickRequest) -> Result<()>;
}

pub(crate) type PickReply = oneshot::Receiver<Result<PickOutcome>>;

struct PendingPick {
    token: Uuid,
    reply: oneshot::Sender<Result<PickOutcome>>,
}

/// Holds at most one pick waiting for the picker.
///
/// Installing a new request fails the previous one with
/// [`TransferError::Superseded`]; answers are only accepted for the token
/// currently installed.
#[derive(Default)]
pub(crate) struct PickSlot {
    pending: Mutex<Option<PendingPick>>,
    /// Held from install until the picker has launched, so a request cannot
    /// be superseded before its own picker is shown.
    launching: Mutex<()>,
}

impl PickSlot {
    /// Installs `request` and launches `picker` for it as one step.
    ///
    /// A failed launch leaves the slot empty again.
    pub fn open(&self, request: &PickRequest, picker: &dyn Picker) -> Result<PickReply> {
        let _launching = self.launching.lock().map_err(|_| {
            TransferError::Other(anyhow::anyhow!("pick launch lock poisoned"))
        })?;

        let reply = self.install(request.token)?;
        if let Err(e) = picker.launch(request) {
            self.discard(request.token);
            return Err(e);
        }
        Ok(reply)
    }

    pub fn install(&self, token: Uuid) -> Result<PickReply> {
        let (reply, receiver) = oneshot::channel();
        let previous = self
            .lock()?
            .replace(PendingPick { token, reply });

        if let Some(previous) = previous {
            debug!("Pick {} superseded by {}", previous.token, token);
            let _ = previous.reply.send(Err(TransferError::Superseded));
        }
        Ok(receiver)
    }

    pub fn resolve(&self, token: Uuid, outcome: Result<PickOutcome>) -> Result<()> {
        let pending = {
            let mut slot = self.lock()?;
            if holds(&slot, token) {
                slot.take()
            } else {
                None
            }
        };

        let pending = pending.ok_or(TransferError::NoPendingPick)?;
        if pending.reply.send(outcome).is_err() {
            debug!("Pick {} resolved after its caller went away", token);
        }
        Ok(())
    }

    /// Drops the request if it is still the installed one.
    pub fn discard(&self, token: Uuid) -> bool {
        match self.lock() {
            Ok(mut slot) if holds(&slot, token) => {
                slot.take();
                true
            }
            _ => false,
        }
    }

    pub fn pending_token(&self) -> Option<Uuid> {
        self.lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|pending| pending.token))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<PendingPick>>> {
        self.pending.lock().map_err(|_| {
            TransferError::Other(anyhow::anyhow!("pick slot lock poisoned"))
        })
    }
}

fn holds(slot: &Option<PendingPick>, token: Uuid) -> bool {
    slot.as_ref().map_or(false, |pending| pending.token == token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
    };

    fn selected(raw: &str) -> Result<PickOutcome> {
        Ok(PickOutcome::Selected(ResourceId::parse(raw).unwrap()))
    }

    #[tokio::test]
    async fn answer_reaches_the_matching_request() {
        let slot = PickSlot::default();
        let token = Uuid::new_v4();
        let reply = slot.install(token).unwrap();

        slot.resolve(token, selected("content://doc/1")).unwrap();

        assert_eq!(reply.await.unwrap().unwrap(), selected("content://doc/1").unwrap());
        assert_eq!(slot.pending_token(), None);
    }

    #[tokio::test]
    async fn newer_request_supersedes_the_older_one() {
        let slot = PickSlot::default();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let first_reply = slot.install(first).unwrap();
        let second_reply = slot.install(second).unwrap();

        assert!(matches!(
            first_reply.await.unwrap(),
            Err(TransferError::Superseded)
        ));

        assert!(matches!(
            slot.resolve(first, selected("content://doc/1")),
            Err(TransferError::NoPendingPick)
        ));
        assert_eq!(slot.pending_token(), Some(second));

        slot.resolve(second, selected("content://doc/2")).unwrap();
        assert_eq!(
            second_reply.await.unwrap().unwrap(),
            selected("content://doc/2").unwrap()
        );
    }

    #[test]
    fn discard_only_touches_its_own_token() {
        let slot = PickSlot::default();
        let token = Uuid::new_v4();
        let _reply = slot.install(token).unwrap();

        assert!(!slot.discard(Uuid::new_v4()));
        assert_eq!(slot.pending_token(), Some(token));
        assert!(slot.discard(token));
        assert_eq!(slot.pending_token(), None);
    }

    #[test]
    fn answering_an_empty_slot_is_rejected() {
        let slot = PickSlot::default();
        assert!(matches!(
            slot.resolve(Uuid::new_v4(), Ok(PickOutcome::Cancelled)),
            Err(TransferError::NoPendingPick)
        ));
    }

    /// Records launches for tokens that were no longer installed.
    struct CheckingPicker {
        slot: Arc<PickSlot>,
        stale: AtomicUsize,
    }

    impl Picker for CheckingPicker {
        fn launch(&self, request: &PickRequest) -> Result<()> {
            if self.slot.pending_token() != Some(request.token) {
                self.stale.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[test]
    fn picker_only_launches_for_the_installed_request() {
        let slot = Arc::new(PickSlot::default());
        let picker = Arc::new(CheckingPicker {
            slot: slot.clone(),
            stale: AtomicUsize::new(0),
        });

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let (slot, picker) = (slot.clone(), picker.clone());
                thread::spawn(move || {
                    for _ in 0..200 {
                        let _reply = slot.open(&PickRequest::any_document(), &*picker).unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        assert_eq!(picker.stale.load(Ordering::SeqCst), 0);
    }

    struct RefusingPicker;

    impl Picker for RefusingPicker {
        fn launch(&self, _: &PickRequest) -> Result<()> {
            Err(TransferError::Other(anyhow::anyhow!("no activity")))
        }
    }

    #[test]
    fn failed_launch_empties_the_slot() {
        let slot = PickSlot::default();
        assert!(slot.open(&PickRequest::any_document(), &RefusingPicker).is_err());
        assert_eq!(slot.pending_token(), None);
    }

    #[test]
    fn any_document_request() {
        let request = PickRequest::any_document();
        assert_eq!(request.mime_type, "*/*");
        assert!(request.openable);
        assert_ne!(request.token, PickRequest::any_document().token);
    }
}
