use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CreatedItem, ItemEdit, ItemUpdate, SubmittedUpdate};
use crate::call::{AsyncCall, CallStatus};
use crate::error::{CallFailure, ResultCode};
use crate::transport::{CallHandle, ItemId, Request, Transport};

/// Where an item workflow is.
///
/// `Idle → Creating → Updating → {Succeeded | Failed}`; `Updating` is
/// entered directly when the item already exists. `cancel` returns to
/// `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemPhase {
    Idle,
    Creating,
    Updating,
    Succeeded,
    Failed,
}

impl ItemPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemPhase::Succeeded | ItemPhase::Failed)
    }
}

/// Why an item workflow failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemFailure {
    /// The call never reported back.
    Transport(CallFailure),
    /// The service answered and rejected the step.
    Application(ResultCode),
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFailure::Transport(failure) => write!(f, "transport failure: {}", failure),
            ItemFailure::Application(result) => write!(f, "{}", result.error_text()),
        }
    }
}

/// Final result of an item workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOutcome {
    Succeeded {
        item_id: ItemId,
        /// The item was minted by this workflow rather than updated in place.
        created: bool,
        legal_agreement_required: bool,
    },
    Failed {
        reason: ItemFailure,
        /// The item the failed step was working on, if one was known.
        item_id: Option<ItemId>,
        created: bool,
    },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }

    pub fn item_id(&self) -> Option<ItemId> {
        match self {
            ItemOutcome::Succeeded { item_id, .. } => Some(*item_id),
            ItemOutcome::Failed { item_id, .. } => *item_id,
        }
    }
}

#[derive(Debug)]
enum ItemCall {
    None,
    Create(AsyncCall<CreatedItem>),
    Update(AsyncCall<SubmittedUpdate>),
}

impl ItemCall {
    fn reset(&mut self) -> Option<CallHandle> {
        let handle = match self {
            ItemCall::None => None,
            ItemCall::Create(call) => call.reset(),
            ItemCall::Update(call) => call.reset(),
        };
        *self = ItemCall::None;
        handle
    }
}

/// Create-then-update (or update-only) workflow for one item.
///
/// Only one call is in flight at a time. Creation and the edit that
/// follows it are two steps of the same workflow; callers see a single
/// outcome for the pair.
#[derive(Debug)]
pub struct ItemWorkflow {
    app_id: u32,
    phase: ItemPhase,
    edit: ItemEdit,
    item_id: Option<ItemId>,
    created: bool,
    legal_agreement_required: bool,
    call: ItemCall,
    outcome: Option<ItemOutcome>,
}

impl ItemWorkflow {
    /// Start creating a new item, or updating `existing_id`.
    pub fn begin<R: Transport + ?Sized>(
        transport: &mut R,
        app_id: u32,
        edit: ItemEdit,
        existing_id: Option<ItemId>,
    ) -> Self {
        let mut workflow = ItemWorkflow {
            app_id,
            phase: ItemPhase::Idle,
            edit,
            item_id: existing_id,
            created: false,
            legal_agreement_required: false,
            call: ItemCall::None,
            outcome: None,
        };
        match existing_id {
            Some(id) => workflow.submit_update(transport, id),
            None => {
                workflow.call = ItemCall::Create(AsyncCall::submit(
                    transport,
                    Request::CreateItem { app_id },
                ));
                workflow.phase = ItemPhase::Creating;
            }
        }
        workflow
    }

    pub fn phase(&self) -> ItemPhase {
        self.phase
    }

    pub fn item_id(&self) -> Option<ItemId> {
        self.item_id
    }

    pub fn edit(&self) -> &ItemEdit {
        &self.edit
    }

    /// Id this workflow updates in place, if it was started for one.
    pub fn existing_id(&self) -> Option<ItemId> {
        if self.created {
            None
        } else {
            self.item_id
        }
    }

    pub fn outcome(&self) -> Option<&ItemOutcome> {
        self.outcome.as_ref()
    }

    fn submit_update<R: Transport + ?Sized>(&mut self, transport: &mut R, id: ItemId) {
        let update = ItemUpdate::start(self.app_id, id).apply(&self.edit);
        self.call = ItemCall::Update(AsyncCall::submit(transport, Request::SubmitUpdate(update)));
        self.phase = ItemPhase::Updating;
    }

    fn finish(&mut self, outcome: ItemOutcome) -> Option<ItemOutcome> {
        self.phase = if outcome.is_success() {
            ItemPhase::Succeeded
        } else {
            ItemPhase::Failed
        };
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    fn fail(&mut self, reason: ItemFailure) -> Option<ItemOutcome> {
        debug!(item_id = ?self.item_id, %reason, "item workflow failed");
        self.finish(ItemOutcome::Failed {
            reason,
            item_id: self.item_id,
            created: self.created,
        })
    }

    /// Advance the in-flight step.
    ///
    /// Returns `None` while work remains. A successful create step chains
    /// straight into the update step and still returns `None`. Once
    /// terminal, returns the same outcome on every call.
    pub fn poll<R: Transport + ?Sized>(&mut self, transport: &mut R) -> Option<ItemOutcome> {
        match self.phase {
            ItemPhase::Idle => None,
            ItemPhase::Succeeded | ItemPhase::Failed => self.outcome.clone(),
            ItemPhase::Creating => self.poll_create(transport),
            ItemPhase::Updating => self.poll_update(transport),
        }
    }

    fn poll_create<R: Transport + ?Sized>(&mut self, transport: &mut R) -> Option<ItemOutcome> {
        let ItemCall::Create(call) = &mut self.call else {
            unreachable!("creating without a create call")
        };
        call.poll(transport);
        match call.status() {
            CallStatus::Failed => {
                let failure = call.failure().unwrap_or(CallFailure::InvalidHandle);
                self.fail(ItemFailure::Transport(failure))
            }
            CallStatus::Completed => {
                let reply = call.result().clone();
                if let Some(handle) = self.call.reset() {
                    transport.release(handle);
                }
                if !reply.result.is_ok() {
                    return self.fail(ItemFailure::Application(reply.result));
                }
                info!(item_id = reply.item_id, "item created");
                self.item_id = Some(reply.item_id);
                self.created = true;
                self.legal_agreement_required |= reply.legal_agreement_required;
                self.submit_update(transport, reply.item_id);
                None
            }
            CallStatus::Pending | CallStatus::Invalid => None,
        }
    }

    fn poll_update<R: Transport + ?Sized>(&mut self, transport: &mut R) -> Option<ItemOutcome> {
        let ItemCall::Update(call) = &mut self.call else {
            unreachable!("updating without an update call")
        };
        call.poll(transport);
        match call.status() {
            CallStatus::Failed => {
                let failure = call.failure().unwrap_or(CallFailure::InvalidHandle);
                self.fail(ItemFailure::Transport(failure))
            }
            CallStatus::Completed => {
                let reply = call.result().clone();
                if !reply.result.is_ok() {
                    return self.fail(ItemFailure::Application(reply.result));
                }
                let item_id = self.item_id.unwrap_or_default();
                info!(item_id, created = self.created, "item updated");
                self.legal_agreement_required |= reply.legal_agreement_required;
                self.finish(ItemOutcome::Succeeded {
                    item_id,
                    created: self.created,
                    legal_agreement_required: self.legal_agreement_required,
                })
            }
            CallStatus::Pending | CallStatus::Invalid => None,
        }
    }

    /// Abandon the workflow and return to `Idle`.
    ///
    /// Releases the in-flight handle. Returns the id of an item this
    /// workflow minted but never finished updating; the caller must delete
    /// it. A create or update call that already finished but was not yet
    /// polled is checked once, so a minted id is not lost and a completed
    /// item is not deleted. Cancelling an idle workflow does
    /// nothing.
    ///
    /// # Panics
    ///
    /// If the workflow already reached an outcome.
    pub fn cancel<R: Transport + ?Sized>(&mut self, transport: &mut R) -> Option<ItemId> {
        assert!(
            !self.phase.is_terminal(),
            "cannot cancel an item workflow after its outcome ({:?})",
            self.phase
        );

        let mut updated = false;
        match &mut self.call {
            ItemCall::Create(call) => {
                call.poll(transport);
                if call.is_completed() && call.result().result.is_ok() {
                    self.item_id = Some(call.result().item_id);
                    self.created = true;
                }
            }
            ItemCall::Update(call) => {
                call.poll(transport);
                updated = call.is_completed() && call.result().result.is_ok();
            }
            ItemCall::None => {}
        }

        if let Some(handle) = self.call.reset() {
            transport.release(handle);
        }
        self.phase = ItemPhase::Idle;

        if self.created && updated {
            debug!(item_id = ?self.item_id, "update finished before cancel, item kept");
            self.created = false;
            None
        } else if self.created {
            self.created = false;
            let orphan = self.item_id.take();
            debug!(item_id = ?orphan, "cancelled after creation");
            orphan
        } else {
            None
        }
    }

    pub(crate) fn reset(&mut self) -> Option<CallHandle> {
        self.call.reset()
    }
}
