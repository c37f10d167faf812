use serde::{Deserialize, Serialize};

use crate::call::{CallKind, CallPayload};
use crate::error::ResultCode;
use crate::transport::ItemId;

/// Reply to a create-item request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub result: ResultCode,
    pub item_id: ItemId,
    pub legal_agreement_required: bool,
}

impl CallPayload for CreatedItem {
    const KIND: CallKind = CallKind::ItemCreated;
}

/// Reply to a submitted update transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedUpdate {
    pub result: ResultCode,
    pub legal_agreement_required: bool,
}

impl CallPayload for SubmittedUpdate {
    const KIND: CallKind = CallKind::ItemUpdateSubmitted;
}

/// Reply to a delete-item request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedItem {
    pub result: ResultCode,
    pub item_id: ItemId,
}

impl CallPayload for DeletedItem {
    const KIND: CallKind = CallKind::ItemDeleted;
}
