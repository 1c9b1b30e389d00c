use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A posted or postable bundle of accounting entries for one order.
///
/// Vouchers are created only from a balance-validated entry set. Posting
/// is idempotent in the negative sense: a second attempt is refused and
/// mutates nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    voucher_id: Uuid,
    order_id: Uuid,
    entry_ids: Vec<Uuid>,
    /// Operator who requested the voucher, for the audit trail.
    operator: String,
    created_at: DateTime<Utc>,
    posted: bool,
    posted_at: Option<DateTime<Utc>>,
}

impl Voucher {
    pub fn new(order_id: Uuid, entry_ids: Vec<Uuid>, operator: impl Into<String>) -> Self {
        Self {
            voucher_id: Uuid::new_v4(),
            order_id,
            entry_ids,
            operator: operator.into(),
            created_at: Utc::now(),
            posted: false,
            posted_at: None,
        }
    }

    pub fn voucher_id(&self) -> Uuid {
        self.voucher_id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn entry_ids(&self) -> &[Uuid] {
        &self.entry_ids
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn posted(&self) -> bool {
        self.posted
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    pub(crate) fn mark_posted(&mut self) {
        self.posted = true;
        self.posted_at = Some(Utc::now());
    }
}
