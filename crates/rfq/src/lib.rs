//! RFQ domain module (Requests for Quotation, event-sourced).
//!
//! Business rules for a company's solicitation: its line items, supplier
//! invitations and the draft → published → closed/cancelled lifecycle.
//! Deterministic domain logic only (no IO, no HTTP, no storage).

pub mod rfq;

pub use rfq::{
    AddRfqItem, CancelRfq, CloseRfq, CreateRfq, DeleteRfq, InvitationChanged, InviteSupplier,
    PublishRfq, RemoveRfqItem, RevokeInvitation, Rfq, RfqCancelled, RfqCommand, RfqCreated,
    RfqDetailsUpdated, RfqEvent, RfqId, RfqInvitation, RfqItem, RfqItemChanged, RfqItemInput,
    RfqItemRemoved, RfqStatus, RfqStatusChanged, RfqType, UpdateRfqDetails, UpdateRfqItem,
};
