//! Payment domain module (settlement of an order, event-sourced).
//!
//! At most one payment exists per order: its id is derived from the order id.

pub mod payment;

pub use payment::{
    CancelPayment, CompletePayment, CreatePayment, ExpirePayment, FailPayment, Payment,
    PaymentCommand, PaymentCreated, PaymentDetailsUpdated, PaymentEvent, PaymentId, PaymentStatus,
    PaymentStatusChanged, ProcessPayment, RefundPayment, UpdatePaymentDetails,
};
