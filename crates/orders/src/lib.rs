//! Order domain module (commitments placed from accepted quotations, event-sourced).
//!
//! Orders own a deep copy of the quotation lines taken at placement; totals
//! are computed once and never edited afterwards.

pub mod order;

pub use order::{
    CancelOrder, ConfirmOrder, DeliverOrder, InvoiceNumberSet, Order, OrderCommand,
    OrderDetailsUpdated, OrderEvent, OrderId, OrderItem, OrderPlaced, OrderStatus,
    OrderStatusChanged, OrderTotals, PlaceOrder, ReturnOrder, SetInvoiceNumber, ShipOrder,
    StartPreparing, StatusChange, TrackingUpdated, UpdateOrderDetails, UpdateTracking,
};
