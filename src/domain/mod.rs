//! Domain layer: the credit-sales records, the rules that change them, and the
//! ports persistence adapters implement.
//!
//! Nothing here performs I/O. Operations take the current time or date as an
//! argument and return new state or a `ChangeSet` for the application layer to
//! commit.

pub mod boleto;
pub mod client;
pub mod expense;
pub mod ids;
pub mod installment;
pub mod listing;
pub mod money;
pub mod notice;
pub mod outbox;
pub mod ports;
pub mod reconcile;
pub mod report;
pub mod route;
pub mod schedule;
pub mod session;
pub mod visit;
