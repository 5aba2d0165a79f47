//! CSV import of client registrations and CSV export of listings.

pub mod client_reader;
pub mod record_writer;
