// src/lib.rs
pub mod aggregate;
pub mod config;
pub mod extract;
pub mod intermediate;
pub mod ledger;
pub mod pipeline;
pub mod record;
pub mod snapshot;

pub use aggregate::{aggregate, GroupedTable};
pub use extract::extract;
pub use ledger::write_outputs;
pub use record::ReservationRecord;
