//! Plan catalog and usage metering.

pub mod handlers;
pub mod ledger;
pub mod plans;
pub mod store;
