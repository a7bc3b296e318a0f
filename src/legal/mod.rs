//! Practice logic layered over stored records.

pub mod calendar;
pub mod dashboard;
pub mod docgen;
pub mod listing;
pub mod schema;
