//! Pure table-top rules: no I/O, no database.

pub mod dice;
pub mod invite;
pub mod sheet;
