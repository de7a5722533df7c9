//! fieldplan-cli: the thin shell around the planning core — input parsing,
//! plan persistence and the text printers.

pub mod input;
pub mod plan;
pub mod printers;
