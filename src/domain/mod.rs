//! Domain model: catalog entities, order metadata, settlement outcomes and the
//! ports the application layer depends on.

pub mod account;
pub mod course;
pub mod ids;
pub mod money;
pub mod order;
pub mod ports;
pub mod progress;
pub mod settlement;
