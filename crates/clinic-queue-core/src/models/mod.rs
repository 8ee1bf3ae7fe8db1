//! Domain models for the clinic queue.

mod doctor;
mod patient;
mod requests;
mod room;
pub(crate) mod local_time;

pub use doctor::*;
pub use patient::*;
pub use requests::*;
pub use room::*;
