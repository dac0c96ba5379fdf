pub mod applications;
pub mod roster;

pub use roster::{ApplicantRoster, RosterEntry, RosterError};
