pub mod openings;
