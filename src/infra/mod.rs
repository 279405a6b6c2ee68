//! Infrastructure adapters implementing the application ports.

pub mod csv_sink;
pub mod google_play;
pub mod google_translate;
pub mod json_sink;
pub mod mymemory;
pub mod pacing;
