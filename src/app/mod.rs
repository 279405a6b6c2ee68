//! Application layer: ports and the use cases built on them.

pub mod normalize_use_case;
pub mod ports;
pub mod translator;
