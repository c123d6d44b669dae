#![cfg_attr(target_os = "none", no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bus;
pub mod indicator;
pub mod io;
pub mod reporter;
pub mod sample;
pub mod scanner;
