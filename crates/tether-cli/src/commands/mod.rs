pub mod common;
pub mod completions;
pub mod config;
pub mod probe;
pub mod run;
pub mod sync;
