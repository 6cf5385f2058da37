//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod interrupt;
pub mod process;

pub use config::Config;
pub use diagnostic::Diagnostic;
pub use interrupt::InterruptFlag;
pub use process::{CommandOutput, CommandRunner, ProcessBuilder, ProcessError, SystemRunner};
