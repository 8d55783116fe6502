//! Error taxonomy for the virtual machine, grounded in `seen_ir/src/error.rs`'s
//! `thiserror`-derived enum shape and §7's error taxonomy.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VmError {
    #[error("value stack overflow (capacity {capacity} bytes)")]
    StackOverflow { capacity: usize },

    #[error("call stack overflow (capacity {capacity} bytes)")]
    CallStackOverflow { capacity: usize },

    #[error("runtime error: {0}")]
    Runtime(String),

    /// Reserved for a future front end; unused internally (§7).
    #[error("compile error: {0}")]
    Compile(String),
}

impl VmError {
    pub fn runtime(msg: impl Into<String>) -> Self {
        VmError::Runtime(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, VmError>;
