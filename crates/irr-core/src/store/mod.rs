// # Object Store Implementations
//
// This module provides implementations of the ObjectStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileObjectStore;
pub use memory::MemoryObjectStore;
