// # Token Cache Implementations
//
// This module provides implementations of the TokenCache trait.

pub mod memory;

pub use memory::MemoryTokenCache;
