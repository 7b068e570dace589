//! Collaborator implementations for tenant and identity persistence.

pub mod memory;

pub use memory::{MemoryTenantStore, MemoryUserDirectory};
