//! Utility modules

pub mod memory_storage;
pub mod validation;

pub use memory_storage::MemoryStorage;
pub use validation::EnhancedInvoiceValidator;
