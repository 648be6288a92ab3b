// ============================================================================
// Compensating Transactions
// ============================================================================
//
// Persistence calls are not atomic with in-memory state changes, so every
// mutating orchestrator operation is written as a forward action plus a
// compensating action that undoes it.
//
// Design Patterns Used:
// - Command Pattern: forward/compensate pairs
// - Saga (single step): compensation instead of a distributed commit
//
// ============================================================================

pub mod runner;

pub use runner::{CompensatingTransactionRunner, TransactionStats};
