//! Batch domain: long artifacts produced across bounded generation calls.

pub mod accumulator;
pub mod cursor;
pub mod instruction;

pub use accumulator::{BatchAccumulator, BatchFailure};
pub use cursor::{BatchCursor, BatchRole, BatchSpec, UnitRange};
pub use instruction::batch_instruction;
