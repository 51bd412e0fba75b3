//! Large-context handling
//!
//! Conversations under the chunk threshold are trimmed to the context window
//! and sent in one call. Larger ones are cut into chunks that are sent in
//! order, each preceded by a rolling summary of the chunks before it.

pub mod budget;
pub mod chunk;
pub mod processor;

pub use budget::{fit_to_budget, TRUNCATION_MARKER};
pub use chunk::{split_into_chunks, Chunk};
pub use processor::{ContextRoute, LargeContextConfig, LargeContextProcessor};
