//! Blockchain identifiers.
//!
//! Every accepts entry names its network as a CAIP-2 chain ID. The buyer only ever
//! dispatches on the namespace of that ID, which is captured by [`ChainFamily`].

mod chain_id;

pub use chain_id::*;
