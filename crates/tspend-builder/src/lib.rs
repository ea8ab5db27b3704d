// crates/tspend-builder/src/lib.rs
//
// tspend-builder: Assembly, signing and publishing of treasury spends.
//
// `TxBuilder` turns a list of payouts into a signed, consensus checked
// treasury spend whose declared value in covers the payouts plus the relay
// fee for its exact serialized size.

pub mod builder;
pub mod op_return;
pub mod publish;

pub use builder::{BuildRequest, BuiltTspend, ExpirySource, Payout, TxBuilder};
pub use op_return::OpReturnPolicy;
pub use publish::{publish, PublishOutcome};
