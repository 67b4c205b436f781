pub mod dedup;
pub mod encoding;
pub mod hash;
pub mod indexer;
pub mod language;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod reconcile;
pub mod selector;
pub mod store;
