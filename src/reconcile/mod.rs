//! Stream reconciliation: one ordered, deduplicated collection per record
//! type, with subscriber fan-out, plus the manager that collapses duplicate
//! transport subscriptions.

mod store;
mod subscription;

pub use store::{FeedStore, SubscriberId};
pub use subscription::SubscriptionManager;
