pub mod adapters;
pub mod fetch;
pub mod health;
pub mod model;
pub mod output;
pub mod predict;
pub mod reconcile;
pub mod stats;
pub mod transport;
