// Client-side protocol engine: allocation, correlation, sync replay, and routing.
#![allow(clippy::module_inception)]
pub mod ack;
pub mod allocation;
pub mod client;
pub mod events;
pub mod reply;
pub mod router;
pub mod sync_batch;
