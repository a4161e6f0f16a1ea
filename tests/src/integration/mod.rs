//! # Integration Flows
//!
//! Every flow drives the real stages through a [`fixtures::Pipeline`]:
//! in-memory store, queue and directory, a manual clock, and the same
//! wiring the worker binary uses.

pub mod fixtures;

mod cache_flow;
mod listing_flow;
mod queue_flow;
mod tree_flow;
mod vote_flow;
