//! Negotiation domain module
//!
//! Bids, bid scoring and the deterministic ranking used to pick an assignee
//! when more than one agent is capable of a task.

pub mod bid;

pub use bid::{Bid, NegotiationOutcome, ScoredBid, rank_bids, score};
