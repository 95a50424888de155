//! Slack Web API backend for the rotation: channel and member lookup,
//! presence, topic updates and message posting.

pub mod client;
pub mod error;

pub use {
    client::SlackClient,
    error::{Error, Result},
};
