//! Slack Web API client and Block Kit message builders.

pub mod blocks;
pub mod client;
pub mod message;

pub use client::{SlackClient, SlackError};
pub use message::{Attachment, Message};
