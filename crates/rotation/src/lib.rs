//! Point-of-contact rotation.
//!
//! Picks the next rotator for a channel from its active members, keeps the
//! per-channel history of who already had a turn, and rewrites the channel
//! topic so it carries exactly one POC mention.
//!
//! Platform access goes through [`MembershipProvider`] and [`Notifier`]; the
//! selection and topic functions themselves are pure.

pub mod error;
pub mod history;
pub mod memory;
pub mod provider;
pub mod rules;
pub mod selector;
pub mod service;
pub mod template;
pub mod topic;
pub mod types;

pub use {
    error::{Error, Result},
    history::RotationHistory,
    provider::{MembershipProvider, Notifier},
    rules::RotatorRules,
    selector::{Selection, eligible_names, select_rotator},
    service::{RotationOutcome, RotationService},
    template::Template,
    topic::{TopicMutator, compute_topic},
    types::{Channel, Member, MemberProfile, NotifyTarget, Presence},
};
