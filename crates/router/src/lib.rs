//! The studentdesk response router.
//!
//! [`ResponseRouter::handle`] takes a session ID and a student's message
//! and walks the tiers: FAQ match, knowledge retrieval, generation with
//! function calling, function dispatch, then session and log updates.
//! Every answer carries a [`RoutingDecision`] describing how it was made.
//!
//! [`RoutingDecision`]: studentdesk_core::routing::RoutingDecision

pub mod augment;
pub mod messages;
pub mod router;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use augment::{PromptAugmenter, build_context};
pub use messages::{Locale, Phrases};
pub use router::{ChatResponse, ResponseRouter, RoutedReply, RouterConfig, RouterError};
pub use session::{SessionHandle, SessionStore};
