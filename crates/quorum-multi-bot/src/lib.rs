//! Multi-bot response arbitration for shared channel message streams.
//!
//! When several bot identities observe the same channel, exactly one should
//! own a given conversation. This crate classifies each inbound message per
//! identity (`respond` / `skip` / `yield`) through a precedence-ordered
//! filter pipeline, then arbitrates the channel's single owner field with a
//! deterministic first-claimed-wins deference rule.
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use quorum_multi_bot::{classify_multi_bot_message, parse_multi_bot_config,
//!     parse_multi_bot_message_event, MultiBotClassification};
//!
//! let config = parse_multi_bot_config(r#"{
//!   "schema_version": 1,
//!   "identities": [ { "platform": "qq", "self_id": "1001" } ]
//! }"#)?;
//! let event = parse_multi_bot_message_event(r#"{
//!   "schema_version": 1,
//!   "platform": "qq",
//!   "message_id": "msg-1",
//!   "text": "hello",
//!   "origin": { "user_id": "user-1", "channel_id": "chan-1" }
//! }"#)?;
//!
//! let identity = config.config_for("qq", "1001").ok_or("missing identity")?;
//! let trace = classify_multi_bot_message(&event, identity);
//! assert_eq!(trace.classification, MultiBotClassification::Respond);
//! # Ok(())
//! # }
//! ```

pub mod multi_bot_arbitration;
pub mod multi_bot_config;
pub mod multi_bot_contract;
pub mod multi_bot_decision;
pub mod multi_bot_filters;
pub mod multi_bot_mentions;
pub mod multi_bot_owner_store;
pub mod multi_bot_report;

pub use multi_bot_arbitration::*;
pub use multi_bot_config::*;
pub use multi_bot_contract::*;
pub use multi_bot_decision::*;
pub use multi_bot_filters::*;
pub use multi_bot_mentions::*;
pub use multi_bot_owner_store::*;
pub use multi_bot_report::*;
