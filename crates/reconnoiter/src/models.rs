//! These models represent the objects passed around by the agent
//!
//! There are a few related formats we need to interact with:
//! - run requests and attachments, sent from the HTTP interface to the agent
//! - run response chunks, sent from the agent back to the interface
//! - gemini contents/parts, sent from the agent to the LLM
//! - tool calls, sent from the agent to the systems providing capabilities
//!
//! We always immediately convert those data models into the internal structs
//! using to/from helpers, so the internal models are not an exact match to
//! any one of these formats.
pub mod attachment;
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
