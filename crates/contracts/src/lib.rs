//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! change records, outbound messages, transport traits and errors.
//! Business crates depend on this crate only, never on each other in reverse.
//!
//! ## Delivery model
//! - A `ChangeRecord` is produced per mutated entity in a unit of work
//! - The dispatcher turns it into an `OutboundMessage` and ships it to a topic
//! - The broker itself is reached only through `TopicConnector` / `TopicAdmin`

mod change;
mod dispatcher_config;
mod error;
mod message;
mod production_area;
mod service_config;
mod transport;

pub use change::*;
pub use dispatcher_config::*;
pub use error::*;
pub use message::*;
pub use production_area::*;
pub use service_config::*;
pub use transport::*;
