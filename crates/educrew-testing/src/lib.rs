//! # Educrew Testing
//!
//! Test doubles shared by every crate in the workspace.
//!
//! - [`ScriptedResponder`]: replays scripted upstream replies and records call
//!   instants, for exercising spacing and backoff under a paused clock
//! - [`MockAgent`]: an agent with a fixed result, error, delay or panic
//! - [`fixtures`]: ready-made tasks
//!
//! ```rust
//! use educrew_testing::{ScriptedResponder, fixtures};
//!
//! let responder = ScriptedResponder::new().reply("¡Muy bien!").throttle();
//! let task = fixtures::celebration_task("streak_5");
//! assert_eq!(responder.call_count(), 0);
//! assert_eq!(task.kind().as_str(), "create_celebration");
//! ```

pub mod agent;
pub mod fixtures;
pub mod responder;

pub use agent::MockAgent;
pub use responder::{DEFAULT_REPLY, ScriptedResponder};
