pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod fence;
pub mod job;
pub mod provider;
pub mod resources;
pub mod secrets;
pub mod synth;
pub mod template;
pub mod types;

pub use error::{ActuatorError, Result};
pub use synth::{synthesize, Invocation};
pub use template::ActionTemplate;
pub use types::{Action, Strategy};
