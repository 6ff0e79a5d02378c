//! `actuator-runtime`: async execution of machine lifecycle actions.
//!
//! # Architecture
//!
//! ```text
//! MachineActuator (create / delete / update / exists)
//!     │
//!     ▼
//! ConfigSelector  ← inline template, fencing config, cluster list
//!     │              (node lookups), setup catalog
//!     ▼
//! synthesize()    ← args + env for one action against one target
//!     │
//!     ▼
//! Executor        ← JobExecutor: submit with Backoff, wait with Poller
//!                    ProcessExecutor: run locally, interpret exit code
//! ```
//!
//! The cluster API is reached only through [`PlatformClient`],
//! [`MachineStore`] and [`EventRecorder`]; [`kube_client`] and
//! [`events::KubeEventRecorder`] are the production implementations.

pub mod actuator;
pub mod backoff;
pub mod client;
pub mod cluster;
pub mod error;
pub mod events;
pub mod exec;
pub mod kube_client;
pub mod poll;
pub mod process;
pub mod selector;

pub use actuator::{MachineActuator, MachineActuatorParams, Outcome};
pub use client::{MachineStore, PlatformClient};
pub use cluster::ClusterActuator;
pub use error::{Error, MachineErrorReason, Result};
pub use events::{EventRecorder, EventType};
pub use exec::{Executor, Verdict};
