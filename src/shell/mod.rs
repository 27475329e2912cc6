//! Embedded command shell
//!
//! - `coerce` - raw tokens to typed argument values
//! - `registry` - named commands, aliases and their declared parameters
//! - `dispatcher` - line splitting, resolution, arity checks and invocation

pub mod coerce;
pub mod dispatcher;
pub mod registry;

pub use coerce::{CoercionError, Kind, Value, coerce};
pub use dispatcher::{DispatchError, Shell, split_commands, tokenize};
pub use registry::{Args, Command, Flow, Registry, RegistryError};
