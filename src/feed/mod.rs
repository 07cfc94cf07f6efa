//! Input feeds decoded at the boundary into typed records.

pub mod declaration;
pub mod graphml;

pub use declaration::{Declaration, DeclarationError, DeclarationFile, MethodTarget};
pub use graphml::{GraphmlError, Stage, State, Transition, WorkflowGraph};
