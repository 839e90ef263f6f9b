//! ac-core: Shared types for the agentc workflow compiler
//!
//! This crate has zero internal crate dependencies and defines the
//! canonical IR used across all other ac-* crates: the `WorkflowSpec`
//! envelope, the polymorphic `Node` tree, identifier and credential
//! rules, and the condition-safety tokenizer.

pub mod ast;
pub mod condition;
pub mod ident;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::{
        Conditional, Node, Orchestrator, ParamType, Parameter, Parallel, RoutingRule, Sequential,
        ToolCall, WorkflowSpec,
    };
    pub use crate::condition::{check_condition, ConditionError, Token};
    pub use crate::ident::{is_credential_name, is_reserved_tool, is_valid_identifier};
}
