//! Crewflow lets a user define reusable agents and compose them into
//! workflows: ordered steps, each assigned to an agent, with declared
//! dependencies on other steps referenced by order number.
//!
//! The crate provides the workflow model (step editing that keeps orders
//! dense and dependency references consistent), a dependency graph builder
//! that turns a workflow into render-ready nodes, edges and diagnostics,
//! and JSON-file stores for both record types. It never executes workflows.
pub mod agent;
pub mod flow_graph;
pub mod store;
pub mod workflow;

pub use agent::{Agent, McpServer};
pub use flow_graph::{Diagnostic, FlowGraph, GraphEdge, GraphError, GraphNode, build_graph};
pub use store::{AgentStore, JsonStore, StoreError, WorkflowStore};
pub use workflow::{Step, StepField, Workflow, WorkflowError, parse_dependencies};
