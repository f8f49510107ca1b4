use std::collections::{HashMap, hash_map};

use petgraph::{Direction, graph::NodeIndex, prelude::StableGraph};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{agent::Agent, workflow::Workflow};

/// Label shown when a step's `agent_id` does not resolve to a known agent.
pub const UNKNOWN_AGENT: &str = "Unknown Agent";

// Canvas grid: three nodes per row, spaced for 200px-wide cards.
const ROW_WIDTH: usize = 3;
const X_SPACING: f32 = 300.0;
const X_OFFSET: f32 = 100.0;
const Y_SPACING: f32 = 150.0;
const Y_OFFSET: f32 = 50.0;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Invalid workflow input: {0}")]
    InvalidInput(String),
}

/// A non-fatal data-quality finding attached to a successfully built graph.
///
/// None of these abort the build: the caller always gets a usable graph and
/// decides how to surface the findings.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// `step_id` claimed an order another step already holds. The first
    /// claimant keeps it for dependency resolution; both steps are rendered.
    DuplicateOrder { order: u32, step_id: String },
    /// A dependency named an order no step has. The edge was omitted.
    DanglingDependency { step_id: String, missing_order: u32 },
    /// The steps forming a dependency cycle, in traversal order. All edges
    /// are kept: cycles are advisory, never rejected.
    CyclicDependency { step_ids: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// The step's stable identifier, independent of its order.
    pub id: String,
    pub order: u32,
    pub agent_name: String,
    pub action: String,
    pub x: f32,
    pub y: f32,
}

/// A directed edge pointing from a prerequisite step to its dependent.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// A render-ready view of one workflow's step dependencies.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FlowGraph {
    /// Renders the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph {\n");
        for node in &self.nodes {
            dot.push_str(&format!(
                "    \"{}\" [label=\"{}. {}: {}\"];\n",
                node.id, node.order, node.agent_name, node.action
            ));
        }
        for edge in &self.edges {
            dot.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                edge.source, edge.target
            ));
        }
        dot.push_str("}\n");
        dot
    }
}

/// Derives a directed graph from a workflow's step list.
///
/// Pure and deterministic: the same workflow and agent map always yield the
/// same nodes (identical coordinates) and the same edge list. Data-quality
/// problems — duplicate orders, dependencies on missing orders, cycles —
/// come back as [`Diagnostic`]s on the result, never as errors. The only
/// hard failure is a structurally malformed step (an order of zero).
///
/// Layout places nodes on a fixed-width grid by their position in the
/// original step sequence, not in topological order.
pub fn build_graph(
    workflow: &Workflow,
    agents: &HashMap<Uuid, Agent>,
) -> Result<FlowGraph, GraphError> {
    if let Some(bad) = workflow.steps.iter().find(|step| step.order == 0) {
        return Err(GraphError::InvalidInput(format!(
            "step '{}' has order 0, orders start at 1",
            bad.id
        )));
    }

    let mut diagnostics = Vec::new();

    // Map each order to the position of the step holding it. On a
    // collision the first claimant wins; the loser is still rendered.
    let mut order_to_pos: HashMap<u32, usize> = HashMap::new();
    for (pos, step) in workflow.steps.iter().enumerate() {
        match order_to_pos.entry(step.order) {
            hash_map::Entry::Vacant(e) => {
                e.insert(pos);
            }
            hash_map::Entry::Occupied(_) => {
                diagnostics.push(Diagnostic::DuplicateOrder {
                    order: step.order,
                    step_id: step.id.clone(),
                });
            }
        }
    }

    let nodes: Vec<GraphNode> = workflow
        .steps
        .iter()
        .enumerate()
        .map(|(pos, step)| {
            let agent_name = step
                .agent_id
                .and_then(|id| agents.get(&id))
                .map_or_else(|| UNKNOWN_AGENT.to_owned(), |agent| agent.name.clone());
            GraphNode {
                id: step.id.clone(),
                order: step.order,
                agent_name,
                action: step.action.clone(),
                x: (pos % ROW_WIDTH) as f32 * X_SPACING + X_OFFSET,
                y: (pos / ROW_WIDTH) as f32 * Y_SPACING + Y_OFFSET,
            }
        })
        .collect();

    // Node weight = the step's position in the original sequence.
    let mut graph: StableGraph<usize, ()> =
        StableGraph::with_capacity(workflow.steps.len(), 0);
    let node_indices: Vec<NodeIndex> =
        (0..workflow.steps.len()).map(|pos| graph.add_node(pos)).collect();

    let mut edges = Vec::new();
    for (pos, step) in workflow.steps.iter().enumerate() {
        for &dep in &step.dependencies {
            match order_to_pos.get(&dep) {
                Some(&source_pos) => {
                    graph.add_edge(node_indices[source_pos], node_indices[pos], ());
                    edges.push(GraphEdge {
                        source: workflow.steps[source_pos].id.clone(),
                        target: step.id.clone(),
                    });
                }
                None => {
                    tracing::warn!(
                        "| flow graph | Workflow: {} | Step: {} | dropping dependency on missing order {}",
                        workflow.id,
                        step.id,
                        dep
                    );
                    diagnostics.push(Diagnostic::DanglingDependency {
                        step_id: step.id.clone(),
                        missing_order: dep,
                    });
                }
            }
        }
    }

    if let Some(cycle) = find_cycle(&graph) {
        diagnostics.push(Diagnostic::CyclicDependency {
            step_ids: cycle
                .into_iter()
                .map(|node| workflow.steps[graph[node]].id.clone())
                .collect(),
        });
    }

    Ok(FlowGraph {
        nodes,
        edges,
        diagnostics,
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

// Three-color DFS. Returns the members of the first cycle found, in
// traversal order, or None when the graph is acyclic.
fn find_cycle(graph: &StableGraph<usize, ()>) -> Option<Vec<NodeIndex>> {
    let mut marks = vec![Mark::Unvisited; graph.node_count()];
    let mut stack = Vec::new();

    for node in graph.node_indices() {
        if marks[node.index()] == Mark::Unvisited
            && let Some(cycle) = dfs_cycle(graph, node, &mut marks, &mut stack)
        {
            return Some(cycle);
        }
    }
    None
}

fn dfs_cycle(
    graph: &StableGraph<usize, ()>,
    node: NodeIndex,
    marks: &mut [Mark],
    stack: &mut Vec<NodeIndex>,
) -> Option<Vec<NodeIndex>> {
    marks[node.index()] = Mark::InProgress;
    stack.push(node);

    for neighbor in graph.neighbors_directed(node, Direction::Outgoing) {
        match marks[neighbor.index()] {
            Mark::Unvisited => {
                if let Some(cycle) = dfs_cycle(graph, neighbor, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::InProgress => {
                // An in-progress neighbor is on the stack; the cycle is
                // everything from its stack position onward.
                let start = stack.iter().position(|n| *n == neighbor).unwrap_or(0);
                return Some(stack[start..].to_vec());
            }
            Mark::Done => {}
        }
    }

    marks[node.index()] = Mark::Done;
    stack.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Step;

    fn step(id: &str, order: u32, dependencies: Vec<u32>) -> Step {
        Step {
            id: id.to_owned(),
            order,
            agent_id: None,
            action: format!("action {order}"),
            dependencies,
        }
    }

    fn workflow_with(steps: Vec<Step>) -> Workflow {
        let mut workflow = Workflow::new("test");
        workflow.steps = steps;
        workflow
    }

    #[test]
    fn test_two_step_example() {
        let workflow = workflow_with(vec![step("a", 1, vec![]), step("b", 2, vec![1])]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(
            graph.edges,
            vec![GraphEdge {
                source: "a".to_owned(),
                target: "b".to_owned(),
            }]
        );
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_clean_workflow_node_and_edge_counts() {
        let workflow = workflow_with(vec![
            step("a", 1, vec![]),
            step("b", 2, vec![1]),
            step("c", 3, vec![1, 2]),
            step("d", 4, vec![3]),
        ]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 4);
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let workflow = workflow_with(vec![
            step("a", 1, vec![]),
            step("b", 2, vec![1]),
            step("c", 3, vec![2]),
            step("d", 4, vec![2, 3]),
        ]);

        let first = build_graph(&workflow, &HashMap::new()).unwrap();
        let second = build_graph(&workflow, &HashMap::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grid_layout_from_sequence_position() {
        let workflow = workflow_with(vec![
            step("a", 1, vec![]),
            step("b", 2, vec![]),
            step("c", 3, vec![]),
            step("d", 4, vec![]),
        ]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        let coords: Vec<(f32, f32)> = graph.nodes.iter().map(|n| (n.x, n.y)).collect();
        assert_eq!(
            coords,
            vec![
                (100.0, 50.0),
                (400.0, 50.0),
                (700.0, 50.0),
                (100.0, 200.0),
            ]
        );
    }

    #[test]
    fn test_agent_labels_resolve_or_fall_back() {
        let agent = Agent::builder().name("Researcher").build();
        let agents = HashMap::from([(agent.id, agent.clone())]);

        let mut steps = vec![step("a", 1, vec![]), step("b", 2, vec![])];
        steps[0].agent_id = Some(agent.id);
        steps[1].agent_id = Some(Uuid::new_v4()); // deleted agent
        let workflow = workflow_with(steps);

        let graph = build_graph(&workflow, &agents).unwrap();
        assert_eq!(graph.nodes[0].agent_name, "Researcher");
        assert_eq!(graph.nodes[1].agent_name, UNKNOWN_AGENT);
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_cycle_is_reported_with_all_members() {
        let workflow = workflow_with(vec![
            step("a", 1, vec![3]),
            step("b", 2, vec![1]),
            step("c", 3, vec![2]),
        ]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        assert_eq!(graph.nodes.len(), 3);
        // Cycles are advisory: every edge stays in the graph.
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.diagnostics.len(), 1);
        match &graph.diagnostics[0] {
            Diagnostic::CyclicDependency { step_ids } => {
                let mut ids = step_ids.clone();
                ids.sort();
                assert_eq!(ids, vec!["a", "b", "c"]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_dangling_dependency_drops_edge_keeps_node() {
        let workflow = workflow_with(vec![step("a", 1, vec![]), step("b", 2, vec![99])]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
        assert_eq!(
            graph.diagnostics,
            vec![Diagnostic::DanglingDependency {
                step_id: "b".to_owned(),
                missing_order: 99,
            }]
        );
    }

    #[test]
    fn test_duplicate_order_first_claimant_wins() {
        let workflow = workflow_with(vec![
            step("a", 1, vec![]),
            step("b", 2, vec![]),
            step("c", 2, vec![]),
            step("d", 3, vec![2]),
        ]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        // Every step is still a node, the collision is a single diagnostic.
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(
            graph.diagnostics,
            vec![Diagnostic::DuplicateOrder {
                order: 2,
                step_id: "c".to_owned(),
            }]
        );
        // The dependency on 2 resolved to the first claimant.
        assert_eq!(
            graph.edges,
            vec![GraphEdge {
                source: "b".to_owned(),
                target: "d".to_owned(),
            }]
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let workflow = workflow_with(vec![step("a", 1, vec![1])]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(
            graph.diagnostics,
            vec![Diagnostic::CyclicDependency {
                step_ids: vec!["a".to_owned()],
            }]
        );
    }

    #[test]
    fn test_zero_order_is_invalid_input() {
        let workflow = workflow_with(vec![step("a", 0, vec![])]);
        assert!(matches!(
            build_graph(&workflow, &HashMap::new()),
            Err(GraphError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_workflow_builds_empty_graph() {
        let workflow = workflow_with(vec![]);
        let graph = build_graph(&workflow, &HashMap::new()).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(graph.diagnostics.is_empty());
    }

    #[test]
    fn test_dot_export_lists_nodes_and_edges() {
        let workflow = workflow_with(vec![step("a", 1, vec![]), step("b", 2, vec![1])]);
        let dot = build_graph(&workflow, &HashMap::new()).unwrap().to_dot();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"a\" [label="));
        assert!(dot.contains("\"b\" [label="));
        assert!(dot.contains("\"a\" -> \"b\";"));
    }
}
