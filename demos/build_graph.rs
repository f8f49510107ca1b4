use std::collections::HashMap;

use anyhow::Result;
use crewflow::{Agent, StepField, Workflow, build_graph};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let researcher = Agent::builder()
        .name("Researcher")
        .role("research")
        .capabilities("web search, summarization")
        .build();
    let writer = Agent::builder()
        .name("Writer")
        .role("writing")
        .build();
    let agents: HashMap<_, _> = [researcher.clone(), writer.clone()]
        .into_iter()
        .map(|agent| (agent.id, agent))
        .collect();

    let mut workflow = Workflow::new("Content Creation Pipeline");
    workflow.workflow_description =
        "Research the topic first, then draft and review the article.".to_owned();

    workflow.add_step();
    workflow.set_step_field(0, StepField::Agent(Some(researcher.id)))?;
    workflow.set_step_field(0, StepField::Action("Collect sources".to_owned()))?;

    workflow.add_step();
    workflow.set_step_field(1, StepField::Agent(Some(writer.id)))?;
    workflow.set_step_field(1, StepField::Action("Draft the article".to_owned()))?;
    workflow.set_step_field(1, StepField::Dependencies("1".to_owned()))?;

    workflow.add_step();
    workflow.set_step_field(2, StepField::Action("Review".to_owned()))?;
    // A typo'd reference and a loop back to the draft, to show diagnostics.
    workflow.set_step_field(2, StepField::Dependencies("2, 9".to_owned()))?;
    workflow.set_step_field(1, StepField::Dependencies("1, 3".to_owned()))?;

    let graph = build_graph(&workflow, &agents)?;

    println!("nodes:");
    for node in &graph.nodes {
        println!(
            "  {} '{}' by {} at ({}, {})",
            node.order, node.action, node.agent_name, node.x, node.y
        );
    }
    println!("edges:");
    for edge in &graph.edges {
        println!("  {} -> {}", edge.source, edge.target);
    }
    println!("diagnostics: {:#?}", graph.diagnostics);
    println!("{}", graph.to_dot());

    Ok(())
}
