use crate::reports;
use clap::Args;
use lineforge::api::LineBalancer;
use lineforge::error::LbResult;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {}

pub fn run(balancer: &LineBalancer) -> LbResult<()> {
    let graph = balancer.graph();
    println!(
        "\n🧩 {} tasks, total work {:.2}, longest task {:.2}",
        graph.len(),
        graph.total_duration(),
        graph.max_duration()
    );
    println!(
        "   Baseline order: {}",
        graph
            .topological_order()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    reports::print_task_table(graph);
    reports::print_regions(graph);
    Ok(())
}
