//! Lay out a random graph and write a PNG snapshot.
//!
//! Run with: cargo run --example random_graph -- [nodes] [output.png]

use std::time::Instant;

use learngraph_layout::{
    draw_graph, DrawOptions, Edge, ForceSimulation, ForceSimulationConfig, Node,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("learngraph_layout=info".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let node_count: usize = match args.next() {
        Some(count) => count.parse()?,
        None => 1000,
    };
    let output = args.next().unwrap_or_else(|| "random_graph.png".to_string());

    println!("Creating random graph with {} nodes...", node_count);

    let mut rng = StdRng::seed_from_u64(42);
    let nodes: Vec<Node> = (0..node_count).map(|i| Node::new(format!("n{i}"))).collect();
    let mut edges = Vec::with_capacity(node_count * 2);
    for i in 1..node_count {
        // A path keeps the graph connected.
        edges.push(Edge::new(i - 1, i));
        let other = rng.random_range(0..node_count);
        if other != i {
            edges.push(Edge::weighted(i, other, rng.random_range(0.5..2.0)));
        }
    }

    let config = ForceSimulationConfig {
        seed: Some(42),
        ..ForceSimulationConfig::complete()
    };
    let mut simulation = ForceSimulation::new(config)?;

    let start = Instant::now();
    let (mut nodes, stats) = simulation.compute_layout(nodes, edges)?;
    println!(
        "Completed {} iterations in {:.2?} (converged: {}, temperature {:.5})",
        stats.iterations,
        start.elapsed(),
        stats.converged,
        stats.temperature
    );

    let reseeded = simulation.reseed_non_finite(&mut nodes);
    if reseeded > 0 {
        println!("Reseeded {} diverged nodes", reseeded);
    }

    println!("\nFinal positions (first 5 nodes):");
    for node in nodes.iter().take(5) {
        println!("  {}: ({:.2}, {:.2})", node.name, node.pos.x, node.pos.y);
    }

    draw_graph(&nodes, &output, &DrawOptions::default())?;
    println!("\nWrote {}", output);
    Ok(())
}
