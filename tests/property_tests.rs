mod common;

use common::{assert_feasible, chained_diamonds};
use fastrand::Rng;
use lineforge::decoder::decode;
use lineforge::graph::{Task, TaskGraph};
use lineforge::optimizer::crossover::region_crossover;
use lineforge::optimizer::initialization::random_order;
use lineforge::optimizer::mutation::{region_mutation, relocation_window};
use lineforge::optimizer::{comsoal, ComsoalOptions, Genome, SelectionWeighting};
use lineforge::pool::OutLimit;
use lineforge::ushape::UChromosome;
use proptest::prelude::*;

// --- STRATEGIES ---

// Random DAG: each task may depend on any smaller id (about one edge in four).
prop_compose! {
    fn arb_tasks()(n in 2usize..16)(
        durations in proptest::collection::vec(1u32..10, n),
        edges in proptest::collection::vec(proptest::collection::vec(0u8..4, n), n),
        n in Just(n)
    ) -> Vec<Task> {
        (0..n)
            .map(|i| {
                let preds: Vec<u32> = (0..i)
                    .filter(|&j| edges[i][j] == 0)
                    .map(|j| j as u32 + 1)
                    .collect();
                Task::new(i as u32 + 1, &preds, durations[i] as f64)
            })
            .collect()
    }
}

fn station_of(stations: &[Vec<u32>], id: u32) -> usize {
    stations
        .iter()
        .position(|s| s.contains(&id))
        .unwrap_or(usize::MAX)
}

proptest! {
    #[test]
    fn baseline_order_decodes_with_monotone_stations(tasks in arb_tasks(), slack in 0.0..20.0f64) {
        let graph = TaskGraph::build(&tasks).unwrap();
        let cycle_time = graph.max_duration() + slack;
        let a = decode(&graph, &graph.topological_order(), cycle_time).unwrap();
        assert_feasible(&graph, &a);
        for t in &tasks {
            for &p in &t.predecessors {
                prop_assert!(station_of(&a.stations, p) <= station_of(&a.stations, t.id));
            }
        }
    }

    #[test]
    fn decoding_is_deterministic(tasks in arb_tasks(), seed in any::<u64>()) {
        let graph = TaskGraph::build(&tasks).unwrap();
        let order = random_order(&graph, SelectionWeighting::Uniform, &mut Rng::with_seed(seed));
        let ct = graph.max_duration() * 1.5;
        prop_assert_eq!(decode(&graph, &order, ct).unwrap(), decode(&graph, &order, ct).unwrap());
    }

    #[test]
    fn operators_keep_random_dags_feasible(tasks in arb_tasks(), seed in any::<u64>()) {
        let graph = TaskGraph::build(&tasks).unwrap();
        let mut rng = Rng::with_seed(seed);
        let a = random_order(&graph, SelectionWeighting::Duration, &mut rng);
        let b = random_order(&graph, SelectionWeighting::PositionalWeight, &mut rng);
        let (mut x, y) = region_crossover(&graph, &a, &b, &mut rng);
        prop_assert!(graph.is_valid_order(&x));
        prop_assert!(graph.is_valid_order(&y));

        if region_mutation(&graph, &mut x, &mut rng).is_ok() {
            prop_assert!(graph.is_valid_order(&x));
        }
    }

    #[test]
    fn relocation_stays_inside_the_window(tasks in arb_tasks(), seed in any::<u64>()) {
        let graph = TaskGraph::build(&tasks).unwrap();
        let mut rng = Rng::with_seed(seed);
        let mut order = random_order(&graph, SelectionWeighting::Uniform, &mut rng);
        let before = order.clone();
        if let Ok(moved) = region_mutation(&graph, &mut order, &mut rng) {
            let window = relocation_window(&graph, &before, moved.from).unwrap();
            prop_assert!(window.contains(&moved.to));
            prop_assert!(graph.is_valid_order(&order));
        }
    }

    #[test]
    fn comsoal_results_cover_every_task_once(tasks in arb_tasks(), seed in any::<u64>()) {
        let graph = TaskGraph::build(&tasks).unwrap();
        let options = ComsoalOptions {
            iterations: 10,
            out: OutLimit::All,
            seed: Some(seed),
            ..Default::default()
        };
        let pool = comsoal(&graph, graph.max_duration() * 2.0, &options).unwrap();
        prop_assert!(!pool.is_empty());
        for c in &pool {
            assert_feasible(&graph, &c.assignment);
        }
    }

    #[test]
    fn u_chromosome_operators_keep_sides_closed(tasks in arb_tasks(), seed in any::<u64>()) {
        let graph = TaskGraph::build(&tasks).unwrap();
        let mut rng = Rng::with_seed(seed);
        let a = UChromosome::random(&graph, SelectionWeighting::Uniform, &mut rng);
        let b = UChromosome::random(&graph, SelectionWeighting::Uniform, &mut rng);
        let (mut x, y) = a.crossover(&b, &graph, &mut rng);
        let _ = x.mutate(&graph, &mut rng);
        for c in [&a, &b, &x, &y] {
            prop_assert!(c.is_closed(&graph));
            prop_assert!(graph.is_valid_order(&c.order));
            let decoded = c.decode(&graph, graph.max_duration() * 1.5).unwrap();
            assert_feasible(&graph, &decoded);
        }
    }
}

#[test]
fn crossover_over_a_thousand_parent_pairs() {
    let graph = chained_diamonds().graph();
    assert!(graph.articulation_points().len() >= 2);

    let mut rng = Rng::with_seed(1000);
    for _ in 0..1000 {
        let a = random_order(&graph, SelectionWeighting::Uniform, &mut rng);
        let b = random_order(&graph, SelectionWeighting::Uniform, &mut rng);
        let (x, y) = region_crossover(&graph, &a, &b, &mut rng);
        assert!(graph.is_valid_order(&x), "{:?} x {:?} -> {:?}", a, b, x);
        assert!(graph.is_valid_order(&y), "{:?} x {:?} -> {:?}", a, b, y);
    }
}

#[test]
fn cut_vertices_hold_their_position_in_every_order() {
    let graph = chained_diamonds().graph();
    let mut rng = Rng::with_seed(5);
    let reference = graph.topological_order();
    for _ in 0..200 {
        let order = random_order(&graph, SelectionWeighting::Uniform, &mut rng);
        for &cut in &graph.articulation_points() {
            let p = order.iter().position(|&t| t == cut);
            let q = reference.iter().position(|&t| t == cut);
            assert_eq!(p, q, "cut vertex {} moved", cut);
        }
    }
}
