mod common;

use common::{assert_feasible, diamond, nine_tasks};
use lineforge::decoder::{decode_u, Side, SideLabel, UStep};
use lineforge::heuristics::Heuristic;
use lineforge::optimizer::{
    Chromosome, ComsoalOptions, GeneticOptimizer, GeneticOptions, Genome, LocalSearchMode,
    SilentProgress,
};
use lineforge::pool::{Candidate, OutLimit};
use lineforge::strategy::{Layout, Strategy};
use lineforge::ushape::{u_comsoal, u_heuristic, UChromosome};
use rstest::rstest;

#[rstest]
#[case(Heuristic::Lcr)]
#[case(Heuristic::Hb)]
fn u_heuristics_are_feasible_and_labelled(#[case] rule: Heuristic) {
    let graph = nine_tasks().graph();
    let a = u_heuristic(&graph, 12.0, rule).unwrap();
    assert_feasible(&graph, &a);
    assert_eq!(a.sides.as_ref().map(Vec::len), Some(graph.len()));
}

#[test]
fn u_genetic_search_is_no_worse_than_its_rule_seeds() {
    let graph = nine_tasks().graph();
    let options = GeneticOptions {
        generations: 20,
        population: 20,
        seed: Some(8),
        ..Default::default()
    };
    let pool = GeneticOptimizer::<UChromosome>::new(&graph, 12.0, options)
        .run(SilentProgress)
        .unwrap();
    let best = pool.best().unwrap();
    assert_feasible(&graph, &best.assignment);
    for seed in UChromosome::constructive(&graph, 12.0).unwrap() {
        let seeded = Candidate::new(&graph, seed.decode(&graph, 12.0).unwrap());
        assert!(best.quality.is_no_worse_than(&seeded.quality));
    }
}

#[test]
fn side_labels_follow_commit_time_feasibility() {
    let graph = diamond().graph();
    let steps = [
        UStep::new(1, Side::Front),
        UStep::new(4, Side::Back),
        UStep::new(2, Side::Front),
        UStep::new(3, Side::Back),
    ];
    let a = decode_u(&graph, &steps, 6.0).unwrap();
    assert_eq!(
        a.sides.unwrap(),
        vec![SideLabel::Front, SideLabel::Back, SideLabel::Either, SideLabel::Either]
    );
}

#[test]
fn u_comsoal_respects_out() {
    let graph = nine_tasks().graph();
    let options = ComsoalOptions {
        iterations: 100,
        out: OutLimit::Count(3),
        seed: Some(12),
        ..Default::default()
    };
    let pool = u_comsoal(&graph, 12.0, &options).unwrap();
    assert!(pool.len() <= 3 && !pool.is_empty());
    for c in &pool {
        assert_feasible(&graph, &c.assignment);
    }
}

#[test]
fn strategy_dispatch_uses_the_u_decoder() {
    let graph = diamond().graph();
    let pool = Strategy::Heuristic(Heuristic::Lcr)
        .produce(&graph, 6.0, Layout::UShaped)
        .unwrap();
    assert!(pool.best().unwrap().assignment.sides.is_some());
}

#[rstest]
#[case(LocalSearchMode::Local)]
#[case(LocalSearchMode::Genetics)]
fn u_genetic_search_skips_offspring_polishing(#[case] mode: LocalSearchMode) {
    assert!(Chromosome::POLISHES);
    assert!(!UChromosome::POLISHES);

    let graph = nine_tasks().graph();
    let base = GeneticOptions {
        generations: 5,
        population: 10,
        seed: Some(4),
        ..Default::default()
    };
    let with_mode = GeneticOptions {
        local_search: Some(mode),
        ..base.clone()
    };
    let plain = GeneticOptimizer::<UChromosome>::new(&graph, 12.0, base)
        .run(SilentProgress)
        .unwrap();
    let skipped = GeneticOptimizer::<UChromosome>::new(&graph, 12.0, with_mode)
        .run(SilentProgress)
        .unwrap();
    // Without a polish step the run is the same as one with no local search.
    assert_eq!(plain, skipped);
}
