//! Equivalence of differently compiled plans for the same network

use srnn_compiler::compile;
use srnn_model::{CoreConfig, Network, Recurrence, TransferFunction, WeightInit};
use srnn_runtime::SolutionEngine;

const BUDGET: usize = 256 * 1024 * 1024;

fn wide_network() -> Network {
    Network::builder()
        .input_size(20)
        .transfer_function(TransferFunction::Tanh)
        .weight_init(WeightInit::Random { seed: 1234 })
        .dense_layers(&[20, 20, 30, 10, 5])
        .unwrap()
}

fn test_input(size: usize) -> Vec<f64> {
    (0..size).map(|i| (i as f64) / 7.0 - 1.3).collect()
}

#[test]
fn budget_split_evaluates_identically() {
    let network = wide_network();
    let full = compile(&network, BUDGET, 4, false).unwrap();
    assert_eq!(full.partial_solutions.len(), 1);

    let footprint: usize = full
        .partial_solutions
        .iter()
        .map(|partial| partial.estimated_size_bytes())
        .sum();
    let split = compile(&network, footprint / 5, 4, false).unwrap();
    assert!(split.partial_solutions.len() >= 5);

    let config = CoreConfig::default();
    let mut full_engine = SolutionEngine::new(full, &config).unwrap();
    let mut split_engine = SolutionEngine::new(split, &config).unwrap();

    let input = test_input(20);
    let expected = full_engine.solve(&input, false, 0).unwrap().to_vec();
    let actual = split_engine.solve(&input, false, 0).unwrap().to_vec();
    assert_eq!(expected, actual);
}

#[test]
fn weight_hot_swap_matches_fresh_compilation() {
    let mut network = Network::builder()
        .input_size(4)
        .dense_layers(&[3, 2])
        .unwrap();
    let solution = compile(&network, BUDGET, 4, false).unwrap();
    let config = CoreConfig::default();
    let mut engine = SolutionEngine::new(solution, &config).unwrap();

    for weight in &mut network.weight_table {
        *weight = 0.5;
    }
    engine.update_weights_from(&network).unwrap();

    let fresh_solution = compile(&network, BUDGET, 4, false).unwrap();
    let mut fresh_engine = SolutionEngine::new(fresh_solution, &config).unwrap();

    let input = test_input(4);
    assert_eq!(
        engine.solve(&input, true, 0).unwrap(),
        fresh_engine.solve(&input, true, 0).unwrap()
    );
}

#[test]
fn strict_mode_outputs_are_byte_identical() {
    let network = Network::builder()
        .input_size(6)
        .transfer_function(TransferFunction::Sigmoid)
        .weight_init(WeightInit::Random { seed: 7 })
        .recurrence(Recurrence::ToLayer)
        .dense_layers(&[5, 4, 3])
        .unwrap();

    let throughput = compile(&network, BUDGET, 4, true).unwrap();
    let compact = compile(&network, BUDGET, 4, false).unwrap();
    // Strict routing produces more, smaller tiles
    assert!(throughput.partial_solutions.len() >= compact.partial_solutions.len());

    let config = CoreConfig::default();
    let mut throughput_engine = SolutionEngine::new(throughput, &config).unwrap();
    let mut compact_engine = SolutionEngine::new(compact, &config).unwrap();

    let input = test_input(6);
    for _ in 0..5 {
        let lhs = throughput_engine.solve(&input, false, 0).unwrap().to_vec();
        let rhs = compact_engine.solve(&input, false, 0).unwrap().to_vec();
        let lhs_bits: Vec<u64> = lhs.iter().map(|v| v.to_bits()).collect();
        let rhs_bits: Vec<u64> = rhs.iter().map(|v| v.to_bits()).collect();
        assert_eq!(lhs_bits, rhs_bits);
    }
}

#[test]
fn worker_count_does_not_change_results() {
    let network = wide_network();
    let input = test_input(20);

    let mut outputs = Vec::new();
    for workers in [1usize, 4] {
        let solution = compile(&network, BUDGET / 2048, workers, true).unwrap();
        let config = CoreConfig::default().with_max_solve_threads(workers);
        let mut engine = SolutionEngine::new(solution, &config).unwrap();
        let mut sequence = Vec::new();
        for _ in 0..3 {
            sequence.extend_from_slice(engine.solve(&input, false, 0).unwrap());
        }
        outputs.push(sequence);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn recurrent_split_stays_equivalent_over_time() {
    let network = Network::builder()
        .input_size(8)
        .transfer_function(TransferFunction::Tanh)
        .weight_init(WeightInit::Random { seed: 42 })
        .recurrence(Recurrence::ToSelf)
        .dense_layers(&[8, 8, 4])
        .unwrap();

    let full = compile(&network, BUDGET, 2, false).unwrap();
    let footprint: usize = full
        .partial_solutions
        .iter()
        .map(|partial| partial.estimated_size_bytes())
        .sum();
    let split = compile(&network, footprint / 4, 2, false).unwrap();

    let config = CoreConfig::default().with_max_solve_threads(2);
    let mut full_engine = SolutionEngine::new(full, &config).unwrap();
    let mut split_engine = SolutionEngine::new(split, &config).unwrap();

    let input = test_input(8);
    for _ in 0..6 {
        assert_eq!(
            full_engine.solve(&input, false, 0).unwrap(),
            split_engine.solve(&input, false, 0).unwrap()
        );
    }
}
