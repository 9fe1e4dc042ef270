//! Drives a compiled plan row by row over input sequences

use crate::error::{Result, SolveError};
use crate::partial_solver::PartialSolver;
use crate::ringbuffer::ActivationRingbuffer;
use crate::thread_group::ThreadGroup;
use crate::weight_updater::WeightUpdater;
use srnn_model::{
    input_index_from_synapse_index, is_input_index, CoreConfig, Network, PartialSolution, Solution,
    SynapseInterval,
};

/// Executes a [`Solution`] deterministically, one input vector per step.
///
/// The engine owns the plan, the activation ring buffer, and a scratch pool
/// of one lane per worker and processing thread. Rows run in order; the
/// tiles of one row are fanned out over the worker group in waves, each
/// tile gathering into its worker's lane and writing its own disjoint
/// slice of the current activation row.
#[derive(Debug)]
pub struct SolutionEngine {
    solution: Solution,
    config: CoreConfig,
    ring: ActivationRingbuffer,
    thread_group: ThreadGroup,
    scratch_pool: Vec<Vec<f64>>,
    required_input_size: usize,
}

impl SolutionEngine {
    /// Validate a plan and provision the state to execute it
    pub fn new(solution: Solution, config: &CoreConfig) -> Result<Self> {
        config.validate()?;
        Self::validate_solution(&solution)?;

        let memory_depth = solution.network_memory_length.max(1);
        let scratch_size = solution.required_scratch_size();
        let lane_count = config.max_processing_threads * config.max_solve_threads;
        let required_input_size = solution
            .partial_solutions
            .iter()
            .flat_map(|partial| &partial.input_data)
            .filter(|interval| is_input_index(interval.starts))
            .filter_map(|interval| interval.last_index())
            .map(|deepest| input_index_from_synapse_index(deepest) as usize + 1)
            .max()
            .unwrap_or(0);

        log::debug!(
            "engine provisioned: {} tiles, memory depth {}, {} scratch lanes of {}",
            solution.partial_solutions.len(),
            memory_depth,
            lane_count,
            scratch_size
        );
        Ok(Self {
            ring: ActivationRingbuffer::new(memory_depth, solution.neuron_number),
            thread_group: ThreadGroup::new(config.max_solve_threads),
            scratch_pool: vec![vec![0.0; scratch_size]; lane_count],
            required_input_size,
            solution,
            config: config.clone(),
        })
    }

    /// The plan under execution
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// Number of past loops the engine retains
    pub fn memory_depth(&self) -> u32 {
        self.ring.memory_depth()
    }

    /// Length of the output slice returned by [`solve`](Self::solve)
    pub fn output_size(&self) -> usize {
        self.solution.output_neuron_number as usize
    }

    /// Smallest input vector length [`solve`](Self::solve) accepts
    pub fn required_input_size(&self) -> usize {
        self.required_input_size
    }

    /// The retained activations, for diagnostics
    pub fn neuron_data(&self) -> &ActivationRingbuffer {
        &self.ring
    }

    /// Zero the retained activations
    pub fn reset_state(&mut self) {
        self.ring.reset();
    }

    /// Advance one time step and return the network output slice.
    ///
    /// With `reset` the retained activations are zeroed first. `worker_id`
    /// selects the caller's scratch lanes and must stay below the
    /// configured `max_processing_threads`. On failure the ring buffer
    /// position is rolled back and no output is produced.
    pub fn solve(&mut self, input: &[f64], reset: bool, worker_id: u32) -> Result<&[f64]> {
        if worker_id as usize >= self.config.max_processing_threads {
            return Err(SolveError::invalid_input(format!(
                "worker id {} outside the {} provisioned processing threads",
                worker_id, self.config.max_processing_threads
            )));
        }
        if input.len() < self.required_input_size {
            return Err(SolveError::invalid_input(format!(
                "input vector of {} elements, the plan reads {}",
                input.len(),
                self.required_input_size
            )));
        }
        if reset {
            self.ring.reset();
        }

        let saved_position = self.ring.position();
        self.ring.step();

        let workers = self.thread_group.workers();
        let lane_base = worker_id as usize * workers;
        let lanes = &mut self.scratch_pool[lane_base..lane_base + workers];
        if let Err(error) = Self::execute_rows(
            &self.solution,
            &self.config,
            &self.thread_group,
            &mut self.ring,
            lanes,
            input,
        ) {
            self.ring.restore_position(saved_position);
            return Err(error);
        }

        let current = self.ring.current_row();
        Ok(&current[current.len() - self.solution.output_neuron_number as usize..])
    }

    /// Refresh every tile's private weights from the network's weight
    /// table. Must not race a `solve`; exclusive access enforces that here.
    pub fn update_weights_from(&mut self, network: &Network) -> Result<()> {
        WeightUpdater::update_solution_with_weights(&mut self.solution, network)
    }

    fn execute_rows(
        solution: &Solution,
        config: &CoreConfig,
        thread_group: &ThreadGroup,
        ring: &mut ActivationRingbuffer,
        lanes: &mut [Vec<f64>],
        input: &[f64],
    ) -> Result<()> {
        let mut row_start = 0usize;
        for &cols in &solution.cols {
            let tiles = &solution.partial_solutions[row_start..row_start + cols as usize];
            for batch in tiles.chunks(thread_group.workers()) {
                // Gather phase: read-only over the ring buffer
                for (lane, partial) in lanes.iter_mut().zip(batch) {
                    PartialSolver::new(partial).gather_inputs(input, ring, lane)?;
                }
                // Compute phase: disjoint slices of the current row
                let current = ring.current_row_mut();
                let outputs = split_output_slices(current, batch);
                let tasks: Vec<(PartialSolver, &[f64], &mut [f64])> = batch
                    .iter()
                    .zip(lanes.iter())
                    .zip(outputs)
                    .map(|((partial, lane), out)| {
                        (PartialSolver::new(partial), lane.as_slice(), out)
                    })
                    .collect();
                thread_group.start_and_block(tasks, |(solver, lane, out)| {
                    solver.compute(config, lane, out)
                });
            }
            row_start += cols as usize;
        }
        Ok(())
    }

    fn validate_solution(solution: &Solution) -> Result<()> {
        if solution.cols.is_empty() {
            return Err(SolveError::malformed_tile("a solution of zero rows"));
        }
        if solution.cols.iter().any(|&cols| cols == 0) {
            return Err(SolveError::malformed_tile("a solution row of zero tiles"));
        }
        let tile_count: usize = solution.cols.iter().map(|&c| c as usize).sum();
        if tile_count != solution.partial_solutions.len() {
            return Err(SolveError::malformed_tile(
                "row shape disagrees with the tile count",
            ));
        }
        if solution.output_neuron_number == 0
            || solution.output_neuron_number > solution.neuron_number
        {
            return Err(SolveError::malformed_tile(
                "output neuron number outside the activation row",
            ));
        }

        let memory_depth = solution.network_memory_length.max(1);
        let mut covered = vec![false; solution.neuron_number as usize];
        for partial in &solution.partial_solutions {
            PartialSolver::new(partial).validate(memory_depth, solution.neuron_number)?;
            for offset in 0..partial.internal_neuron_number {
                let neuron_index = (partial.output_start() + offset) as usize;
                if covered[neuron_index] {
                    return Err(SolveError::malformed_tile(format!(
                        "neuron {} is computed by two tiles",
                        neuron_index
                    )));
                }
                covered[neuron_index] = true;
            }
        }
        if !covered.iter().all(|&c| c) {
            return Err(SolveError::malformed_tile(
                "the tile outputs do not cover every neuron",
            ));
        }
        Ok(())
    }
}

/// Carve the current activation row into one mutable slice per tile,
/// returned in tile order. Tile output ranges are validated disjoint.
fn split_output_slices<'r>(
    mut row: &'r mut [f64],
    tiles: &[PartialSolution],
) -> Vec<&'r mut [f64]> {
    let mut order: Vec<usize> = (0..tiles.len()).collect();
    order.sort_by_key(|&tile_index| tiles[tile_index].output_start());

    let mut carved: Vec<(usize, &'r mut [f64])> = Vec::with_capacity(tiles.len());
    let mut consumed = 0usize;
    for &tile_index in &order {
        let start = tiles[tile_index].output_start() as usize;
        let size = tiles[tile_index].internal_neuron_number as usize;
        let (_, tail) = std::mem::take(&mut row).split_at_mut(start - consumed);
        let (slice, rest) = tail.split_at_mut(size);
        carved.push((tile_index, slice));
        row = rest;
        consumed = start + size;
    }
    carved.sort_by_key(|&(tile_index, _)| tile_index);
    carved.into_iter().map(|(_, slice)| slice).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use srnn_model::{
        encode_input_index, IndexSynapseInterval, InputSynapseInterval, TransferFunction,
    };

    /// Single-tile plan: neuron 0 sums both inputs, neuron 1 relays it
    fn passthrough_solution() -> Solution {
        Solution {
            neuron_number: 2,
            output_neuron_number: 1,
            network_memory_length: 1,
            cols: vec![1],
            partial_solutions: vec![PartialSolution {
                internal_neuron_number: 2,
                output_data: IndexSynapseInterval::new(0, 2),
                input_data: vec![InputSynapseInterval::new(encode_input_index(0), 2)],
                weight_table: vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                neuron_transfer_functions: vec![TransferFunction::Identity; 2],
                spike_parameter_indices: vec![0, 4],
                weight_synapse_counts: vec![1, 1],
                index_synapse_counts: vec![1, 1],
                inside_indices: vec![
                    InputSynapseInterval::new(encode_input_index(0), 2),
                    InputSynapseInterval::new(0, 1),
                ],
                weight_indices: vec![
                    IndexSynapseInterval::new(1, 3),
                    IndexSynapseInterval::new(5, 2),
                ],
            }],
        }
    }

    #[test]
    fn test_solve_returns_output_slice() {
        let config = CoreConfig::default();
        let mut engine = SolutionEngine::new(passthrough_solution(), &config).unwrap();
        assert_eq!(engine.output_size(), 1);
        assert_eq!(engine.required_input_size(), 2);
        let output = engine.solve(&[10.0, 5.0], false, 0).unwrap();
        assert_eq!(output, &[15.0]);
    }

    #[test]
    fn test_invalid_worker_id_is_rejected() {
        let config = CoreConfig::default();
        let mut engine = SolutionEngine::new(passthrough_solution(), &config).unwrap();
        let result = engine.solve(&[1.0, 1.0], false, 99);
        assert!(matches!(result, Err(SolveError::InvalidInput { .. })));
    }

    #[test]
    fn test_short_input_rolls_back_nothing() {
        let config = CoreConfig::default();
        let mut engine = SolutionEngine::new(passthrough_solution(), &config).unwrap();
        let before = engine.neuron_data().position();
        assert!(engine.solve(&[1.0], false, 0).is_err());
        assert_eq!(engine.neuron_data().position(), before);
    }

    #[test]
    fn test_rejects_gapped_coverage() {
        let mut solution = passthrough_solution();
        solution.neuron_number = 3;
        let config = CoreConfig::default();
        assert!(matches!(
            SolutionEngine::new(solution, &config),
            Err(SolveError::MalformedTile { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_rows() {
        let mut solution = passthrough_solution();
        solution.cols = vec![1, 0];
        let config = CoreConfig::default();
        assert!(SolutionEngine::new(solution, &config).is_err());
    }

    #[test]
    fn test_split_output_slices_handles_unordered_tiles() {
        let mut row = vec![0.0; 5];
        let tiles = vec![
            PartialSolution {
                internal_neuron_number: 2,
                output_data: IndexSynapseInterval::new(3, 2),
                ..PartialSolution::default()
            },
            PartialSolution {
                internal_neuron_number: 2,
                output_data: IndexSynapseInterval::new(0, 2),
                ..PartialSolution::default()
            },
        ];
        let slices = split_output_slices(&mut row, &tiles);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].len(), 2);
        slices.into_iter().enumerate().for_each(|(tile_index, slice)| {
            slice.fill(tile_index as f64 + 1.0);
        });
        assert_eq!(row, vec![2.0, 2.0, 0.0, 1.0, 1.0]);
    }
}
