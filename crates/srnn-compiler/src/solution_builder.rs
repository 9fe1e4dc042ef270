//! Assembles the tile matrix a network compiles into

use crate::partial_builder::PartialSolutionBuilder;
use crate::router::NeuronRouter;
use crate::{CompileError, Result};
use srnn_model::{CoreConfig, Network, PartialSolution, Solution};
use std::mem;

/// Compiles a [`Network`] into a [`Solution`].
///
/// Rows are grown one subset of schedulable neurons at a time. A tile is
/// closed when the byte budget is reached or its output range cannot stay
/// contiguous; remaining subset neurons then go into further tiles of the
/// same row, collected strictly so the row's tiles stay independent of
/// each other.
#[derive(Debug)]
pub struct SolutionBuilder<'a> {
    config: &'a CoreConfig,
}

impl<'a> SolutionBuilder<'a> {
    /// Create a builder using the given configuration
    pub fn new(config: &'a CoreConfig) -> Self {
        Self { config }
    }

    /// Build the execution plan for a network.
    ///
    /// With `optimise_for_throughput` the router runs strictly from the
    /// first row, yielding smaller but more independent tiles.
    pub fn build(&self, network: &Network, optimise_for_throughput: bool) -> Result<Solution> {
        self.config.validate()?;
        crate::validate_network(network)?;

        let budget = self.config.device_max_bytes;
        let mut router = NeuronRouter::new(network);
        let mut rows: Vec<Vec<PartialSolution>> = Vec::new();
        let mut current_row: Vec<PartialSolution> = Vec::new();
        let mut builder = PartialSolutionBuilder::new(network);
        let mut neurons_in_row: Vec<u32> = Vec::new();
        let mut placed_in_row = 0usize;
        let mut max_reach_back = 0u32;
        let mut strict = optimise_for_throughput;

        while !router.finished() {
            router.collect_subset(self.config.max_solve_threads, budget, strict)?;

            while let Some(neuron_index) = router.subset_element(placed_in_row) {
                let estimated_bytes = builder.size_with(neuron_index);
                if estimated_bytes > budget {
                    if builder.partial().internal_neuron_number == 0 {
                        return Err(CompileError::BudgetExceeded {
                            neuron_index,
                            estimated_bytes,
                            budget_bytes: budget,
                        });
                    }
                    break;
                }
                if matches!(builder.next_output_index(), Some(next) if next != neuron_index) {
                    break;
                }
                let reach_back = builder.add_neuron_to_partial(neuron_index)?;
                max_reach_back = max_reach_back.max(reach_back);
                neurons_in_row.push(neuron_index);
                placed_in_row += 1;
            }

            if placed_in_row < router.subset_size() {
                // The tile refused a neuron while the subset still has
                // members: close it and grow the row another tile. The
                // unplaced remainder is re-collected strictly, keeping the
                // row's tiles independent of each other.
                let fresh = PartialSolutionBuilder::new(network);
                if let Some(partial) = mem::replace(&mut builder, fresh).finish() {
                    current_row.push(partial);
                }
                router.reset_all_except(&neurons_in_row);
                placed_in_row = neurons_in_row.len();
                strict = true;
                continue;
            }

            // Subset exhausted: the row is complete
            for &neuron_index in &neurons_in_row {
                router.confirm_first_subset_element_processed(neuron_index);
            }
            neurons_in_row.clear();
            router.reset_remaining_subset();
            let fresh = PartialSolutionBuilder::new(network);
            if let Some(partial) = mem::replace(&mut builder, fresh).finish() {
                current_row.push(partial);
            }
            if !current_row.is_empty() {
                log::debug!(
                    "solution row {} closed with {} tiles",
                    rows.len(),
                    current_row.len()
                );
                rows.push(mem::take(&mut current_row));
            }
            placed_in_row = 0;
            strict = optimise_for_throughput;
        }

        let solution = Solution {
            neuron_number: network.neuron_count() as u32,
            output_neuron_number: network.output_neuron_number,
            network_memory_length: max_reach_back + 1,
            cols: rows.iter().map(|row| row.len() as u32).collect(),
            partial_solutions: rows.into_iter().flatten().collect(),
        };
        log::info!(
            "compiled {} neurons into {} tiles across {} rows (memory depth {})",
            solution.neuron_number,
            solution.partial_solutions.len(),
            solution.rows(),
            solution.network_memory_length
        );
        Ok(solution)
    }
}
