//! Pushes network weight changes into a compiled plan's tiles
//!
//! Tiles carry private copies of the weights their neurons use, so editing
//! the network's weight table alone changes nothing at solve time. The
//! updater re-copies weights into every affected tile, either wholesale or
//! for one weight index. Callers quiesce the engine first; the exclusive
//! borrow on the solution enforces that within one process.

use crate::error::{Result, SolveError};
use srnn_model::{Network, PartialSolution, Solution, SynapseInterval, SynapseIterator};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Copies network weights into compiled tiles
#[derive(Debug)]
pub struct WeightUpdater;

impl WeightUpdater {
    /// Refresh every tile from the network's weight table.
    ///
    /// Tiles are independent, so the sweep fans out across them when the
    /// `parallel` feature is enabled.
    pub fn update_solution_with_weights(solution: &mut Solution, network: &Network) -> Result<()> {
        #[cfg(feature = "parallel")]
        {
            solution
                .partial_solutions
                .par_iter_mut()
                .try_for_each(|partial| Self::update_partial(partial, network))
        }
        #[cfg(not(feature = "parallel"))]
        {
            solution
                .partial_solutions
                .iter_mut()
                .try_for_each(|partial| Self::update_partial(partial, network))
        }
    }

    /// Refresh only the tiles touched by one weight of the network.
    ///
    /// Every neuron using the weight, through a synapse or as its spike
    /// parameter, has its whole local weight range re-copied in the one
    /// tile computing it.
    pub fn update_solution_with_weight(
        solution: &mut Solution,
        network: &Network,
        weight_index: u32,
    ) -> Result<()> {
        if weight_index as usize >= network.weight_table.len() {
            return Err(SolveError::invalid_input(format!(
                "weight index {} outside a weight table of {}",
                weight_index,
                network.weight_table.len()
            )));
        }
        for (neuron_index, neuron) in network.neuron_array.iter().enumerate() {
            let mut relevant = neuron.spike_parameter_weight_index == weight_index;
            if !relevant {
                SynapseIterator::new(&neuron.input_weights).skim_terminatable(|synapse| {
                    if synapse.contains(weight_index as i32) {
                        relevant = true;
                        false
                    } else {
                        true
                    }
                });
            }
            if !relevant {
                continue;
            }
            // A neuron belongs to exactly one tile
            for partial in &mut solution.partial_solutions {
                if partial.contains_neuron(neuron_index as u32) {
                    let inner_index = neuron_index - partial.output_start() as usize;
                    Self::copy_neuron_weights(network, partial, inner_index)?;
                    break;
                }
            }
        }
        Ok(())
    }

    fn update_partial(partial: &mut PartialSolution, network: &Network) -> Result<()> {
        for inner_index in 0..partial.internal_neuron_number as usize {
            Self::copy_neuron_weights(network, partial, inner_index)?;
        }
        Ok(())
    }

    /// Re-copy one inner neuron's spike parameter and weight ranges from
    /// the network into the tile's local table
    fn copy_neuron_weights(
        network: &Network,
        partial: &mut PartialSolution,
        inner_index: usize,
    ) -> Result<()> {
        let neuron_index = partial.output_start() as usize + inner_index;
        let neuron = network.neuron_array.get(neuron_index).ok_or_else(|| {
            SolveError::malformed_tile(format!(
                "tile computes neuron {} which the network does not declare",
                neuron_index
            ))
        })?;

        let spike_local = partial.spike_parameter_indices[inner_index] as usize;
        let spike_source = network
            .weight_table
            .get(neuron.spike_parameter_weight_index as usize)
            .copied()
            .ok_or_else(|| {
                SolveError::invalid_input(format!(
                    "neuron {} spike parameter escapes the network weight table",
                    neuron_index
                ))
            })?;
        *partial.weight_table.get_mut(spike_local).ok_or_else(|| {
            SolveError::malformed_tile(format!(
                "neuron {} spike slot escapes its tile's weight table",
                neuron_index
            ))
        })? = neuron.spike_function.normalized_parameter(spike_source);

        let synapse_count = partial.weight_synapse_counts[inner_index] as usize;
        if neuron.input_weights.len() != synapse_count {
            return Err(SolveError::malformed_tile(format!(
                "neuron {} weight synapses diverged from its tile",
                neuron_index
            )));
        }
        let synapse_start: usize = partial.weight_synapse_counts[..inner_index]
            .iter()
            .map(|&count| count as usize)
            .sum();
        for synapse_offset in 0..synapse_count {
            let local = partial.weight_indices[synapse_start + synapse_offset];
            let source = neuron.input_weights[synapse_offset];
            if local.interval_size != source.interval_size {
                return Err(SolveError::malformed_tile(format!(
                    "neuron {} weight synapse {} diverged from its tile",
                    neuron_index, synapse_offset
                )));
            }
            for n in 0..source.interval_size {
                let value = network
                    .weight_table
                    .get(source.nth_index(n) as usize)
                    .copied()
                    .ok_or_else(|| {
                        SolveError::invalid_input(format!(
                            "neuron {} weight reference escapes the network weight table",
                            neuron_index
                        ))
                    })?;
                let local_index = local.nth_index(n) as usize;
                *partial.weight_table.get_mut(local_index).ok_or_else(|| {
                    SolveError::malformed_tile(format!(
                        "neuron {} weight slot escapes its tile's weight table",
                        neuron_index
                    ))
                })? = value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srnn_model::{CoreConfig, Network};

    fn compiled(network: &Network) -> Solution {
        srnn_compiler::SolutionBuilder::new(&CoreConfig::default())
            .build(network, false)
            .unwrap()
    }

    #[test]
    fn test_bulk_update_rewrites_local_tables() {
        let mut network = Network::builder()
            .input_size(2)
            .dense_layers(&[2, 1])
            .unwrap();
        let mut solution = compiled(&network);

        for weight in &mut network.weight_table {
            *weight = 0.5;
        }
        WeightUpdater::update_solution_with_weights(&mut solution, &network).unwrap();

        // Freshly compiling the mutated network yields the same tiles
        assert_eq!(solution, compiled(&network));
    }

    #[test]
    fn test_single_weight_update_touches_owning_tile() {
        let mut network = Network::builder()
            .input_size(2)
            .dense_layers(&[2, 1])
            .unwrap();
        let mut solution = compiled(&network);

        // First synapse weight of neuron 0 sits right after its spike slot
        let weight_index = network.neuron_array[0].input_weights[0].starts as u32;
        network.weight_table[weight_index as usize] = -2.0;
        WeightUpdater::update_solution_with_weight(&mut solution, &network, weight_index).unwrap();

        assert_eq!(solution, compiled(&network));
    }

    #[test]
    fn test_out_of_range_weight_index_is_rejected() {
        let network = Network::builder()
            .input_size(2)
            .dense_layers(&[1])
            .unwrap();
        let mut solution = compiled(&network);
        let result =
            WeightUpdater::update_solution_with_weight(&mut solution, &network, 10_000);
        assert!(matches!(result, Err(SolveError::InvalidInput { .. })));
    }
}
