//! Evaluates one compute tile against one time step
//!
//! Solving a tile happens in two phases. The gather phase copies every
//! external reference (network inputs and earlier tiles' activations,
//! possibly from past loops) into a scratch lane, reading the ring buffer
//! only. The compute phase then writes the tile's own output slice of the
//! current activation row, reading nothing but the scratch lane, the tile's
//! private weight table, and the slice itself.

use crate::error::{Result, SolveError};
use crate::ringbuffer::ActivationRingbuffer;
use srnn_model::{
    input_index_from_synapse_index, is_input_index, CoreConfig, PartialSolution, SpikeFunction,
    SynapseInterval, SynapseIterator,
};

/// Solver over one borrowed [`PartialSolution`]
#[derive(Debug, Clone, Copy)]
pub struct PartialSolver<'a> {
    partial: &'a PartialSolution,
}

impl<'a> PartialSolver<'a> {
    /// Wrap a tile whose shape has already been validated
    pub fn new(partial: &'a PartialSolution) -> Self {
        Self { partial }
    }

    /// The tile under evaluation
    pub fn partial(&self) -> &'a PartialSolution {
        self.partial
    }

    /// Scratch elements one gather phase needs
    pub fn required_scratch_size(&self) -> usize {
        self.partial.input_element_count() as usize
    }

    /// Check every structural invariant of the tile.
    ///
    /// Run once per tile at engine construction; a violation here means the
    /// compiler produced an inconsistent plan.
    pub fn validate(&self, memory_depth: u32, neuron_count: u32) -> Result<()> {
        let partial = self.partial;
        let inner_count = partial.internal_neuron_number as usize;
        if inner_count == 0 {
            return Err(SolveError::malformed_tile("tile computes no neurons"));
        }
        if partial.output_data.interval_size as usize != inner_count {
            return Err(SolveError::malformed_tile(
                "output range and internal neuron number disagree",
            ));
        }
        if partial.output_data.starts < 0
            || partial.output_data.starts as u32 + partial.output_data.interval_size > neuron_count
        {
            return Err(SolveError::malformed_tile(
                "output range escapes the activation row",
            ));
        }
        if partial.neuron_transfer_functions.len() != inner_count
            || partial.spike_parameter_indices.len() != inner_count
            || partial.weight_synapse_counts.len() != inner_count
            || partial.index_synapse_counts.len() != inner_count
        {
            return Err(SolveError::malformed_tile(
                "per-neuron arrays disagree with the internal neuron number",
            ));
        }
        let weight_synapse_total: u32 = partial.weight_synapse_counts.iter().sum();
        let index_synapse_total: u32 = partial.index_synapse_counts.iter().sum();
        if weight_synapse_total as usize != partial.weight_indices.len()
            || index_synapse_total as usize != partial.inside_indices.len()
        {
            return Err(SolveError::malformed_tile(
                "flat synapse arrays disagree with the per-neuron counts",
            ));
        }

        for &spike_index in &partial.spike_parameter_indices {
            if spike_index as usize >= partial.weight_table.len() {
                return Err(SolveError::malformed_tile(
                    "spike parameter index escapes the local weight table",
                ));
            }
        }
        for interval in &partial.weight_indices {
            if interval.interval_size == 0
                || interval.starts < 0
                || interval.starts as usize + interval.interval_size as usize
                    > partial.weight_table.len()
            {
                return Err(SolveError::malformed_tile(
                    "weight synapse escapes the local weight table",
                ));
            }
        }
        for interval in &partial.input_data {
            if interval.interval_size == 0 {
                return Err(SolveError::malformed_tile("zero-sized tile input synapse"));
            }
            if interval.reach_past_loops >= memory_depth {
                return Err(SolveError::malformed_tile(
                    "tile input reaches past the retained memory depth",
                ));
            }
        }

        // Per neuron: enough weights for every input, and internal
        // references only to earlier inner neurons
        let input_span = partial.input_element_count();
        let mut weight_cursor = 0usize;
        let mut index_cursor = 0usize;
        for inner_index in 0..inner_count {
            let weight_count = partial.weight_synapse_counts[inner_index] as usize;
            let index_count = partial.index_synapse_counts[inner_index] as usize;
            let weight_elements: u32 = partial.weight_indices
                [weight_cursor..weight_cursor + weight_count]
                .iter()
                .map(|s| s.interval_size)
                .sum();
            let index_elements: u32 = partial.inside_indices
                [index_cursor..index_cursor + index_count]
                .iter()
                .map(|s| s.interval_size)
                .sum();
            if weight_elements < index_elements {
                return Err(SolveError::malformed_tile(format!(
                    "inner neuron {} has {} inputs but only {} weights",
                    inner_index, index_elements, weight_elements
                )));
            }
            for interval in &partial.inside_indices[index_cursor..index_cursor + index_count] {
                if interval.interval_size == 0 {
                    return Err(SolveError::malformed_tile("zero-sized inner synapse"));
                }
                if is_input_index(interval.starts) {
                    let deepest = interval
                        .last_index()
                        .map(input_index_from_synapse_index)
                        .unwrap_or(0);
                    if deepest >= input_span {
                        return Err(SolveError::malformed_tile(
                            "inner reference escapes the tile inputs",
                        ));
                    }
                } else if interval.starts as usize + interval.interval_size as usize > inner_index {
                    return Err(SolveError::malformed_tile(format!(
                        "inner neuron {} references a not yet computed neuron",
                        inner_index
                    )));
                }
            }
            weight_cursor += weight_count;
            index_cursor += index_count;
        }
        Ok(())
    }

    /// Gather phase: copy every tile input into the scratch lane.
    ///
    /// Reads the external input vector for input-convention references and
    /// the ring buffer for everything else, at the reference's past offset.
    pub fn gather_inputs(
        &self,
        input: &[f64],
        ring: &ActivationRingbuffer,
        scratch: &mut [f64],
    ) -> Result<()> {
        if scratch.len() < self.required_scratch_size() {
            return Err(SolveError::invalid_input(format!(
                "scratch lane of {} elements cannot hold {} tile inputs",
                scratch.len(),
                self.required_scratch_size()
            )));
        }

        let mut offset = 0usize;
        for interval in &self.partial.input_data {
            let size = interval.interval_size as usize;
            if is_input_index(interval.starts) {
                let first = input_index_from_synapse_index(interval.starts) as usize;
                if first + size > input.len() {
                    return Err(SolveError::invalid_input(format!(
                        "tile reads inputs {}..{} of an input vector of {}",
                        first,
                        first + size,
                        input.len()
                    )));
                }
                scratch[offset..offset + size].copy_from_slice(&input[first..first + size]);
            } else {
                let row = ring.past_row(interval.reach_past_loops)?;
                let first = interval.starts as usize;
                if first + size > row.len() {
                    return Err(SolveError::invalid_input(format!(
                        "tile reads activations {}..{} of a row of {}",
                        first,
                        first + size,
                        row.len()
                    )));
                }
                scratch[offset..offset + size].copy_from_slice(&row[first..first + size]);
            }
            offset += size;
        }
        Ok(())
    }

    /// Compute phase: produce every inner neuron's next activation.
    ///
    /// `out` is the tile's output slice of the current activation row,
    /// pre-seeded with the previous loop's values; the spike function reads
    /// its previous activation from there before overwriting it.
    pub fn compute(&self, config: &CoreConfig, scratch: &[f64], out: &mut [f64]) {
        let partial = self.partial;
        let mut weight_cursor = 0usize;
        let mut index_cursor = 0usize;

        for inner_index in 0..partial.internal_neuron_number as usize {
            let weight_count = partial.weight_synapse_counts[inner_index] as usize;
            let index_count = partial.index_synapse_counts[inner_index] as usize;
            let mut input_synapse = 0usize;
            let mut input_offset = 0u32;
            let mut combined = 0.0f64;

            SynapseIterator::new(
                &partial.weight_indices[weight_cursor..weight_cursor + weight_count],
            )
            .iterate_indices(|_, weight_index| {
                let input_value = if input_synapse < index_count {
                    let synapse = &partial.inside_indices[index_cursor + input_synapse];
                    let logical = synapse.nth_index(input_offset);
                    input_offset += 1;
                    if input_offset >= synapse.interval_size {
                        input_offset = 0;
                        input_synapse += 1;
                    }
                    if is_input_index(logical) {
                        scratch[input_index_from_synapse_index(logical) as usize]
                    } else {
                        out[logical as usize]
                    }
                } else {
                    // Surplus weights act as biases
                    1.0
                };
                combined += input_value * partial.weight_table[weight_index as usize];
            });

            let transferred =
                partial.neuron_transfer_functions[inner_index].value(config, combined);
            let spike_parameter =
                partial.weight_table[partial.spike_parameter_indices[inner_index] as usize];
            out[inner_index] =
                SpikeFunction::filter(spike_parameter, transferred, out[inner_index]);

            weight_cursor += weight_count;
            index_cursor += index_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srnn_model::{encode_input_index, IndexSynapseInterval, InputSynapseInterval,
        TransferFunction};

    /// Tile of two neurons: the first combines both tile inputs, the second
    /// reads the first internally. Weights are all one, biases zero.
    fn two_neuron_tile() -> PartialSolution {
        PartialSolution {
            internal_neuron_number: 2,
            output_data: IndexSynapseInterval::new(0, 2),
            input_data: vec![InputSynapseInterval::new(encode_input_index(0), 2)],
            // per neuron: [spike, w, w, bias] and [spike, w, bias]
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
        }
    }

    #[test]
    fn test_validate_accepts_consistent_tile() {
        let tile = two_neuron_tile();
        assert!(PartialSolver::new(&tile).validate(1, 2).is_ok());
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let mut tile = two_neuron_tile();
        // First neuron now references the second, which is computed later
        tile.inside_indices[0] = InputSynapseInterval::new(1, 1);
        let solver = PartialSolver::new(&tile);
        assert!(matches!(
            solver.validate(1, 2),
            Err(SolveError::MalformedTile { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_count_mismatch() {
        let mut tile = two_neuron_tile();
        tile.index_synapse_counts = vec![1];
        assert!(PartialSolver::new(&tile).validate(1, 2).is_err());

        let mut tile = two_neuron_tile();
        tile.weight_indices[1].interval_size = 0;
        assert!(PartialSolver::new(&tile).validate(1, 2).is_err());
    }

    #[test]
    fn test_validate_rejects_deep_reach() {
        let mut tile = two_neuron_tile();
        tile.input_data[0].reach_past_loops = 1;
        assert!(PartialSolver::new(&tile).validate(1, 2).is_err());
        assert!(PartialSolver::new(&tile).validate(2, 2).is_ok());
    }

    #[test]
    fn test_gather_and_compute() {
        let tile = two_neuron_tile();
        let solver = PartialSolver::new(&tile);
        let ring = ActivationRingbuffer::new(1, 2);
        let mut scratch = vec![0.0; solver.required_scratch_size()];
        let config = CoreConfig::default();

        solver
            .gather_inputs(&[10.0, 5.0], &ring, &mut scratch)
            .unwrap();
        assert_eq!(scratch, vec![10.0, 5.0]);

        let mut out = vec![0.0; 2];
        solver.compute(&config, &scratch, &mut out);
        // First neuron sums both inputs; the second passes it through
        assert_eq!(out, vec![15.0, 15.0]);
    }

    #[test]
    fn test_gather_rejects_short_input() {
        let tile = two_neuron_tile();
        let solver = PartialSolver::new(&tile);
        let ring = ActivationRingbuffer::new(1, 2);
        let mut scratch = vec![0.0; 2];
        let result = solver.gather_inputs(&[1.0], &ring, &mut scratch);
        assert!(matches!(result, Err(SolveError::InvalidInput { .. })));
    }

    #[test]
    fn test_gather_reads_past_activations() {
        let mut tile = two_neuron_tile();
        tile.input_data = vec![InputSynapseInterval::reaching_back(0, 2, 1)];
        let solver = PartialSolver::new(&tile);

        let mut ring = ActivationRingbuffer::new(2, 2);
        ring.step();
        ring.set_element(0, 0, 3.0).unwrap();
        ring.set_element(0, 1, 4.0).unwrap();
        ring.step();

        let mut scratch = vec![0.0; 2];
        solver.gather_inputs(&[], &ring, &mut scratch).unwrap();
        assert_eq!(scratch, vec![3.0, 4.0]);
    }

    #[test]
    fn test_spike_parameter_filters_output() {
        let mut tile = two_neuron_tile();
        // Second neuron keeps half of its previous activation
        tile.weight_table[4] = 0.5;
        let solver = PartialSolver::new(&tile);
        let config = CoreConfig::default();
        let scratch = vec![10.0, 5.0];

        let mut out = vec![0.0, 8.0];
        solver.compute(&config, &scratch, &mut out);
        // transfer output 15, previous 8: 8·0.5 + 15·0.5
        assert_eq!(out[1], 11.5);
    }

    #[test]
    fn test_input_collection_across_partitions() {
        // Ten relay neurons whose tile inputs arrive as four separate
        // partitions of the input vector; each neuron must receive exactly
        // its own input back
        let inputs = vec![1.9, 2.8, 3.7, 4.6, 5.5, 6.4, 7.3, 8.2, 9.1, 10.0];
        let tile = PartialSolution {
            internal_neuron_number: 10,
            output_data: IndexSynapseInterval::new(0, 10),
            input_data: vec![
                InputSynapseInterval::new(encode_input_index(0), 3),
                InputSynapseInterval::new(encode_input_index(3), 3),
                InputSynapseInterval::new(encode_input_index(6), 2),
                InputSynapseInterval::new(encode_input_index(8), 2),
            ],
            // shared spike parameter slot and one unit weight per neuron
            weight_table: std::iter::once(0.0)
                .chain(std::iter::repeat(1.0).take(10))
                .collect(),
            neuron_transfer_functions: vec![TransferFunction::Identity; 10],
            spike_parameter_indices: vec![0; 10],
            weight_synapse_counts: vec![1; 10],
            index_synapse_counts: vec![1; 10],
            inside_indices: (0..10)
                .map(|i| InputSynapseInterval::new(encode_input_index(i), 1))
                .collect(),
            weight_indices: (0..10)
                .map(|i| IndexSynapseInterval::new(1 + i, 1))
                .collect(),
        };
        let solver = PartialSolver::new(&tile);
        assert!(solver.validate(1, 10).is_ok());

        let ring = ActivationRingbuffer::new(1, 10);
        let mut scratch = vec![0.0; solver.required_scratch_size()];
        solver.gather_inputs(&inputs, &ring, &mut scratch).unwrap();

        let config = CoreConfig::default();
        let mut out = vec![0.0; 10];
        solver.compute(&config, &scratch, &mut out);
        assert_eq!(out, inputs);
    }

    #[test]
    fn test_bias_only_neuron() {
        let tile = PartialSolution {
            internal_neuron_number: 1,
            output_data: IndexSynapseInterval::new(0, 1),
            input_data: Vec::new(),
            weight_table: vec![0.0, 2.5],
            neuron_transfer_functions: vec![TransferFunction::Identity],
            spike_parameter_indices: vec![0],
            weight_synapse_counts: vec![1],
            index_synapse_counts: vec![0],
            inside_indices: Vec::new(),
            weight_indices: vec![IndexSynapseInterval::new(1, 1)],
        };
        let solver = PartialSolver::new(&tile);
        assert!(solver.validate(1, 1).is_ok());

        let config = CoreConfig::default();
        let mut out = vec![0.0];
        solver.compute(&config, &[], &mut out);
        // spike(transfer(weight · 1.0), previous) with spike parameter zero
        assert_eq!(out[0], 2.5);
    }
}
