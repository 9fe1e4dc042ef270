//! Packs neurons into one self-contained compute tile
//!
//! Adding a neuron copies its spike parameter and weights into the tile's
//! private weight table, rewrites its input references into tile-local
//! coordinates, and run-length coalesces adjacent references as they are
//! emitted. The coalescing bookkeeping lives in a stack value created per
//! added neuron.

use crate::{CompileError, Result};
use srnn_model::{
    encode_input_index, is_input_index, IndexSynapseInterval, InputSynapseInterval, Network,
    PartialSolution, SynapseInterval, SynapseIterator,
};

/// Where the previously emitted inner reference pointed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputSource {
    None,
    Internal,
    External,
}

/// Coalescing state for the one neuron currently being packed
#[derive(Debug)]
struct NeuronPacking {
    /// Open run length in `inside_indices`; zero means the run is closed
    neuron_run: u32,
    /// Open run length in `input_data`; zero means the run is closed
    input_run: u32,
    /// Source kind of the previous inner reference
    previous_source: InputSource,
    /// Position of the previous inner reference within its source
    previous_index: i64,
}

/// Builds one [`PartialSolution`] by adding network neurons to it
#[derive(Debug)]
pub struct PartialSolutionBuilder<'a> {
    network: &'a Network,
    partial: PartialSolution,
}

impl<'a> PartialSolutionBuilder<'a> {
    /// Start an empty tile over the given network
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            partial: PartialSolution::default(),
        }
    }

    /// The tile as packed so far
    pub fn partial(&self) -> &PartialSolution {
        &self.partial
    }

    /// Network neuron index the next added neuron must have, if the tile
    /// already computes a range
    pub fn next_output_index(&self) -> Option<u32> {
        match self.partial.internal_neuron_number {
            0 => None,
            count => Some(self.partial.output_start() + count),
        }
    }

    /// Estimated tile footprint if the given neuron were added
    pub fn size_with(&self, neuron_index: u32) -> usize {
        self.partial.estimated_size_bytes()
            + self.network.neuron_array[neuron_index as usize].estimated_size_bytes()
    }

    /// Close the tile. Returns `None` when no neuron was ever added.
    pub fn finish(mut self) -> Option<PartialSolution> {
        if self.partial.internal_neuron_number == 0 {
            return None;
        }
        while matches!(self.partial.input_data.last(), Some(last) if last.interval_size == 0) {
            self.partial.input_data.pop();
        }
        Some(self.partial)
    }

    /// Add one network neuron to the tile.
    ///
    /// Returns the deepest `reach_past_loops` observed among the neuron's
    /// inputs so the caller can size the ring buffer.
    pub fn add_neuron_to_partial(&mut self, neuron_index: u32) -> Result<u32> {
        let neuron = self
            .network
            .neuron_array
            .get(neuron_index as usize)
            .ok_or_else(|| {
                CompileError::malformed_network(format!(
                    "neuron index {} is out of bounds of the neuron array",
                    neuron_index
                ))
            })?;

        if self.partial.internal_neuron_number == 0 {
            self.partial.output_data.starts = neuron_index as i32;
        }
        debug_assert!(
            self.next_output_index().is_none()
                || self.next_output_index() == Some(neuron_index),
            "tile output ranges grow by consecutive neuron indices"
        );
        self.partial.output_data.interval_size += 1;
        self.partial.internal_neuron_number += 1;

        // Neuron parameters: transfer function and normalised spike parameter
        self.partial
            .neuron_transfer_functions
            .push(neuron.transfer_function);
        self.partial
            .spike_parameter_indices
            .push(self.partial.weight_table.len() as u32);
        self.partial.weight_table.push(
            neuron.spike_function.normalized_parameter(
                self.network.weight_table[neuron.spike_parameter_weight_index as usize],
            ),
        );

        // Copy the neuron's weights into the local table, one local range
        // per source synapse
        self.partial
            .weight_synapse_counts
            .push(neuron.input_weights.len() as u32);
        for weight_synapse in &neuron.input_weights {
            self.partial.weight_indices.push(IndexSynapseInterval::new(
                self.partial.weight_table.len() as i32,
                weight_synapse.interval_size,
            ));
            for n in 0..weight_synapse.interval_size {
                let weight_index = weight_synapse.nth_index(n) as usize;
                self.partial
                    .weight_table
                    .push(self.network.weight_table[weight_index]);
            }
        }

        // Rewrite the input references into tile-local coordinates
        let mut packing = NeuronPacking {
            neuron_run: 0,
            input_run: 0,
            previous_source: InputSource::None,
            previous_index: self.input_data_element_count() as i64,
        };
        let inside_count_before = self.partial.inside_indices.len();
        let mut max_reach_back = 0u32;

        SynapseIterator::new(&neuron.input_indices).iterate(
            |interval| {
                if interval.reach_past_loops > max_reach_back {
                    max_reach_back = interval.reach_past_loops;
                }
            },
            |interval, input_index| {
                self.map_neuron_input(input_index, interval.reach_past_loops, &mut packing);
            },
        );

        self.partial
            .index_synapse_counts
            .push((self.partial.inside_indices.len() - inside_count_before) as u32);

        if matches!(self.partial.input_data.last(), Some(last) if last.interval_size == 0) {
            self.partial.input_data.pop();
        }

        Ok(max_reach_back)
    }

    /// Route one input reference: tile input, already-computed inner
    /// neuron, or a freshly opened tile input
    fn map_neuron_input(&mut self, input_index: i32, reach_back: u32, packing: &mut NeuronPacking) {
        if self.look_for_neuron_input(input_index, reach_back, packing) {
            return;
        }
        if reach_back == 0 && self.look_for_neuron_input_internally(input_index, packing) {
            return;
        }

        // The reference escapes the tile: extend or open an input_data run
        if packing.input_run > 0 {
            let last_index = SynapseIterator::new(&self.partial.input_data)
                .back()
                .unwrap_or(0);
            let last_reach = self
                .partial
                .input_data
                .last()
                .map(|s| s.reach_past_loops)
                .unwrap_or(0);
            let contiguous = if is_input_index(input_index) {
                last_index == input_index + 1
            } else {
                last_index == input_index - 1
            };
            if !contiguous || last_reach != reach_back {
                packing.input_run = 0;
            }
        }
        if packing.neuron_run > 0
            && (packing.previous_source != InputSource::External
                || self.input_data_element_count() as i64 - 1 != packing.previous_index)
        {
            packing.neuron_run = 0;
        }

        let position = self.input_data_element_count();
        packing.previous_index = position as i64;
        packing.previous_source = InputSource::External;
        let run = packing.neuron_run;
        packing.neuron_run = Self::add_to_synapse(
            encode_input_index(position),
            0,
            run,
            &mut self.partial.inside_indices,
        );
        let run = packing.input_run;
        packing.input_run = Self::add_to_synapse(
            input_index,
            reach_back,
            run,
            &mut self.partial.input_data,
        );
    }

    /// Look for the reference among the tile's existing inputs; on a hit,
    /// emit an inner reference to that input position
    fn look_for_neuron_input(
        &mut self,
        input_index: i32,
        reach_back: u32,
        packing: &mut NeuronPacking,
    ) -> bool {
        let mut position = 0u32;
        let mut found = false;
        SynapseIterator::new(&self.partial.input_data).iterate_terminatable(
            |interval, candidate| {
                if candidate == input_index && interval.reach_past_loops == reach_back {
                    found = true;
                    return false;
                }
                position += 1;
                true
            },
        );
        if !found {
            return false;
        }

        if packing.neuron_run > 0
            && (packing.previous_source != InputSource::External
                || position as i64 - 1 != packing.previous_index)
        {
            packing.neuron_run = 0;
        }
        packing.previous_index = position as i64;
        packing.previous_source = InputSource::External;
        let run = packing.neuron_run;
        packing.neuron_run = Self::add_to_synapse(
            encode_input_index(position),
            0,
            run,
            &mut self.partial.inside_indices,
        );
        true
    }

    /// Look for the reference among the tile's own neurons; on a hit, emit
    /// an inner reference to that inner index
    fn look_for_neuron_input_internally(
        &mut self,
        input_index: i32,
        packing: &mut NeuronPacking,
    ) -> bool {
        if !self.partial.output_data.contains(input_index) {
            return false;
        }
        let inner_index = (input_index - self.partial.output_data.starts) as u32;
        if packing.neuron_run > 0
            && (packing.previous_source != InputSource::Internal
                || inner_index as i64 - 1 != packing.previous_index)
        {
            packing.neuron_run = 0;
        }
        packing.previous_index = inner_index as i64;
        packing.previous_source = InputSource::Internal;
        let run = packing.neuron_run;
        packing.neuron_run = Self::add_to_synapse(
            inner_index as i32,
            0,
            run,
            &mut self.partial.inside_indices,
        );
        true
    }

    /// Append an index to an interval list, extending the open run or
    /// opening a fresh interval. Returns the new run length.
    fn add_to_synapse(
        index: i32,
        reach_back: u32,
        current_run: u32,
        intervals: &mut Vec<InputSynapseInterval>,
    ) -> u32 {
        if current_run > 0 {
            if let Some(last) = intervals.last_mut() {
                last.interval_size = current_run + 1;
                return current_run + 1;
            }
        }
        intervals.push(InputSynapseInterval::reaching_back(index, 1, reach_back));
        1
    }

    fn input_data_element_count(&self) -> u32 {
        self.partial
            .input_data
            .iter()
            .map(|s| s.interval_size)
            .sum()
    }
}
