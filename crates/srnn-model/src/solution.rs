//! Compiled plan schemas: the solution and its compute tiles

use crate::synapse::{IndexSynapseInterval, InputSynapseInterval};
use crate::transfer::TransferFunction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One self-contained compute tile of a compiled solution.
///
/// A tile evaluates the contiguous neuron range `output_data`, reading only
/// its `input_data` references and its private `weight_table` copy. The
/// four positional arrays hold one entry per inner neuron;
/// `inside_indices` and `weight_indices` are flat, in inner-neuron order.
/// Inner references in `inside_indices` always point to an earlier inner
/// neuron of the same tile.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartialSolution {
    /// Number of neurons this tile computes
    pub internal_neuron_number: u32,
    /// The contiguous network-neuron range this tile computes
    pub output_data: IndexSynapseInterval,
    /// External references: network inputs or neurons of earlier tiles
    pub input_data: Vec<InputSynapseInterval>,
    /// Private copy of every weight scalar the tile's neurons use
    pub weight_table: Vec<f64>,
    /// Per inner neuron: transfer function
    pub neuron_transfer_functions: Vec<TransferFunction>,
    /// Per inner neuron: local weight-table index of the spike parameter
    pub spike_parameter_indices: Vec<u32>,
    /// Per inner neuron: number of entries in `weight_indices`
    pub weight_synapse_counts: Vec<u32>,
    /// Per inner neuron: number of entries in `inside_indices`
    pub index_synapse_counts: Vec<u32>,
    /// Flat input references in tile-local coordinates: the input convention
    /// references positions of the flattened `input_data`, non-negative
    /// values reference earlier inner neurons
    pub inside_indices: Vec<InputSynapseInterval>,
    /// Flat ranges into the local `weight_table`, per inner neuron
    pub weight_indices: Vec<IndexSynapseInterval>,
}

impl PartialSolution {
    /// First network neuron index of the tile's output range
    pub fn output_start(&self) -> u32 {
        self.output_data.starts as u32
    }

    /// Whether the given network neuron is computed by this tile
    pub fn contains_neuron(&self, neuron_index: u32) -> bool {
        self.output_data.contains(neuron_index as i32)
    }

    /// Total number of external input elements the tile gathers per step
    pub fn input_element_count(&self) -> u32 {
        self.input_data.iter().map(|s| s.interval_size).sum()
    }

    /// Packed byte footprint, used to budget tiles against
    /// `device_max_bytes` during compilation
    pub fn estimated_size_bytes(&self) -> usize {
        use std::mem::size_of;
        self.weight_table.len() * size_of::<f64>()
            + self.input_data.len() * size_of::<InputSynapseInterval>()
            + self.inside_indices.len() * size_of::<InputSynapseInterval>()
            + self.weight_indices.len() * size_of::<IndexSynapseInterval>()
            + self.neuron_transfer_functions.len() * size_of::<TransferFunction>()
            + (self.spike_parameter_indices.len()
                + self.weight_synapse_counts.len()
                + self.index_synapse_counts.len())
                * size_of::<u32>()
            + size_of::<Self>()
    }
}

/// A compiled plan: a row-major matrix of tiles.
///
/// Tiles of one row are independent of each other; row `r+1` may read row
/// `r`'s results at the current time step. `cols[r]` gives the number of
/// tiles in row `r`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Solution {
    /// Number of neurons of the source network
    pub neuron_number: u32,
    /// Number of trailing neurons forming the network output
    pub output_neuron_number: u32,
    /// Ring-buffer depth required to evaluate the plan
    pub network_memory_length: u32,
    /// Tile count per row
    pub cols: Vec<u32>,
    /// The tiles, row-major
    pub partial_solutions: Vec<PartialSolution>,
}

impl Solution {
    /// Number of rows in the plan
    pub fn rows(&self) -> usize {
        self.cols.len()
    }

    /// Index into `partial_solutions` where the given row starts
    pub fn row_start(&self, row: usize) -> usize {
        self.cols[..row].iter().map(|&c| c as usize).sum()
    }

    /// The tiles of one row
    pub fn partials_of_row(&self, row: usize) -> &[PartialSolution] {
        let start = self.row_start(row);
        &self.partial_solutions[start..start + self.cols[row] as usize]
    }

    /// Largest external-input span over all tiles; the scratch lane size
    /// the engine provisions per worker
    pub fn required_scratch_size(&self) -> usize {
        self.partial_solutions
            .iter()
            .map(|partial| partial.input_element_count() as usize)
            .max()
            .unwrap_or(0)
    }
}
