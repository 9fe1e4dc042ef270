//! Dependency-respecting neuron scheduler
//!
//! The router walks the network in its declared order and collects subsets
//! of neurons whose inputs are already available at the current time step.
//! Inputs reaching into the past and external inputs are always available;
//! a same-step internal input is available once its neuron is processed,
//! or, outside strict mode, once it sits earlier in the subset being
//! collected.

use crate::{CompileError, Result};
use srnn_model::{is_input_index, Network, SynapseIterator};
use std::collections::VecDeque;

/// Scheduling state of one neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NeuronState {
    /// Not yet picked by any subset
    Unvisited,
    /// Member of the subset currently being consumed
    InSubset,
    /// Confirmed solved; later neurons may depend on it
    Processed,
}

/// Walks a network and emits parallel-ready neuron subsets under a budget
#[derive(Debug)]
pub struct NeuronRouter<'a> {
    network: &'a Network,
    states: Vec<NeuronState>,
    subset: VecDeque<u32>,
    subset_size_bytes: usize,
}

impl<'a> NeuronRouter<'a> {
    /// Create a router over the given network
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            states: vec![NeuronState::Unvisited; network.neuron_count()],
            subset: VecDeque::new(),
            subset_size_bytes: 0,
        }
    }

    /// Whether every neuron has been processed
    pub fn finished(&self) -> bool {
        self.states
            .iter()
            .all(|&state| state == NeuronState::Processed)
    }

    /// Number of neurons currently in the subset
    pub fn subset_size(&self) -> usize {
        self.subset.len()
    }

    /// Estimated byte cost of the current subset
    pub fn subset_size_bytes(&self) -> usize {
        self.subset_size_bytes
    }

    /// The `n`-th neuron of the current subset
    pub fn subset_element(&self, n: usize) -> Option<u32> {
        self.subset.get(n).copied()
    }

    /// Head of the current subset
    pub fn get_first_neuron_index_from_subset(&self) -> Option<u32> {
        self.subset.front().copied()
    }

    /// Whether the given neuron is confirmed processed
    pub fn is_neuron_processed(&self, neuron_index: u32) -> bool {
        self.states[neuron_index as usize] == NeuronState::Processed
    }

    /// Whether the given neuron sits in the current subset
    pub fn is_neuron_in_subset(&self, neuron_index: u32) -> bool {
        self.states[neuron_index as usize] == NeuronState::InSubset
    }

    /// Whether every same-step internal input of the neuron is already
    /// accounted for: processed, or queued earlier in the current subset
    pub fn is_neuron_without_dependency(&self, neuron_index: u32) -> bool {
        let neuron = &self.network.neuron_array[neuron_index as usize];
        let mut satisfied = true;
        SynapseIterator::new(&neuron.input_indices).iterate_terminatable(|interval, index| {
            if interval.reach_past_loops == 0
                && !is_input_index(index)
                && self.states[index as usize] == NeuronState::Unvisited
            {
                satisfied = false;
            }
            satisfied
        });
        satisfied
    }

    fn is_eligible(&self, neuron_index: usize, strict: bool) -> bool {
        let neuron = &self.network.neuron_array[neuron_index];
        let mut eligible = true;
        SynapseIterator::new(&neuron.input_indices).iterate_terminatable(|interval, index| {
            if interval.reach_past_loops == 0 && !is_input_index(index) {
                eligible = match self.states[index as usize] {
                    NeuronState::Processed => true,
                    NeuronState::InSubset => !strict,
                    NeuronState::Unvisited => false,
                };
            }
            eligible
        });
        eligible
    }

    /// Collect schedulable neurons into the subset.
    ///
    /// Scans the neuron array in repeated full passes, appending every
    /// eligible unvisited neuron. Collection stops mid-pass once the summed
    /// byte estimates reach `max_bytes`, and stops between passes once the
    /// subset holds at least `max_parallel` neurons, a pass added nothing,
    /// or `strict` is set (a strict pass cannot enable further neurons).
    ///
    /// Fails with [`CompileError::CyclicDependency`] when the subset is
    /// empty afterwards while unvisited neurons remain.
    pub fn collect_subset(
        &mut self,
        max_parallel: usize,
        max_bytes: usize,
        strict: bool,
    ) -> Result<()> {
        'passes: loop {
            let mut added = 0usize;
            for neuron_index in 0..self.network.neuron_count() {
                if self.subset_size_bytes >= max_bytes {
                    break 'passes;
                }
                if self.states[neuron_index] != NeuronState::Unvisited
                    || !self.is_eligible(neuron_index, strict)
                {
                    continue;
                }
                self.states[neuron_index] = NeuronState::InSubset;
                self.subset.push_back(neuron_index as u32);
                self.subset_size_bytes +=
                    self.network.neuron_array[neuron_index].estimated_size_bytes();
                added += 1;
            }
            if strict || added == 0 || self.subset.len() >= max_parallel {
                break;
            }
        }

        if self.subset.is_empty() && !self.finished() {
            let unvisited = self
                .states
                .iter()
                .filter(|&&state| state != NeuronState::Processed)
                .count();
            return Err(CompileError::CyclicDependency { unvisited });
        }
        Ok(())
    }

    /// Promote the subset head to processed and pop it.
    ///
    /// The caller names the neuron it confirmed; it must be the head.
    pub fn confirm_first_subset_element_processed(&mut self, neuron_index: u32) {
        debug_assert_eq!(self.subset.front(), Some(&neuron_index));
        if let Some(head) = self.subset.pop_front() {
            self.subset_size_bytes = self
                .subset_size_bytes
                .saturating_sub(self.network.neuron_array[head as usize].estimated_size_bytes());
            self.states[head as usize] = NeuronState::Processed;
        }
    }

    /// Drop the subset head back to unvisited and pop it
    pub fn confirm_first_subset_element_omitted(&mut self, neuron_index: u32) {
        debug_assert_eq!(self.subset.front(), Some(&neuron_index));
        if let Some(head) = self.subset.pop_front() {
            self.subset_size_bytes = self
                .subset_size_bytes
                .saturating_sub(self.network.neuron_array[head as usize].estimated_size_bytes());
            self.states[head as usize] = NeuronState::Unvisited;
        }
    }

    /// Demote every remaining subset member back to unvisited
    pub fn reset_remaining_subset(&mut self) {
        for &neuron_index in &self.subset {
            self.states[neuron_index as usize] = NeuronState::Unvisited;
        }
        self.subset.clear();
        self.subset_size_bytes = 0;
    }

    /// Demote every subset member not named in `kept` back to unvisited.
    ///
    /// Used when a row grows a second tile: the kept members stay in the
    /// subset (they are placed but unconfirmed), everything else must be
    /// re-collected strictly so cross-tile independence holds within the
    /// row.
    pub fn reset_all_except(&mut self, kept: &[u32]) {
        self.subset.retain(|&neuron_index| {
            if kept.contains(&neuron_index) {
                true
            } else {
                self.states[neuron_index as usize] = NeuronState::Unvisited;
                false
            }
        });
        self.subset_size_bytes = self
            .subset
            .iter()
            .map(|&n| self.network.neuron_array[n as usize].estimated_size_bytes())
            .sum();
    }
}
