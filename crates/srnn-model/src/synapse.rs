//! Run-length encoded synapse intervals and the external-input convention
//!
//! A synapse interval names a contiguous range of index references: into the
//! weight table, into the neuron array, or, through the external-input
//! convention, into the network's input vector. A negative `starts` field
//! encodes an input reference: input index `i` is stored as `-(i + 1)`, so
//! logical indices inside such an interval step downwards.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Returns true when a logical index refers to the network input vector
pub const fn is_input_index(index: i32) -> bool {
    index < 0
}

/// Decode an input-convention index into the referenced input position
pub const fn input_index_from_synapse_index(index: i32) -> u32 {
    (-index - 1) as u32
}

/// Encode an input position into the input-convention index
pub const fn encode_input_index(input_index: u32) -> i32 {
    -(input_index as i32) - 1
}

/// Common surface of the run-length encoded interval flavours
pub trait SynapseInterval {
    /// First logical index covered by the interval
    fn starts(&self) -> i32;

    /// Number of elements covered; stored intervals never have size zero
    fn interval_size(&self) -> u32;

    /// Time steps into the past the referenced data lives; zero for the
    /// plain index flavour
    fn reach_past_loops(&self) -> u32 {
        0
    }

    /// Logical index of the `n`-th element. Input-convention intervals step
    /// downwards, everything else steps upwards.
    fn nth_index(&self, n: u32) -> i32 {
        let starts = self.starts();
        if is_input_index(starts) {
            starts - n as i32
        } else {
            starts + n as i32
        }
    }

    /// Logical index of the last covered element, or `None` for an empty
    /// interval
    fn last_index(&self) -> Option<i32> {
        match self.interval_size() {
            0 => None,
            size => Some(self.nth_index(size - 1)),
        }
    }
}

/// A contiguous range of weight-table or neuron indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexSynapseInterval {
    /// First covered index
    pub starts: i32,
    /// Number of covered indices
    pub interval_size: u32,
}

impl IndexSynapseInterval {
    /// Create a new interval
    pub const fn new(starts: i32, interval_size: u32) -> Self {
        Self {
            starts,
            interval_size,
        }
    }

    /// Whether the given index falls inside this interval
    pub fn contains(&self, index: i32) -> bool {
        index >= self.starts && index < self.starts + self.interval_size as i32
    }
}

impl SynapseInterval for IndexSynapseInterval {
    fn starts(&self) -> i32 {
        self.starts
    }

    fn interval_size(&self) -> u32 {
        self.interval_size
    }
}

/// A contiguous range of input references, reaching `reach_past_loops`
/// time steps into the past
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputSynapseInterval {
    /// First covered index; negative values follow the input convention
    pub starts: i32,
    /// Number of covered indices
    pub interval_size: u32,
    /// Time steps into the past to read the referenced data from
    pub reach_past_loops: u32,
}

impl InputSynapseInterval {
    /// Create a new interval reading from the current time step
    pub const fn new(starts: i32, interval_size: u32) -> Self {
        Self {
            starts,
            interval_size,
            reach_past_loops: 0,
        }
    }

    /// Create a new interval reading from `reach_past_loops` steps back
    pub const fn reaching_back(starts: i32, interval_size: u32, reach_past_loops: u32) -> Self {
        Self {
            starts,
            interval_size,
            reach_past_loops,
        }
    }
}

impl SynapseInterval for InputSynapseInterval {
    fn starts(&self) -> i32 {
        self.starts
    }

    fn interval_size(&self) -> u32 {
        self.interval_size
    }

    fn reach_past_loops(&self) -> u32 {
        self.reach_past_loops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_convention_roundtrip() {
        for input_index in 0..64u32 {
            let encoded = encode_input_index(input_index);
            assert!(is_input_index(encoded));
            assert_eq!(input_index_from_synapse_index(encoded), input_index);
        }
        assert!(!is_input_index(0));
        assert_eq!(encode_input_index(0), -1);
        assert_eq!(encode_input_index(4), -5);
    }

    #[test]
    fn test_index_interval_walk() {
        let interval = IndexSynapseInterval::new(7, 3);
        assert_eq!(interval.nth_index(0), 7);
        assert_eq!(interval.nth_index(2), 9);
        assert_eq!(interval.last_index(), Some(9));
        assert!(interval.contains(8));
        assert!(!interval.contains(10));
    }

    #[test]
    fn test_input_interval_walks_downwards() {
        // inputs 3,4,5 encode as -4,-5,-6
        let interval = InputSynapseInterval::new(encode_input_index(3), 3);
        assert_eq!(interval.nth_index(0), -4);
        assert_eq!(interval.nth_index(2), -6);
        assert_eq!(
            input_index_from_synapse_index(interval.last_index().unwrap()),
            5
        );
    }

    #[test]
    fn test_empty_interval_has_no_last_index() {
        let interval = IndexSynapseInterval::new(3, 0);
        assert_eq!(interval.last_index(), None);
    }
}
