//! Occurrence bounds for particles
//!
//! minOccurs/maxOccurs constraints shared by the schema model and the
//! typecode marshaling contract.

use crate::error::{Result, SchemaError};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
///
/// None for max means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if this particle can be absent (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if the particle can occur more than once
    pub fn is_multiple(&self) -> bool {
        !self.is_single() && self.max != Some(0)
    }

    /// Check if an occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if an occurrence count exceeds the maximum
    pub fn is_exceeded(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count > max,
            None => false,
        }
    }

    /// Check whether a count lies within `[min, max]`
    pub fn contains(&self, count: u32) -> bool {
        !self.is_missing(count) && !self.is_exceeded(count)
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

/// Parse minOccurs/maxOccurs attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        occurs.min = min_str.parse::<u32>().map_err(|_| {
            SchemaError::new("minOccurs value is not a valid non-negative integer")
        })?;
    }

    match max_occurs {
        Some("unbounded") => occurs.max = None,
        Some(max_str) => {
            let max = max_str.parse::<u32>().map_err(|_| {
                SchemaError::new("maxOccurs value must be a non-negative integer or 'unbounded'")
            })?;
            if occurs.min > max {
                return Err(
                    SchemaError::new("maxOccurs must be 'unbounded' or at least minOccurs").into(),
                );
            }
            occurs.max = Some(max);
        }
        None => {
            if occurs.min > 1 {
                return Err(
                    SchemaError::new("minOccurs must be lesser or equal than maxOccurs").into(),
                );
            }
        }
    }

    Ok(occurs)
}
