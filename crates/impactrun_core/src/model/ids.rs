//! Dense identifiers for model entities
//!
//! Every id is an index into an arena owned by the compiled model, so lookups
//! are plain slice indexing and ids can be freely copied across threads.

use serde::{Deserialize, Serialize};

/// Index of a node in the impact tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index of an impact indicator across the whole tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndicatorId(pub u16);

/// Index of a registered parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamId(pub u16);

/// Slot of a formula variable (a float parameter or one enum indicator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl IndicatorId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ParamId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
