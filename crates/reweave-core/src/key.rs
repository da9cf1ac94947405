use crate::variable::{Variable, VariableList};
use smallvec::{SmallVec, smallvec};

type Segments = SmallVec<[u32; 2]>;

/// A tuple of variable values bit-packed into a fixed-width array of
/// 32-bit segments. Two keys are equal iff their segment arrays match
/// bit-for-bit; ordering and hashing are defined on the raw segments, so
/// sorting a table lexicographically and hashing projection keys need no
/// per-variable unpacking.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    segments: Segments,
}

impl Key {
    /// An all-zero key sized for the given variable list.
    pub fn zeroed(vars: &VariableList) -> Self {
        Self::with_segments(vars.segments())
    }

    pub fn with_segments(count: usize) -> Self {
        Key {
            segments: smallvec![0u32; count],
        }
    }

    /// Pack the given `(position, value)` pairs; unset variables are zero.
    pub fn build(vars: &VariableList, pairs: &[(usize, u32)]) -> Self {
        let mut key = Self::zeroed(vars);
        for &(position, value) in pairs {
            key.set(vars.get(position), value);
        }
        key
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Read one variable's value.
    #[inline]
    pub fn get(&self, var: &Variable) -> u32 {
        (self.segments[var.layout.segment] & var.layout.mask) >> var.layout.shift
    }

    /// Write one variable's value.
    #[inline]
    pub fn set(&mut self, var: &Variable, value: u32) {
        let seg = &mut self.segments[var.layout.segment];
        *seg = (*seg & !var.layout.mask) | ((value << var.layout.shift) & var.layout.mask);
    }

    /// Zero every bit outside the mask, yielding the projection key.
    #[inline]
    pub fn masked(&self, mask: &KeyMask) -> Key {
        let mut out = self.clone();
        for (seg, m) in out.segments.iter_mut().zip(mask.segments.iter()) {
            *seg &= m;
        }
        out
    }

    #[inline]
    pub fn mask_in_place(&mut self, mask: &KeyMask) {
        for (seg, m) in self.segments.iter_mut().zip(mask.segments.iter()) {
            *seg &= m;
        }
    }
}

/// Per-segment OR of a relation's variable masks. Applying it to a key
/// zeroes the segments and bit-ranges not belonging to the relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMask {
    segments: Segments,
}

impl KeyMask {
    /// Mask covering the given variable positions.
    pub fn for_positions(vars: &VariableList, positions: &[usize]) -> Self {
        let mut segments: Segments = smallvec![0u32; vars.segments()];
        for &p in positions {
            let layout = vars.get(p).layout;
            segments[layout.segment] |= layout.mask;
        }
        KeyMask { segments }
    }

    pub fn segments(&self) -> &[u32] {
        &self.segments
    }
}
