use smallvec::SmallVec;

/// Integer coordinates of a grid cell, one component per configuration-space
/// axis. Hashable so cells can be stored sparsely in a map instead of a
/// dense array sized by the product of every axis's cell count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellCoord {
    axes: SmallVec<[i64; 6]>,
}

impl CellCoord {
    pub fn new(axes: &[i64]) -> CellCoord {
        CellCoord { axes: SmallVec::from_slice(axes) }
    }

    pub fn axis(&self, i: usize) -> i64 {
        self.axes[i]
    }

    pub fn set_axis(&mut self, i: usize, value: i64) {
        self.axes[i] = value;
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equal_coords_hash_equal() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let a = CellCoord::new(&[1, 2, 3]);
        let b = CellCoord::new(&[1, 2, 3]);
        assert_eq!(a, b);

        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn set_axis_updates_only_that_axis() {
        let mut c = CellCoord::new(&[1, 2, 3]);
        c.set_axis(1, 9);
        assert_eq!(c.axis(0), 1);
        assert_eq!(c.axis(1), 9);
        assert_eq!(c.axis(2), 3);
    }
}
