//! The dihedral group of the square.
//!
//! Patterns are canonicalized up to rotation, reflection, and translation.
//! Transforms act on relative (row, col) pairs around the origin; the
//! matcher derives the translation separately, so board size only matters
//! when transforming absolute board states (tests, symmetry closure).

/// The 8 symmetries of the square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum D4 {
    Identity,
    Rot90,
    Rot180,
    Rot270,
    FlipHorizontal,
    FlipVertical,
    FlipMain,
    FlipAnti,
}

impl D4 {
    /// All 8 elements, identity first.
    pub const ALL: [D4; 8] = [
        D4::Identity,
        D4::Rot90,
        D4::Rot180,
        D4::Rot270,
        D4::FlipHorizontal,
        D4::FlipVertical,
        D4::FlipMain,
        D4::FlipAnti,
    ];

    /// Apply to a relative coordinate around the origin.
    #[inline]
    pub fn apply_rel(self, (r, c): (i32, i32)) -> (i32, i32) {
        match self {
            D4::Identity => (r, c),
            D4::Rot90 => (c, -r),
            D4::Rot180 => (-r, -c),
            D4::Rot270 => (-c, r),
            D4::FlipHorizontal => (r, -c),
            D4::FlipVertical => (-r, c),
            D4::FlipMain => (c, r),
            D4::FlipAnti => (-c, -r),
        }
    }

    /// Apply to an absolute board coordinate on an n×n grid.
    #[inline]
    pub fn apply(self, (r, c): (usize, usize), n: usize) -> (usize, usize) {
        let m = n - 1;
        match self {
            D4::Identity => (r, c),
            D4::Rot90 => (c, m - r),
            D4::Rot180 => (m - r, m - c),
            D4::Rot270 => (m - c, r),
            D4::FlipHorizontal => (r, m - c),
            D4::FlipVertical => (m - r, c),
            D4::FlipMain => (c, r),
            D4::FlipAnti => (m - c, m - r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity() {
        assert_eq!(D4::Identity.apply((2, 3), 10), (2, 3));
    }

    #[test]
    fn test_rot90_absolute() {
        // 90° rotation maps (r, c) to (c, n-1-r)
        assert_eq!(D4::Rot90.apply((0, 0), 4), (0, 3));
        assert_eq!(D4::Rot90.apply((0, 3), 4), (3, 3));
        assert_eq!(D4::Rot90.apply((3, 3), 4), (3, 0));
        assert_eq!(D4::Rot90.apply((3, 0), 4), (0, 0));
    }

    #[test]
    fn test_four_rotations_cycle() {
        let mut p = (1, 2);
        for _ in 0..4 {
            p = D4::Rot90.apply(p, 5);
        }
        assert_eq!(p, (1, 2));
    }

    #[test]
    fn test_transforms_are_permutations() {
        for t in D4::ALL {
            let mut seen = HashSet::new();
            for r in 0..5 {
                for c in 0..5 {
                    seen.insert(t.apply((r, c), 5));
                }
            }
            assert_eq!(seen.len(), 25, "{:?} is not a bijection", t);
        }
    }

    #[test]
    fn test_relative_orbits_have_eight_or_fewer_images() {
        let pts = [(0, 0), (0, 3), (3, 0)];
        let mut images = HashSet::new();
        for t in D4::ALL {
            let mut mapped: Vec<(i32, i32)> = pts.iter().map(|&p| t.apply_rel(p)).collect();
            mapped.sort_unstable();
            images.insert(mapped);
        }
        assert!(images.len() <= 8);
    }
}
