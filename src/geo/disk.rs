use std::collections::HashSet;

use h3o::CellIndex;

use super::{GeoError, MAX_RING_COUNT};

/// All cells within `k` rings of `origin`, origin included.
///
/// Breadth-first expansion over cell adjacency: every cell has six
/// neighbors (five for the twelve pentagons), each cell is visited once,
/// and the traversal stops at hop-distance `k`. Away from pentagon
/// distortion the result holds exactly `3k² + 3k + 1` cells; disks touching
/// a pentagon undercount.
///
/// Ring counts are bounded upstream by the ring estimator, so a `k` above
/// [`MAX_RING_COUNT`] here is a caller bug and fails with
/// [`GeoError::InvalidRingCount`].
pub fn disk(origin: CellIndex, k: u32) -> Result<HashSet<CellIndex>, GeoError> {
    if k > MAX_RING_COUNT {
        return Err(GeoError::InvalidRingCount(k));
    }

    let mut visited = HashSet::with_capacity((3 * k * k + 3 * k + 1) as usize);
    visited.insert(origin);

    let mut frontier = vec![origin];
    for _ in 0..k {
        let mut next = Vec::with_capacity(frontier.len() + 6);
        for cell in frontier {
            for neighbor in cell.grid_disk_safe(1) {
                if visited.insert(neighbor) {
                    next.push(neighbor);
                }
            }
        }
        frontier = next;
    }

    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{RESOLUTION, cell_of};

    fn origin() -> CellIndex {
        cell_of(12.9716, 77.5946, RESOLUTION).unwrap()
    }

    #[test]
    fn zero_rings_is_just_the_origin() {
        assert_eq!(disk(origin(), 0).unwrap(), HashSet::from([origin()]));
    }

    #[test]
    fn origin_is_always_a_member() {
        for k in 0..5 {
            assert!(disk(origin(), k).unwrap().contains(&origin()));
        }
    }

    #[test]
    fn disks_grow_monotonically() {
        let mut previous = HashSet::new();
        for k in 0..6 {
            let current = disk(origin(), k).unwrap();
            assert!(previous.is_subset(&current), "disk shrank at k={k}");
            previous = current;
        }
    }

    #[test]
    fn hexagon_disk_has_closed_form_size() {
        for k in 0..8u32 {
            let expected = (3 * k * k + 3 * k + 1) as usize;
            assert_eq!(disk(origin(), k).unwrap().len(), expected, "at k={k}");
        }
    }

    #[test]
    fn all_members_share_the_origin_resolution() {
        for cell in disk(origin(), 3).unwrap() {
            assert_eq!(cell.resolution(), RESOLUTION);
        }
    }

    #[test]
    fn pentagon_disk_undercounts() {
        // Resolution-0 cell over base cell 4, one of the twelve pentagons.
        let pentagon = CellIndex::try_from(0x8009fffffffffff).unwrap();
        assert!(pentagon.is_pentagon());

        // Five neighbors instead of six.
        assert_eq!(disk(pentagon, 1).unwrap().len(), 6);
        assert!(disk(pentagon, 2).unwrap().len() < 19);
    }

    #[test]
    fn ring_count_above_ceiling_is_an_invariant_violation() {
        assert_eq!(
            disk(origin(), MAX_RING_COUNT + 1),
            Err(GeoError::InvalidRingCount(MAX_RING_COUNT + 1))
        );
    }
}
