//! Per-segment occupancy grids recording which placement cells are reserved.

use std::collections::BTreeMap;

use lane_runner_core::{CellCoord, Footprint, PlacementError, SegmentId};

/// Dense boolean occupancy grids keyed by segment.
///
/// An entry exists exactly for the lifetime of its segment: it is created at
/// generation time and fully removed at recycle time. Reservation strictly
/// separates validation from commit so no partial footprint is ever visible.
#[derive(Debug)]
pub(crate) struct SegmentGrids {
    cells_per_segment: u32,
    lane_count: u32,
    grids: BTreeMap<SegmentId, Vec<bool>>,
}

impl SegmentGrids {
    pub(crate) fn new(cells_per_segment: u32, lane_count: u32) -> Self {
        Self {
            cells_per_segment,
            lane_count,
            grids: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, segment: SegmentId) {
        let capacity = self.cells_per_segment as usize * self.lane_count as usize;
        let _ = self.grids.insert(segment, vec![false; capacity]);
    }

    /// Drops all occupancy state for a segment. Idempotent.
    pub(crate) fn release(&mut self, segment: SegmentId) {
        let _ = self.grids.remove(&segment);
    }

    pub(crate) fn reserve(
        &mut self,
        segment: SegmentId,
        footprint: &Footprint,
    ) -> Result<(), PlacementError> {
        let cells_per_segment = self.cells_per_segment;
        let lane_count = self.lane_count;
        let grid = self
            .grids
            .get_mut(&segment)
            .ok_or(PlacementError::UnknownSegment)?;

        let mut indices = Vec::new();
        for cell in footprint.covers(lane_count) {
            let index = cell_slot(cell, cells_per_segment, lane_count)
                .ok_or(PlacementError::OutOfBounds)?;
            if grid[index] {
                return Err(PlacementError::Occupied);
            }
            indices.push(index);
        }

        for index in indices {
            grid[index] = true;
        }
        Ok(())
    }

    pub(crate) fn is_free(&self, segment: SegmentId, cell: CellCoord) -> bool {
        let Some(grid) = self.grids.get(&segment) else {
            return false;
        };
        match cell_slot(cell, self.cells_per_segment, self.lane_count) {
            Some(index) => !grid[index],
            None => false,
        }
    }

    pub(crate) fn contains(&self, segment: SegmentId) -> bool {
        self.grids.contains_key(&segment)
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.grids.len()
    }

    pub(crate) fn cells(&self, segment: SegmentId) -> Option<&[bool]> {
        self.grids.get(&segment).map(Vec::as_slice)
    }
}

pub(crate) fn cell_slot(cell: CellCoord, cells_per_segment: u32, lane_count: u32) -> Option<usize> {
    if cell.cell().get() < cells_per_segment && cell.lane().get() < lane_count {
        let row = usize::try_from(cell.cell().get()).ok()?;
        let lane = usize::try_from(cell.lane().get()).ok()?;
        let width = usize::try_from(lane_count).ok()?;
        Some(row * width + lane)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentGrids;
    use lane_runner_core::{
        CellCoord, CellIndex, Footprint, LaneIndex, ObstacleKind, PlacementError, SegmentId,
    };

    fn cell(lane: u32, index: u32) -> CellCoord {
        CellCoord::new(LaneIndex::new(lane), CellIndex::new(index))
    }

    #[test]
    fn reserve_marks_every_covered_cell() {
        let mut grids = SegmentGrids::new(8, 3);
        let segment = SegmentId::new(0);
        grids.insert(segment);

        let footprint = Footprint::new(ObstacleKind::Wide, cell(0, 3), 2);
        assert_eq!(grids.reserve(segment, &footprint), Ok(()));

        for lane in 0..3 {
            assert!(!grids.is_free(segment, cell(lane, 3)));
            assert!(!grids.is_free(segment, cell(lane, 4)));
        }
        assert!(grids.is_free(segment, cell(0, 2)));
        assert!(grids.is_free(segment, cell(2, 5)));
    }

    #[test]
    fn wide_reservation_blocks_subsequent_long_overlap() {
        let mut grids = SegmentGrids::new(8, 3);
        let segment = SegmentId::new(0);
        grids.insert(segment);

        let wide = Footprint::new(ObstacleKind::Wide, cell(0, 3), 2);
        assert_eq!(grids.reserve(segment, &wide), Ok(()));

        let long = Footprint::new(ObstacleKind::Long, cell(1, 4), 2);
        assert_eq!(
            grids.reserve(segment, &long),
            Err(PlacementError::Occupied)
        );
    }

    #[test]
    fn failed_reservation_leaves_no_partial_marks() {
        let mut grids = SegmentGrids::new(8, 3);
        let segment = SegmentId::new(0);
        grids.insert(segment);

        let blocker = Footprint::new(ObstacleKind::Long, cell(1, 6), 1);
        assert_eq!(grids.reserve(segment, &blocker), Ok(()));

        // Covers cells 5 and 6 in lane 1; 6 is taken, so 5 must stay free.
        let overlap = Footprint::new(ObstacleKind::Long, cell(1, 5), 2);
        assert_eq!(
            grids.reserve(segment, &overlap),
            Err(PlacementError::Occupied)
        );
        assert!(grids.is_free(segment, cell(1, 5)));
    }

    #[test]
    fn reservation_rejects_out_of_bounds_tail() {
        let mut grids = SegmentGrids::new(8, 3);
        let segment = SegmentId::new(0);
        grids.insert(segment);

        let footprint = Footprint::new(ObstacleKind::Long, cell(0, 7), 2);
        assert_eq!(
            grids.reserve(segment, &footprint),
            Err(PlacementError::OutOfBounds)
        );
        assert!(grids.is_free(segment, cell(0, 7)));
    }

    #[test]
    fn release_is_idempotent() {
        let mut grids = SegmentGrids::new(4, 2);
        let segment = SegmentId::new(9);
        grids.insert(segment);
        assert!(grids.contains(segment));

        grids.release(segment);
        grids.release(segment);
        assert!(!grids.contains(segment));
        assert_eq!(grids.entry_count(), 0);
    }

    #[test]
    fn unknown_segment_is_rejected() {
        let mut grids = SegmentGrids::new(4, 2);
        let footprint = Footprint::new(ObstacleKind::Long, cell(0, 0), 1);
        assert_eq!(
            grids.reserve(SegmentId::new(3), &footprint),
            Err(PlacementError::UnknownSegment)
        );
    }
}
