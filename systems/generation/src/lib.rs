#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Obstacle and coin population for freshly generated track segments.
//!
//! The populator owns the run's only random number generator. For every
//! `SegmentGenerated` event it plans an obstacle pass followed by a coin pass
//! against a scratch copy of the segment's occupancy and emits placement
//! commands; the world's own reservation step remains the authority.

use std::time::Duration;

use lane_runner_core::{
    CellCoord, CellIndex, Command, Event, Footprint, LaneIndex, ObstacleKind, SegmentId,
    TrackConfig,
};
use rand::{distributions::WeightedIndex, prelude::Distribution, seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration for the track populator.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a populator configuration with the provided RNG seed.
    #[must_use]
    pub fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Plans obstacle and coin placements for new segments.
#[derive(Debug)]
pub struct TrackPopulator {
    rng: ChaCha8Rng,
}

impl TrackPopulator {
    /// Creates a populator seeded from the provided configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Reacts to the world events of one tick and emits placement commands.
    ///
    /// `clock` is the world's simulated time; obstacle placement is
    /// suppressed until the configured grace period has elapsed.
    pub fn handle(
        &mut self,
        events: &[Event],
        track: &TrackConfig,
        clock: Duration,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::SegmentGenerated { segment, .. } = event {
                self.plan_segment(*segment, track, clock, out);
            }
        }
    }

    fn plan_segment(
        &mut self,
        segment: SegmentId,
        track: &TrackConfig,
        clock: Duration,
        out: &mut Vec<Command>,
    ) {
        let lane_count = track.lane_count();
        let cells = track.cells_per_segment;
        let mut scratch = ScratchGrid::new(cells, lane_count);

        if clock >= track.min_run_time {
            self.plan_obstacles(segment, track, &mut scratch, out);
        }
        self.plan_coins(segment, track, out);
    }

    fn plan_obstacles(
        &mut self,
        segment: SegmentId,
        track: &TrackConfig,
        scratch: &mut ScratchGrid,
        out: &mut Vec<Command>,
    ) {
        let weights: Vec<f32> = ObstacleKind::ALL
            .iter()
            .map(|kind| track.tuning(*kind).weight)
            .collect();
        // An all-zero weight table degrades to an obstacle-free segment.
        let Ok(kind_distribution) = WeightedIndex::new(&weights) else {
            return;
        };

        let mut order: Vec<u32> = (0..track.cells_per_segment).collect();
        order.shuffle(&mut self.rng);

        let mut total = 0;
        let mut per_kind = [0u32; ObstacleKind::ALL.len()];

        for cell in order {
            if total >= track.max_obstacles_per_segment {
                break;
            }
            if !self.rng.gen_bool(f64::from(track.obstacle_chance)) {
                continue;
            }

            let index = kind_distribution.sample(&mut self.rng);
            let kind = ObstacleKind::ALL[index];
            if per_kind[index] >= track.tuning(kind).max_per_segment {
                continue;
            }

            let placed = if kind.spans_all_lanes() {
                let anchor = CellCoord::new(LaneIndex::new(0), CellIndex::new(cell));
                let footprint = Footprint::new(kind, anchor, track.depth_cells(kind));
                if scratch.try_reserve(&footprint) {
                    out.push(Command::PlaceObstacle {
                        segment,
                        kind,
                        anchor,
                    });
                    Some(index)
                } else {
                    // A blocked full-width barrier degrades to a single-lane
                    // block in a random lane, when one still fits.
                    self.fall_back_to_long(segment, track, scratch, cell, &per_kind, out)
                }
            } else {
                self.place_long(segment, track, scratch, cell, out)
            };

            if let Some(placed_index) = placed {
                per_kind[placed_index] += 1;
                total += 1;
            }
        }
    }

    fn fall_back_to_long(
        &mut self,
        segment: SegmentId,
        track: &TrackConfig,
        scratch: &mut ScratchGrid,
        cell: u32,
        per_kind: &[u32; ObstacleKind::ALL.len()],
        out: &mut Vec<Command>,
    ) -> Option<usize> {
        let long_index = ObstacleKind::ALL
            .iter()
            .position(|kind| *kind == ObstacleKind::Long)?;
        if per_kind[long_index] >= track.tuning(ObstacleKind::Long).max_per_segment {
            return None;
        }
        self.place_long(segment, track, scratch, cell, out)
    }

    fn place_long(
        &mut self,
        segment: SegmentId,
        track: &TrackConfig,
        scratch: &mut ScratchGrid,
        cell: u32,
        out: &mut Vec<Command>,
    ) -> Option<usize> {
        let mut lanes: Vec<u32> = (0..track.lane_count()).collect();
        lanes.shuffle(&mut self.rng);
        let depth_cells = track.depth_cells(ObstacleKind::Long);

        for lane in lanes {
            let anchor = CellCoord::new(LaneIndex::new(lane), CellIndex::new(cell));
            let footprint = Footprint::new(ObstacleKind::Long, anchor, depth_cells);
            if scratch.try_reserve(&footprint) {
                out.push(Command::PlaceObstacle {
                    segment,
                    kind: ObstacleKind::Long,
                    anchor,
                });
                return ObstacleKind::ALL
                    .iter()
                    .position(|kind| *kind == ObstacleKind::Long);
            }
        }
        None
    }

    fn plan_coins(&mut self, segment: SegmentId, track: &TrackConfig, out: &mut Vec<Command>) {
        let mut placed = 0;
        for cell in 0..track.cells_per_segment {
            for lane in 0..track.lane_count() {
                if placed >= track.max_coins_per_segment {
                    return;
                }
                if !self.rng.gen_bool(f64::from(track.coin_chance)) {
                    continue;
                }
                out.push(Command::PlaceCoin {
                    segment,
                    cell: CellCoord::new(LaneIndex::new(lane), CellIndex::new(cell)),
                });
                placed += 1;
            }
        }
    }
}

/// Local mirror of a fresh segment's occupancy used while planning, so one
/// batch never emits self-conflicting placements.
#[derive(Debug)]
struct ScratchGrid {
    cells_per_segment: u32,
    lane_count: u32,
    cells: Vec<bool>,
}

impl ScratchGrid {
    fn new(cells_per_segment: u32, lane_count: u32) -> Self {
        Self {
            cells_per_segment,
            lane_count,
            cells: vec![false; cells_per_segment as usize * lane_count as usize],
        }
    }

    fn slot(&self, cell: CellCoord) -> Option<usize> {
        if cell.cell().get() < self.cells_per_segment && cell.lane().get() < self.lane_count {
            Some((cell.cell().get() * self.lane_count + cell.lane().get()) as usize)
        } else {
            None
        }
    }

    fn try_reserve(&mut self, footprint: &Footprint) -> bool {
        let mut slots = Vec::new();
        for cell in footprint.covers(self.lane_count) {
            let Some(slot) = self.slot(cell) else {
                return false;
            };
            if self.cells[slot] {
                return false;
            }
            slots.push(slot);
        }
        for slot in slots {
            self.cells[slot] = true;
        }
        true
    }
}
