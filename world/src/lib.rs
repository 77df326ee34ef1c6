#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative track state management for Lane Runner.
//!
//! The world owns the per-segment occupancy grids, the entity pools, the
//! active-segment queue, and the simulation clock. All mutation flows through
//! [`apply`], which executes one [`Command`] and appends the resulting
//! [`Event`] values; systems observe the world exclusively through the
//! [`query`] module.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    time::Duration,
};

use lane_runner_core::{
    CellCoord, CoinHeight, CoinId, CoinShelf, Command, Event, Footprint, GroundId, ObstacleId,
    ObstacleKind, PlacementError, SegmentId, TrackConfig, WorldPosition,
};

use occupancy::SegmentGrids;
use pool::Pool;

mod occupancy;
mod pool;

/// Represents the authoritative Lane Runner track state.
#[derive(Debug)]
pub struct World {
    config: TrackConfig,
    clock: Duration,
    subject_z: f32,
    next_z: f32,
    next_segment: u64,
    active: VecDeque<SegmentRecord>,
    occupancy: SegmentGrids,
    ground_pool: Pool<GroundId>,
    wide_pool: Pool<ObstacleId>,
    high_pool: Pool<ObstacleId>,
    long_pool: Pool<ObstacleId>,
    coin_pool: Pool<CoinId>,
}

#[derive(Debug)]
struct SegmentRecord {
    id: SegmentId,
    start_z: f32,
    ground: GroundId,
    obstacles: Vec<ObstacleRecord>,
    coins: Vec<CoinRecord>,
    cell_obstacles: BTreeMap<CellCoord, usize>,
    coin_cells: BTreeSet<CellCoord>,
}

#[derive(Debug)]
struct ObstacleRecord {
    id: ObstacleId,
    kind: ObstacleKind,
    anchor: CellCoord,
    depth_cells: u32,
    position: WorldPosition,
}

#[derive(Debug)]
struct CoinRecord {
    id: CoinId,
    cell: CellCoord,
    height: CoinHeight,
    position: WorldPosition,
    collected: bool,
}

impl World {
    /// Creates a new track world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(TrackConfig::default())
    }

    fn from_config(config: TrackConfig) -> Self {
        let occupancy = SegmentGrids::new(config.cells_per_segment, config.lane_count());
        let sizes = config.pool_sizes;
        Self {
            occupancy,
            clock: Duration::ZERO,
            subject_z: 0.0,
            next_z: 0.0,
            next_segment: 0,
            active: VecDeque::new(),
            ground_pool: Pool::new(sizes.ground, GroundId::new),
            wide_pool: Pool::new(sizes.obstacles, ObstacleId::new),
            high_pool: Pool::new(sizes.obstacles, ObstacleId::new),
            long_pool: Pool::new(sizes.obstacles, ObstacleId::new),
            coin_pool: Pool::new(sizes.coins, CoinId::new),
            config,
        }
    }

    fn obstacle_pool_mut(&mut self, kind: ObstacleKind) -> &mut Pool<ObstacleId> {
        match kind {
            ObstacleKind::Wide => &mut self.wide_pool,
            ObstacleKind::High => &mut self.high_pool,
            ObstacleKind::Long => &mut self.long_pool,
        }
    }

    fn obstacle_pool(&self, kind: ObstacleKind) -> &Pool<ObstacleId> {
        match kind {
            ObstacleKind::Wide => &self.wide_pool,
            ObstacleKind::High => &self.high_pool,
            ObstacleKind::Long => &self.long_pool,
        }
    }

    fn segment_index(&self, segment: SegmentId) -> Option<usize> {
        self.active.iter().position(|record| record.id == segment)
    }

    fn generate_segment(&mut self, out_events: &mut Vec<Event>) {
        let id = SegmentId::new(self.next_segment);
        let start_z = self.next_z;
        let ground = self.ground_pool.acquire();

        self.occupancy.insert(id);
        self.active.push_back(SegmentRecord {
            id,
            start_z,
            ground,
            obstacles: Vec::new(),
            coins: Vec::new(),
            cell_obstacles: BTreeMap::new(),
            coin_cells: BTreeSet::new(),
        });
        self.next_z += self.config.segment_length;
        self.next_segment = self.next_segment.saturating_add(1);

        out_events.push(Event::SegmentGenerated {
            segment: id,
            start_z,
        });
    }

    fn recycle_oldest(&mut self, out_events: &mut Vec<Event>) {
        let Some(record) = self.active.pop_front() else {
            return;
        };

        // Children go back to their pools before the ground instance itself.
        // Collected coins already went back at collection time and their ids
        // may be live in a newer segment, so they are not released again.
        for obstacle in &record.obstacles {
            self.obstacle_pool_mut(obstacle.kind).release(obstacle.id);
        }
        for coin in record.coins.iter().filter(|coin| !coin.collected) {
            self.coin_pool.release(coin.id);
        }
        self.occupancy.release(record.id);
        self.ground_pool.release(record.ground);

        out_events.push(Event::SegmentRecycled { segment: record.id });
    }

    fn place_obstacle(
        &mut self,
        segment: SegmentId,
        kind: ObstacleKind,
        anchor: CellCoord,
        out_events: &mut Vec<Event>,
    ) {
        let Some(index) = self.segment_index(segment) else {
            out_events.push(Event::ObstaclePlacementRejected {
                segment,
                kind,
                anchor,
                reason: PlacementError::UnknownSegment,
            });
            return;
        };

        let depth_cells = self.config.depth_cells(kind);
        let footprint = Footprint::new(kind, anchor, depth_cells);
        if let Err(reason) = self.occupancy.reserve(segment, &footprint) {
            out_events.push(Event::ObstaclePlacementRejected {
                segment,
                kind,
                anchor,
                reason,
            });
            return;
        }

        let start_z = self.active[index].start_z;
        let position = self.obstacle_position(kind, anchor, depth_cells, start_z);
        let lane_count = self.config.lane_count();
        let id = self.obstacle_pool_mut(kind).acquire();

        let record = &mut self.active[index];
        let slot = record.obstacles.len();
        record.obstacles.push(ObstacleRecord {
            id,
            kind,
            anchor,
            depth_cells,
            position,
        });
        for cell in footprint.covers(lane_count) {
            let _ = record.cell_obstacles.insert(cell, slot);
        }

        out_events.push(Event::ObstaclePlaced {
            segment,
            obstacle: id,
            kind,
            anchor,
            depth_cells,
        });
    }

    fn obstacle_position(
        &self,
        kind: ObstacleKind,
        anchor: CellCoord,
        depth_cells: u32,
        start_z: f32,
    ) -> WorldPosition {
        let x = if kind.spans_all_lanes() {
            let lanes = &self.config.lane_positions;
            lanes.iter().sum::<f32>() / lanes.len() as f32
        } else {
            self.config.lane_position(anchor.lane()).unwrap_or(0.0)
        };
        let y = self.config.tuning(kind).height;
        let cell_length = self.config.cell_length();
        let z = start_z + (anchor.cell().get() as f32 + depth_cells as f32 / 2.0) * cell_length;
        WorldPosition::new(x, y, z)
    }

    fn place_coin(&mut self, segment: SegmentId, cell: CellCoord, out_events: &mut Vec<Event>) {
        let Some(index) = self.segment_index(segment) else {
            out_events.push(Event::CoinPlacementRejected {
                segment,
                cell,
                reason: PlacementError::UnknownSegment,
            });
            return;
        };

        if cell.lane().get() >= self.config.lane_count()
            || cell.cell().get() >= self.config.cells_per_segment
        {
            out_events.push(Event::CoinPlacementRejected {
                segment,
                cell,
                reason: PlacementError::OutOfBounds,
            });
            return;
        }

        if self.active[index].coin_cells.contains(&cell) {
            out_events.push(Event::CoinPlacementRejected {
                segment,
                cell,
                reason: PlacementError::CellTaken,
            });
            return;
        }

        // Height is resolved from the cell's obstacle state at placement
        // time, after the obstacle pass has fully committed.
        let height = match self.active[index].cell_obstacles.get(&cell) {
            None => CoinHeight::Ground,
            Some(slot) => match self.config.tuning(self.active[index].obstacles[*slot].kind).shelf {
                CoinShelf::Above => CoinHeight::AboveObstacle,
                CoinShelf::Below => CoinHeight::BelowObstacle,
            },
        };
        let y = match height {
            CoinHeight::Ground => self.config.coin_heights.ground,
            CoinHeight::AboveObstacle => self.config.coin_heights.above_obstacle,
            CoinHeight::BelowObstacle => self.config.coin_heights.below_obstacle,
        };
        let x = self.config.lane_position(cell.lane()).unwrap_or(0.0);
        let start_z = self.active[index].start_z;
        let z = start_z + (cell.cell().get() as f32 + 0.5) * self.config.cell_length();

        let id = self.coin_pool.acquire();
        let record = &mut self.active[index];
        record.coins.push(CoinRecord {
            id,
            cell,
            height,
            position: WorldPosition::new(x, y, z),
            collected: false,
        });
        let _ = record.coin_cells.insert(cell);

        out_events.push(Event::CoinPlaced {
            segment,
            coin: id,
            cell,
            height,
        });
    }

    fn collect_coin(&mut self, coin: CoinId, out_events: &mut Vec<Event>) {
        for record in self.active.iter_mut() {
            if let Some(entry) = record
                .coins
                .iter_mut()
                .find(|entry| entry.id == coin && !entry.collected)
            {
                entry.collected = true;
                self.coin_pool.release(coin);
                out_events.push(Event::CoinCollected { coin });
                return;
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureTrack { config } => {
            *world = World::from_config(config);
            out_events.push(Event::TrackConfigured);
        }
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::AdvanceSubject { z } => {
            if z > world.subject_z {
                world.subject_z = z;
            }
            out_events.push(Event::SubjectAdvanced { z: world.subject_z });
        }
        Command::GenerateSegment => world.generate_segment(out_events),
        Command::RecycleOldestSegment => world.recycle_oldest(out_events),
        Command::PlaceObstacle {
            segment,
            kind,
            anchor,
        } => world.place_obstacle(segment, kind, anchor, out_events),
        Command::PlaceCoin { segment, cell } => world.place_coin(segment, cell, out_events),
        Command::CollectCoin { coin } => world.collect_coin(coin, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use lane_runner_core::{
        CellCoord, CoinHeight, CoinId, GroundId, ObstacleId, ObstacleKind, SegmentId, TrackConfig,
        TrackStatus, WorldPosition,
    };

    /// Provides read-only access to the active track configuration.
    #[must_use]
    pub fn track_config(world: &World) -> &TrackConfig {
        &world.config
    }

    /// Simulated time accumulated since the run was configured.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Captures the frontier summary consumed by the segment scheduler.
    #[must_use]
    pub fn track_status(world: &World) -> TrackStatus {
        TrackStatus {
            subject_z: world.subject_z,
            next_z: world.next_z,
            active_segments: world.active.len() as u32,
            segment_length: world.config.segment_length,
            segments_ahead: world.config.segments_ahead,
            lookahead_factor: world.config.lookahead_factor,
        }
    }

    /// Captures a read-only view of the active segments in creation order.
    #[must_use]
    pub fn segment_view(world: &World) -> Vec<SegmentSnapshot> {
        world
            .active
            .iter()
            .map(|record| SegmentSnapshot {
                id: record.id,
                start_z: record.start_z,
                ground: record.ground,
                obstacle_count: record.obstacles.len(),
                coin_count: record.coins.len(),
            })
            .collect()
    }

    /// Reports whether the provided segment still has an occupancy entry.
    #[must_use]
    pub fn has_occupancy(world: &World, segment: SegmentId) -> bool {
        world.occupancy.contains(segment)
    }

    /// Number of occupancy entries currently held by the world.
    #[must_use]
    pub fn occupancy_entry_count(world: &World) -> usize {
        world.occupancy.entry_count()
    }

    /// Exposes a read-only view of one segment's occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World, segment: SegmentId) -> Option<OccupancyView<'_>> {
        world.occupancy.cells(segment).map(|cells| OccupancyView {
            world,
            segment,
            cells,
        })
    }

    /// Kind of the obstacle whose footprint covers the provided cell, if any.
    #[must_use]
    pub fn obstacle_in_cell(
        world: &World,
        segment: SegmentId,
        cell: CellCoord,
    ) -> Option<ObstacleKind> {
        let record = world.active.iter().find(|record| record.id == segment)?;
        let slot = record.cell_obstacles.get(&cell)?;
        Some(record.obstacles[*slot].kind)
    }

    /// Captures read-only snapshots of every attached obstacle instance.
    #[must_use]
    pub fn obstacle_view(world: &World) -> Vec<ObstacleSnapshot> {
        world
            .active
            .iter()
            .flat_map(|record| {
                record.obstacles.iter().map(|obstacle| ObstacleSnapshot {
                    id: obstacle.id,
                    segment: record.id,
                    kind: obstacle.kind,
                    anchor: obstacle.anchor,
                    depth_cells: obstacle.depth_cells,
                    position: obstacle.position,
                })
            })
            .collect()
    }

    /// Captures read-only snapshots of every attached coin instance.
    #[must_use]
    pub fn coin_view(world: &World) -> Vec<CoinSnapshot> {
        world
            .active
            .iter()
            .flat_map(|record| {
                record.coins.iter().map(|coin| CoinSnapshot {
                    id: coin.id,
                    segment: record.id,
                    cell: coin.cell,
                    height: coin.height,
                    position: coin.position,
                    collected: coin.collected,
                })
            })
            .collect()
    }

    /// Snapshot of the ground-segment pool for conservation checks.
    #[must_use]
    pub fn ground_pool(world: &World) -> PoolSnapshot<GroundId> {
        snapshot(&world.ground_pool)
    }

    /// Snapshot of the pool backing the provided obstacle kind.
    #[must_use]
    pub fn obstacle_pool(world: &World, kind: ObstacleKind) -> PoolSnapshot<ObstacleId> {
        snapshot(world.obstacle_pool(kind))
    }

    /// Snapshot of the coin pool for conservation checks.
    #[must_use]
    pub fn coin_pool(world: &World) -> PoolSnapshot<CoinId> {
        snapshot(&world.coin_pool)
    }

    fn snapshot<T: Copy + Ord>(pool: &super::Pool<T>) -> PoolSnapshot<T> {
        PoolSnapshot {
            available: pool.available().collect(),
            active: pool.active().collect(),
            constructed: pool.constructed(),
        }
    }

    /// Immutable representation of a single segment's state used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct SegmentSnapshot {
        /// Identifier assigned to the segment at creation.
        pub id: SegmentId,
        /// World-space forward position where the segment begins.
        pub start_z: f32,
        /// Pooled ground instance backing the segment.
        pub ground: GroundId,
        /// Number of obstacle instances attached to the segment.
        pub obstacle_count: usize,
        /// Number of coin instances attached to the segment.
        pub coin_count: usize,
    }

    /// Immutable representation of one obstacle instance.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ObstacleSnapshot {
        /// Pooled instance handle.
        pub id: ObstacleId,
        /// Segment that owns the instance.
        pub segment: SegmentId,
        /// Kind of the obstacle, fixed at placement time.
        pub kind: ObstacleKind,
        /// Cell anchoring the reserved footprint.
        pub anchor: CellCoord,
        /// Number of consecutive sub-cells the footprint covers.
        pub depth_cells: u32,
        /// World transform of the instance (footprint centroid).
        pub position: WorldPosition,
    }

    /// Immutable representation of one coin instance.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct CoinSnapshot {
        /// Pooled instance handle.
        pub id: CoinId,
        /// Segment that owns the instance.
        pub segment: SegmentId,
        /// Cell the coin occupies.
        pub cell: CellCoord,
        /// Height band resolved at placement time.
        pub height: CoinHeight,
        /// World transform of the instance.
        pub position: WorldPosition,
        /// Indicates whether external contact detection collected the coin.
        pub collected: bool,
    }

    /// Snapshot of one pool's membership for conservation checks.
    #[derive(Clone, Debug, PartialEq)]
    pub struct PoolSnapshot<T> {
        /// Handles currently waiting in the available queue.
        pub available: Vec<T>,
        /// Handles currently held by active instances.
        pub active: Vec<T>,
        /// Total number of handles ever constructed.
        pub constructed: u32,
    }

    /// Read-only view into one segment's dense occupancy grid.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        world: &'a World,
        segment: SegmentId,
        cells: &'a [bool],
    }

    impl<'a> OccupancyView<'a> {
        /// Reports whether the cell is currently free for placement.
        #[must_use]
        pub fn is_free(&self, cell: CellCoord) -> bool {
            self.world.occupancy.is_free(self.segment, cell)
        }

        /// Number of reserved cells in the segment.
        #[must_use]
        pub fn occupied_count(&self) -> usize {
            self.cells.iter().filter(|cell| **cell).count()
        }
    }
}
