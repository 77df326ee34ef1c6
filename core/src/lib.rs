#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Runner engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative track world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod config;

pub use config::{CoinHeights, ObstacleTuning, PoolSizes, TrackConfig, TrackConfigError};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resets the world with the provided track configuration for a new run.
    ConfigureTrack {
        /// Validated configuration describing lanes, segments, and tuning.
        config: TrackConfig,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Records the subject's forward coordinate polled from the locomotion
    /// collaborator once per tick. Regressions are clamped so the recorded
    /// coordinate stays monotonic.
    AdvanceSubject {
        /// World-space forward position of the subject.
        z: f32,
    },
    /// Requests generation of the next track segment at the current frontier.
    GenerateSegment,
    /// Requests recycling of the oldest active segment, returning all of its
    /// pooled instances before the ground instance itself is released.
    RecycleOldestSegment,
    /// Requests placement of an obstacle anchored at the provided cell.
    PlaceObstacle {
        /// Segment the obstacle should be attached to.
        segment: SegmentId,
        /// Kind of obstacle to place, determining its footprint.
        kind: ObstacleKind,
        /// Cell that anchors the footprint. Full-width kinds ignore the lane
        /// component and cover every lane.
        anchor: CellCoord,
    },
    /// Requests placement of a collectible coin in the provided cell. The
    /// world derives the coin height from the cell's obstacle state.
    PlaceCoin {
        /// Segment the coin should be attached to.
        segment: SegmentId,
        /// Cell the coin occupies.
        cell: CellCoord,
    },
    /// Reports that external contact detection collected a coin.
    CollectCoin {
        /// Identifier of the collected coin instance.
        coin: CoinId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the world was reset with a fresh configuration.
    TrackConfigured,
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms the subject's recorded forward coordinate after clamping.
    SubjectAdvanced {
        /// Monotonic forward position of the subject.
        z: f32,
    },
    /// Confirms that a new segment was generated at the track frontier.
    SegmentGenerated {
        /// Identifier assigned to the segment in creation order.
        segment: SegmentId,
        /// World-space forward position where the segment begins.
        start_z: f32,
    },
    /// Confirms that the oldest segment was recycled and its state dropped.
    SegmentRecycled {
        /// Identifier of the recycled segment.
        segment: SegmentId,
    },
    /// Confirms that an obstacle was placed and its footprint reserved.
    ObstaclePlaced {
        /// Segment that owns the obstacle.
        segment: SegmentId,
        /// Identifier of the pooled obstacle instance.
        obstacle: ObstacleId,
        /// Kind of obstacle that was placed.
        kind: ObstacleKind,
        /// Cell that anchors the reserved footprint.
        anchor: CellCoord,
        /// Number of consecutive sub-cells the footprint covers.
        depth_cells: u32,
    },
    /// Reports that an obstacle placement request was rejected.
    ObstaclePlacementRejected {
        /// Segment provided in the placement request.
        segment: SegmentId,
        /// Kind of obstacle requested for placement.
        kind: ObstacleKind,
        /// Anchor cell provided in the placement request.
        anchor: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a coin was placed at its resolved height.
    CoinPlaced {
        /// Segment that owns the coin.
        segment: SegmentId,
        /// Identifier of the pooled coin instance.
        coin: CoinId,
        /// Cell the coin occupies.
        cell: CellCoord,
        /// Height band resolved from the cell's obstacle state.
        height: CoinHeight,
    },
    /// Reports that a coin placement request was rejected.
    CoinPlacementRejected {
        /// Segment provided in the placement request.
        segment: SegmentId,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a coin was collected and returned to its pool.
    CoinCollected {
        /// Identifier of the collected coin instance.
        coin: CoinId,
    },
}

/// Index of one of the fixed lateral travel lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneIndex(u32);

impl LaneIndex {
    /// Creates a new lane index wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the zero-based lane index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Index of a sub-cell within a segment along the direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex(u32);

impl CellIndex {
    /// Creates a new sub-cell index wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the zero-based sub-cell index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single placement cell expressed as lane and sub-cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    lane: LaneIndex,
    cell: CellIndex,
}

impl CellCoord {
    /// Creates a new placement cell coordinate.
    #[must_use]
    pub const fn new(lane: LaneIndex, cell: CellIndex) -> Self {
        Self { lane, cell }
    }

    /// Lane that contains the cell.
    #[must_use]
    pub const fn lane(&self) -> LaneIndex {
        self.lane
    }

    /// Sub-cell index within the owning segment.
    #[must_use]
    pub const fn cell(&self) -> CellIndex {
        self.cell
    }
}

/// Identifier assigned to a segment in monotonically increasing creation
/// order; the unit of streaming and recycling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Creates a new segment identifier with the provided creation index.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric creation index of the segment.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Pooled obstacle instance handle. Identity is preserved across reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle instance handle.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Pooled coin instance handle. Identity is preserved across reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoinId(u32);

impl CoinId {
    /// Creates a new coin instance handle.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Pooled ground-segment instance handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroundId(u32);

impl GroundId {
    /// Creates a new ground instance handle.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Kinds of obstacles the generator can place, indexed by footprint shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Low barrier spanning every lane; defeated by jumping over it.
    Wide,
    /// Raised barrier spanning every lane; defeated by sliding under it.
    High,
    /// Deep single-lane block; defeated only by moving to another lane.
    Long,
}

impl ObstacleKind {
    /// Every obstacle kind in canonical order.
    pub const ALL: [ObstacleKind; 3] = [Self::Wide, Self::High, Self::Long];

    /// Reports whether the kind's footprint covers every lane.
    #[must_use]
    pub const fn spans_all_lanes(self) -> bool {
        match self {
            Self::Wide | Self::High => true,
            Self::Long => false,
        }
    }

    /// Locomotion response required to pass an obstacle of this kind.
    #[must_use]
    pub const fn required_evasion(self) -> Evasion {
        match self {
            Self::Wide => Evasion::Jump,
            Self::High => Evasion::Slide,
            Self::Long => Evasion::ChangeLane,
        }
    }
}

/// Locomotion response that defeats an obstacle kind on contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Evasion {
    /// The subject must be airborne in its jump arc.
    Jump,
    /// The subject must be sliding with a reduced collider.
    Slide,
    /// No overlap is survivable; the subject must occupy another lane.
    ChangeLane,
}

/// Shelf a coin is placed on when its cell already holds an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinShelf {
    /// The coin floats above the obstacle's top face.
    Above,
    /// The coin sits in the gap beneath the obstacle, rewarding a slide.
    Below,
}

/// Vertical band a placed coin occupies, resolved at placement time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinHeight {
    /// Cell was obstacle-free; the coin sits at running height.
    Ground,
    /// Cell holds a coin-above obstacle; the coin floats over it.
    AboveObstacle,
    /// Cell holds a coin-below obstacle; the coin hangs under it.
    BelowObstacle,
}

/// Set of cells an obstacle of a given kind reserves from an anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Footprint {
    kind: ObstacleKind,
    anchor: CellCoord,
    depth_cells: u32,
}

impl Footprint {
    /// Constructs a footprint for the provided kind, anchor, and depth.
    #[must_use]
    pub const fn new(kind: ObstacleKind, anchor: CellCoord, depth_cells: u32) -> Self {
        Self {
            kind,
            anchor,
            depth_cells,
        }
    }

    /// Kind of obstacle the footprint belongs to.
    #[must_use]
    pub const fn kind(&self) -> ObstacleKind {
        self.kind
    }

    /// Cell that anchors the footprint.
    #[must_use]
    pub const fn anchor(&self) -> CellCoord {
        self.anchor
    }

    /// Number of consecutive sub-cells the footprint covers.
    #[must_use]
    pub const fn depth_cells(&self) -> u32 {
        self.depth_cells
    }

    /// Enumerates every cell the footprint covers given the lane count.
    pub fn covers(&self, lane_count: u32) -> impl Iterator<Item = CellCoord> {
        let lanes = if self.kind.spans_all_lanes() {
            0..lane_count
        } else {
            let lane = self.anchor.lane().get();
            lane..lane.saturating_add(1)
        };
        let first = self.anchor.cell().get();
        let cells = first..first.saturating_add(self.depth_cells);
        lanes.flat_map(move |lane| {
            cells
                .clone()
                .map(move |cell| CellCoord::new(LaneIndex::new(lane), CellIndex::new(cell)))
        })
    }
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The referenced segment is not active, so it has no occupancy entry.
    UnknownSegment,
    /// The requested footprint extends beyond the segment bounds.
    OutOfBounds,
    /// The requested footprint overlaps an already reserved cell.
    Occupied,
    /// The requested cell already holds a coin.
    CellTaken,
}

/// Plain value transform attached to pooled instances in place of a live
/// scene-graph node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    /// Lateral coordinate along the lane axis.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
    /// Forward coordinate along the direction of travel.
    pub z: f32,
}

impl WorldPosition {
    /// Creates a new world position from explicit components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Abstract movement intents produced by an external input-decoding layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Request to start a jump; honored only while grounded.
    Jump,
    /// Request to start a slide; honored only while grounded.
    Slide,
    /// Request to shift one lane laterally.
    MoveLane(LaneShift),
}

/// Direction of a single-lane lateral shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LaneShift {
    /// Toward decreasing lane indices.
    Left,
    /// Toward increasing lane indices.
    Right,
}

impl LaneShift {
    /// Signed lane-index offset of the shift.
    #[must_use]
    pub const fn offset(self) -> i64 {
        match self {
            Self::Left => -1,
            Self::Right => 1,
        }
    }
}

/// States of the subject's locomotion machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocomotionState {
    /// Vertical position locked to the ground; jumps and slides may start.
    Grounded,
    /// Ascending under the jump impulse until velocity turns negative.
    Jumping,
    /// Descending under gravity until ground contact is regained.
    Falling,
    /// Ground-locked with a reduced collider until the slide deadline.
    Sliding,
}

/// Outcome of resolving a contact between the subject and an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactOutcome {
    /// The subject was in the evasion state the obstacle requires.
    Cleared,
    /// The subject was in the wrong state; the run should end.
    Failed,
}

/// Read-only summary of the track frontier consumed by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackStatus {
    /// Monotonic forward position of the subject.
    pub subject_z: f32,
    /// World-space forward position where the next segment will begin.
    pub next_z: f32,
    /// Number of segments currently active.
    pub active_segments: u32,
    /// Length of one segment in world units.
    pub segment_length: f32,
    /// Number of segments the scheduler keeps ahead of the subject.
    pub segments_ahead: u32,
    /// Fraction of the lookahead window that triggers generation.
    pub lookahead_factor: f32,
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, CellIndex, CoinHeight, Evasion, Footprint, LaneIndex, ObstacleId,
        ObstacleKind, PlacementError, SegmentId,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_round_trip_through_bincode() {
        assert_round_trip(&SegmentId::new(17));
        assert_round_trip(&ObstacleId::new(42));
        assert_round_trip(&CellCoord::new(LaneIndex::new(1), CellIndex::new(6)));
    }

    #[test]
    fn placement_error_round_trips_through_bincode() {
        assert_round_trip(&PlacementError::Occupied);
    }

    #[test]
    fn coin_height_round_trips_through_bincode() {
        assert_round_trip(&CoinHeight::BelowObstacle);
    }

    #[test]
    fn evasion_table_matches_footprint_shapes() {
        assert_eq!(ObstacleKind::Wide.required_evasion(), Evasion::Jump);
        assert_eq!(ObstacleKind::High.required_evasion(), Evasion::Slide);
        assert_eq!(ObstacleKind::Long.required_evasion(), Evasion::ChangeLane);
        assert!(ObstacleKind::Wide.spans_all_lanes());
        assert!(ObstacleKind::High.spans_all_lanes());
        assert!(!ObstacleKind::Long.spans_all_lanes());
    }

    #[test]
    fn full_width_footprint_covers_every_lane() {
        let anchor = CellCoord::new(LaneIndex::new(0), CellIndex::new(3));
        let footprint = Footprint::new(ObstacleKind::Wide, anchor, 2);
        let cells: Vec<CellCoord> = footprint.covers(3).collect();

        assert_eq!(cells.len(), 6);
        for lane in 0..3 {
            for cell in 3..5 {
                assert!(cells.contains(&CellCoord::new(
                    LaneIndex::new(lane),
                    CellIndex::new(cell)
                )));
            }
        }
    }

    #[test]
    fn single_lane_footprint_stays_in_its_lane() {
        let anchor = CellCoord::new(LaneIndex::new(2), CellIndex::new(5));
        let footprint = Footprint::new(ObstacleKind::Long, anchor, 3);
        let cells: Vec<CellCoord> = footprint.covers(3).collect();

        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|cell| cell.lane() == LaneIndex::new(2)));
        assert!(cells.iter().all(|cell| (5..8).contains(&cell.cell().get())));
    }
}
