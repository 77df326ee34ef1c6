//! Externally supplied track configuration, validated once at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CoinShelf, LaneIndex, ObstacleKind};

/// Tuning for a single obstacle kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleTuning {
    /// Relative spawn weight; weights need not sum to one and a weight of
    /// zero removes the kind from selection.
    pub weight: f32,
    /// Footprint depth along the direction of travel, in world units.
    pub depth: f32,
    /// Vertical center of the placed instance, in world units.
    pub height: f32,
    /// Maximum instances of this kind per segment.
    pub max_per_segment: u32,
    /// Shelf coins use when sharing a cell with this kind.
    pub shelf: CoinShelf,
}

/// World-space heights for the three coin placement bands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinHeights {
    /// Height of a coin in an obstacle-free cell.
    pub ground: f32,
    /// Height of a coin floating over a coin-above obstacle.
    pub above_obstacle: f32,
    /// Height of a coin hanging under a coin-below obstacle.
    pub below_obstacle: f32,
}

/// Initial pool sizes per entity kind. Pools grow on demand afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSizes {
    /// Pre-constructed ground segment instances.
    pub ground: u32,
    /// Pre-constructed instances per obstacle kind.
    pub obstacles: u32,
    /// Pre-constructed coin instances.
    pub coins: u32,
}

/// Complete configuration surface for the track generator and its pools.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Lateral world position of each lane; the length fixes the lane count.
    pub lane_positions: Vec<f32>,
    /// Number of placement sub-cells along one segment.
    pub cells_per_segment: u32,
    /// Length of one segment in world units.
    pub segment_length: f32,
    /// Number of segments kept generated ahead of the subject.
    pub segments_ahead: u32,
    /// Fraction of the lookahead window that triggers generation.
    pub lookahead_factor: f32,
    /// Probability of attempting an obstacle in a visited sub-cell.
    pub obstacle_chance: f32,
    /// Probability of placing a coin in a visited cell.
    pub coin_chance: f32,
    /// Simulated time that must elapse before obstacles may spawn.
    pub min_run_time: Duration,
    /// Cap on the total obstacle count per segment.
    pub max_obstacles_per_segment: u32,
    /// Cap on the coin count per segment.
    pub max_coins_per_segment: u32,
    /// Tuning for the full-width low barrier.
    pub wide: ObstacleTuning,
    /// Tuning for the full-width raised barrier.
    pub high: ObstacleTuning,
    /// Tuning for the single-lane deep block.
    pub long: ObstacleTuning,
    /// World-space coin heights per placement band.
    pub coin_heights: CoinHeights,
    /// Initial pool sizes per entity kind.
    pub pool_sizes: PoolSizes,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            lane_positions: vec![-2.5, 0.0, 2.5],
            cells_per_segment: 8,
            segment_length: 10.0,
            segments_ahead: 8,
            lookahead_factor: 0.7,
            obstacle_chance: 0.25,
            coin_chance: 0.3,
            min_run_time: Duration::from_secs(5),
            max_obstacles_per_segment: 3,
            max_coins_per_segment: 8,
            wide: ObstacleTuning {
                weight: 1.0,
                depth: 2.0,
                height: 0.5,
                max_per_segment: 2,
                shelf: CoinShelf::Above,
            },
            high: ObstacleTuning {
                weight: 1.0,
                depth: 2.0,
                height: 2.0,
                max_per_segment: 2,
                shelf: CoinShelf::Below,
            },
            long: ObstacleTuning {
                weight: 1.0,
                depth: 4.0,
                height: 0.5,
                max_per_segment: 2,
                shelf: CoinShelf::Above,
            },
            coin_heights: CoinHeights {
                ground: 1.0,
                above_obstacle: 2.0,
                below_obstacle: 0.5,
            },
            pool_sizes: PoolSizes {
                ground: 12,
                obstacles: 8,
                coins: 40,
            },
        }
    }
}

impl TrackConfig {
    /// Number of lateral lanes.
    #[must_use]
    pub fn lane_count(&self) -> u32 {
        self.lane_positions.len() as u32
    }

    /// Length of one placement sub-cell in world units.
    #[must_use]
    pub fn cell_length(&self) -> f32 {
        self.segment_length / self.cells_per_segment as f32
    }

    /// Tuning table entry for the provided obstacle kind.
    #[must_use]
    pub fn tuning(&self, kind: ObstacleKind) -> &ObstacleTuning {
        match kind {
            ObstacleKind::Wide => &self.wide,
            ObstacleKind::High => &self.high,
            ObstacleKind::Long => &self.long,
        }
    }

    /// Footprint depth of the provided kind in whole sub-cells, at least one.
    #[must_use]
    pub fn depth_cells(&self, kind: ObstacleKind) -> u32 {
        let cells = (self.tuning(kind).depth / self.cell_length()).ceil();
        (cells as u32).max(1)
    }

    /// Lateral world position of the provided lane, if it exists.
    #[must_use]
    pub fn lane_position(&self, lane: LaneIndex) -> Option<f32> {
        self.lane_positions.get(lane.get() as usize).copied()
    }

    /// Checks every structural requirement of the configuration surface.
    ///
    /// Content-level degradation such as an all-zero weight table is not an
    /// error here; the placers skip the affected step instead.
    pub fn validate(&self) -> Result<(), TrackConfigError> {
        if self.lane_positions.is_empty() {
            return Err(TrackConfigError::NoLanes);
        }
        if self.cells_per_segment == 0 {
            return Err(TrackConfigError::NoCells);
        }
        if !(self.segment_length.is_finite() && self.segment_length > 0.0) {
            return Err(TrackConfigError::InvalidSegmentLength {
                value: self.segment_length,
            });
        }
        if self.segments_ahead == 0 {
            return Err(TrackConfigError::NoLookaheadSegments);
        }
        if !(self.lookahead_factor.is_finite()
            && self.lookahead_factor > 0.0
            && self.lookahead_factor <= 1.0)
        {
            return Err(TrackConfigError::InvalidLookaheadFactor {
                value: self.lookahead_factor,
            });
        }
        for chance in [self.obstacle_chance, self.coin_chance] {
            if !(chance.is_finite() && (0.0..=1.0).contains(&chance)) {
                return Err(TrackConfigError::InvalidChance { value: chance });
            }
        }
        for kind in ObstacleKind::ALL {
            let tuning = self.tuning(kind);
            if !(tuning.depth.is_finite() && tuning.depth > 0.0) {
                return Err(TrackConfigError::InvalidObstacleDepth {
                    value: tuning.depth,
                });
            }
            if !(tuning.weight.is_finite() && tuning.weight >= 0.0) {
                return Err(TrackConfigError::InvalidObstacleWeight {
                    value: tuning.weight,
                });
            }
        }
        Ok(())
    }
}

/// Structural defects that make a [`TrackConfig`] unusable.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum TrackConfigError {
    /// The lane position table was empty.
    #[error("at least one lane position is required")]
    NoLanes,
    /// The sub-cell count was zero.
    #[error("cells_per_segment must be positive")]
    NoCells,
    /// The segment length was non-positive or non-finite.
    #[error("segment_length must be positive and finite, got {value}")]
    InvalidSegmentLength {
        /// Rejected value.
        value: f32,
    },
    /// The lookahead segment count was zero.
    #[error("segments_ahead must be positive")]
    NoLookaheadSegments,
    /// The lookahead factor fell outside the half-open unit interval.
    #[error("lookahead_factor must be within (0, 1], got {value}")]
    InvalidLookaheadFactor {
        /// Rejected value.
        value: f32,
    },
    /// A spawn probability fell outside the unit interval.
    #[error("spawn chance must be within [0, 1], got {value}")]
    InvalidChance {
        /// Rejected value.
        value: f32,
    },
    /// An obstacle depth was non-positive or non-finite.
    #[error("obstacle depth must be positive and finite, got {value}")]
    InvalidObstacleDepth {
        /// Rejected value.
        value: f32,
    },
    /// An obstacle weight was negative or non-finite.
    #[error("obstacle weight must be non-negative and finite, got {value}")]
    InvalidObstacleWeight {
        /// Rejected value.
        value: f32,
    },
}
