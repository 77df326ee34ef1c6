#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Segment streaming policy for Lane Runner.
//!
//! The scheduler watches the subject's forward progress and keeps the track
//! frontier generated far enough ahead while recycling segments that fall
//! behind. It never mutates the world directly; it emits [`Command`] values
//! that the host applies in order.

use lane_runner_core::{Command, Event, TrackStatus};

/// Decides when track segments are generated and recycled.
#[derive(Debug, Default)]
pub struct SegmentScheduler;

impl SegmentScheduler {
    /// Creates a new segment scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reacts to the world events of one tick and emits streaming commands.
    ///
    /// Commands are planned against a local copy of the frontier so a single
    /// batch never requests the same segment twice. Generation commands are
    /// emitted before recycle commands.
    pub fn handle(&mut self, events: &[Event], status: &TrackStatus, out: &mut Vec<Command>) {
        let segment_length = status.segment_length;
        let mut frontier = status.next_z;
        let mut active = status.active_segments;

        // A fresh configuration primes the full lookahead window at once.
        if events.iter().any(|event| matches!(event, Event::TrackConfigured)) {
            for _ in 0..status.segments_ahead {
                out.push(Command::GenerateSegment);
            }
            frontier += segment_length * status.segments_ahead as f32;
            active += status.segments_ahead;
        }

        let trigger_distance =
            status.segments_ahead as f32 * segment_length * status.lookahead_factor;
        while frontier - status.subject_z < trigger_distance {
            out.push(Command::GenerateSegment);
            frontier += segment_length;
            active += 1;
        }

        // The active set is bounded by the lookahead window; anything beyond
        // it is the oldest trailing segment and gets recycled.
        while active > status.segments_ahead {
            out.push(Command::RecycleOldestSegment);
            active -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SegmentScheduler;
    use lane_runner_core::{Command, Event, TrackStatus};

    fn status(subject_z: f32, next_z: f32, active_segments: u32) -> TrackStatus {
        TrackStatus {
            subject_z,
            next_z,
            active_segments,
            segment_length: 10.0,
            segments_ahead: 8,
            lookahead_factor: 0.7,
        }
    }

    #[test]
    fn configuration_primes_the_full_window() {
        let mut scheduler = SegmentScheduler::new();
        let mut out = Vec::new();

        scheduler.handle(&[Event::TrackConfigured], &status(0.0, 0.0, 0), &mut out);

        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|command| *command == Command::GenerateSegment));
    }

    #[test]
    fn idle_subject_inside_the_window_requests_nothing() {
        let mut scheduler = SegmentScheduler::new();
        let mut out = Vec::new();

        scheduler.handle(&[], &status(0.0, 80.0, 8), &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn crossing_the_lookahead_threshold_extends_the_frontier() {
        let mut scheduler = SegmentScheduler::new();
        let mut out = Vec::new();

        // Remaining runway 80 - 25 = 55 < 56 trigger distance.
        scheduler.handle(&[], &status(25.0, 80.0, 8), &mut out);

        assert!(out.contains(&Command::GenerateSegment));
        let generated = out
            .iter()
            .filter(|command| **command == Command::GenerateSegment)
            .count();
        // 25 + 56 = 81, one segment closes the gap.
        assert_eq!(generated, 1);
    }

    #[test]
    fn active_segments_beyond_the_window_are_recycled() {
        let mut scheduler = SegmentScheduler::new();
        let mut out = Vec::new();

        // Twelve active segments exceed the eight-segment window by four.
        scheduler.handle(&[], &status(45.0, 120.0, 12), &mut out);

        let recycled = out
            .iter()
            .filter(|command| **command == Command::RecycleOldestSegment)
            .count();
        assert_eq!(recycled, 4);
    }

    #[test]
    fn one_batch_never_requests_the_same_segment_twice() {
        let mut scheduler = SegmentScheduler::new();
        let mut out = Vec::new();

        scheduler.handle(&[Event::TrackConfigured], &status(0.0, 0.0, 0), &mut out);
        let first = out.len();

        // Re-running against the already advanced frontier plans nothing new.
        out.clear();
        scheduler.handle(&[], &status(0.0, 80.0, 8), &mut out);
        assert_eq!(first, 8);
        assert!(out.is_empty());
    }
}
