#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Subject locomotion for Lane Runner.
//!
//! A four-state machine drives the subject along the track: grounded running,
//! the ascending half of a jump, the descending fall, and the timed slide.
//! The machine is self-contained and owns the subject transform; the host
//! polls the forward coordinate once per tick and resolves obstacle contacts
//! through [`LocomotionStateMachine::resolve_contact`].

use std::time::Duration;

use lane_runner_core::{
    ContactOutcome, Evasion, Intent, LaneIndex, LaneShift, LocomotionState, ObstacleKind,
    WorldPosition,
};

/// Movement tuning for the locomotion machine.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Lateral world position of each lane; the length fixes the lane count.
    pub lane_positions: Vec<f32>,
    /// Constant forward speed in world units per second.
    pub move_speed: f32,
    /// Lateral approach speed toward the target lane.
    pub lane_switch_speed: f32,
    /// Upward velocity applied when a jump starts.
    pub jump_impulse: f32,
    /// Downward acceleration applied while airborne; negative.
    pub gravity: f32,
    /// Time a slide lasts before the machine stands back up.
    pub slide_duration: Duration,
    /// Collider height while standing.
    pub standing_height: f32,
    /// Collider height while sliding.
    pub sliding_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lane_positions: vec![-2.5, 0.0, 2.5],
            move_speed: 10.0,
            lane_switch_speed: 15.0,
            jump_impulse: 12.0,
            gravity: -30.0,
            slide_duration: Duration::from_secs(1),
            standing_height: 2.0,
            sliding_height: 1.0,
        }
    }
}

/// Four-state locomotion machine owning the subject transform.
#[derive(Debug)]
pub struct LocomotionStateMachine {
    config: Config,
    state: LocomotionState,
    lane: u32,
    x: f32,
    y: f32,
    z: f32,
    vertical_velocity: f32,
    slide_deadline: Option<Duration>,
    clock: Duration,
}

impl LocomotionStateMachine {
    /// Creates a machine standing in the middle lane at the track origin.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let lane = (config.lane_positions.len().saturating_sub(1) / 2) as u32;
        let x = lane_position(&config, lane);
        Self {
            config,
            state: LocomotionState::Grounded,
            lane,
            x,
            y: 0.0,
            z: 0.0,
            vertical_velocity: 0.0,
            slide_deadline: None,
            clock: Duration::ZERO,
        }
    }

    /// Current state of the machine.
    #[must_use]
    pub fn state(&self) -> LocomotionState {
        self.state
    }

    /// Lane the machine currently targets.
    #[must_use]
    pub fn lane(&self) -> LaneIndex {
        LaneIndex::new(self.lane)
    }

    /// Current subject transform.
    #[must_use]
    pub fn position(&self) -> WorldPosition {
        WorldPosition::new(self.x, self.y, self.z)
    }

    /// Collider height for the current state; reduced while sliding.
    #[must_use]
    pub fn collider_height(&self) -> f32 {
        match self.state {
            LocomotionState::Sliding => self.config.sliding_height,
            _ => self.config.standing_height,
        }
    }

    /// Applies one movement intent.
    ///
    /// Jumps and slides are honored only while grounded; lane shifts clamp to
    /// the lane range and retarget the lateral approach in any state.
    pub fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Jump => {
                if self.state == LocomotionState::Grounded {
                    self.state = LocomotionState::Jumping;
                    self.vertical_velocity = self.config.jump_impulse;
                }
            }
            Intent::Slide => {
                if self.state == LocomotionState::Grounded {
                    self.state = LocomotionState::Sliding;
                    self.slide_deadline =
                        Some(self.clock.saturating_add(self.config.slide_duration));
                }
            }
            Intent::MoveLane(shift) => self.shift_lane(shift),
        }
    }

    fn shift_lane(&mut self, shift: LaneShift) {
        let last = self.config.lane_positions.len().saturating_sub(1) as i64;
        let target = (i64::from(self.lane) + shift.offset()).clamp(0, last);
        self.lane = target as u32;
    }

    /// Advances the machine by one tick of simulated time.
    ///
    /// `ground_contact` reports whether the surface check under the subject
    /// succeeded this tick; losing it drops a grounded or sliding subject
    /// into a fall.
    pub fn step(&mut self, dt: Duration, ground_contact: bool) {
        let seconds = dt.as_secs_f32();
        self.clock = self.clock.saturating_add(dt);

        self.z += self.config.move_speed * seconds;
        self.approach_lane(seconds);

        match self.state {
            LocomotionState::Grounded => {
                if !ground_contact {
                    self.state = LocomotionState::Falling;
                }
            }
            LocomotionState::Jumping => {
                self.integrate_vertical(seconds);
                if self.vertical_velocity <= 0.0 {
                    self.state = LocomotionState::Falling;
                }
            }
            LocomotionState::Falling => {
                self.integrate_vertical(seconds);
                if ground_contact && self.y <= 0.0 {
                    self.y = 0.0;
                    self.vertical_velocity = 0.0;
                    self.state = LocomotionState::Grounded;
                }
            }
            LocomotionState::Sliding => {
                if !ground_contact {
                    self.slide_deadline = None;
                    self.state = LocomotionState::Falling;
                    return;
                }
                let expired = self
                    .slide_deadline
                    .is_some_and(|deadline| self.clock >= deadline);
                if expired {
                    self.slide_deadline = None;
                    self.state = LocomotionState::Grounded;
                }
            }
        }
    }

    fn integrate_vertical(&mut self, seconds: f32) {
        self.vertical_velocity += self.config.gravity * seconds;
        self.y += self.vertical_velocity * seconds;
    }

    fn approach_lane(&mut self, seconds: f32) {
        let target = lane_position(&self.config, self.lane);
        let max_step = self.config.lane_switch_speed * seconds;
        let delta = target - self.x;
        if delta.abs() <= max_step {
            self.x = target;
        } else {
            self.x += max_step.copysign(delta);
        }
    }

    /// Resolves a contact with an obstacle of the provided kind.
    ///
    /// The outcome is discrete; a failed contact is the caller's signal to
    /// end the run, never an internal error.
    #[must_use]
    pub fn resolve_contact(&self, kind: ObstacleKind) -> ContactOutcome {
        let cleared = match kind.required_evasion() {
            Evasion::Jump => matches!(
                self.state,
                LocomotionState::Jumping | LocomotionState::Falling
            ),
            Evasion::Slide => self.state == LocomotionState::Sliding,
            Evasion::ChangeLane => false,
        };
        if cleared {
            ContactOutcome::Cleared
        } else {
            ContactOutcome::Failed
        }
    }
}

fn lane_position(config: &Config, lane: u32) -> f32 {
    config
        .lane_positions
        .get(lane as usize)
        .copied()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::{Config, LocomotionStateMachine};
    use lane_runner_core::{
        ContactOutcome, Intent, LaneIndex, LaneShift, LocomotionState, ObstacleKind,
    };
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(20);

    fn machine() -> LocomotionStateMachine {
        LocomotionStateMachine::new(Config::default())
    }

    fn step_for(machine: &mut LocomotionStateMachine, total: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            machine.step(TICK, true);
            elapsed += TICK;
        }
    }

    #[test]
    fn starts_grounded_in_the_middle_lane() {
        let machine = machine();
        assert_eq!(machine.state(), LocomotionState::Grounded);
        assert_eq!(machine.lane(), LaneIndex::new(1));
        assert_eq!(machine.position().x, 0.0);
        assert_eq!(machine.position().y, 0.0);
    }

    #[test]
    fn jump_rises_then_falls_back_to_ground() {
        let mut machine = machine();
        machine.apply_intent(Intent::Jump);
        assert_eq!(machine.state(), LocomotionState::Jumping);

        machine.step(TICK, true);
        assert!(machine.position().y > 0.0);

        // Impulse 12 against gravity 30 turns over after 0.4 s.
        step_for(&mut machine, Duration::from_millis(480));
        assert_eq!(machine.state(), LocomotionState::Falling);

        step_for(&mut machine, Duration::from_secs(1));
        assert_eq!(machine.state(), LocomotionState::Grounded);
        assert_eq!(machine.position().y, 0.0);
    }

    #[test]
    fn jump_intent_is_ignored_while_airborne() {
        let mut machine = machine();
        machine.apply_intent(Intent::Jump);
        step_for(&mut machine, Duration::from_millis(200));
        let mid_jump_y = machine.position().y;

        machine.apply_intent(Intent::Jump);
        machine.step(TICK, true);
        // Velocity keeps decaying instead of resetting to the full impulse.
        assert!(machine.position().y - mid_jump_y < 12.0 * TICK.as_secs_f32());
    }

    #[test]
    fn slide_ends_at_its_deadline() {
        let mut machine = machine();
        machine.apply_intent(Intent::Slide);
        assert_eq!(machine.state(), LocomotionState::Sliding);
        assert_eq!(machine.collider_height(), 1.0);

        step_for(&mut machine, Duration::from_millis(900));
        assert_eq!(machine.state(), LocomotionState::Sliding);

        step_for(&mut machine, Duration::from_millis(200));
        assert_eq!(machine.state(), LocomotionState::Grounded);
        assert_eq!(machine.collider_height(), 2.0);
    }

    #[test]
    fn slide_intent_is_ignored_while_airborne() {
        let mut machine = machine();
        machine.apply_intent(Intent::Jump);
        machine.step(TICK, true);
        machine.apply_intent(Intent::Slide);
        assert_eq!(machine.state(), LocomotionState::Jumping);
    }

    #[test]
    fn losing_ground_contact_drops_into_a_fall() {
        let mut runner = machine();
        runner.step(TICK, false);
        assert_eq!(runner.state(), LocomotionState::Falling);
    }

    #[test]
    fn slide_interrupted_by_contact_loss_falls_instead_of_standing() {
        let mut runner = machine();
        runner.apply_intent(Intent::Slide);
        runner.step(TICK, false);
        assert_eq!(runner.state(), LocomotionState::Falling);

        // Regaining contact at ground height stands the subject back up.
        runner.step(TICK, true);
        assert_eq!(runner.state(), LocomotionState::Grounded);
    }

    #[test]
    fn lane_shifts_clamp_to_the_outer_lanes() {
        let mut machine = machine();
        machine.apply_intent(Intent::MoveLane(LaneShift::Left));
        machine.apply_intent(Intent::MoveLane(LaneShift::Left));
        assert_eq!(machine.lane(), LaneIndex::new(0));

        for _ in 0..5 {
            machine.apply_intent(Intent::MoveLane(LaneShift::Right));
        }
        assert_eq!(machine.lane(), LaneIndex::new(2));
    }

    #[test]
    fn lateral_approach_reaches_the_target_without_overshoot() {
        let mut machine = machine();
        machine.apply_intent(Intent::MoveLane(LaneShift::Right));

        let mut previous = machine.position().x;
        step_for(&mut machine, Duration::from_secs(1));
        loop {
            let x = machine.position().x;
            assert!(x >= previous);
            assert!(x <= 2.5);
            if x == 2.5 {
                break;
            }
            previous = x;
            machine.step(TICK, true);
        }
    }

    #[test]
    fn forward_motion_continues_in_every_state() {
        let mut machine = machine();
        let start = machine.position().z;
        machine.apply_intent(Intent::Jump);
        step_for(&mut machine, Duration::from_secs(1));
        let after_jump = machine.position().z;
        assert!(after_jump > start);

        machine.apply_intent(Intent::Slide);
        step_for(&mut machine, Duration::from_millis(500));
        assert!(machine.position().z > after_jump);
    }

    #[test]
    fn contact_resolution_follows_the_evasion_table() {
        let mut machine = machine();
        assert_eq!(
            machine.resolve_contact(ObstacleKind::Wide),
            ContactOutcome::Failed
        );
        assert_eq!(
            machine.resolve_contact(ObstacleKind::Long),
            ContactOutcome::Failed
        );

        machine.apply_intent(Intent::Jump);
        assert_eq!(
            machine.resolve_contact(ObstacleKind::Wide),
            ContactOutcome::Cleared
        );
        assert_eq!(
            machine.resolve_contact(ObstacleKind::High),
            ContactOutcome::Failed
        );
        assert_eq!(
            machine.resolve_contact(ObstacleKind::Long),
            ContactOutcome::Failed
        );

        step_for(&mut machine, Duration::from_secs(2));
        machine.apply_intent(Intent::Slide);
        assert_eq!(
            machine.resolve_contact(ObstacleKind::High),
            ContactOutcome::Cleared
        );
        assert_eq!(
            machine.resolve_contact(ObstacleKind::Wide),
            ContactOutcome::Failed
        );
    }

    #[test]
    fn every_state_accepts_every_intent_without_invalid_transitions() {
        let intents = [
            Intent::Jump,
            Intent::Slide,
            Intent::MoveLane(LaneShift::Left),
            Intent::MoveLane(LaneShift::Right),
        ];
        let valid = [
            LocomotionState::Grounded,
            LocomotionState::Jumping,
            LocomotionState::Falling,
            LocomotionState::Sliding,
        ];

        let mut machine = machine();
        for round in 0..200 {
            machine.apply_intent(intents[round % intents.len()]);
            machine.step(TICK, true);
            assert!(valid.contains(&machine.state()));
            assert!(machine.position().y >= 0.0);
        }
    }
}
