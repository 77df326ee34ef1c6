#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives an unattended Lane Runner session.
//!
//! The driver wires the streaming scheduler, the track populator, and the
//! locomotion machine around the authoritative world, runs a fixed-length
//! simulation with a simple look-ahead autopilot, and prints a run summary.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use lane_runner_core::{
    CellCoord, CellIndex, Command, ContactOutcome, Evasion, Event, Intent, LaneIndex, LaneShift,
    ObstacleKind, SegmentId, TrackConfig,
};
use lane_runner_system_generation::{Config as PopulatorConfig, TrackPopulator};
use lane_runner_system_locomotion::{Config as LocomotionConfig, LocomotionStateMachine};
use lane_runner_system_streaming::SegmentScheduler;
use lane_runner_world::{apply, query, World};

/// Runs an unattended Lane Runner session and prints its statistics.
#[derive(Debug, Parser)]
#[command(name = "lane-runner")]
struct Args {
    /// Seed for the track generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Simulated run length in seconds.
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// Tick length in milliseconds.
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,

    /// Overrides the probability of attempting an obstacle per visited cell.
    #[arg(long)]
    obstacle_chance: Option<f32>,

    /// Overrides the probability of placing a coin per visited cell.
    #[arg(long)]
    coin_chance: Option<f32>,
}

#[derive(Debug, Default)]
struct RunStats {
    segments_generated: u64,
    segments_recycled: u64,
    wide_obstacles: u64,
    high_obstacles: u64,
    long_obstacles: u64,
    coins_placed: u64,
    coins_collected: u64,
    placements_rejected: u64,
}

impl RunStats {
    fn note(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::SegmentGenerated { .. } => self.segments_generated += 1,
                Event::SegmentRecycled { .. } => self.segments_recycled += 1,
                Event::ObstaclePlaced { kind, .. } => match kind {
                    ObstacleKind::Wide => self.wide_obstacles += 1,
                    ObstacleKind::High => self.high_obstacles += 1,
                    ObstacleKind::Long => self.long_obstacles += 1,
                },
                Event::CoinPlaced { .. } => self.coins_placed += 1,
                Event::CoinCollected { .. } => self.coins_collected += 1,
                Event::ObstaclePlacementRejected { .. }
                | Event::CoinPlacementRejected { .. } => self.placements_rejected += 1,
                Event::TrackConfigured
                | Event::TimeAdvanced { .. }
                | Event::SubjectAdvanced { .. } => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = TrackConfig::default();
    if let Some(chance) = args.obstacle_chance {
        config.obstacle_chance = chance;
    }
    if let Some(chance) = args.coin_chance {
        config.coin_chance = chance;
    }
    config.validate()?;

    let mut world = World::new();
    let mut scheduler = SegmentScheduler::new();
    let mut populator = TrackPopulator::new(PopulatorConfig::new(args.seed));
    let mut machine = LocomotionStateMachine::new(LocomotionConfig {
        lane_positions: config.lane_positions.clone(),
        ..LocomotionConfig::default()
    });
    let mut stats = RunStats::default();

    let dt = Duration::from_millis(args.tick_ms);
    let ticks = (args.seconds / dt.as_secs_f32()).ceil() as u64;

    // Prime the run: configure the track and build the lookahead window.
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::ConfigureTrack {
            config: config.clone(),
        },
        &mut events,
    );
    pump_systems(&mut world, &mut scheduler, &mut populator, &mut events);
    stats.note(&events);

    let mut ended_by_contact = false;
    for _ in 0..ticks {
        let mut events = Vec::new();
        apply(&mut world, Command::Tick { dt }, &mut events);

        autopilot(&world, &config, &mut machine);
        machine.step(dt, true);
        apply(
            &mut world,
            Command::AdvanceSubject {
                z: machine.position().z,
            },
            &mut events,
        );

        pump_systems(&mut world, &mut scheduler, &mut populator, &mut events);

        if let Some((segment, cell)) = subject_cell(&world, &config, &machine) {
            collect_coins(&mut world, segment, cell, &mut events);
            if let Some(kind) = query::obstacle_in_cell(&world, segment, cell) {
                if machine.resolve_contact(kind) == ContactOutcome::Failed {
                    stats.note(&events);
                    ended_by_contact = true;
                    break;
                }
            }
        }
        stats.note(&events);
    }

    print_summary(&stats, &machine, ended_by_contact);
    Ok(())
}

/// Lets the scheduler and populator react to this tick's events, applying
/// their commands in order and folding the produced events back into the log.
fn pump_systems(
    world: &mut World,
    scheduler: &mut SegmentScheduler,
    populator: &mut TrackPopulator,
    events: &mut Vec<Event>,
) {
    let mut commands = Vec::new();
    scheduler.handle(events, &query::track_status(world), &mut commands);
    for command in commands {
        apply(world, command, events);
    }

    let mut commands = Vec::new();
    let track = query::track_config(world).clone();
    populator.handle(events, &track, query::clock(world), &mut commands);
    for command in commands {
        apply(world, command, events);
    }
}

/// Issues the evasion intent for the nearest obstacle ahead in the subject's
/// lane, two cells before contact.
fn autopilot(world: &World, config: &TrackConfig, machine: &mut LocomotionStateMachine) {
    let Some((segment, cell)) = subject_cell(world, config, machine) else {
        return;
    };
    let Some((segment, cell)) = advance_cell(world, config, segment, cell, 2) else {
        return;
    };
    let ahead = CellCoord::new(machine.lane(), cell.cell());
    let Some(kind) = query::obstacle_in_cell(world, segment, ahead) else {
        return;
    };

    match kind.required_evasion() {
        Evasion::Jump => machine.apply_intent(Intent::Jump),
        Evasion::Slide => machine.apply_intent(Intent::Slide),
        Evasion::ChangeLane => {
            let shift = free_shift(world, config, segment, ahead);
            machine.apply_intent(Intent::MoveLane(shift));
        }
    }
}

/// Picks the lateral shift whose destination lane is obstacle-free in the
/// probed cell, preferring left when both are blocked or both are open.
fn free_shift(
    world: &World,
    config: &TrackConfig,
    segment: SegmentId,
    ahead: CellCoord,
) -> LaneShift {
    let lane = ahead.lane().get();
    for (candidate, shift) in [
        (lane.checked_sub(1), LaneShift::Left),
        (lane.checked_add(1), LaneShift::Right),
    ] {
        let Some(candidate) = candidate else {
            continue;
        };
        if candidate >= config.lane_count() {
            continue;
        }
        let probe = CellCoord::new(LaneIndex::new(candidate), ahead.cell());
        if query::obstacle_in_cell(world, segment, probe).is_none() {
            return shift;
        }
    }
    LaneShift::Left
}

/// Locates the active segment and sub-cell under the subject, if any.
fn subject_cell(
    world: &World,
    config: &TrackConfig,
    machine: &LocomotionStateMachine,
) -> Option<(SegmentId, CellCoord)> {
    let z = machine.position().z;
    let snapshot = query::segment_view(world)
        .into_iter()
        .find(|snapshot| z >= snapshot.start_z && z < snapshot.start_z + config.segment_length)?;
    let cell = ((z - snapshot.start_z) / config.cell_length()) as u32;
    let cell = cell.min(config.cells_per_segment.saturating_sub(1));
    Some((
        snapshot.id,
        CellCoord::new(machine.lane(), CellIndex::new(cell)),
    ))
}

/// Steps a cell coordinate forward along the track, crossing into the next
/// segment when the offset runs past the end of the current one.
fn advance_cell(
    world: &World,
    config: &TrackConfig,
    segment: SegmentId,
    cell: CellCoord,
    offset: u32,
) -> Option<(SegmentId, CellCoord)> {
    let mut index = cell.cell().get() + offset;
    let mut segment = segment;
    while index >= config.cells_per_segment {
        index -= config.cells_per_segment;
        segment = SegmentId::new(segment.get() + 1);
    }
    if query::segment_view(world)
        .iter()
        .any(|snapshot| snapshot.id == segment)
    {
        Some((segment, CellCoord::new(cell.lane(), CellIndex::new(index))))
    } else {
        None
    }
}

/// Collects every uncollected coin sitting in the subject's cell.
fn collect_coins(world: &mut World, segment: SegmentId, cell: CellCoord, events: &mut Vec<Event>) {
    let coins: Vec<_> = query::coin_view(world)
        .into_iter()
        .filter(|coin| coin.segment == segment && coin.cell == cell && !coin.collected)
        .map(|coin| coin.id)
        .collect();
    for coin in coins {
        apply(world, Command::CollectCoin { coin }, events);
    }
}

fn print_summary(stats: &RunStats, machine: &LocomotionStateMachine, ended_by_contact: bool) {
    let position = machine.position();
    println!("run over");
    println!("  distance            {:>10.1}", position.z);
    println!(
        "  outcome             {:>10}",
        if ended_by_contact { "crashed" } else { "survived" }
    );
    println!("  final state         {:>10?}", machine.state());
    println!("  segments generated  {:>10}", stats.segments_generated);
    println!("  segments recycled   {:>10}", stats.segments_recycled);
    println!("  wide obstacles      {:>10}", stats.wide_obstacles);
    println!("  high obstacles      {:>10}", stats.high_obstacles);
    println!("  long obstacles      {:>10}", stats.long_obstacles);
    println!("  coins placed        {:>10}", stats.coins_placed);
    println!("  coins collected     {:>10}", stats.coins_collected);
    println!("  placements rejected {:>10}", stats.placements_rejected);
}
