//! Integration tests for the step pulse generator.
//!
//! These drive the tick the way the platform timer would and observe the
//! pulses, directions and timer periods through mock pin sinks.

use step_pulse::config::DualCarriageConfig;
use step_pulse::{
    timer_for_rate, Axis, Block, BlockBuilder, Direction, EndstopSwitch, Kinematics,
    MachineConfig, PinSinks, Stepper, StepTimer, StepperChannel,
};

// =============================================================================
// Mock board and timer
// =============================================================================

fn channel_index(channel: StepperChannel) -> usize {
    match channel {
        StepperChannel::X => 0,
        StepperChannel::X2 => 1,
        StepperChannel::Y => 2,
        StepperChannel::Z => 3,
        StepperChannel::Z2 => 4,
        StepperChannel::E0 => 5,
        StepperChannel::E1 => 6,
        StepperChannel::E2 => 7,
    }
}

/// Records pulses and replays scripted endstop readings.
#[derive(Default)]
struct MockBoard {
    pulses: [u32; 8],
    asserted: [bool; 8],
    directions: [Option<Direction>; 8],
    enabled: [bool; 8],
    endstop_script: [Vec<bool>; 6],
    endstop_cursor: [usize; 6],
}

impl MockBoard {
    fn new() -> Self {
        Self::default()
    }

    fn pulses(&self, channel: StepperChannel) -> u32 {
        self.pulses[channel_index(channel)]
    }

    fn direction(&self, channel: StepperChannel) -> Option<Direction> {
        self.directions[channel_index(channel)]
    }

    fn enabled(&self, channel: StepperChannel) -> bool {
        self.enabled[channel_index(channel)]
    }

    fn script_endstop(&mut self, switch: EndstopSwitch, readings: &[bool]) {
        self.endstop_script[switch.index()] = readings.to_vec();
        self.endstop_cursor[switch.index()] = 0;
    }

    fn endstop_reads(&self, switch: EndstopSwitch) -> usize {
        self.endstop_cursor[switch.index()]
    }
}

impl PinSinks for MockBoard {
    fn assert_step(&mut self, channel: StepperChannel) {
        let i = channel_index(channel);
        if !self.asserted[i] {
            self.pulses[i] += 1;
        }
        self.asserted[i] = true;
    }

    fn release_step(&mut self, channel: StepperChannel) {
        self.asserted[channel_index(channel)] = false;
    }

    fn set_direction(&mut self, channel: StepperChannel, direction: Direction) {
        self.directions[channel_index(channel)] = Some(direction);
    }

    fn set_enabled(&mut self, channel: StepperChannel, enabled: bool) {
        self.enabled[channel_index(channel)] = enabled;
    }

    fn read_endstop(&mut self, switch: EndstopSwitch) -> bool {
        let i = switch.index();
        let reading = self
            .endstop_script[i]
            .get(self.endstop_cursor[i])
            .copied()
            .unwrap_or(false);
        self.endstop_cursor[i] += 1;
        reading
    }
}

/// Records every armed period; the last one is what a real timer would fire.
#[derive(Default)]
struct MockTimer {
    armed: Vec<u32>,
}

impl MockTimer {
    fn new() -> Self {
        Self::default()
    }

    fn last_armed(&self) -> u32 {
        self.armed.last().copied().expect("timer never armed")
    }
}

impl StepTimer for MockTimer {
    fn arm(&mut self, delay_us: u32) {
        self.armed.push(delay_us);
    }

    fn cancel(&mut self) {}
}

// =============================================================================
// Helpers
// =============================================================================

const CEILING: u32 = 40_000;

fn make_stepper(config: MachineConfig) -> Stepper<MockBoard, MockTimer> {
    let mut stepper = Stepper::new(MockBoard::new(), MockTimer::new(), config);
    stepper.init();
    stepper
}

/// Planner scaling: steps/s² to the shifted acceleration factor.
fn scaled_acceleration(steps_per_s2: u32) -> u32 {
    ((steps_per_s2 as u64) * (1 << 24) / 1_000_000) as u32
}

fn cruise_block(steps: [i32; 4], rate: u16) -> Block {
    BlockBuilder::new()
        .steps(steps)
        .rates(rate, rate, rate)
        .build()
        .unwrap()
}

/// Tick until the current block (and everything queued) is done.
fn run_to_completion(stepper: &mut Stepper<MockBoard, MockTimer>) -> u32 {
    let mut ticks = 0;
    while stepper.blocks_queued() {
        stepper.tick();
        ticks += 1;
        assert!(ticks < 2_000_000, "generator never finished");
    }
    ticks
}

// =============================================================================
// Scenario 1: pure X move, no acceleration phase
// =============================================================================

#[test]
fn pure_x_move_constant_rate() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([100, 0, 0, 0], 1000)).unwrap();

    let expected_period = u32::from(timer_for_rate(1000, CEILING).period_us);
    let mut ticks = 0;
    while stepper.blocks_queued() {
        stepper.tick();
        ticks += 1;
        assert_eq!(stepper.timer().last_armed(), expected_period);
        assert!(ticks <= 100);
    }

    assert_eq!(ticks, 100);
    assert_eq!(stepper.board().pulses(StepperChannel::X), 100);
    assert_eq!(stepper.board().pulses(StepperChannel::Y), 0);
    assert_eq!(stepper.board().pulses(StepperChannel::Z), 0);
    assert_eq!(stepper.board().pulses(StepperChannel::E0), 0);
    assert_eq!(stepper.position(Axis::X), 100);
    assert_eq!(stepper.position(Axis::Y), 0);
    assert_eq!(stepper.position(Axis::Z), 0);
    assert_eq!(stepper.position(Axis::E), 0);
}

// =============================================================================
// Scenario 2: 3-4-5 diagonal
// =============================================================================

#[test]
fn diagonal_3_4_5() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([3, 4, 0, 0], 1000)).unwrap();

    // With counters seeded to -(4/2) = -2 the X accumulator crosses zero on
    // events 1, 3 and 4.
    let mut x_events = Vec::new();
    for event in 1..=4 {
        let before = stepper.board().pulses(StepperChannel::X);
        stepper.tick();
        if stepper.board().pulses(StepperChannel::X) > before {
            x_events.push(event);
        }
        assert_eq!(stepper.board().pulses(StepperChannel::Y), event);
    }

    assert_eq!(x_events, vec![1, 3, 4]);
    assert_eq!(stepper.board().pulses(StepperChannel::X), 3);
    assert_eq!(stepper.board().pulses(StepperChannel::Y), 4);
    assert!(!stepper.blocks_queued());
}

// =============================================================================
// Scenario 3: trapezoid profile
// =============================================================================

#[test]
fn trapezoid_reaches_and_holds_nominal() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .enqueue(
            BlockBuilder::new()
                .steps([1000, 0, 0, 0])
                .rates(200, 2000, 200)
                .acceleration(scaled_acceleration(22_000))
                .phases(100, 900)
                .build()
                .unwrap(),
        )
        .unwrap();

    let nominal_period = u32::from(timer_for_rate(2000, CEILING).period_us);
    let final_period = u32::from(timer_for_rate(200, CEILING).period_us);

    let mut first_at_nominal = None;
    let mut event = 0;
    while stepper.blocks_queued() {
        stepper.tick();
        event += 1;
        let period = stepper.timer().last_armed();
        if period == nominal_period && first_at_nominal.is_none() {
            first_at_nominal = Some(event);
        }
        if (100..=900).contains(&event) {
            assert_eq!(period, nominal_period, "not pegged at nominal at event {event}");
        }
        assert!(event <= 1000);
    }

    // Ramp tops out at or before the end of the acceleration phase.
    assert!(first_at_nominal.expect("never reached nominal") <= 100);
    // Decelerated back to the exit rate by the end of the block.
    assert_eq!(stepper.timer().last_armed(), final_period);
    assert_eq!(stepper.position(Axis::X), 1000);
}

#[test]
fn trapezoid_duration_matches_profile() {
    // Longer variant of the same shape so phase-boundary quantisation stays
    // well below the tolerance.
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .enqueue(
            BlockBuilder::new()
                .steps([10_000, 0, 0, 0])
                .rates(200, 2000, 200)
                .acceleration(scaled_acceleration(2_200))
                .phases(1000, 9000)
                .build()
                .unwrap(),
        )
        .unwrap();

    let mut total_us: u64 = 0;
    while stepper.blocks_queued() {
        stepper.tick();
        total_us += u64::from(stepper.timer().last_armed());
    }

    // Accelerate 200->2000 at 2200 steps/s²: 818.2 ms over 900 steps, then
    // 100 steps at 2000. Cruise 8000 steps. Decelerate mirrors the ramp with
    // its 100-step tail at 200 steps/s.
    let accel = 1800.0 / 2200.0 + 100.0 / 2000.0;
    let cruise = 8000.0 / 2000.0;
    let decel = 1800.0 / 2200.0 + 100.0 / 200.0;
    let expected_us = (accel + cruise + decel) * 1_000_000.0;

    let error = (total_us as f64 - expected_us).abs() / expected_us;
    assert!(error < 0.01, "duration off by {:.2}%", error * 100.0);
}

// =============================================================================
// Scenario 4: high-rate step batching
// =============================================================================

#[test]
fn high_rate_steps_four_per_interrupt() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([400, 0, 0, 0], 30_000)).unwrap();

    let timing = timer_for_rate(30_000, CEILING);
    assert_eq!(timing.step_loops, 4);
    assert_eq!(
        timing.period_us,
        timer_for_rate(7_500, CEILING).period_us,
        "nominal period comes from the reduced rate"
    );

    let mut last = 0;
    while stepper.blocks_queued() {
        stepper.tick();
        assert_eq!(stepper.timer().last_armed(), u32::from(timing.period_us));
        let pulses = stepper.board().pulses(StepperChannel::X);
        assert_eq!(pulses - last, 4, "expected 4 pulses per interrupt");
        last = pulses;
    }
    assert_eq!(stepper.position(Axis::X), 400);
}

// =============================================================================
// Scenario 5: endstop debounce
// =============================================================================

#[test]
fn endstop_two_sample_debounce() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::XMin, &[false, true, false, true, true]);
    stepper.enqueue(cruise_block([-100, 0, 0, 0], 1000)).unwrap();

    for _ in 0..4 {
        stepper.tick();
        assert!(!stepper.endstop_hit(Axis::X));
    }
    assert_eq!(stepper.position(Axis::X), -4);

    // Fifth sample pairs with the fourth: latch, record, truncate.
    stepper.tick();
    assert!(stepper.endstop_hit(Axis::X));
    assert_eq!(stepper.endstop_trigger_position(Axis::X), -4);
    assert_eq!(stepper.position(Axis::X), -4, "no step after truncation");
    assert!(!stepper.has_active_block());
    assert!(!stepper.blocks_queued());
}

#[test]
fn endstop_ignored_when_disabled() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::XMin, &[true; 200]);
    stepper.enable_endstops(false);
    stepper.enqueue(cruise_block([-100, 0, 0, 0], 1000)).unwrap();

    run_to_completion(&mut stepper);
    assert!(!stepper.endstop_hit(Axis::X));
    assert_eq!(stepper.position(Axis::X), -100);
    assert_eq!(stepper.board().endstop_reads(EndstopSwitch::XMin), 0);
}

#[test]
fn endstop_only_sampled_toward_travel() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::XMin, &[true; 200]);
    // Moving +X: the min switch is never consulted, the max switch is.
    stepper.enqueue(cruise_block([100, 0, 0, 0], 1000)).unwrap();

    run_to_completion(&mut stepper);
    assert!(!stepper.endstop_hit(Axis::X));
    assert_eq!(stepper.board().endstop_reads(EndstopSwitch::XMin), 0);
    assert_eq!(stepper.board().endstop_reads(EndstopSwitch::XMax), 100);
}

// =============================================================================
// Scenario 6: quick stop
// =============================================================================

#[test]
fn quick_stop_abandons_everything() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([100, 0, 0, 0], 1000)).unwrap();
    stepper.enqueue(cruise_block([50, 0, 0, 0], 1000)).unwrap();

    for _ in 0..10 {
        stepper.tick();
    }
    assert!(stepper.has_active_block());

    stepper.quick_stop();
    assert!(!stepper.has_active_block());
    assert!(!stepper.blocks_queued());

    // Next tick idles at the 1 ms self-rearm without touching a pin.
    let pulses_before = stepper.board().pulses(StepperChannel::X);
    stepper.tick();
    assert_eq!(stepper.timer().last_armed(), 1000);
    assert_eq!(stepper.board().pulses(StepperChannel::X), pulses_before);

    // A fresh block starts cleanly.
    stepper.enqueue(cruise_block([0, 20, 0, 0], 1000)).unwrap();
    run_to_completion(&mut stepper);
    assert_eq!(stepper.board().pulses(StepperChannel::Y), 20);
}

// =============================================================================
// Position round trips
// =============================================================================

#[test]
fn set_position_round_trips_across_idle_ticks() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.set_position(10, -20, 30, -40);

    for _ in 0..5 {
        stepper.tick(); // idle ticks must not disturb the counters
    }

    assert_eq!(stepper.position(Axis::X), 10);
    assert_eq!(stepper.position(Axis::Y), -20);
    assert_eq!(stepper.position(Axis::Z), 30);
    assert_eq!(stepper.position(Axis::E), -40);

    stepper.set_e_position(7);
    assert_eq!(stepper.position(Axis::E), 7);
    assert_eq!(stepper.position(Axis::X), 10);
}

#[test]
fn out_and_back_returns_to_start() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.set_position(500, 0, 0, 0);

    stepper.enqueue(cruise_block([75, 0, 0, 0], 2000)).unwrap();
    stepper.enqueue(cruise_block([-75, 0, 0, 0], 2000)).unwrap();
    run_to_completion(&mut stepper);

    assert_eq!(stepper.position(Axis::X), 500);
    assert_eq!(stepper.board().pulses(StepperChannel::X), 150);
}

// =============================================================================
// Bresenham distribution
// =============================================================================

#[test]
fn step_counts_match_block_on_all_axes() {
    for steps in [
        [100i32, 33, 7, 54],
        [-10, 255, -255, 1],
        [1, 1, 1, 1],
        [0, 0, 17, 0],
    ] {
        let mut stepper = make_stepper(MachineConfig::default());
        stepper.enqueue(cruise_block(steps, 2000)).unwrap();
        run_to_completion(&mut stepper);

        for axis in Axis::ALL {
            assert_eq!(
                stepper.position(axis),
                steps[axis.index()],
                "axis {:?} of {:?}",
                axis,
                steps
            );
        }
        assert_eq!(
            stepper.board().pulses(StepperChannel::X),
            steps[0].unsigned_abs()
        );
        assert_eq!(
            stepper.board().pulses(StepperChannel::Y),
            steps[1].unsigned_abs()
        );
        assert_eq!(
            stepper.board().pulses(StepperChannel::Z),
            steps[2].unsigned_abs()
        );
        assert_eq!(
            stepper.board().pulses(StepperChannel::E0),
            steps[3].unsigned_abs()
        );
    }
}

#[test]
fn bresenham_gaps_are_fair() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([3, 10, 0, 0], 1000)).unwrap();

    let max_gap = 10u32.div_ceil(3);
    let mut last_step_event = 0u32;
    for event in 1..=10u32 {
        let before = stepper.board().pulses(StepperChannel::X);
        stepper.tick();
        if stepper.board().pulses(StepperChannel::X) > before {
            assert!(
                event - last_step_event <= max_gap,
                "gap of {} events before event {}",
                event - last_step_event,
                event
            );
            last_step_event = event;
        }
    }
    assert_eq!(stepper.board().pulses(StepperChannel::X), 3);
}

// =============================================================================
// Kinematics and routing
// =============================================================================

#[test]
fn corexy_endstops_follow_cartesian_travel() {
    let mut config = MachineConfig::default();
    config.machine.kinematics = Kinematics::CoreXy;
    let mut stepper = make_stepper(config);
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::YMin, &[true; 200]);
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::XMin, &[true; 200]);

    // A negative, B positive: cartesian -Y travel. Both motors step.
    stepper.enqueue(cruise_block([-40, 40, 0, 0], 1000)).unwrap();
    for _ in 0..3 {
        stepper.tick();
    }

    assert!(stepper.endstop_hit(Axis::Y));
    assert!(!stepper.endstop_hit(Axis::X));
    // -X needs both A and B negative, so the X min switch was never read.
    assert_eq!(stepper.board().endstop_reads(EndstopSwitch::XMin), 0);
}

#[test]
fn dual_x_routes_by_active_extruder() {
    let mut config = MachineConfig::default();
    config.dual_x_carriage = Some(DualCarriageConfig {
        x_home_dir: -1,
        x2_home_dir: 1,
    });
    let mut stepper = make_stepper(config);

    stepper
        .enqueue(
            BlockBuilder::new()
                .steps([30, 0, 0, 0])
                .rates(1000, 1000, 1000)
                .extruder(1)
                .build()
                .unwrap(),
        )
        .unwrap();
    run_to_completion(&mut stepper);

    assert_eq!(stepper.board().pulses(StepperChannel::X), 0);
    assert_eq!(stepper.board().pulses(StepperChannel::X2), 30);
    assert_eq!(stepper.board().direction(StepperChannel::X2), Some(Direction::Positive));
}

#[test]
fn dual_x_duplication_drives_both_carriages() {
    let mut config = MachineConfig::default();
    config.dual_x_carriage = Some(DualCarriageConfig::default());
    let mut stepper = make_stepper(config);
    stepper.set_duplication(true);

    stepper.enqueue(cruise_block([25, 0, 0, 0], 1000)).unwrap();
    run_to_completion(&mut stepper);

    assert_eq!(stepper.board().pulses(StepperChannel::X), 25);
    assert_eq!(stepper.board().pulses(StepperChannel::X2), 25);
}

#[test]
fn dual_x_endstop_gated_by_homing_direction() {
    let mut config = MachineConfig::default();
    config.dual_x_carriage = Some(DualCarriageConfig {
        x_home_dir: -1,
        x2_home_dir: 1,
    });
    let mut stepper = make_stepper(config);
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::XMin, &[true; 200]);

    // Carriage 1 homes toward +X, so -X travel never consults the min switch.
    stepper
        .enqueue(
            BlockBuilder::new()
                .steps([-40, 0, 0, 0])
                .rates(1000, 1000, 1000)
                .extruder(1)
                .build()
                .unwrap(),
        )
        .unwrap();
    run_to_completion(&mut stepper);

    assert!(!stepper.endstop_hit(Axis::X));
    assert_eq!(stepper.board().endstop_reads(EndstopSwitch::XMin), 0);
    assert_eq!(stepper.position(Axis::X), -40);
}

#[test]
fn dual_z_mirrors_z_channel() {
    let mut config = MachineConfig::default();
    config.features.z_dual_stepper_drivers = true;
    let mut stepper = make_stepper(config);

    stepper.enqueue(cruise_block([0, 0, 12, 0], 400)).unwrap();
    run_to_completion(&mut stepper);

    assert_eq!(stepper.board().pulses(StepperChannel::Z), 12);
    assert_eq!(stepper.board().pulses(StepperChannel::Z2), 12);
    assert_eq!(
        stepper.board().direction(StepperChannel::Z2),
        Some(Direction::Positive)
    );
}

#[test]
fn z_late_enable_stalls_before_first_step() {
    let mut config = MachineConfig::default();
    config.features.z_late_enable = true;
    let mut stepper = make_stepper(config);
    assert!(!stepper.board().enabled(StepperChannel::Z));

    stepper.enqueue(cruise_block([0, 0, 10, 0], 400)).unwrap();

    // First tick enables the driver and stalls instead of stepping.
    stepper.tick();
    assert!(stepper.board().enabled(StepperChannel::Z));
    assert!(stepper.has_active_block());
    assert_eq!(stepper.board().pulses(StepperChannel::Z), 0);
    assert_eq!(stepper.timer().last_armed(), 1000);

    // Second tick starts stepping.
    stepper.tick();
    assert_eq!(stepper.board().pulses(StepperChannel::Z), 1);

    run_to_completion(&mut stepper);
    assert_eq!(stepper.position(Axis::Z), 10);
}

// =============================================================================
// Advance compensator
// =============================================================================

fn advance_config() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.features.advance = true;
    config
}

#[test]
fn advance_diverts_extruder_pulses_to_drain_timer() {
    let mut stepper = make_stepper(advance_config());
    stepper.enqueue(cruise_block([0, 0, 0, 20], 1000)).unwrap();

    run_to_completion(&mut stepper);
    // Inline emission is suppressed; the backlog holds the block's steps.
    assert_eq!(stepper.board().pulses(StepperChannel::E0), 0);
    assert_eq!(stepper.position(Axis::E), 0);

    // The drain timer emits them, one per sweep, four sweeps per tick.
    stepper.advance_tick();
    assert_eq!(stepper.board().pulses(StepperChannel::E0), 4);
    while stepper.position(Axis::E) < 20 {
        stepper.advance_tick();
    }
    assert_eq!(stepper.board().pulses(StepperChannel::E0), 20);
    assert_eq!(
        stepper.board().direction(StepperChannel::E0),
        Some(Direction::Positive)
    );

    // Backlog empty: further drain ticks do nothing.
    stepper.advance_tick();
    assert_eq!(stepper.board().pulses(StepperChannel::E0), 20);
}

#[test]
fn advance_retraction_drains_negative() {
    let mut stepper = make_stepper(advance_config());
    stepper.enqueue(cruise_block([0, 0, 0, -8], 1000)).unwrap();
    run_to_completion(&mut stepper);

    while stepper.position(Axis::E) > -8 {
        stepper.advance_tick();
    }
    assert_eq!(stepper.board().pulses(StepperChannel::E0), 8);
    assert_eq!(
        stepper.board().direction(StepperChannel::E0),
        Some(Direction::Negative)
    );
}

#[test]
fn advance_pushes_extra_steps_during_ramp() {
    let mut stepper = make_stepper(advance_config());
    stepper
        .enqueue(
            BlockBuilder::new()
                .steps([200, 0, 0, 50])
                .rates(200, 2000, 200)
                .acceleration(scaled_acceleration(40_000))
                .phases(80, 120)
                .advance(0, 0, 1 << 6)
                .build()
                .unwrap(),
        )
        .unwrap();
    run_to_completion(&mut stepper);

    // Bresenham queued 50 steps; the accel/decel pushes cancel out save for
    // rounding, so draining everything lands near the block's E total.
    let mut guard = 0;
    while stepper.position(Axis::E) < 48 {
        stepper.advance_tick();
        guard += 1;
        assert!(guard < 10_000, "backlog never drained");
    }
    assert!(stepper.board().pulses(StepperChannel::E0) >= 48);
}

// =============================================================================
// Endstop reporting
// =============================================================================

#[test]
fn endstop_report_prints_millimetres() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::XMin, &[true; 200]);
    stepper.enqueue(cruise_block([-100, 0, 0, 0], 1000)).unwrap();

    stepper.tick();
    stepper.tick();
    assert!(stepper.endstop_hit(Axis::X));

    let mut report = String::new();
    let aborted = stepper.check_hit_endstops(&mut report);
    assert!(!aborted);
    // One confirmed step at 80 steps/mm before the latch.
    assert_eq!(report, "echo:endstops hit: X:-0.01\n");
    assert!(!stepper.endstop_hit(Axis::X), "latch cleared by report");

    // Nothing latched, nothing printed.
    let mut empty = String::new();
    assert!(!stepper.check_hit_endstops(&mut empty));
    assert!(empty.is_empty());
}

#[test]
fn endstop_abort_drains_queue() {
    let mut config = MachineConfig::default();
    config.features.abort_on_endstop_hit = true;
    let mut stepper = make_stepper(config);
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::YMin, &[true; 200]);
    stepper.enqueue(cruise_block([0, -50, 0, 0], 1000)).unwrap();
    stepper.enqueue(cruise_block([0, -50, 0, 0], 1000)).unwrap();

    stepper.tick();
    stepper.tick();
    assert!(stepper.endstop_hit(Axis::Y));

    let mut report = String::new();
    let aborted = stepper.check_hit_endstops(&mut report);
    assert!(aborted, "abort feature must fire");
    assert!(report.starts_with("echo:endstops hit: Y:"));
    assert!(!stepper.blocks_queued());
    assert!(!stepper.has_active_block());
}

#[test]
fn endstops_hit_on_purpose_clears_silently() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper
        .board_mut()
        .script_endstop(EndstopSwitch::ZMin, &[true; 200]);
    stepper.enqueue(cruise_block([0, 0, -30, 0], 400)).unwrap();

    stepper.tick();
    stepper.tick();
    assert!(stepper.endstop_hit(Axis::Z));

    stepper.endstops_hit_on_purpose();
    assert!(!stepper.endstop_hit(Axis::Z));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn init_leaves_idle_armed_state() {
    let mut stepper: Stepper<MockBoard, MockTimer> =
        Stepper::new(MockBoard::new(), MockTimer::new(), MachineConfig::default());
    stepper.init();

    assert_eq!(stepper.timer().last_armed(), 2000);
    for channel in StepperChannel::ALL {
        assert!(!stepper.board().enabled(channel));
        assert_eq!(stepper.board().pulses(channel), 0);
    }
    assert!(stepper.endstops_enabled());

    // Idle tick parks at the 1 ms self-rearm.
    stepper.tick();
    assert_eq!(stepper.timer().last_armed(), 1000);
}

#[test]
fn synchronize_spins_until_queue_empty() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([10, 0, 0, 0], 1000)).unwrap();

    let mut spins = 0;
    stepper.synchronize(|s| {
        s.tick();
        spins += 1;
    });
    assert_eq!(spins, 10);
    assert!(!stepper.blocks_queued());
}

#[test]
fn finish_and_disable_drops_every_driver() {
    let mut stepper = make_stepper(MachineConfig::default());
    stepper.enqueue(cruise_block([5, 0, 0, 0], 1000)).unwrap();

    stepper.finish_and_disable(|s| s.tick());
    assert!(!stepper.blocks_queued());
    for channel in StepperChannel::ALL {
        assert!(!stepper.board().enabled(channel));
    }
}
