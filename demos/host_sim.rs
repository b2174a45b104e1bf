//! Host-side simulation of the step pulse generator.
//!
//! Wires the generator to counting pin sinks and a virtual timer, queues a
//! few blocks and reports what came out the other end. Run with:
//!
//! ```sh
//! cargo run --example host_sim
//! ```

use step_pulse::{
    Axis, BlockBuilder, Direction, EndstopSwitch, MachineConfig, PinSinks, StepTimer, Stepper,
    StepperChannel,
};

const MACHINE_TOML: &str = r#"
[machine]
max_step_frequency = 40000
kinematics = "cartesian"

[axes.x]
steps_per_mm = 80.0

[axes.y]
steps_per_mm = 80.0

[axes.z]
steps_per_mm = 400.0

[axes.e]
steps_per_mm = 500.0

[endstops.x_min]
inverting = true
pullup = true
"#;

/// Pin sinks that count pulses instead of driving hardware.
#[derive(Default)]
struct CountingBoard {
    pulses: [u32; 8],
    asserted: [bool; 8],
}

fn index(channel: StepperChannel) -> usize {
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

impl PinSinks for CountingBoard {
    fn assert_step(&mut self, channel: StepperChannel) {
        let i = index(channel);
        if !self.asserted[i] {
            self.pulses[i] += 1;
        }
        self.asserted[i] = true;
    }

    fn release_step(&mut self, channel: StepperChannel) {
        self.asserted[index(channel)] = false;
    }

    fn set_direction(&mut self, _channel: StepperChannel, _direction: Direction) {}

    fn set_enabled(&mut self, _channel: StepperChannel, _enabled: bool) {}

    fn read_endstop(&mut self, _switch: EndstopSwitch) -> bool {
        false
    }
}

/// Virtual one-shot timer: remembers the last armed delay instead of
/// scheduling anything.
#[derive(Default)]
struct VirtualTimer {
    latest_us: u32,
}

impl StepTimer for VirtualTimer {
    fn arm(&mut self, delay_us: u32) {
        self.latest_us = delay_us;
    }

    fn cancel(&mut self) {
        self.latest_us = 0;
    }
}

/// Planner scaling: steps/s² to the shifted acceleration factor.
fn scaled_acceleration(steps_per_s2: u32) -> u32 {
    ((steps_per_s2 as u64) * (1 << 24) / 1_000_000) as u32
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config: MachineConfig = step_pulse::config::parse_config(MACHINE_TOML)?;
    let mut stepper: Stepper<_, _> =
        Stepper::new(CountingBoard::default(), VirtualTimer::default(), config);
    stepper.init();

    // A trapezoidal X/Y diagonal with extrusion, then a short retract.
    stepper.enqueue(
        BlockBuilder::new()
            .steps([1600, 1200, 0, 90])
            .rates(200, 2000, 200)
            .acceleration(scaled_acceleration(8_000))
            .phases(220, 1380)
            .build()?,
    )?;
    stepper.enqueue(
        BlockBuilder::new()
            .steps([0, 0, 0, -45])
            .rates(400, 1200, 400)
            .acceleration(scaled_acceleration(10_000))
            .phases(10, 35)
            .build()?,
    )?;

    // Fire the virtual timer until the queue drains, accumulating the armed
    // periods as simulated wall-clock time.
    let mut ticks = 0u64;
    let mut elapsed_us = 0u64;
    stepper.synchronize(|s| {
        s.tick();
        ticks += 1;
        elapsed_us += u64::from(s.timer().latest_us);
    });

    println!(
        "queue drained after {} interrupts, {:.1} ms of motion",
        ticks,
        elapsed_us as f64 / 1000.0
    );
    for axis in Axis::ALL {
        println!(
            "{}: {:>6} steps ({:.2} mm)",
            axis.letter(),
            stepper.position(axis),
            stepper.position(axis) as f32 / stepper.config().axes.for_axis(axis),
        );
    }
    println!(
        "pulses: X={} Y={} E0={}",
        stepper.board().pulses[index(StepperChannel::X)],
        stepper.board().pulses[index(StepperChannel::Y)],
        stepper.board().pulses[index(StepperChannel::E0)],
    );

    Ok(())
}
