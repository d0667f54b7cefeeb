//! Control-timer tick and background pass scenarios.

use heater_core::{
    config::{ControlConfig, HeaterMode, SensorIndex, Status, CHANNEL_COUNT},
    control::{ControlLoop, Indicator, TickOutcome},
    heater::{Drive, HeaterActuator},
    pid::TICK_DIVIDER,
    sensors::{Batch, ChannelMask, SensorBank},
};

use crate::mock_hw::{MockBoard, PinCall};

fn settle(sensors: &mut SensorBank, batch: &Batch) {
    for _ in 0..1000 {
        sensors.capture(batch, ChannelMask::NONE);
    }
}

/// Tick until the controller runs and return what it did.
fn run_until_due(control: &mut ControlLoop, board: &mut MockBoard) -> TickOutcome {
    for _ in 0..=TICK_DIVIDER {
        let outcome = tick(control, board);
        if outcome != TickOutcome::Idle {
            return outcome;
        }
    }
    panic!("controller never ran");
}

fn tick(control: &mut ControlLoop, board: &mut MockBoard) -> TickOutcome {
    control
        .tick(
            &mut board.config,
            &board.sensors,
            &mut board.heater,
            &mut board.compare,
        )
        .unwrap()
}

#[test]
fn pid_at_set_point_outputs_zero() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.sensors.capture(&[2048; CHANNEL_COUNT], ChannelMask::NONE);
    board.send(&[0x41, 0x00, 0x08]);
    board.send(&[0x40, 0x01]);
    board.compare.duty = 500;

    let outcome = run_until_due(&mut control, &mut board);
    assert_eq!(outcome, TickOutcome::Updated { output: 0 });
    assert_eq!(outcome.indicator(), Indicator::Toggle);
    assert_eq!(board.compare.duty, 0);
    assert_eq!(control.pid().error_sum(), 0);
}

#[test]
fn pid_runs_once_per_divided_period() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.sensors.capture(&[1000; CHANNEL_COUNT], ChannelMask::NONE);
    board.config.set_point = 1100;
    board.config.heater_mode = HeaterMode::Pid;

    let updates = (0..3 * (usize::from(TICK_DIVIDER) + 1))
        .filter(|_| matches!(tick(&mut control, &mut board), TickOutcome::Updated { .. }))
        .count();
    assert_eq!(updates, 3);
    assert_eq!(board.compare.writes, 3);
    // error 100 three times: sum 36, out 336
    assert_eq!(board.compare.duty, 336);
}

#[test]
fn over_temperature_trips_and_latches() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.send(&[0x44, 0xB8, 0x0B]); // 3000
    board.send(&[0x40, 0x01]);
    board.compare.duty = 700;
    board.heater.calls.clear();

    let mut batch = [1000; CHANNEL_COUNT];
    batch[0] = 3500;
    board.sensors.capture(&batch, ChannelMask::NONE);

    let outcome = tick(&mut control, &mut board);
    assert_eq!(
        outcome,
        TickOutcome::Tripped {
            channel: 0,
            reading: 3500,
            latched: false
        }
    );
    assert_eq!(outcome.indicator(), Indicator::Off);
    assert_eq!(board.config.heater_mode, HeaterMode::Off);
    assert_eq!(
        board.heater.calls,
        vec![PinCall::SetLow, PinCall::Route(Drive::Software)]
    );
    assert_eq!(board.compare.duty, 0);
    assert_eq!(board.read(0x11), Some(0x0003));

    // cooling down does not clear the flag
    board.sensors.capture(&[1000; CHANNEL_COUNT], ChannelMask::NONE);
    for _ in 0..1000 {
        tick(&mut control, &mut board);
    }
    assert!(board.config.status.contains(Status::MAX_TEMP));
    assert_eq!(board.read(0x20), Some(0));

    // a mode write does
    board.send(&[0x40, 0x02]);
    assert_eq!(board.read(0x11), Some(0x0001));
    assert_eq!(board.read(0x20), Some(2));
}

#[test]
fn repeated_trips_report_latched() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.config.max_temp = 3000;
    let mut batch = [1000; CHANNEL_COUNT];
    batch[4] = 3001;
    board.sensors.capture(&batch, ChannelMask::NONE);

    tick(&mut control, &mut board);
    assert!(matches!(
        tick(&mut control, &mut board),
        TickOutcome::Tripped {
            channel: 4,
            latched: true,
            ..
        }
    ));
}

#[test]
fn trip_overrides_software_pwm() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    let mut actuator = HeaterActuator::new();
    board.send(&[0x40, 0x02]);
    actuator.pass(&board.config, &mut board.heater).unwrap();
    assert!(board.heater.high);

    let mut batch = [1000; CHANNEL_COUNT];
    batch[1] = 4000;
    board.sensors.capture(&batch, ChannelMask::NONE);
    tick(&mut control, &mut board);
    assert!(!board.heater.high);

    // the next background pass sees the heater off and keeps it there
    actuator.pass(&board.config, &mut board.heater).unwrap();
    assert!(!board.heater.high);
}

#[test]
fn zero_max_temp_disables_interlock() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.send(&[0x44, 0x00, 0x00]);
    board.send(&[0x40, 0x01]);
    board.sensors.capture(&[4095; CHANNEL_COUNT], ChannelMask::NONE);

    for _ in 0..1000 {
        assert!(!matches!(
            tick(&mut control, &mut board),
            TickOutcome::Tripped { .. }
        ));
    }
    assert_eq!(board.config.heater_mode, HeaterMode::Pid);
    assert!(!board.config.status.contains(Status::MAX_TEMP));
}

#[test]
fn heater_sense_channels_do_not_trip() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.config.heater_mode = HeaterMode::Pwm;
    let mut batch = [1000; CHANNEL_COUNT];
    batch[7] = 4095;
    board.sensors.capture(&batch, ChannelMask::NONE);

    for _ in 0..=TICK_DIVIDER {
        tick(&mut control, &mut board);
    }
    assert_eq!(board.config.heater_mode, HeaterMode::Pwm);
}

#[test]
fn implausible_reading_zeroes_output_and_keeps_integrator() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.config.heater_mode = HeaterMode::Pid;
    board.config.set_point = 1100;
    board.sensors.capture(&[1000; CHANNEL_COUNT], ChannelMask::NONE);
    run_until_due(&mut control, &mut board);
    let sum = control.pid().error_sum();

    let mut batch = [1000; CHANNEL_COUNT];
    batch[0] = 0x0F;
    board.sensors.capture(&batch, ChannelMask::NONE);
    let outcome = run_until_due(&mut control, &mut board);

    assert_eq!(outcome, TickOutcome::SensorFault { reading: 0x0F });
    assert_eq!(board.compare.duty, 0);
    assert_eq!(control.pid().error_sum(), sum);
}

#[test]
fn control_sensor_selects_channel() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    let mut batch = [0; CHANNEL_COUNT];
    batch[3] = 1000;
    board.sensors.capture(&batch, ChannelMask::NONE);
    board.config.heater_mode = HeaterMode::Pid;
    board.config.set_point = 1100;
    board.config.control_sensor = SensorIndex::new(3).unwrap();

    assert_eq!(
        run_until_due(&mut control, &mut board),
        TickOutcome::Updated { output: 312 }
    );
}

#[test]
fn leaving_pid_zeroes_compare() {
    let mut board = MockBoard::new();
    let mut control = ControlLoop::new();
    board.compare.duty = 900;

    let outcome = run_until_due(&mut control, &mut board);
    assert_eq!(outcome, TickOutcome::Inactive);
    assert_eq!(board.compare.duty, 0);
}

#[test]
fn background_passes_skip_sense_channels_while_off() {
    let mut board = MockBoard::new();
    let mut actuator = HeaterActuator::new();
    board.config = ControlConfig {
        heater_mode: HeaterMode::Pwm,
        pwm_duty: 128,
        ..ControlConfig::new()
    };
    settle(&mut board.sensors, &[500; CHANNEL_COUNT]);

    let sense = SensorIndex::new(7).unwrap();
    let temp = SensorIndex::new(0).unwrap();
    let mut on_samples = 0;
    for _ in 0..256 {
        actuator.pass(&board.config, &mut board.heater).unwrap();
        let skip = actuator.skip_mask(&board.config);
        board.sensors.capture(&[900; CHANNEL_COUNT], skip);
        if skip == ChannelMask::NONE {
            on_samples += 1;
        }
    }

    assert_eq!(on_samples, 128);
    assert_eq!(board.sensors.raw(temp), 900);
    // the sense channel was only sampled while the heater was on
    assert!(board.sensors.filtered(sense) < board.sensors.filtered(temp));
}
