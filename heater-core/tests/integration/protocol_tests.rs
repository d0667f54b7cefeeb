//! Command sequences as a bus master would send them.

use heater_core::{
    config::{ControlConfig, HeaterMode, CHANNEL_COUNT, FIRMWARE_VERSION},
    heater::Drive,
    protocol::{ProtocolError, Reply},
    sensors::ChannelMask,
};

use crate::mock_hw::{MockBoard, PinCall};

#[test]
fn read_back_every_setting() {
    let mut board = MockBoard::new();
    board.send(&[0x41, 0x34, 0x12]);
    board.send(&[0x42, 0x05]);
    board.send(&[0x43, 0x40]);
    board.send(&[0x44, 0xB8, 0x0B]);
    board.send(&[0x40, 0x02]);

    assert_eq!(board.read(0x21), Some(0x1234));
    assert_eq!(board.read(0x22), Some(5));
    assert_eq!(board.read(0x23), Some(0x40));
    assert_eq!(board.read(0x24), Some(3000));
    assert_eq!(board.read(0x20), Some(2));
    assert_eq!(board.read(0x10), Some(FIRMWARE_VERSION));
}

#[test]
fn raw_and_filtered_reads() {
    let mut board = MockBoard::new();
    let batch: [u16; CHANNEL_COUNT] = [10, 20, 30, 40, 50, 60, 70, 80];
    board.sensors.capture(&batch, ChannelMask::NONE);

    for (ch, &raw) in batch.iter().enumerate() {
        let ch = ch as u8;
        assert_eq!(board.read(0x01 + ch), Some(raw));
        assert!(board.read(0x31 + ch).is_some());
    }
}

#[test]
fn mode_off_releases_compare_output() {
    let mut board = MockBoard::new();
    board.send(&[0x40, 0x01]);
    assert_eq!(board.heater.drive, Drive::Compare);
    board.heater.calls.clear();

    board.send(&[0x40, 0x00]);
    assert_eq!(
        board.heater.calls,
        vec![PinCall::SetLow, PinCall::Route(Drive::Software)]
    );
    assert_eq!(board.config.heater_mode, HeaterMode::Off);
}

#[test]
fn short_write_changes_nothing() {
    let mut board = MockBoard::new();
    let reply = board.send(&[0x41, 0x00]);
    assert!(matches!(
        reply,
        Reply::Rejected(ProtocolError::ShortPayload { opcode: 0x41, .. })
    ));
    assert!(reply.response().is_empty());
    assert_eq!(board.config, ControlConfig::new());
}

#[test]
fn empty_transaction_is_rejected() {
    let mut board = MockBoard::new();
    assert_eq!(board.send(&[]), Reply::Rejected(ProtocolError::Empty));
}

#[test]
fn reset_leaves_settings_alone_until_restart() {
    let mut board = MockBoard::new();
    board.send(&[0x43, 0x10]);
    assert_eq!(board.send(&[0x50]), Reply::Reset);
    assert_eq!(board.config.pwm_duty, 0x10);
}
