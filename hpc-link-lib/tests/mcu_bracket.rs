//! Tests for the MCU transaction bracket

mod common;

use common::*;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[test]
fn test_command_goes_out_bit_reversed() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK]);

    let transaction = mcu.start(Command::GetBatteryData).unwrap();
    transaction.end();

    assert_eq!(probe.wire(), vec![0x03]);
    assert_eq!(probe.sent(), vec![0xC0]);
}

#[test]
fn test_enable_follows_bracket() {
    let (mcu, probe) = scripted_mcu();
    // deasserted on construction
    assert_eq!(probe.enable_history(), vec![false]);

    probe.reply(&[ACK, 0x42]);
    let mut transaction = mcu.start(Command::GetContrast).unwrap();
    assert!(probe.enabled());
    assert_eq!(transaction.read().unwrap(), 0x42);
    transaction.end();
    assert!(!probe.enabled());
}

#[test]
fn test_bracket_reentry() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, ACK]);

    mcu.start(Command::GetBrightness).unwrap().end();
    mcu.start(Command::GetContrast).unwrap().end();

    assert_eq!(probe.enable_history(), vec![false, true, false, true, false]);
    assert_eq!(probe.sent(), vec![0xD2, 0xD0]);
}

#[test]
fn test_read_sends_dummy() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, 0x01, 0x02]);

    let mut transaction = mcu.start(Command::GetBatteryData).unwrap();
    assert_eq!(transaction.read().unwrap(), 0x01);
    assert_eq!(transaction.read().unwrap(), 0x02);
    transaction.end();

    assert_eq!(probe.sent(), vec![0xC0, 0x11, 0x11]);
}

#[test]
fn test_desync_drains_and_keeps_bracket_open() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[0x42, 0x07, 0x08, 0x09]);

    let failed = mcu.start(Command::GetScanKeyCode).unwrap_err();
    assert!(matches!(
        failed.error,
        LinkError::ProtocolDesync {
            first: 0x42,
            drained: 3
        }
    ));
    assert!(probe.enabled(), "bracket must stay open until end()");
    assert_eq!(probe.pending_replies(), 0);

    let err = failed.end();
    assert!(matches!(err, LinkError::ProtocolDesync { .. }));
    assert!(!probe.enabled());

    // the link is usable again
    probe.reply(&[ACK]);
    mcu.start(Command::GetContrast).unwrap().end();
}

#[test]
fn test_drain_is_bounded() {
    let (port, probe) = ScriptedMcu::new();
    let mcu = Mcu::with_config(
        port,
        McuConfig {
            ready_timeout: 1_000,
            drain_limit: 4,
        },
    );
    probe.reply(&[0x00; 10]);

    let err = mcu.start(Command::GetContrast).map_err(StartError::end).unwrap_err();
    assert!(matches!(err, LinkError::ProtocolDesync { first: 0x00, drained: 4 }));
    assert_eq!(probe.pending_replies(), 5);
}

#[test]
fn test_ready_timeout() {
    let (port, probe) = ScriptedMcu::stuck();
    let mcu = Mcu::with_config(port, FAST_MCU);

    let failed = mcu.start(Command::GetBrightness).unwrap_err();
    assert!(matches!(failed.error, LinkError::Timeout { polls: 1_000 }));
    assert!(probe.wire().is_empty());
    assert!(probe.enabled());

    failed.end();
    assert!(!probe.enabled());
}

#[test]
fn test_timeout_mid_transaction() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, 0x05]);

    let mut transaction = mcu.start(Command::GetScanKeyCode).unwrap();
    assert_eq!(transaction.read().unwrap(), 0x05);
    assert!(matches!(transaction.read(), Err(LinkError::Timeout { .. })));
    transaction.end();
    assert!(!probe.enabled());
}

#[test]
fn test_send_parameter_requires_ack() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, ACK, ACK, 0x00]);

    let mut transaction = mcu.start(Command::SetContrast).unwrap();
    transaction.send_parameter(0x80).unwrap();
    transaction.end();

    let mut transaction = mcu.start(Command::SetContrast).unwrap();
    let err = transaction.send_parameter(0x80).unwrap_err();
    transaction.end();
    assert!(matches!(
        err,
        LinkError::ProtocolError {
            expected: 0x11,
            actual: 0x00
        }
    ));
}

#[test]
fn test_dropped_transaction_releases_bracket() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, ACK]);

    {
        let _transaction = mcu.start(Command::GetBrightness).unwrap();
        assert!(probe.enabled());
    }
    assert!(!probe.enabled());
    mcu.start(Command::GetBrightness).unwrap().end();
}

#[test]
fn test_second_start_blocks_until_end() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, ACK]);

    let transaction = mcu.start(Command::GetBrightness).unwrap();

    let (tx, rx) = mpsc::channel();
    let worker = {
        let mcu = Arc::clone(&mcu);
        thread::spawn(move || {
            mcu.start(Command::GetContrast).map_err(StartError::end).unwrap().end();
            tx.send(()).unwrap();
        })
    };

    assert!(
        rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "second start must wait for end()"
    );
    transaction.end();
    rx.recv_timeout(Duration::from_secs(5))
        .expect("second start should proceed after end()");
    worker.join().unwrap();

    assert_eq!(probe.sent(), vec![0xD2, 0xD0]);
    assert_eq!(probe.enable_history(), vec![false, true, false, true, false]);
}

#[test]
fn test_probe() {
    let (mcu, probe) = scripted_mcu();
    probe.reply(&[ACK, 0xE6]);
    mcu.probe().unwrap();
    assert_eq!(probe.sent(), vec![0xD2, 0x11]);

    // nothing answers
    assert!(matches!(mcu.probe(), Err(LinkError::Timeout { .. })));
    assert!(!probe.enabled());
}
