//! End-to-end mobile-money and remote dispensing through `KioskService`.

use waterkiosk::app::commands::KioskCommand;
use waterkiosk::app::events::AppEvent;
use waterkiosk::app::ports::Tone;
use waterkiosk::fsm::UiState;
use waterkiosk::tap::{AbortReason, TapEvent, TapPhase};

use super::mock_hw::{IMEI, Kiosk};

const REQUEST: &str = "mpesapay_0712345678_0050_2";

/// Keypad entry for tap 2, 50 units, confirmed by the broker.
fn confirmed_payment() -> Kiosk {
    let mut k = Kiosk::connected();
    k.keys("A");
    k.keys("0712345678");
    k.keys("0050");
    k.keys("2");
    assert_eq!(k.app.ui_state(), UiState::WaitingForTapOrKey);

    k.tick();
    assert_eq!(k.modem.payloads(), vec![REQUEST]);
    assert_eq!(k.modem.published[0].0, format!("kiosk/{IMEI}/tx"));

    k.modem.inbox.push_back(REQUEST);
    k.tick();
    k
}

#[test]
fn keypad_payment_dispenses_exactly_the_paid_volume() {
    let mut k = confirmed_payment();
    let tap = 1;

    assert_eq!(k.app.ui_state(), UiState::HomeIdle, "dispense start releases the UI");
    assert!(k.hw.valve_open(tap));
    assert!(k.hw.indicator_on(tap));
    let status = k.app.taps().status(tap).unwrap();
    assert_eq!(status.phase, TapPhase::Running);
    assert_eq!(status.target_pulses, 500);

    for _ in 0..9 {
        k.pour(tap, 50);
        k.tick();
        assert!(k.hw.valve_open(tap));
    }
    k.pour(tap, 49);
    k.tick();
    assert!(k.hw.valve_open(tap), "one pulse short stays open");
    assert_eq!(k.sink.completions(), 0);

    k.pour(tap, 1);
    k.tick();
    assert!(!k.hw.valve_open(tap));
    assert!(!k.hw.indicator_on(tap));
    assert_eq!(
        k.sink.tap_events().last(),
        Some(&TapEvent::Completed {
            tap,
            pulses: 500,
            target_pulses: 500
        })
    );

    // Late pulses after close never produce a second completion.
    k.pour(tap, 3);
    for _ in 0..5 {
        k.tick();
    }
    assert_eq!(k.sink.completions(), 1);
    assert_eq!(k.app.taps().phase(tap), Ok(TapPhase::Idle));

    let receipt = format!("{REQUEST}_500_done");
    assert!(k.modem.payloads().contains(&receipt.as_str()));
}

#[test]
fn pulse_count_is_monotonic_while_running() {
    let mut k = confirmed_payment();
    let mut last = 0;
    for _ in 0..8 {
        k.pour(1, 37);
        k.tick();
        let now = k.app.taps().status(1).unwrap().pulses;
        assert!(now >= last);
        last = now;
    }
    assert_eq!(last, 8 * 37);
}

#[test]
fn manual_button_pauses_and_resumes() {
    let mut k = confirmed_payment();
    k.pour(1, 100);
    k.tick();

    let now = k.now;
    k.app
        .handle_command(KioskCommand::ManualButton(1), now, &mut k.hw, &mut k.sink)
        .unwrap();
    assert!(!k.hw.valve_open(1));
    let status = k.app.taps().status(1).unwrap();
    assert_eq!(status.phase, TapPhase::Paused);
    assert!(status.manual_trigger_active);
    assert_eq!(status.pulses, 100, "pause keeps the count");

    k.tick();
    let now = k.now;
    k.app
        .handle_command(KioskCommand::ManualButton(1), now, &mut k.hw, &mut k.sink)
        .unwrap();
    assert!(k.hw.valve_open(1));
    assert_eq!(k.app.taps().phase(1), Ok(TapPhase::Running));

    k.pour(1, 400);
    k.tick();
    assert_eq!(k.sink.completions(), 1);
}

#[test]
fn button_on_idle_tap_is_rejected() {
    let mut k = Kiosk::connected();
    let now = k.now;
    assert!(
        k.app
            .handle_command(KioskCommand::ManualButton(0), now, &mut k.hw, &mut k.sink)
            .is_err()
    );
}

#[test]
fn paused_tap_aborts_after_pause_timeout() {
    let mut k = confirmed_payment();
    k.pour(1, 120);
    k.tick();
    let now = k.now;
    k.app
        .handle_command(KioskCommand::PauseTap(1), now, &mut k.hw, &mut k.sink)
        .unwrap();

    k.advance(179_000);
    k.tick();
    assert_eq!(k.app.taps().phase(1), Ok(TapPhase::Paused));

    k.advance(1_000);
    k.tick();
    assert_eq!(k.app.taps().phase(1), Ok(TapPhase::Idle));
    assert!(!k.hw.valve_open(1));
    assert!(k.sink.tap_events().contains(&TapEvent::Aborted {
        tap: 1,
        pulses: 120,
        target_pulses: 500,
        reason: AbortReason::PauseTimeout,
    }));

    k.tick();
    let receipt = format!("{REQUEST}_120_timeout");
    assert!(k.modem.payloads().contains(&receipt.as_str()));
}

#[test]
fn remote_dispense_opens_requested_tap() {
    let mut k = Kiosk::connected();
    k.modem.inbox.push_back("remotedispense_4_3");
    k.tick();

    assert!(k.hw.valve_open(3));
    assert_eq!(k.app.taps().status(3).unwrap().target_pulses, 30);
    assert!(k.sink.events.iter().any(|e| matches!(e, AppEvent::DispenseAuthorised { tap: 3, .. })));
    assert_eq!(k.app.ui_state(), UiState::HomeIdle);
}

#[test]
fn confirmation_for_busy_tap_is_rejected() {
    let mut k = Kiosk::connected();
    k.modem.inbox.push_back("remotedispense_1_3");
    k.tick();
    k.modem.inbox.push_back("remotedispense_1_5");
    k.tick();

    assert_eq!(k.app.taps().status(0).unwrap().target_pulses, 30);
    assert!(k.sink.events.iter().any(|e| matches!(e, AppEvent::TransactionRejected(_))));
}

#[test]
fn keypad_cannot_pay_for_a_tap_that_is_dispensing() {
    let mut k = Kiosk::connected();
    k.modem.inbox.push_back("remotedispense_2_3");
    k.tick();
    assert_eq!(k.app.taps().phase(1), Ok(TapPhase::Running));

    k.keys("A0712345678");
    k.keys("0050");
    k.keys("2");
    assert_eq!(k.app.ui_state(), UiState::HomeIdle);
    assert_eq!(k.hw.beeps().last(), Some(&Tone::Reject));

    k.tick();
    assert!(k.modem.payloads().is_empty(), "no payment request for a busy tap");
    assert_eq!(k.app.taps().status(1).unwrap().target_pulses, 30);
}

#[test]
fn confirmed_payment_for_busy_tap_is_answered_with_cancelled_receipt() {
    let mut k = Kiosk::connected();
    k.modem.inbox.push_back("remotedispense_2_3");
    k.tick();

    k.modem.inbox.push_back(REQUEST);
    k.tick();
    assert!(k.sink.events.iter().any(|e| matches!(e, AppEvent::TransactionRejected(_))));
    assert_eq!(k.app.taps().status(1).unwrap().target_pulses, 30);

    k.tick();
    let receipt = format!("{REQUEST}_0_cancelled");
    assert_eq!(k.modem.payloads(), vec![receipt.as_str()]);
}

#[test]
fn malformed_inbound_is_logged_and_dropped() {
    let mut k = Kiosk::connected();
    k.modem.inbox.push_back("mpesapay_notaphone_12_1");
    k.modem.inbox.push_back("bogus");
    k.tick();
    assert!(k.app.taps().all_idle());
    let rejected = k
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::TransactionRejected(_)))
        .count();
    assert_eq!(rejected, 2);
}

#[test]
fn payment_while_offline_is_refused_and_ui_reset() {
    let mut k = Kiosk::new(Default::default());
    k.keys("A0712345678");
    k.keys("0050");
    k.keys("2");

    assert_eq!(k.app.ui_state(), UiState::HomeIdle);
    assert_eq!(k.hw.beeps().last(), Some(&Tone::Reject));
    assert!(k.sink.events.iter().any(|e| matches!(e, AppEvent::TransactionRejected(_))));
}

#[test]
fn shutdown_closes_everything_and_reports_cancellation() {
    let mut k = confirmed_payment();
    k.pour(1, 10);
    k.tick();
    let now = k.now;
    k.app
        .handle_command(KioskCommand::Shutdown, now, &mut k.hw, &mut k.sink)
        .unwrap();

    assert!(!k.hw.valve_open(1));
    assert!(k.app.taps().all_idle());
    assert!(matches!(
        k.sink.tap_events().last(),
        Some(TapEvent::Aborted {
            reason: AbortReason::Cancelled,
            ..
        })
    ));
}
