//! Payment UI behaviour driven through keypad commands.

use waterkiosk::app::events::AppEvent;
use waterkiosk::app::ports::Tone;
use waterkiosk::error::InputError;
use waterkiosk::fsm::UiState;

use super::mock_hw::Kiosk;

#[test]
fn session_times_out_to_home_with_cleared_buffers() {
    let mut k = Kiosk::connected();
    k.keys("A07123");
    assert_eq!(k.app.ui_state(), UiState::EnterPhone);
    assert_eq!(k.app.ui().phone(), "07123");

    k.advance(44_000);
    k.tick();
    assert_eq!(k.app.ui_state(), UiState::EnterPhone);

    k.advance(1_000);
    k.tick();
    assert_eq!(k.app.ui_state(), UiState::HomeIdle);
    assert_eq!(k.app.ui().phone(), "");
    assert_eq!(k.app.ui().amount(), "");
    assert!(
        k.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::InputRejected(InputError::SessionTimeout)))
    );
    assert!(k.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::UiChanged {
            from: UiState::EnterPhone,
            to: UiState::HomeIdle
        }
    )));
}

#[test]
fn star_cancels_from_any_entry_state() {
    let mut k = Kiosk::connected();
    k.keys("A0712345678");
    assert_eq!(k.app.ui_state(), UiState::EnterAmount);
    k.keys("*");
    assert_eq!(k.app.ui_state(), UiState::HomeIdle);
    assert_eq!(k.hw.beeps().last(), Some(&Tone::Reject));
}

#[test]
fn hash_accepts_short_amount() {
    let mut k = Kiosk::connected();
    k.keys("A0712345678");
    k.keys("25#");
    assert_eq!(k.app.ui_state(), UiState::EnterTap);
    k.keys("3");
    k.tick();
    assert_eq!(k.modem.payloads(), vec!["mpesapay_0712345678_0025_3"]);
}

#[test]
fn invalid_keys_are_rejected_without_leaving_state() {
    let mut k = Kiosk::connected();
    k.keys("A0712345678");
    k.keys("#");
    assert_eq!(k.app.ui_state(), UiState::EnterAmount, "empty amount cannot be confirmed");
    k.keys("000");
    k.keys("0");
    assert_eq!(k.app.ui().amount(), "000", "all-zero amount refused");
    k.keys("5");
    k.keys("9");
    assert_eq!(k.app.ui_state(), UiState::EnterTap, "tap 9 does not exist");
    k.keys("0");
    assert_eq!(k.app.ui_state(), UiState::EnterTap);

    let rejected = k
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::InputRejected(InputError::InvalidInput)))
        .count();
    assert_eq!(rejected, 4);
}

#[test]
fn waiting_screen_can_be_dismissed() {
    let mut k = Kiosk::connected();
    k.keys("A0712345678");
    k.keys("0010");
    k.keys("4");
    assert_eq!(k.app.ui_state(), UiState::WaitingForTapOrKey);
    assert_eq!(k.app.ui().selected_tap(), Some(3));
    k.keys("#");
    assert_eq!(k.app.ui_state(), UiState::HomeIdle);
    assert_eq!(k.app.ui().selected_tap(), None);
}
