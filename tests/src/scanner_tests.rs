//! Keypad scanning through the full mock board

use fretboard_core::scanner::ScanState;
use fretboard_core::types::{
    HeldKeyMask, KeyCode, KEY_1, KEY_2, KEY_4, KEY_5, KEY_7, KEY_A, KEY_D, KEY_STAR,
};
use rstest::rstest;

use crate::{song, Session};

fn drain(session: &Session) -> Vec<KeyCode> {
    std::iter::from_fn(|| session.queue.try_dequeue()).collect()
}

#[rstest]
#[case(1, 1, 0x11)]
#[case(1, 4, 0x81)]
#[case(4, 1, 0x18)]
#[case(4, 4, 0x88)]
fn key_codes_pack_row_and_column(#[case] row: u8, #[case] col: u8, #[case] bits: u8) {
    let key = KeyCode::new(row, col).unwrap();
    assert_eq!(key.bits(), bits);
    assert_eq!((key.row(), key.col()), (row, col));
}

#[rstest]
#[case(0, 1)]
#[case(5, 1)]
#[case(1, 0)]
#[case(1, 5)]
fn out_of_range_keys_are_rejected(#[case] row: u8, #[case] col: u8) {
    assert_eq!(KeyCode::new(row, col), None);
}

#[test]
fn no_key_sentinel() {
    assert!(KeyCode::NONE.is_none());
    assert_eq!(KeyCode::NONE.bits(), 0xFF);
    assert_eq!(KeyCode::from_bits(0xFF), None);
}

#[test]
fn held_key_is_queued_once() {
    let mut session = Session::new(song(&[]));
    session.scanner.matrix_mut().press(KEY_7);
    session.scanner.on_row_edge();
    assert_eq!(session.scanner.state(), ScanState::Settling);
    assert!(session.scanner.matrix().timer_running);
    assert!(!session.scanner.matrix().row_interrupts_armed);

    for _ in 0..10 {
        session.scanner.on_poll_tick();
    }
    assert_eq!(session.scanner.state(), ScanState::Scanning);
    assert!(session.held.is_held(KEY_7));
    assert_eq!(drain(&session), [KEY_7]);

    session.scanner.matrix_mut().release(KEY_7);
    assert_eq!(session.scanner.on_poll_tick(), HeldKeyMask::EMPTY);
    assert_eq!(session.scanner.state(), ScanState::Idle);
    assert!(!session.scanner.matrix().timer_running);
    assert!(session.scanner.matrix().row_interrupts_armed);
    assert_eq!(session.scanner.matrix().columns_high(), [false; 4]);
    assert!(!session.held.is_held(KEY_7));
}

#[test]
fn chord_across_columns_queues_each_key() {
    let mut session = Session::new(song(&[]));
    session.scanner.matrix_mut().press(KEY_1);
    session.scanner.matrix_mut().press(KEY_A);
    session.scanner.on_row_edge();
    session.scanner.on_poll_tick();
    assert_eq!(drain(&session), [KEY_1, KEY_A]);

    // a third key joining the chord is the only new event
    session.scanner.matrix_mut().press(KEY_5);
    session.scanner.on_poll_tick();
    assert_eq!(drain(&session), [KEY_5]);

    let held = session.held.load();
    assert!(held.contains(KEY_1) && held.contains(KEY_A) && held.contains(KEY_5));
}

#[test]
fn same_column_reports_the_lowest_row() {
    let mut session = Session::new(song(&[]));
    session.scanner.matrix_mut().press(KEY_1);
    session.scanner.matrix_mut().press(KEY_4);
    session.scanner.matrix_mut().press(KEY_STAR);
    session.scanner.on_row_edge();
    session.scanner.on_poll_tick();
    assert_eq!(drain(&session), [KEY_STAR]);
    assert_eq!(session.held.load().keys().collect::<Vec<_>>(), [KEY_STAR]);
}

#[test]
fn poll_tick_while_idle_is_ignored() {
    let mut session = Session::new(song(&[]));
    session.scanner.matrix_mut().press(KEY_D);
    assert_eq!(session.scanner.on_poll_tick(), HeldKeyMask::EMPTY);
    assert!(session.queue.is_empty());
}

#[test]
fn repeated_edges_while_scanning_do_not_restart() {
    let mut session = Session::new(song(&[]));
    session.scanner.matrix_mut().press(KEY_2);
    session.scanner.on_row_edge();
    session.scanner.on_poll_tick();
    session.scanner.on_row_edge();
    assert_eq!(session.scanner.state(), ScanState::Scanning);
    assert_eq!(session.scanner.matrix().timer_starts, 1);
}
