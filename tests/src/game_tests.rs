//! Game engine scenarios, driven through the keypad where it matters

use fretboard_core::game::{RhythmGame, SpawnOutcome, SLOTS_PER_COLUMN};
use fretboard_core::hal::mock::{DrawCall, MockGameHal};
use fretboard_core::types::{
    GameConfig, KEY_1, KEY_2, KEY_4, KEY_5, KEY_6, KEY_A, KEY_C, KEY_D, KEY_POUND, KEY_STAR,
};
use proptest::prelude::*;
use rstest::rstest;

use crate::{column, positions, song, Session};

fn started(notes: &[(u8, u32)]) -> Session {
    let mut session = Session::new(song(notes));
    session.tap(KEY_5);
    assert!(session.pulses.is_running());
    session
}

#[test]
fn notes_enter_on_their_start_tick() {
    let mut session = started(&[(1, 30), (2, 50)]);

    session.run_timer(30);
    assert_eq!(session.game.tick(), 30);
    assert_eq!(positions(&session.game, 1), [-30]);
    assert!(positions(&session.game, 2).is_empty());
    assert!(session.hal.sink.contains("spawn col 1 tick 30"));

    session.run_timer(20);
    assert_eq!(positions(&session.game, 1), [-10]);
    assert_eq!(positions(&session.game, 2), [-30]);
    assert_eq!(session.game.spawn_cursor(), 2);
}

#[test]
fn late_spawn_catches_up() {
    let mut session = started(&[(3, 10)]);
    session.run_timer(25);
    assert_eq!(positions(&session.game, 3), [-15]);
    assert_eq!(
        session.hal.draw.count(|call| matches!(call, DrawCall::DrawNote { y: -15, .. })),
        1
    );
}

#[test]
fn paused_timer_moves_nothing() {
    let mut session = Session::new(song(&[(1, 0)]));
    let report = session.run_timer(50);
    assert_eq!(report.ticks, 0);
    assert_eq!(session.game.tick(), 0);
    assert_eq!(session.game.note_count(), 0);
}

#[test]
fn toggle_reports_state_over_serial() {
    let mut session = Session::new(song(&[]));
    session.tap(KEY_5);
    assert!(session.hal.sink.contains("Fall on!"));
    session.tap(KEY_5);
    assert!(session.hal.sink.contains("Fall off!"));
    assert!(!session.pulses.is_running());
}

#[test]
fn speed_keys_change_the_divider() {
    let mut session = started(&[]);
    session.tap(KEY_C);
    assert_eq!(session.pulses.divider_shift(), 0);
    assert!(!session.hal.sink.contains("Speeding up!"));

    session.tap(KEY_D);
    session.tap(KEY_D);
    assert_eq!(session.pulses.divider_shift(), 2);
    assert!(session.hal.sink.contains("Slowing down!"));

    // one pulse per four interrupts
    assert_eq!(session.run_timer(8).ticks, 2);
}

#[test]
fn fret_key_hits_note_on_the_line() {
    let mut session = started(&[(2, 0)]);
    session.run_timer(160);
    assert_eq!(positions(&session.game, 2), [130]);

    session.hold(KEY_2);
    assert_eq!(session.game.score(), 1000);
    assert_eq!(session.game.note_count(), 0);
    assert!(session.hal.tone.on);
    assert!(session.hal.sink.contains("hit col 2 err 0 +1000"));
    assert_eq!(session.hal.draw.last_score(), Some(1000));

    // the fret stays lit until its key comes up
    session.step();
    assert_eq!(session.hal.draw.count(|call| matches!(call, DrawCall::ReleaseFret(_))), 0);
    session.release(KEY_2);
    assert_eq!(session.hal.draw.count(|call| matches!(call, DrawCall::ReleaseFret(_))), 1);
}

#[test]
fn fourth_fret_is_the_a_key() {
    let mut session = started(&[(4, 0)]);
    session.run_timer(160);
    session.tap(KEY_A);
    assert_eq!(session.game.score(), 1000);
}

#[rstest]
#[case(-5, None)]
#[case(-4, Some(996))]
#[case(0, Some(1000))]
#[case(4, Some(996))]
#[case(5, None)]
fn hit_window_edges(#[case] error: i32, #[case] award: Option<u32>) {
    let notes = song(&[(1, 0)]);
    let mut game = RhythmGame::new(GameConfig::default(), notes);
    let mut hal = MockGameHal::mock();

    // spawns at -30, so tick t puts the note at t - 30
    let ticks = (130 + 30 + error) as u32;
    game.advance_ticks(&mut hal, ticks);
    assert_eq!(positions(&game, 1), [130 + error]);

    let awarded = game.press_fret(&mut hal, column(1));
    assert_eq!(awarded, award.unwrap_or(0));
    assert_eq!(game.note_count(), usize::from(award.is_none()));
}

#[test]
fn window_keys_widen_and_narrow() {
    let mut session = Session::new(song(&[]));
    session.tap(KEY_6);
    session.tap(KEY_6);
    assert_eq!(session.game.config().tolerance, 7);
    session.tap(KEY_4);
    assert_eq!(session.game.config().tolerance, 6);
    assert!(session.hal.sink.contains("Hit window wider"));
    assert!(session.hal.sink.contains("Hit window narrower"));
}

#[test]
fn misses_never_drive_the_score_negative() {
    let mut session = started(&[(1, 0), (1, 5), (2, 6)]);
    session.run_timer(160);
    session.tap(KEY_1);
    assert_eq!(session.game.score(), 1000);

    session.run_timer(200);
    assert_eq!(session.game.score(), 1000 - 2 * 50);
    assert!(session.game.is_finished());

    let mut broke = started(&[(1, 0), (2, 0), (3, 0)]);
    broke.run_timer(500);
    assert_eq!(broke.game.score(), 0);
}

#[test]
fn pound_spawns_one_practice_note_per_column() {
    let mut session = Session::new(song(&[]));
    session.tap(KEY_POUND);
    for number in 1..=4 {
        assert_eq!(positions(&session.game, number), [-30]);
    }
}

#[test]
fn full_column_drops_extra_notes() {
    let mut session = Session::new(song(&[]));
    for _ in 0..SLOTS_PER_COLUMN {
        session.tap(KEY_POUND);
    }
    assert_eq!(session.game.note_count(), 4 * SLOTS_PER_COLUMN);

    let mut hal = MockGameHal::mock();
    assert_eq!(session.game.spawn_manual(&mut hal, column(3)), SpawnOutcome::Dropped);
    assert!(hal.sink.contains("col 3 full, note dropped"));
    assert_eq!(session.game.note_count(), 4 * SLOTS_PER_COLUMN);
}

#[test]
fn star_resets_the_song() {
    let mut session = started(&[(1, 0), (2, 100)]);
    session.run_timer(160);
    session.tap(KEY_1);
    session.run_timer(10);
    assert_eq!(session.game.note_count(), 1);

    session.tap(KEY_STAR);
    assert_eq!(session.game.tick(), 0);
    assert_eq!(session.game.score(), 0);
    assert_eq!(session.game.spawn_cursor(), 0);
    assert_eq!(session.game.note_count(), 0);
    assert!(!session.hal.tone.on);
    assert_eq!(session.hal.draw.last_score(), Some(0));
    assert!(session.hal.sink.contains("game reset"));

    // the song replays from the top
    session.run_timer(1);
    assert_eq!(positions(&session.game, 1), [-29]);
}

fn erased_notes(session: &Session) -> Vec<(usize, i32)> {
    let mut erased: Vec<(usize, i32)> = session
        .hal
        .draw
        .calls
        .iter()
        .filter_map(|call| match *call {
            DrawCall::EraseNote { column, y } => Some((column.index(), y)),
            _ => None,
        })
        .collect();
    erased.sort_unstable();
    erased
}

#[test]
fn reset_erases_exactly_the_occupied_slots() {
    let mut session = started(&[(1, 0), (3, 40)]);
    session.run_timer(50);
    session.tap(KEY_POUND);

    let mut occupied: Vec<(usize, i32)> = (1..=4)
        .flat_map(|number| {
            positions(&session.game, number)
                .into_iter()
                .map(move |y| (column(number).index(), y))
        })
        .collect();
    occupied.sort_unstable();
    assert_eq!(occupied.len(), 6);

    session.hal.draw.clear();
    session.tap(KEY_STAR);
    assert_eq!(erased_notes(&session), occupied);
    assert_eq!(session.game.note_count(), 0);
}

#[test]
fn reset_silences_the_speaker_even_when_quiet() {
    let mut session = started(&[]);
    assert!(!session.hal.tone.on);
    let before = session.hal.tone.off_count;

    session.tap(KEY_STAR);
    assert_eq!(session.hal.tone.off_count, before + 1);
    assert!(!session.hal.tone.on);
    assert!(erased_notes(&session).is_empty());
}

fn song_strategy() -> impl Strategy<Value = Vec<(u8, u32)>> {
    prop::collection::vec((1u8..=4, 0u32..300), 0..24).prop_map(|mut notes| {
        notes.sort_by_key(|&(_, start)| start);
        notes
    })
}

proptest! {
    /// Advancing by `a` then `b` lands where advancing by `a + b` does, as
    /// long as no column overflows.
    #[test]
    fn tick_advance_is_additive(notes in song_strategy(), a in 0u32..250, b in 0u32..250) {
        let notes = song(&notes);
        let mut split = RhythmGame::new(GameConfig::default(), notes);
        let mut whole = RhythmGame::new(GameConfig::default(), notes);
        let mut hal = MockGameHal::mock();

        split.advance_ticks(&mut hal, a);
        split.advance_ticks(&mut hal, b);
        whole.advance_ticks(&mut hal, a + b);

        for number in 1..=4 {
            prop_assert_eq!(positions(&split, number), positions(&whole, number));
        }
        prop_assert_eq!(split.score(), whole.score());
        prop_assert_eq!(split.spawn_cursor(), whole.spawn_cursor());
        prop_assert_eq!(split.tick(), whole.tick());
    }
}
