//! Key queue behavior against a simple drop-oldest model

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use fretboard_core::key_queue::KeyEventQueue;
use fretboard_core::types::KeyCode;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Enqueue(KeyCode),
    Dequeue,
}

fn key() -> impl Strategy<Value = KeyCode> {
    (1u8..=4, 1u8..=4).prop_map(|(row, col)| KeyCode::new(row, col).unwrap())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => key().prop_map(Op::Enqueue),
        2 => Just(Op::Dequeue),
    ]
}

proptest! {
    #[test]
    fn matches_drop_oldest_model(ops in prop::collection::vec(op(), 0..200)) {
        let queue = KeyEventQueue::<8>::new();
        let mut model: VecDeque<KeyCode> = VecDeque::new();

        for op in ops {
            match op {
                Op::Enqueue(key) => {
                    let expect_drop = model.len() == 8;
                    if expect_drop {
                        model.pop_front();
                    }
                    model.push_back(key);
                    prop_assert_eq!(queue.enqueue(key), expect_drop);
                }
                Op::Dequeue => {
                    prop_assert_eq!(queue.try_dequeue(), model.pop_front());
                }
            }
            prop_assert_eq!(queue.len(), model.len());
            prop_assert!(queue.len() <= queue.capacity());
        }
    }

    #[test]
    fn last_capacity_keys_survive_a_burst(keys in prop::collection::vec(key(), 0..64)) {
        let queue = KeyEventQueue::<16>::new();
        for key in &keys {
            queue.enqueue(*key);
        }
        let kept: Vec<KeyCode> = std::iter::from_fn(|| queue.try_dequeue()).collect();
        let tail = &keys[keys.len().saturating_sub(16)..];
        prop_assert_eq!(kept.as_slice(), tail);
    }
}

#[test]
fn clear_empties_the_ring() {
    let queue = KeyEventQueue::<4>::new();
    for row in 1..=4 {
        queue.enqueue(KeyCode::new(row, 1).unwrap());
    }
    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.try_dequeue(), None);
}

#[test]
fn concurrent_producer_loses_nothing_unaccounted() {
    const SENT: usize = 50_000;
    let queue: &'static KeyEventQueue<128> = Box::leak(Box::new(KeyEventQueue::new()));
    let done: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(false)));

    let producer = thread::spawn(move || {
        let mut dropped = 0usize;
        for i in 0..SENT {
            let key = KeyCode::new((i % 4) as u8 + 1, (i / 4 % 4) as u8 + 1).unwrap();
            if queue.enqueue(key) {
                dropped += 1;
            }
        }
        done.store(true, Ordering::Release);
        dropped
    });

    let mut received = 0usize;
    loop {
        match queue.try_dequeue() {
            Some(key) => {
                assert!(!key.is_none());
                received += 1;
            }
            None if done.load(Ordering::Acquire) && queue.is_empty() => break,
            None => thread::yield_now(),
        }
    }

    let dropped = producer.join().unwrap();
    assert_eq!(received + dropped, SENT);
}
