/*!
 * Exchange Integration Tests
 *
 * Blocking handoff scenarios across real OS threads
 */

use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use slot_exchange::{CancellationToken, Exchange, ExchangeError, SlotState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_second_deposit_waits_for_withdraw() {
    let exchange = Arc::new(Exchange::new());
    exchange.deposit("x");

    let second_done = Arc::new(AtomicBool::new(false));
    let depositor = {
        let exchange = exchange.clone();
        let second_done = second_done.clone();
        thread::spawn(move || {
            exchange.deposit("z");
            second_done.store(true, Ordering::SeqCst);
        })
    };

    // Give the second depositor time to park on the full slot
    thread::sleep(Duration::from_millis(100));
    assert!(!second_done.load(Ordering::SeqCst), "deposit overwrote a full slot");

    let withdrawer = {
        let exchange = exchange.clone();
        thread::spawn(move || exchange.withdraw())
    };
    assert_eq!(withdrawer.join().unwrap(), "x");

    depositor.join().unwrap();
    assert!(second_done.load(Ordering::SeqCst));
    assert_eq!(exchange.withdraw(), "z");
}

#[test]
fn test_two_depositors_one_withdrawer() {
    const PER_PRODUCER: u32 = 50;
    let exchange = Arc::new(Exchange::new());

    let producers: Vec<_> = (0..2u32)
        .map(|producer| {
            let exchange = exchange.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(producer as u64);
                for i in 0..PER_PRODUCER {
                    if rng.gen_bool(0.2) {
                        thread::sleep(Duration::from_micros(rng.gen_range(10..200)));
                    }
                    exchange.deposit(producer * 1000 + i);
                }
            })
        })
        .collect();

    let consumer = {
        let exchange = exchange.clone();
        thread::spawn(move || {
            (0..2 * PER_PRODUCER)
                .map(|_| exchange.withdraw())
                .collect::<Vec<_>>()
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    let mut received = consumer.join().unwrap();

    // Each producer's items arrive in the order it deposited them
    for producer in 0..2u32 {
        let own: Vec<_> = received
            .iter()
            .copied()
            .filter(|v| v / 1000 == producer)
            .collect();
        let expected: Vec<_> = (0..PER_PRODUCER).map(|i| producer * 1000 + i).collect();
        assert_eq!(own, expected);
    }

    received.sort_unstable();
    let mut deposited: Vec<_> = (0..2u32)
        .flat_map(|p| (0..PER_PRODUCER).map(move |i| p * 1000 + i))
        .collect();
    deposited.sort_unstable();
    assert_eq!(received, deposited);

    let stats = exchange.stats();
    assert_eq!(stats.deposits, 100);
    assert_eq!(stats.withdrawals, 100);
    assert_eq!(stats.state, SlotState::Empty);
}

#[test]
fn test_withdraw_before_deposit_unblocks_after() {
    let exchange = Arc::new(Exchange::new());

    let withdrawer = {
        let exchange = exchange.clone();
        thread::spawn(move || {
            let value = exchange.withdraw();
            (value, Instant::now())
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(exchange.stats().waiting_withdrawers, 1);

    let deposited_at = Instant::now();
    exchange.deposit("y");

    let (value, returned_at) = withdrawer.join().unwrap();
    assert_eq!(value, "y");
    assert!(returned_at >= deposited_at, "withdraw returned before the deposit");
}

#[test]
fn test_parked_caller_does_not_hold_lock() {
    let exchange = Arc::new(Exchange::<u64>::new());

    let withdrawer = {
        let exchange = exchange.clone();
        thread::spawn(move || exchange.withdraw())
    };

    // Give the thread time to park
    thread::sleep(Duration::from_millis(100));

    // Both calls take the exchange mutex; they only return because the
    // parked withdrawer released it
    let start = Instant::now();
    let stats = exchange.stats();
    assert_eq!(exchange.state(), SlotState::Empty);
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(stats.waiting_withdrawers, 1);

    exchange.deposit(42);
    assert_eq!(withdrawer.join().unwrap(), 42);
}

#[test]
fn test_snapshots_never_tear() {
    const ITEMS: u64 = 500;
    let exchange = Arc::new(Exchange::new());
    let running = Arc::new(AtomicBool::new(true));

    let observer = {
        let exchange = exchange.clone();
        let running = running.clone();
        thread::spawn(move || {
            let mut observed = 0u64;
            while running.load(Ordering::SeqCst) {
                let stats = exchange.stats();
                assert!(stats.is_consistent(), "torn snapshot: {:?}", stats);
                assert!(stats.in_flight() <= 1);
                observed += 1;
                thread::yield_now();
            }
            observed
        })
    };

    let producer = {
        let exchange = exchange.clone();
        thread::spawn(move || (0..ITEMS).for_each(|i| exchange.deposit(i)))
    };
    let consumer = {
        let exchange = exchange.clone();
        thread::spawn(move || (0..ITEMS).map(|_| exchange.withdraw()).collect::<Vec<_>>())
    };

    producer.join().unwrap();
    let received = consumer.join().unwrap();
    running.store(false, Ordering::SeqCst);
    assert!(observer.join().unwrap() > 0);

    assert_eq!(received, (0..ITEMS).collect::<Vec<_>>());
}

#[test]
fn test_many_waiters_all_served() {
    let exchange = Arc::new(Exchange::new());

    let withdrawers: Vec<_> = (0..4)
        .map(|_| {
            let exchange = exchange.clone();
            thread::spawn(move || exchange.withdraw())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    for value in 0..4u8 {
        exchange.deposit(value);
    }

    let mut received: Vec<_> = withdrawers.into_iter().map(|h| h.join().unwrap()).collect();
    received.sort_unstable();
    assert_eq!(received, vec![0, 1, 2, 3]);
}

#[test]
fn test_withdraw_timeout_receives_item_before_deadline() {
    let exchange = Arc::new(Exchange::new());

    let withdrawer = {
        let exchange = exchange.clone();
        thread::spawn(move || {
            let start = Instant::now();
            (exchange.withdraw_timeout(Duration::from_secs(2)), start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(50));
    exchange.deposit(11u32);

    let (result, waited) = withdrawer.join().unwrap();
    assert_eq!(result, Ok(11));
    assert!(waited < Duration::from_secs(2));

    let stats = exchange.stats();
    assert_eq!(stats.state, SlotState::Empty);
    assert_eq!(stats.waiting_withdrawers, 0);
}

#[test]
fn test_timeout_under_contention() {
    let exchange = Arc::new(Exchange::new());
    exchange.deposit(1u32);

    let handles: Vec<_> = (0..3u32)
        .map(|i| {
            let exchange = exchange.clone();
            thread::spawn(move || exchange.deposit_timeout(10 + i, Duration::from_millis(100)))
        })
        .collect();

    for handle in handles {
        let rejected = handle.join().unwrap().unwrap_err();
        assert!(matches!(rejected.error(), ExchangeError::Timeout { timeout_ms: 100, .. }));
        assert!(rejected.into_inner() >= 10);
    }

    // The original item was never overwritten
    assert_eq!(exchange.withdraw(), 1);
    assert_eq!(exchange.stats().waiting_depositors, 0);
}

#[test]
fn test_cancel_wakes_every_cancellable_waiter() {
    let exchange = Arc::new(Exchange::new());
    exchange.deposit(0u32);
    let token = CancellationToken::new();

    let depositors: Vec<_> = (1..=3u32)
        .map(|i| {
            let exchange = exchange.clone();
            let token = token.clone();
            thread::spawn(move || exchange.deposit_cancellable(i, &token))
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(exchange.stats().waiting_depositors, 3);

    token.cancel();

    let mut returned: Vec<_> = depositors
        .into_iter()
        .map(|h| {
            let rejected = h.join().unwrap().unwrap_err();
            assert_eq!(rejected.error(), ExchangeError::Cancelled);
            rejected.into_inner()
        })
        .collect();
    returned.sort_unstable();
    assert_eq!(returned, vec![1, 2, 3]);

    // Lock released by every cancelled waiter
    assert_eq!(exchange.try_withdraw(), Ok(0));
}

#[test]
fn test_cancel_leaves_plain_waiters_parked() {
    let exchange = Arc::new(Exchange::<u32>::new());
    let token = CancellationToken::new();

    let plain = {
        let exchange = exchange.clone();
        thread::spawn(move || exchange.withdraw())
    };
    let cancellable = {
        let exchange = exchange.clone();
        let token = token.clone();
        thread::spawn(move || exchange.withdraw_cancellable(&token))
    };

    thread::sleep(Duration::from_millis(100));
    token.cancel();
    assert_eq!(cancellable.join().unwrap(), Err(ExchangeError::Cancelled));

    // The plain withdrawer was woken too, re-checked, and parked again
    thread::sleep(Duration::from_millis(50));
    assert_eq!(exchange.stats().waiting_withdrawers, 1);

    exchange.deposit(9);
    assert_eq!(plain.join().unwrap(), 9);
}
