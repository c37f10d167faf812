//! Bounded waits: deadlines, step counts and what is left behind.

mod support;

use std::time::{Duration, Instant};

use support::{connect, stored, workshop_with, WAIT};
use workshop_rust::{LocalWorkshop, PollDriver, QueryOptions, QueryStatus};

#[test]
fn failed_wait_lasts_at_least_the_timeout() {
    let timeout = Duration::from_millis(30);
    let interval = Duration::from_millis(5);
    let driver = PollDriver::new(timeout, interval);
    let mut steps = 0u32;

    let start = Instant::now();
    let met = driver.wait_until(&mut steps, |steps| *steps += 1, |_| false);
    let elapsed = start.elapsed();

    assert!(!met);
    assert!(elapsed >= timeout, "returned after {:?}", elapsed);
    // one interval of slack, plus scheduler jitter
    assert!(elapsed < timeout + 4 * interval, "took {:?}", elapsed);
    assert!(steps >= 6, "only {} steps", steps);
}

#[test]
fn condition_is_not_checked_after_the_deadline() {
    let driver = PollDriver::new(Duration::from_millis(20), Duration::from_millis(5));
    let deadline = Instant::now() + Duration::from_millis(20);
    let mut late_checks = 0;
    let mut state = ();

    driver.wait_until(
        &mut state,
        |_| {},
        |_| {
            if Instant::now() > deadline + Duration::from_millis(5) {
                late_checks += 1;
            }
            false
        },
    );
    assert_eq!(late_checks, 0);
}

#[test]
fn timed_out_query_stays_pending_and_can_finish_later() {
    let mut client = connect(workshop_with(vec![stored(1, "One")]).with_latency(200));
    let slot = client.create_details_query(QueryOptions::default(), &[1]);

    assert!(!client.wait_for_queries(&[slot], Duration::from_millis(5)));
    assert_eq!(client.query_status(slot), QueryStatus::Pending);
    assert_eq!(client.query_error(slot), "");

    assert!(client.wait_for_queries(&[slot], WAIT));
    assert_eq!(client.query_status(slot), QueryStatus::Completed);
    client.finish_query(slot);
}

#[test]
fn timed_out_item_can_be_cancelled() {
    let mut client = connect(LocalWorkshop::new().with_latency(1_000_000));
    let slot = client.begin_item(Default::default(), None);

    assert!(!client.wait_until(Duration::from_millis(10), |client| {
        client.item_phase(slot).is_terminal()
    }));
    client.cancel_item(slot);
    assert_eq!(client.pending_deletions(), 0);
    client.finish_item(slot);
    assert_eq!(client.open_slots(), 0);
}
