//! Seek coalescing against a scripted engine.

mod support;

use bridge_traits::SeekResult;
use core_playback::{SeekReport, TimeSeeker};
use core_runtime::dispatch::CoordinationSignal;
use support::{seconds, FakeEngine};

fn seeker(engine: &std::sync::Arc<FakeEngine>) -> TimeSeeker {
    TimeSeeker::new(engine.clone(), CoordinationSignal::new())
}

#[test]
fn test_burst_during_seek_issues_at_most_two_seeks() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    for step in 0..20 {
        seeker.smoothly_seek(seconds(1.0 + step as f64 * 0.1));
    }
    assert_eq!(engine.seeks().len(), 1);
    assert!(seeker.is_seeking());

    engine.complete_next_seek(SeekResult::Finished);
    let reports = seeker.pump();
    assert_eq!(
        reports,
        vec![SeekReport::Finished {
            target: seconds(1.0)
        }]
    );

    // Follow-up goes straight to the last requested time
    assert_eq!(engine.seeks(), vec![seconds(1.0), seconds(2.9)]);

    engine.complete_next_seek(SeekResult::Finished);
    seeker.pump();

    assert_eq!(seeker.seeks_issued(), 2);
    assert!(!seeker.is_seeking());
    assert_eq!(engine.seeks().last().copied(), Some(seconds(2.9)));
}

#[test]
fn test_idle_seeker_seeks_immediately() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(3.0));

    assert_eq!(engine.seeks(), vec![seconds(3.0)]);
    assert_eq!(seeker.target(), Some(seconds(3.0)));
}

#[test]
fn test_no_follow_up_when_queued_target_equals_landed_time() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(4.0));
    seeker.smoothly_seek(seconds(5.0));
    seeker.smoothly_seek(seconds(4.0));

    engine.complete_next_seek(SeekResult::Finished);
    seeker.pump();

    assert_eq!(engine.seeks().len(), 1);
    assert!(!seeker.is_seeking());
}

#[test]
fn test_cancel_pending_seeks_lets_in_flight_finish_without_follow_up() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(1.0));
    seeker.smoothly_seek(seconds(8.0));
    seeker.cancel_pending_seeks();

    assert!(seeker.is_seeking());
    assert_eq!(seeker.target(), Some(seconds(1.0)));

    engine.complete_next_seek(SeekResult::Finished);
    seeker.pump();

    assert_eq!(engine.seeks(), vec![seconds(1.0)]);
    assert!(!seeker.is_seeking());
}

#[test]
fn test_interrupted_seek_is_not_reported_and_chases_queued_target() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(1.0));
    seeker.smoothly_seek(seconds(1.0));

    engine.complete_next_seek(SeekResult::Interrupted);
    let reports = seeker.pump();

    assert!(reports.is_empty());
    // The play head never reached 1.0, so the queued target is retried
    assert_eq!(engine.seeks(), vec![seconds(1.0), seconds(1.0)]);
}

#[test]
fn test_engine_failure_is_reported() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(6.0));
    engine.complete_next_seek(SeekResult::Failed("decoder error".to_string()));

    let reports = seeker.pump();
    assert_eq!(
        reports,
        vec![SeekReport::Failed {
            target: seconds(6.0),
            message: "decoder error".to_string()
        }]
    );
    assert!(!seeker.is_seeking());
}

#[test]
fn test_completion_after_reset_is_ignored() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(2.0));
    seeker.smoothly_seek(seconds(7.0));
    seeker.reset();

    engine.complete_next_seek(SeekResult::Finished);
    assert!(seeker.pump().is_empty());
    assert_eq!(engine.seeks().len(), 1);
    assert!(!seeker.is_seeking());
}

#[test]
fn test_completion_from_engine_thread() {
    let engine = FakeEngine::new();
    let mut seeker = seeker(&engine);

    seeker.smoothly_seek(seconds(1.5));

    let worker = {
        let engine = engine.clone();
        std::thread::spawn(move || engine.complete_next_seek(SeekResult::Finished))
    };
    assert_eq!(worker.join().unwrap(), Some(seconds(1.5)));

    assert_eq!(seeker.pump().len(), 1);
}
