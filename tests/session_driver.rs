use gesture_coach::keypoints::synthetic_hand;
use gesture_coach::sources::{ReplaySource, SimulatedSource};
use gesture_coach::{
    start_session, EngineConfig, EngineError, KeypointFrame, Phase, SessionOutcome, SlotId,
};
use std::time::Duration;

fn short_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.session.calibration_units = 1;
    config.session.recording_units = 2;
    config
}

#[tokio::test(start_paused = true)]
async fn no_detections_reports_no_data() {
    let source = ReplaySource::from_frames(Vec::new());
    let handle = start_session(EngineConfig::default(), source).await.unwrap();

    match handle.wait().await.unwrap() {
        SessionOutcome::Completed(report) => {
            assert!(!report.has_data());
            assert!(report.overall_score.is_none());
            assert!(report.hands.is_empty());
        }
        SessionOutcome::Cancelled => panic!("session should have completed"),
    }
}

#[tokio::test(start_paused = true)]
async fn simulated_session_scores_both_hands() {
    let handle = start_session(short_config(), SimulatedSource::new(30))
        .await
        .unwrap();
    let live = handle.live();

    let outcome = handle.wait().await.unwrap();
    let report = outcome.report().expect("completed session");

    assert_eq!(report.hands.len(), 2);
    assert!(report.hand(SlotId::A).is_some());
    assert!(report.hand(SlotId::B).is_some());
    let overall = report.overall_score.unwrap();
    assert!((0.0..=10.0).contains(&overall));
    assert!(!report.tips.is_empty());

    let last = live.borrow().clone();
    assert!(last.calibrated);
    assert_eq!(last.phase, Phase::Recording);
    assert!(last.frames_processed > 30);
}

#[tokio::test(start_paused = true)]
async fn double_cancel_is_single_cancel() {
    let handle = start_session(EngineConfig::default(), SimulatedSource::new(30))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();
    handle.cancel();
    let canceller = handle.canceller();
    canceller.cancel();
    assert!(canceller.is_cancelled());

    assert!(matches!(handle.wait().await.unwrap(), SessionOutcome::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn cancel_after_finish_has_no_effect() {
    let handle = start_session(short_config(), SimulatedSource::new(30))
        .await
        .unwrap();

    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    handle.cancel();
    handle.cancel();

    assert!(matches!(handle.wait().await.unwrap(), SessionOutcome::Completed(_)));
}

#[tokio::test(start_paused = true)]
async fn exhausted_source_still_times_out() {
    let frames = (0..10u64)
        .map(|i| KeypointFrame {
            t_ms: i * 33,
            hands: vec![synthetic_hand(50.0 + 10.0 * i as f64, 150.0)],
            face: None,
        })
        .collect();
    let mut config = short_config();
    config.session.calibration_units = 0;

    let handle = start_session(config, ReplaySource::from_frames(frames))
        .await
        .unwrap();
    let report = match handle.wait().await.unwrap() {
        SessionOutcome::Completed(report) => report,
        SessionOutcome::Cancelled => panic!("session should have completed"),
    };

    let hand = report.hand(SlotId::A).unwrap();
    assert!((hand.distance - 90.0).abs() < 1e-6);
    assert!(report.hand(SlotId::B).is_none());
}

#[tokio::test]
async fn unavailable_source_fails_start() {
    let source = ReplaySource::from_path("/nonexistent/keypoints.jsonl");
    let err = start_session(EngineConfig::default(), source).await.err();
    assert!(matches!(err, Some(EngineError::SourceUnavailable(_))));
}

#[tokio::test]
async fn invalid_config_fails_start() {
    let mut config = EngineConfig::default();
    config.session.recording_units = 0;
    let err = start_session(config, SimulatedSource::new(30)).await.err();
    assert!(matches!(err, Some(EngineError::Config(_))));
}

#[tokio::test]
async fn oversized_duration_fails_start() {
    let mut config = EngineConfig::default();
    config.session.time_unit_ms = u64::MAX;
    let err = start_session(config, SimulatedSource::new(30)).await.err();
    assert!(matches!(err, Some(EngineError::Config(_))));
}
