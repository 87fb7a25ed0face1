mod common;

use classroom_vision::inference::config::DebounceSpec;
use classroom_vision::inference::InferenceConfig;

use common::fixtures::{at, engine, entry, face, frame, neutral_metrics, sample_face, FRAME_STEP_MS};

/// Window of 1 and zero debounce on `distracted`, so every frame counts as-is.
fn instant_config() -> InferenceConfig {
    let mut cfg = InferenceConfig::default();
    cfg.smoothing.window = 1;
    cfg.smoothing.overrides.clear();
    for cond in &mut cfg.conditions {
        if cond.name == "distracted" {
            cond.debounce = DebounceSpec::default();
        }
    }
    cfg
}

#[test]
fn confused_is_reported_after_calibration_and_debounce() {
    let mut engine = engine(InferenceConfig::default(), vec![]);
    let mut statuses = Vec::new();

    for i in 0..30 {
        let r = engine.observe_metrics("s1", "Carol", at(i * FRAME_STEP_MS), neutral_metrics());
        statuses.push(r.main_status);
    }
    for i in 30..46 {
        let mut m = neutral_metrics();
        m.eyebrow_ratio = 0.30;
        m.glabella_ratio = 0.20;
        let r = engine.observe_metrics("s1", "Carol", at(i * FRAME_STEP_MS), m);
        statuses.push(r.main_status);
    }

    assert!(statuses[..30].iter().all(|s| s == "Calibrating"));
    // onset at frame 30 (1200ms); 300ms of continuous furrow first reached at frame 38
    assert!(statuses[30..38].iter().all(|s| s == "Focused"), "{statuses:?}");
    assert!(statuses[38..].iter().all(|s| s == "Confused"), "{statuses:?}");

    let report = engine.finish();
    let carol = &report.summary["Carol"];
    assert_eq!(carol.total_records, 16);
    assert_eq!(carol.status_counts["Confused"], 8);
    assert_eq!(report.episodes["s1"]["confused"], 1);
}

#[test]
fn confused_at_eighty_percent_brows() {
    let mut engine = engine(InferenceConfig::default(), vec![]);
    let mut statuses = Vec::new();

    for i in 0..30 {
        let r = engine.observe_metrics("s1", "Carol", at(i * FRAME_STEP_MS), neutral_metrics());
        statuses.push(r.main_status);
    }
    for i in 30..46 {
        let mut m = neutral_metrics();
        m.eyebrow_ratio = 0.32;
        m.glabella_ratio = 0.24;
        let r = engine.observe_metrics("s1", "Carol", at(i * FRAME_STEP_MS), m);
        statuses.push(r.main_status);
    }

    // frame 30: smoothed glabella 0.288 is still above 0.95 × 0.30
    // frame 31: both predicates hold, 300ms later is frame 39
    assert!(statuses[30..39].iter().all(|s| s == "Focused"), "{statuses:?}");
    assert!(statuses[39..].iter().all(|s| s == "Confused"), "{statuses:?}");

    let carol = &engine.finish().summary["Carol"];
    assert_eq!(carol.status_counts["Confused"], 7);
    assert_eq!(carol.status_counts["Focused"], 9);
}

#[test]
fn calibrating_frames_never_reach_the_summary() {
    let mut engine = engine(InferenceConfig::default(), vec![]);
    for i in 0..30 {
        engine.observe_metrics("s1", "Dan", at(i * FRAME_STEP_MS), neutral_metrics());
    }
    assert!(engine.summary().is_empty());
    assert!(engine.subject("s1").is_some_and(|s| s.is_calibrated()));
}

#[test]
fn alice_embedding_resolves_to_alice() {
    let mut engine = engine(
        InferenceConfig::default(),
        vec![entry("Alice", &[1.0, 0.0, 0.0]), entry("Bob", &[0.0, 1.0, 0.0])],
    );
    let records = engine.process_frame(&frame(
        0,
        vec![
            face("t1", Some(sample_face()), Some(&[1.0, 0.0, 0.0])),
            face("t2", Some(sample_face()), Some(&[0.1, 0.1, 0.99])),
        ],
    ));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].subject_name, "Alice");
    assert!((records[0].similarity.unwrap() - 1.0).abs() < 1e-6);
    assert_eq!(records[1].subject_name, "unknown");
    assert_eq!(records[0].main_status, "Calibrating");
}

#[test]
fn wrong_dimension_embedding_degrades_to_unknown() {
    let mut engine = engine(InferenceConfig::default(), vec![entry("Alice", &[1.0, 0.0, 0.0])]);
    let records = engine.process_frame(&frame(0, vec![face("t1", Some(sample_face()), Some(&[1.0, 0.0]))]));
    assert_eq!(records[0].subject_name, "unknown");
    assert_eq!(records[0].similarity, None);
    assert!(records[0].metrics_snapshot.is_some());
}

#[test]
fn bob_seventy_thirty_split() {
    let cfg = instant_config();
    let mut engine = engine(cfg, vec![]);
    let mut i = 0;
    for _ in 0..30 {
        engine.observe_metrics("b", "Bob", at(i * FRAME_STEP_MS), neutral_metrics());
        i += 1;
    }
    for _ in 0..70 {
        engine.observe_metrics("b", "Bob", at(i * FRAME_STEP_MS), neutral_metrics());
        i += 1;
    }
    let mut sleepy = neutral_metrics();
    sleepy.eye_aspect_ratio = 0.10;
    for _ in 0..30 {
        let r = engine.observe_metrics("b", "Bob", at(i * FRAME_STEP_MS), sleepy);
        assert_eq!(r.main_status, "Distracted");
        i += 1;
    }

    let summary = engine.finish().summary;
    let bob = &summary["Bob"];
    assert_eq!(bob.total_records, 100);
    assert_eq!(bob.status_percentages["Focused"], 70.0);
    assert_eq!(bob.status_percentages["Distracted"], 30.0);
}

#[test]
fn head_down_wins_over_confused() {
    let mut engine = engine(instant_config(), vec![]);
    for i in 0..30 {
        engine.observe_metrics("s", "Eve", at(i * FRAME_STEP_MS), neutral_metrics());
    }
    let mut m = neutral_metrics();
    m.eyebrow_ratio = 0.30;
    m.glabella_ratio = 0.20;
    m.vertical_head_ratio = 2.0;
    let mut last = None;
    for i in 30..45 {
        last = Some(engine.observe_metrics("s", "Eve", at(i * FRAME_STEP_MS), m));
    }
    let last = last.unwrap();
    assert_eq!(last.main_status, "Head Down");
    assert_eq!(last.head_pose, "Head Down");
    assert_eq!(last.head_turn, "Forward");
}

#[test]
fn yawn_needs_five_consecutive_frames() {
    let mut engine = engine(instant_config(), vec![]);
    for i in 0..30 {
        engine.observe_metrics("s", "Fay", at(i * FRAME_STEP_MS), neutral_metrics());
    }
    let mut m = neutral_metrics();
    m.mouth_aperture_ratio = 0.35;
    let statuses: Vec<_> = (30..36)
        .map(|i| engine.observe_metrics("s", "Fay", at(i * FRAME_STEP_MS), m).main_status)
        .collect();
    assert_eq!(
        statuses,
        vec!["Focused", "Focused", "Focused", "Focused", "Yawning", "Yawning"]
    );
}

#[test]
fn head_turn_field_follows_turn_direction() {
    let mut engine = engine(instant_config(), vec![]);
    for i in 0..30 {
        engine.observe_metrics("s", "Gus", at(i * FRAME_STEP_MS), neutral_metrics());
    }
    let mut m = neutral_metrics();
    m.head_turn_ratio = -0.5;
    let r = engine.observe_metrics("s", "Gus", at(30 * FRAME_STEP_MS), m);
    assert_eq!(r.main_status, "Turning RIGHT");
    assert_eq!(r.head_turn, "Turning RIGHT");

    m.head_turn_ratio = 0.5;
    let r = engine.observe_metrics("s", "Gus", at(31 * FRAME_STEP_MS), m);
    assert_eq!(r.main_status, "Turning LEFT");
}

#[test]
fn subjects_calibrate_independently() {
    let mut engine = engine(InferenceConfig::default(), vec![]);
    for i in 0..30 {
        engine.observe_metrics("a", "A", at(i * FRAME_STEP_MS), neutral_metrics());
    }
    let late = engine.observe_metrics("b", "B", at(30 * FRAME_STEP_MS), neutral_metrics());
    let early = engine.observe_metrics("a", "A", at(30 * FRAME_STEP_MS), neutral_metrics());
    assert_eq!(late.main_status, "Calibrating");
    assert_eq!(early.main_status, "Focused");
}
