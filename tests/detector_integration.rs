//! Integration tests for the STA/LTA event detector
//!
//! These tests validate detector behaviour over realistic signals:
//! - Constant background never triggers
//! - A step burst triggers once and de-triggers once
//! - The safety valve forces a de-trigger on a saturated signal
//! - Listeners and channel forwarding see every transition

mod common;

use common::builders::DetectorBuilder;
use common::mock_helpers::{create_event_channel, RecordingListener};
use common::{step_signal, test_timeout};
use sigcond_rs::analysis::{
    DetectorParams, DetectorState, EventForwarder, StaLtaDetector, Transition,
};
use sigcond_rs::SigCondError;
use std::thread;

fn run(det: &mut StaLtaDetector, signal: &[f64]) -> Vec<(usize, Transition)> {
    signal
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| det.add_sample(v, i as i64 * 1000).map(|t| (i, t)))
        .collect()
}

#[test]
fn test_constant_signal_never_triggers() {
    let mut det = DetectorBuilder::new("flat").build();
    let transitions = run(&mut det, &vec![4.2; 500]);
    assert!(transitions.is_empty());
    assert_eq!(det.state(), DetectorState::Detriggered);
    assert_eq!(det.sample_count(), 500);
}

#[test]
fn test_step_burst_triggers_once_and_recovers() {
    let mut det = DetectorBuilder::new("step").build();
    let signal = step_signal(1.0, 10.0, 20, 6, 20);
    let transitions = run(&mut det, &signal);

    assert_eq!(
        transitions,
        vec![(20, Transition::Triggered), (27, Transition::Detriggered)]
    );
    assert_eq!(det.transition_time(), 27_000);
    assert!(!det.is_triggered());
}

#[test]
fn test_lta_frozen_while_triggered() {
    let mut det = DetectorBuilder::new("freeze").build();
    run(&mut det, &step_signal(2.0, 20.0, 15, 4, 0));
    assert!(det.is_triggered());
    common::assert_float_eq(det.lta(), 2.0, 1e-12);
    assert_eq!(det.consecutive_triggered(), 4);
}

#[test]
fn test_safety_valve_forces_detrigger() {
    let mut det = DetectorBuilder::new("saturated").max_triggered(5).build();
    let signal = step_signal(1.0, 10.0, 20, 40, 0);
    let transitions = run(&mut det, &signal);

    // triggered on the first burst sample, forced down on the sixth triggered sample;
    // afterwards the LTA refills with the burst level and the ratio stays near 1
    assert_eq!(
        transitions,
        vec![(20, Transition::Triggered), (25, Transition::Detriggered)]
    );
    assert_eq!(det.state(), DetectorState::Detriggered);
}

#[test]
fn test_not_ready_until_lta_full() {
    let mut det = DetectorBuilder::new("warmup").widths(2, 10).build();
    run(&mut det, &[1.0; 10]);
    assert_eq!(det.state(), DetectorState::Unready);
    run(&mut det, &[1.0]);
    assert!(det.is_ready());
}

#[test]
fn test_invalid_parameters_rejected_without_mutation() {
    let mut det = DetectorBuilder::new("cfg").build();
    run(&mut det, &[1.0; 12]);

    let bad = DetectorParams {
        sta_width: 10,
        lta_width: 10,
        trigger_ratio: 3.0,
        de_trigger_ratio: 1.5,
        max_triggered_samples: 5,
    };
    let err = det.set_parameters(bad).unwrap_err();
    assert!(matches!(err, SigCondError::Configuration(_)));
    assert_eq!(det.params().sta_width, 2);
    assert!(det.is_ready());

    assert!(StaLtaDetector::new("bad", bad).is_err());
}

#[test]
fn test_listener_sees_transitions() {
    let mut det = DetectorBuilder::new("listened").build();
    let listener = RecordingListener::new();
    det.add_listener(Box::new(listener.clone()));

    run(&mut det, &step_signal(1.0, 10.0, 20, 6, 20));

    assert_eq!(
        listener.events(),
        vec![(Transition::Triggered, 21), (Transition::Detriggered, 28)]
    );
}

#[test]
fn test_forwarder_delivers_across_threads() {
    let (tx, rx) = create_event_channel();
    let signal = step_signal(1.0, 10.0, 20, 6, 20);

    let handle = thread::spawn(move || {
        let mut det = DetectorBuilder::new("remote").build();
        det.add_listener(Box::new(EventForwarder::new(tx)));
        for (i, v) in signal.into_iter().enumerate() {
            det.add_sample(v, 1_000 + i as i64);
        }
    });

    let first = rx.recv_timeout(test_timeout()).unwrap();
    let second = rx.recv_timeout(test_timeout()).unwrap();
    handle.join().unwrap();

    assert_eq!(first.detector, "remote");
    assert_eq!(first.transition, Transition::Triggered);
    assert_eq!(first.timestamp_ms, 1_020);
    assert_eq!(second.transition, Transition::Detriggered);
    assert!(rx.try_recv().is_err());
}
