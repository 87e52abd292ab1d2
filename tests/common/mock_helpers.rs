//! Mock construction helpers

use crossbeam_channel::{bounded, Receiver, Sender};
use sigcond_rs::analysis::{DetectorEvent, DetectorListener, StaLtaDetector, Transition};
use std::sync::{Arc, Mutex};

/// Create an event channel with default size
pub fn create_event_channel() -> (Sender<DetectorEvent>, Receiver<DetectorEvent>) {
    bounded(16)
}

/// Listener that records every transition with the detector's sample count.
#[derive(Clone, Default)]
pub struct RecordingListener {
    pub events: Arc<Mutex<Vec<(Transition, u64)>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn events(&self) -> Vec<(Transition, u64)> {
        self.events.lock().unwrap().clone()
    }
}

impl DetectorListener for RecordingListener {
    fn on_triggered(&mut self, detector: &StaLtaDetector) {
        self.events
            .lock()
            .unwrap()
            .push((Transition::Triggered, detector.sample_count()));
    }

    fn on_detriggered(&mut self, detector: &StaLtaDetector) {
        self.events
            .lock()
            .unwrap()
            .push((Transition::Detriggered, detector.sample_count()));
    }
}
