//! Test data builders for creating test objects

use sigcond_rs::analysis::{DetectorParams, StaLtaDetector};
use sigcond_rs::pipeline::{
    BoxcarFilter, FilterGraph, FilterNode, HeadingFilter, HeadingUnits, MagnitudeFilter, NodeId,
    Terminal, TerminalId,
};

/// Builder for creating test detectors
pub struct DetectorBuilder {
    name: String,
    sta_width: usize,
    lta_width: usize,
    trigger_ratio: f64,
    de_trigger_ratio: f64,
    max_triggered_samples: usize,
}

impl DetectorBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sta_width: 2,
            lta_width: 10,
            trigger_ratio: 3.0,
            de_trigger_ratio: 1.5,
            max_triggered_samples: 50,
        }
    }

    pub fn widths(mut self, sta: usize, lta: usize) -> Self {
        self.sta_width = sta;
        self.lta_width = lta;
        self
    }

    pub fn ratios(mut self, trigger: f64, de_trigger: f64) -> Self {
        self.trigger_ratio = trigger;
        self.de_trigger_ratio = de_trigger;
        self
    }

    pub fn max_triggered(mut self, samples: usize) -> Self {
        self.max_triggered_samples = samples;
        self
    }

    pub fn params(&self) -> DetectorParams {
        DetectorParams {
            sta_width: self.sta_width,
            lta_width: self.lta_width,
            trigger_ratio: self.trigger_ratio,
            de_trigger_ratio: self.de_trigger_ratio,
            max_triggered_samples: self.max_triggered_samples,
        }
    }

    pub fn build(self) -> StaLtaDetector {
        let params = self.params();
        StaLtaDetector::new(self.name, params).unwrap()
    }
}

/// Current-meter graph: east/north components feeding speed and heading,
/// with a boxcar-smoothed speed.
pub struct CurrentMeter {
    pub graph: FilterGraph,
    pub east: TerminalId,
    pub north: TerminalId,
    pub speed_out: TerminalId,
    pub speed: NodeId,
    pub heading: NodeId,
    pub smoothed: NodeId,
}

impl CurrentMeter {
    pub fn new(depth: usize) -> Self {
        let mut graph = FilterGraph::new();
        let east = graph.add_terminal(Terminal::new("east", 0));
        let north = graph.add_terminal(Terminal::new("north", 1));
        let speed_out = graph.add_terminal(Terminal::new("speed", 0));

        let speed = graph
            .add_node_with_inputs(
                FilterNode::new("speed", 0, MagnitudeFilter::new()),
                &[east, north],
            )
            .unwrap();
        let heading = graph
            .add_node_with_inputs(
                FilterNode::new("heading", 1, HeadingFilter::new(HeadingUnits::Degrees)),
                &[east, north],
            )
            .unwrap();
        let smoothed = graph
            .add_node_with_inputs(
                FilterNode::new("smoothed", 2, BoxcarFilter::new(depth).unwrap()),
                &[speed_out],
            )
            .unwrap();
        graph.attach_output(speed, speed_out).unwrap();

        Self {
            graph,
            east,
            north,
            speed_out,
            speed,
            heading,
            smoothed,
        }
    }

    /// Write one east/north pair.
    pub fn put(&mut self, east: f64, north: f64) {
        self.graph.put(self.east, east).unwrap();
        self.graph.put(self.north, north).unwrap();
    }

    pub fn output(&self, node: NodeId) -> f64 {
        self.graph.output_value(node).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_builder() {
        let det = DetectorBuilder::new("d").widths(3, 12).max_triggered(7).build();
        assert_eq!(det.parameter_name(), "d");
        assert_eq!(det.params().sta_width, 3);
        assert_eq!(det.params().max_triggered_samples, 7);
    }
}
