//! Fixed-capacity circular sample buffer.
//!
//! Slots are overwritten in place at a wrapping write index; the backing
//! storage grows lazily until it reaches capacity. The mean is taken over
//! the populated slots and does not depend on insertion order.

/// Circular buffer of `f64` samples.
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    slots: Vec<f64>,
    capacity: usize,
    index: usize,
}

impl CircularBuffer {
    /// `capacity` must be non-zero; callers validate it before construction.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    /// Overwrite the slot at the write index and advance it.
    pub fn push(&mut self, value: f64) {
        if self.index >= self.capacity {
            self.index = 0;
        }
        if self.index < self.slots.len() {
            self.slots[self.index] = value;
        } else {
            self.slots.push(value);
        }
        self.index += 1;
    }

    /// Arithmetic mean of populated slots, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.slots.is_empty() {
            return None;
        }
        Some(self.slots.iter().sum::<f64>() / self.slots.len() as f64)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Populated slots in storage order (not insertion order).
    pub fn as_slice(&self) -> &[f64] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_lazily() {
        let mut buf = CircularBuffer::new(3);
        assert!(buf.is_empty());
        assert_eq!(buf.mean(), None);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.mean(), Some(1.5));
    }

    #[test]
    fn test_wraps_and_overwrites_oldest() {
        let mut buf = CircularBuffer::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            buf.push(v);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.as_slice(), &[4.0, 2.0, 3.0]);
        assert_eq!(buf.mean(), Some(3.0));
    }

    #[test]
    fn test_clear_resets_index() {
        let mut buf = CircularBuffer::new(2);
        buf.push(5.0);
        buf.push(6.0);
        buf.push(7.0);
        buf.clear();
        buf.push(1.0);
        assert_eq!(buf.as_slice(), &[1.0]);
    }
}
