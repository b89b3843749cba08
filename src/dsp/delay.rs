//! Delay line
//!
//! Circular buffer with a fixed capacity and an adjustable read offset.
//! The feedback loop of the echo is closed outside this type, by the graph
//! processor, which reads the delayed sample before writing the new input.

/// Longest delay any delay node can represent, in seconds
pub const MAX_DELAY_SECS: f32 = 2.0;

/// Single-channel circular delay buffer
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
}

impl DelayLine {
    /// Create a delay line able to hold `max_delay_secs` of audio
    pub fn new(max_delay_secs: f32, sample_rate: u32) -> Self {
        let capacity = (max_delay_secs.max(0.0) * sample_rate as f32).ceil() as usize + 1;
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
            delay_samples: 1,
        }
    }

    /// Set the delay in seconds
    ///
    /// Rounded to whole samples, at least one sample and at most the
    /// capacity of the line.
    pub fn set_delay_secs(&mut self, secs: f32, sample_rate: u32) {
        let samples = (secs.max(0.0) * sample_rate as f32).round() as usize;
        self.delay_samples = samples.clamp(1, self.buffer.len() - 1);
    }

    /// Current delay in samples
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Longest delay this line can hold, in samples
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Sample written `delay_samples` writes ago
    #[inline]
    pub fn read(&self) -> f32 {
        let size = self.buffer.len();
        self.buffer[(self.write_pos + size - self.delay_samples) % size]
    }

    /// Write one sample and advance
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Clear the buffer
    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_delayed() {
        let mut line = DelayLine::new(1.0, 100);
        line.set_delay_secs(0.05, 100);
        assert_eq!(line.delay_samples(), 5);

        let mut out = Vec::new();
        for i in 0..10 {
            out.push(line.read());
            line.write(if i == 0 { 1.0 } else { 0.0 });
        }
        assert_eq!(out[5], 1.0);
        assert_eq!(out.iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn test_delay_capped_at_capacity() {
        let mut line = DelayLine::new(MAX_DELAY_SECS, 1000);
        line.set_delay_secs(10.0, 1000);
        assert_eq!(line.delay_samples(), line.capacity());
        assert_eq!(line.capacity(), 2000);
    }

    #[test]
    fn test_minimum_one_sample() {
        let mut line = DelayLine::new(1.0, 44100);
        line.set_delay_secs(0.0, 44100);
        assert_eq!(line.delay_samples(), 1);
    }
}
