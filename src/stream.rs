//! Byte-buffering stream adapter: turns a push-based byte stream into
//! fixed-size frame callbacks with monotonically advancing timestamps.

use std::collections::VecDeque;

/// What a dispatched frame looks like to the caller: raw little-endian
/// `f32` samples for one frame's worth of audio, plus the timestamp (in
/// seconds since the adapter was last reset) at which it starts.
pub struct Frame<'a> {
    pub samples: &'a [f32],
    pub timestamp: f64,
}

/// Ring-buffered byte queue that accumulates pushed audio and yields
/// complete frames of a fixed byte size.
///
/// Grounded in the teacher's `Buffer`/ring-based adapters: `wanted_bytes`
/// is `nchannels * size_of::<f32>() * frame_len` for identification, or
/// `size_of::<f32>() * frame_len` for learning (mono-only label frames).
pub struct StreamAdapter {
    buf: VecDeque<u8>,
    wanted_bytes: usize,
    frame_len: usize,
    sample_rate: u32,
    timestamp: f64,
    scratch: Vec<f32>,
}

impl StreamAdapter {
    pub fn new(frame_len: usize, nchannels: usize, sample_rate: u32) -> Self {
        let wanted_bytes = nchannels * std::mem::size_of::<f32>() * frame_len;
        Self {
            buf: VecDeque::new(),
            wanted_bytes,
            frame_len,
            sample_rate,
            timestamp: 0.0,
            scratch: vec![0.0; frame_len * nchannels],
        }
    }

    /// Appends raw bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes);
    }

    /// Clears all buffered bytes and resets the timestamp, as required on
    /// a host stream-reset event. The next `pop_frame` starts a fresh
    /// frame boundary.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.timestamp = 0.0;
    }

    /// Pops one complete frame if enough bytes are buffered, decoding
    /// little-endian `f32` samples and advancing the timestamp by
    /// `frame_len / sample_rate` seconds. Returns `None` if fewer than
    /// `wanted_bytes` are currently available; does not consume bytes in
    /// that case.
    pub fn pop_frame(&mut self) -> Option<Frame<'_>> {
        if self.buf.len() < self.wanted_bytes {
            return None;
        }
        for (i, out) in self.scratch.iter_mut().enumerate() {
            let base = i * 4;
            let bytes = [
                self.buf[base],
                self.buf[base + 1],
                self.buf[base + 2],
                self.buf[base + 3],
            ];
            *out = f32::from_le_bytes(bytes);
        }
        self.buf.drain(0..self.wanted_bytes);

        let ts = self.timestamp;
        self.timestamp += self.frame_len as f64 / self.sample_rate as f64;

        Some(Frame {
            samples: &self.scratch,
            timestamp: ts,
        })
    }

    pub fn available_bytes(&self) -> usize {
        self.buf.len()
    }

    pub fn wanted_bytes(&self) -> usize {
        self.wanted_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_bytes(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn yields_no_frame_until_enough_bytes_buffered() {
        let mut adapter = StreamAdapter::new(4, 1, 1000);
        adapter.push(&le_bytes(&[1.0, 2.0]));
        assert!(adapter.pop_frame().is_none());
        adapter.push(&le_bytes(&[3.0, 4.0]));
        let frame = adapter.pop_frame().unwrap();
        assert_eq!(frame.samples, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn timestamp_advances_by_frame_len_over_sample_rate() {
        let mut adapter = StreamAdapter::new(4, 1, 1000);
        adapter.push(&le_bytes(&[0.0; 8]));
        let f1 = adapter.pop_frame().unwrap();
        assert_eq!(f1.timestamp, 0.0);
        adapter.push(&le_bytes(&[0.0; 4]));
        let f2 = adapter.pop_frame().unwrap();
        assert!((f2.timestamp - 0.004).abs() < 1e-12);
    }

    #[test]
    fn reset_clears_buffer_and_timestamp() {
        let mut adapter = StreamAdapter::new(4, 1, 1000);
        adapter.push(&le_bytes(&[0.0; 4]));
        adapter.pop_frame();
        adapter.push(&le_bytes(&[0.0; 2]));
        adapter.reset();
        assert_eq!(adapter.available_bytes(), 0);
        adapter.push(&le_bytes(&[0.0; 4]));
        let frame = adapter.pop_frame().unwrap();
        assert_eq!(frame.timestamp, 0.0);
    }

    #[test]
    fn stereo_wanted_bytes_accounts_for_channel_count() {
        let adapter = StreamAdapter::new(256, 2, 44_100);
        assert_eq!(adapter.wanted_bytes(), 256 * 2 * 4);
    }
}
