//! Piecewise-constant tempo map for beat/second conversion

use super::BeatTime;

/// One tempo region: `bpm` holds from `start_beats` until the next segment
#[derive(Debug, Clone, Copy)]
pub struct BpmSegment {
    pub start_beats: f64,
    pub start_seconds: f64,
    pub bpm: f64,
}

/// Tempo map converting between beat positions and wall-clock seconds.
///
/// Conversions are only used for display geometry and visibility windows;
/// all structural ordering stays on [`BeatTime`].
#[derive(Debug, Clone)]
pub struct BpmList {
    segments: Vec<BpmSegment>,
}

impl Default for BpmList {
    fn default() -> Self {
        Self {
            segments: vec![BpmSegment {
                start_beats: 0.0,
                start_seconds: 0.0,
                bpm: 120.0,
            }],
        }
    }
}

impl BpmList {
    /// Build from `(position, bpm)` pairs; the first pair should start at
    /// beat zero. An empty input yields the default 120 BPM map.
    pub fn new(changes: &[(BeatTime, f64)]) -> Self {
        if changes.is_empty() {
            return Self::default();
        }

        let mut segments = Vec::with_capacity(changes.len());
        let mut seconds = 0.0;
        let mut last: Option<BpmSegment> = None;

        for &(time, bpm) in changes {
            let beats = time.to_beats();
            if let Some(prev) = last {
                seconds += (beats - prev.start_beats) * 60.0 / prev.bpm;
            }
            let segment = BpmSegment {
                start_beats: beats,
                start_seconds: seconds,
                bpm,
            };
            segments.push(segment);
            last = Some(segment);
        }

        Self { segments }
    }

    /// Segment in effect at a beat position
    fn segment_at(&self, beats: f64) -> &BpmSegment {
        let idx = self
            .segments
            .partition_point(|s| s.start_beats <= beats)
            .saturating_sub(1);
        &self.segments[idx]
    }

    /// Seconds elapsed at a beat position
    pub fn time_at(&self, beats: f64) -> f64 {
        let s = self.segment_at(beats);
        s.start_seconds + (beats - s.start_beats) * 60.0 / s.bpm
    }

    /// Beat position reached at a point in seconds
    pub fn beats_at(&self, seconds: f64) -> f64 {
        let idx = self
            .segments
            .partition_point(|s| s.start_seconds <= seconds)
            .saturating_sub(1);
        let s = &self.segments[idx];
        s.start_beats + (seconds - s.start_seconds) * s.bpm / 60.0
    }

    /// Duration in seconds of the beat range `[from_beats, to_beats]`
    pub fn segment_seconds(&self, from_beats: f64, to_beats: f64) -> f64 {
        self.time_at(to_beats) - self.time_at(from_beats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map() {
        let bpm = BpmList::default();
        // 120 BPM: one beat every half second
        assert!((bpm.time_at(4.0) - 2.0).abs() < 1e-9);
        assert!((bpm.beats_at(2.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_segments() {
        let bpm = BpmList::new(&[
            (BeatTime::ZERO, 120.0),
            (BeatTime::from_beat(4), 240.0),
        ]);
        // First 4 beats at 120 take 2s, next 4 at 240 take 1s
        assert!((bpm.time_at(8.0) - 3.0).abs() < 1e-9);
        assert!((bpm.beats_at(3.0) - 8.0).abs() < 1e-9);
        assert!((bpm.segment_seconds(4.0, 8.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_before_first_segment() {
        let bpm = BpmList::new(&[(BeatTime::ZERO, 60.0)]);
        assert!((bpm.time_at(1.0) - 1.0).abs() < 1e-9);
    }
}
