//! Once-per-second frame statistics.

use compute::BackendKind;

/// One published statistics sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub backend: BackendKind,
    /// CPU worker count, `None` for the GPU backend.
    pub threads: Option<usize>,
    pub ms_per_frame: f64,
    pub fps: f64,
}

impl TelemetrySample {
    /// Window-title style summary of the sample.
    #[must_use]
    pub fn title(&self) -> String {
        let label = match self.threads {
            Some(threads) => format!("({}, {threads} threads)", self.backend.description()),
            None => format!("({})", self.backend.description()),
        };
        format!(
            "{label} : {:.3} ms, {:.1} fps.  [press SPACE to change compute type]",
            self.ms_per_frame, self.fps
        )
    }
}

/// Rolling frame counter that produces a [`TelemetrySample`] roughly once
/// per second of timer time.
#[derive(Debug, Clone)]
pub struct FrameStats {
    last_report: f64,
    elapsed_seconds: f64,
    elapsed_frames: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            last_report: -2.0,
            elapsed_seconds: 0.0,
            elapsed_frames: 0,
        }
    }
}

impl FrameStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for one frame of `delta` seconds at timer time `total`.
    ///
    /// Returns a sample when more than a second has passed since the last one
    /// and starts a new window.
    pub fn record(
        &mut self,
        delta: f64,
        total: f64,
        backend: BackendKind,
        threads: Option<usize>,
    ) -> Option<TelemetrySample> {
        self.elapsed_seconds += delta;
        self.elapsed_frames += 1;

        if total <= self.last_report + 1.0 {
            return None;
        }

        let frames = self.elapsed_frames as f64;
        let (ms_per_frame, fps) = if self.elapsed_seconds > 0.0 {
            (
                self.elapsed_seconds * 1000.0 / frames,
                frames / self.elapsed_seconds,
            )
        } else {
            (0.0, 0.0)
        };

        self.last_report = total;
        self.elapsed_seconds = 0.0;
        self.elapsed_frames = 0;

        Some(TelemetrySample {
            backend,
            threads,
            ms_per_frame,
            fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_reports_immediately() {
        let mut stats = FrameStats::new();
        let sample = stats.record(0.0, 0.0, BackendKind::VectorCpu, Some(8)).unwrap();
        assert_eq!(sample.fps, 0.0);
        assert_eq!(sample.ms_per_frame, 0.0);
    }

    #[test]
    fn reports_once_per_second() {
        let mut stats = FrameStats::new();
        let mut total = 0.0;
        stats.record(0.0, total, BackendKind::ScalarCpu, Some(4));

        let mut samples = Vec::new();
        for _ in 0..250 {
            total += 0.01;
            if let Some(s) = stats.record(0.01, total, BackendKind::ScalarCpu, Some(4)) {
                samples.push(s);
            }
        }
        assert_eq!(samples.len(), 2);
        let s = &samples[0];
        assert!((s.fps - 100.0).abs() < 1.0, "{s:?}");
        assert!((s.ms_per_frame - 10.0).abs() < 0.1, "{s:?}");
    }

    #[test]
    fn title_format() {
        let sample = TelemetrySample {
            backend: BackendKind::ScalarCpu,
            threads: Some(4),
            ms_per_frame: 16.5,
            fps: 60.6,
        };
        assert_eq!(
            sample.title(),
            "(CPU Scalar Kernel, 4 threads) : 16.500 ms, 60.6 fps.  [press SPACE to change compute type]"
        );

        let gpu = TelemetrySample { backend: BackendKind::Gpu, threads: None, ..sample };
        assert!(gpu.title().starts_with("(GPU Compute) : "));
    }
}
