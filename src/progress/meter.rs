use std::time::{Duration, Instant};
use crate::core::Progress;
use crate::utils::format_speed;

/// Ticks arriving faster than this after the start are folded into the next one
pub const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Turns a running byte count into the progress fields of a snapshot
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    total_bytes: u64,
    bytes_loaded: u64,
    start_time: Instant,
}

impl ProgressMeter {
    pub fn new(total_bytes: u64) -> Self {
        Self::started_at(total_bytes, Instant::now())
    }

    pub fn started_at(total_bytes: u64, start_time: Instant) -> Self {
        Self {
            total_bytes,
            bytes_loaded: 0,
            start_time,
        }
    }

    pub fn bytes_loaded(&self) -> u64 {
        self.bytes_loaded
    }

    /// Record a tick. `None` means the tick is deferred.
    pub fn record(&mut self, bytes: u64) -> Option<Progress> {
        self.bytes_loaded = self.bytes_loaded.saturating_add(bytes);
        compute_progress(self.bytes_loaded, self.total_bytes, self.start_time.elapsed())
    }
}

/// Progress after `loaded` of `total` bytes went out in `elapsed`.
///
/// Returns `None` below [`MIN_ELAPSED`], where the speed is not meaningful.
pub fn compute_progress(loaded: u64, total: u64, elapsed: Duration) -> Option<Progress> {
    if elapsed < MIN_ELAPSED {
        return None;
    }

    let speed = loaded as f64 / elapsed.as_secs_f64();
    let remaining = total.saturating_sub(loaded);
    let time_remaining = if speed > 0.0 {
        Some((remaining as f64 / speed).ceil() as u64)
    } else {
        None
    };

    let percent_completed = if total == 0 {
        100
    } else {
        ((loaded as f64 / total as f64) * 100.0).round().min(100.0) as u8
    };

    Some(Progress {
        time_remaining,
        speed: Some(speed),
        percent_completed: Some(percent_completed),
        speed_human: Some(format_speed(speed)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_math() {
        let progress = compute_progress(512, 2048, Duration::from_secs(2)).unwrap();

        assert_eq!(progress.speed, Some(256.0));
        assert_eq!(progress.time_remaining, Some(6));
        assert_eq!(progress.percent_completed, Some(25));
        assert_eq!(progress.speed_human.as_deref(), Some("256 Bytes/s"));
    }

    #[test]
    fn test_time_remaining_rounds_up() {
        let progress = compute_progress(1000, 2500, Duration::from_secs(1)).unwrap();
        assert_eq!(progress.time_remaining, Some(2));
    }

    #[test]
    fn test_near_zero_elapsed_is_deferred() {
        assert!(compute_progress(100, 1000, Duration::ZERO).is_none());
        assert!(compute_progress(100, 1000, Duration::from_micros(999)).is_none());
        assert!(compute_progress(100, 1000, MIN_ELAPSED).is_some());
    }

    #[test]
    fn test_zero_speed_has_no_eta() {
        let progress = compute_progress(0, 1000, Duration::from_secs(1)).unwrap();
        assert_eq!(progress.time_remaining, None);
        assert_eq!(progress.percent_completed, Some(0));
        assert_eq!(progress.speed_human.as_deref(), Some("0 Byte/s"));
    }

    #[test]
    fn test_empty_file_is_complete() {
        let progress = compute_progress(0, 0, Duration::from_secs(1)).unwrap();
        assert_eq!(progress.percent_completed, Some(100));
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let progress = compute_progress(1500, 1000, Duration::from_secs(1)).unwrap();
        assert_eq!(progress.percent_completed, Some(100));
        assert_eq!(progress.time_remaining, Some(0));
    }

    #[test]
    fn test_percent_is_bounded_and_monotonic() {
        for total in [1u64, 7, 100, 1023, 65_536, 10_000_019] {
            let step = (total / 37).max(1);
            let mut loaded = 0;
            let mut last = 0u8;
            let mut elapsed = Duration::from_millis(1);

            while loaded <= total {
                let percent = compute_progress(loaded, total, elapsed)
                    .and_then(|p| p.percent_completed)
                    .unwrap();

                assert!(percent <= 100);
                assert!(percent >= last, "percent went back for total {total}");
                last = percent;
                loaded += step;
                elapsed += Duration::from_millis(3);
            }
        }
    }

    #[test]
    fn test_meter_accumulates() {
        let start = Instant::now() - Duration::from_secs(1);
        let mut meter = ProgressMeter::started_at(100, start);

        meter.record(30);
        let progress = meter.record(20).unwrap();

        assert_eq!(meter.bytes_loaded(), 50);
        assert_eq!(progress.percent_completed, Some(50));
    }
}
