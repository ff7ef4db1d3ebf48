use std::time::{Duration, Instant};

const HISTORY: usize = 60;

/// Frames-per-second meter, sampled once a second.
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    current: f32,
    history: [f32; HISTORY],
    samples: usize,
    next: usize,
}

impl FpsCounter {
    const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

    pub fn new(now: Instant) -> FpsCounter {
        FpsCounter {
            window_start: now,
            frames: 0,
            current: 0.0,
            history: [0.0; HISTORY],
            samples: 0,
            next: 0,
        }
    }

    /// Call once per presented frame.
    pub fn frame(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed < Self::SAMPLE_PERIOD {
            return;
        }
        self.current = self.frames as f32 / elapsed.as_secs_f32();
        self.history[self.next] = self.current;
        self.next = (self.next + 1) % HISTORY;
        self.samples = (self.samples + 1).min(HISTORY);
        self.frames = 0;
        self.window_start = now;
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn average(&self) -> f32 {
        if self.samples == 0 {
            return 0.0;
        }
        self.history[..self.samples].iter().sum::<f32>() / self.samples as f32
    }
}
