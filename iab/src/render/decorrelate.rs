//! Object decorrelation with hysteresis (§4.5 "Decorrelation"): a fixed all-pass
//! network applied to a second accumulator buffer, summed into the coherent
//! output, and kept running for at least two additional frames after the last
//! frame that actually requested decorrelation before its state is cleared.

/// Minimum number of additional frames decorrelation stays active after the last
/// frame that actually requested it (§4.5).
pub const HYSTERESIS_TAIL_FRAMES: u32 = 2;

/// One channel's fixed all-pass stage: `y[n] = -g*x[n] + x[n-1] + g*y[n-1]`, with
/// a per-channel delay/coefficient so each output channel disperses phase
/// differently (§4.5 "per-channel different delay + phase dispersion").
#[derive(Debug, Clone)]
struct AllPassStage {
    coefficient: f32,
    delay_line: Vec<f32>,
    write_pos: usize,
    prev_x: f32,
    prev_y: f32,
}

impl AllPassStage {
    fn new(coefficient: f32, delay_samples: usize) -> Self {
        Self {
            coefficient,
            delay_line: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            prev_x: 0.0,
            prev_y: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay_line[self.write_pos];
        self.delay_line[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % self.delay_line.len();

        let y = -self.coefficient * delayed + self.prev_x + self.coefficient * self.prev_y;
        self.prev_x = delayed;
        self.prev_y = y;
        y
    }

    fn reset(&mut self) {
        self.delay_line.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
        self.prev_x = 0.0;
        self.prev_y = 0.0;
    }
}

/// Per-output-channel decorrelation network plus hysteresis tail counter.
pub struct Decorrelator {
    stages: Vec<AllPassStage>,
    tail_remaining: u32,
}

impl Decorrelator {
    pub fn new(channel_count: usize) -> Self {
        let stages = (0..channel_count)
            .map(|i| {
                let coefficient = 0.5 + 0.3 * ((i as f32 * 0.37).sin());
                let delay_samples = 11 + i * 7;
                AllPassStage::new(coefficient, delay_samples)
            })
            .collect();
        Self {
            stages,
            tail_remaining: 0,
        }
    }

    /// Call once per frame before processing: `decor_requested` is true when any
    /// object in the frame carried `decor_prefix == MaxDecor` in sub-block 0.
    ///
    /// `tail_remaining` counts this frame plus any still-owed tail frames: a
    /// request resets it to `HYSTERESIS_TAIL_FRAMES + 1` (the requesting frame
    /// itself, plus `HYSTERESIS_TAIL_FRAMES` additional frames of continued
    /// activity once requests stop), so the network stays active for the
    /// requesting frame and the two frames after it before resetting.
    pub fn begin_frame(&mut self, decor_requested: bool) {
        if decor_requested {
            self.tail_remaining = HYSTERESIS_TAIL_FRAMES + 1;
        } else if self.tail_remaining > 0 {
            self.tail_remaining -= 1;
            if self.tail_remaining == 0 {
                for stage in &mut self.stages {
                    stage.reset();
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.tail_remaining > 0
    }

    /// Runs the all-pass network over `decor_buffer` and adds the result into
    /// `coherent_output`, channel by channel.
    pub fn process_into(&mut self, decor_buffer: &[Vec<f32>], coherent_output: &mut [Vec<f32>]) {
        if !self.is_active() {
            return;
        }
        for (channel, stage) in self.stages.iter_mut().enumerate() {
            let Some(input) = decor_buffer.get(channel) else {
                continue;
            };
            let Some(output) = coherent_output.get_mut(channel) else {
                continue;
            };
            for (sample_in, sample_out) in input.iter().zip(output.iter_mut()) {
                *sample_out += stage.process(*sample_in);
            }
        }
    }
}
