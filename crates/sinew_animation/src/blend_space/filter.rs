use std::collections::VecDeque;

use sinew_core::math::SMALL_NUMBER;

use super::config::FilterCurve;

#[derive(Debug, Clone, Copy)]
struct FilterEntry {
    time: f32,
    value: f32,
}

/// Time-window FIR filter smoothing one blend-space axis.
///
/// Keeps every input received in the last `window` seconds and returns their
/// weighted average, entries weighted by [`FilterCurve`] of their recency.
#[derive(Debug, Clone)]
pub struct InputFilter {
    window: f32,
    curve: FilterCurve,
    clock: f32,
    history: VecDeque<FilterEntry>,
}

impl InputFilter {
    #[must_use]
    pub fn new(window: f32, curve: FilterCurve) -> Self {
        Self {
            window,
            curve,
            clock: 0.0,
            history: VecDeque::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.window > 0.0
    }

    pub fn reset(&mut self) {
        self.clock = 0.0;
        self.history.clear();
    }

    /// Pushes `value` received `delta_time` after the previous one and
    /// returns the filtered value. Pass-through when disabled.
    pub fn filter(&mut self, value: f32, delta_time: f32) -> f32 {
        if !self.is_enabled() {
            return value;
        }

        let entry = FilterEntry {
            time: self.clock + delta_time.max(0.0),
            value,
        };
        // A sample at an unchanged clock supersedes the newest one
        match self.history.back_mut() {
            Some(newest) if entry.time <= self.clock => *newest = entry,
            _ => self.history.push_back(entry),
        }
        self.clock = entry.time;

        let window_start = self.clock - self.window;
        while self
            .history
            .front()
            .is_some_and(|entry| entry.time < window_start)
        {
            self.history.pop_front();
        }

        let mut total_weight = 0.0;
        let mut sum = 0.0;
        for entry in &self.history {
            let recency = (entry.time - window_start) / self.window;
            let weight = self.curve.weight(recency);
            total_weight += weight;
            sum += entry.value * weight;
        }

        if total_weight > SMALL_NUMBER {
            sum / total_weight
        } else {
            value
        }
    }
}
