//! Rotary dial and push button, fed from interrupt context.
//!
//! The dial reports an absolute position on a bounded, wrapping scale.
//! The ISR turns each new position into a ±1 tick and accumulates ticks in
//! an atomic counter; the scheduler drains and zeroes the counter once per
//! tick with an atomic swap, so no tick is lost or counted twice.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

/// Dial position bounds reported by the encoder driver.
pub const DIAL_MIN: i32 = 0;
pub const DIAL_MAX: i32 = 12;

/// Tick accumulator shared between ISR and scheduler.
pub struct RotaryEncoder {
    ticks: AtomicI32,
    last_position: AtomicI32,
    button: AtomicBool,
    half_range: i32,
}

impl RotaryEncoder {
    pub const fn new(min: i32, max: i32) -> Self {
        Self {
            ticks: AtomicI32::new(0),
            last_position: AtomicI32::new(min),
            button: AtomicBool::new(false),
            half_range: (max - min + 1) / 2,
        }
    }

    /// Seed the last known position (at startup, before interrupts run).
    pub fn set_position(&self, position: i32) {
        self.last_position.store(position, Ordering::Relaxed);
    }

    /// ISR: the dial reported `position`.
    ///
    /// A jump of more than half the range is a wrap-around and counts in
    /// the opposite direction of the raw difference.
    pub fn knob_turned(&self, position: i32) {
        let diff = position - self.last_position.swap(position, Ordering::Relaxed);
        let direction = if diff > self.half_range {
            -1
        } else if diff < -self.half_range {
            1
        } else {
            diff.signum()
        };
        if direction != 0 {
            self.ticks.fetch_add(direction, Ordering::AcqRel);
        }
    }

    /// ISR: the push button was pressed.
    pub fn button_pressed(&self) {
        self.button.store(true, Ordering::Release);
    }

    /// Take every tick accumulated since the last drain.
    pub fn drain_ticks(&self) -> i32 {
        self.ticks.swap(0, Ordering::AcqRel)
    }

    /// Take the button latch.
    pub fn take_button(&self) -> bool {
        self.button.swap(false, Ordering::AcqRel)
    }
}

/// Direction of one quarter step, indexed by `(previous << 2) | current`
/// where each state is `(A << 1) | B`.  Invalid jumps count as zero.
const QUARTER_STEPS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Quarter steps between two detents.
const STEPS_PER_DETENT: i32 = 4;

/// Gray-code decoder for the dial's A/B lines.
///
/// Both pin interrupts feed [`pins_changed`](Self::pins_changed); each full
/// detent moves a bounded, wrapping position, which is what
/// [`RotaryEncoder::knob_turned`] expects.
pub struct Quadrature {
    state: AtomicU8,
    quarters: AtomicI32,
    position: AtomicI32,
    min: i32,
    max: i32,
}

impl Quadrature {
    pub const fn new(min: i32, max: i32) -> Self {
        Self {
            state: AtomicU8::new(0b11),
            quarters: AtomicI32::new(0),
            position: AtomicI32::new(min),
            min,
            max,
        }
    }

    /// ISR: new levels on A and B.  Returns the new position when a detent
    /// completes.
    pub fn pins_changed(&self, a: bool, b: bool) -> Option<i32> {
        let current = (u8::from(a) << 1) | u8::from(b);
        let previous = self.state.swap(current, Ordering::Relaxed);
        let step = QUARTER_STEPS[usize::from((previous << 2) | current)];
        if step == 0 {
            return None;
        }
        let quarters = self.quarters.fetch_add(i32::from(step), Ordering::Relaxed) + i32::from(step);
        if quarters.abs() < STEPS_PER_DETENT {
            return None;
        }
        self.quarters.store(0, Ordering::Relaxed);

        let mut position = self.position.load(Ordering::Relaxed) + quarters.signum();
        if position > self.max {
            position = self.min;
        } else if position < self.min {
            position = self.max;
        }
        self.position.store(position, Ordering::Relaxed);
        Some(position)
    }
}

/// Decoder for the board's dial lines.
pub static QUADRATURE: Quadrature = Quadrature::new(DIAL_MIN, DIAL_MAX);

/// Registered on both dial line interrupts with the sampled levels.
pub fn dial_lines_isr_handler(a: bool, b: bool) {
    if let Some(position) = QUADRATURE.pins_changed(a, b) {
        encoder_isr_handler(position);
    }
}

/// The board's single dial.  `static` because ISR callbacks cannot capture.
pub static ENCODER: RotaryEncoder = RotaryEncoder::new(DIAL_MIN, DIAL_MAX);

/// Registered as the encoder driver's position callback.
pub fn encoder_isr_handler(position: i32) {
    ENCODER.knob_turned(position);
}

/// Registered as the push button's GPIO interrupt handler.
pub fn button_isr_handler() {
    ENCODER.button_pressed();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dial() -> RotaryEncoder {
        RotaryEncoder::new(DIAL_MIN, DIAL_MAX)
    }

    #[test]
    fn forward_and_back() {
        let e = dial();
        e.knob_turned(1);
        e.knob_turned(2);
        e.knob_turned(3);
        assert_eq!(e.drain_ticks(), 3);
        e.knob_turned(2);
        assert_eq!(e.drain_ticks(), -1);
    }

    #[test]
    fn drain_zeroes_the_counter() {
        let e = dial();
        e.knob_turned(1);
        assert_eq!(e.drain_ticks(), 1);
        assert_eq!(e.drain_ticks(), 0);
    }

    #[test]
    fn wrap_around_keeps_direction() {
        let e = dial();
        e.set_position(12);
        e.knob_turned(0);
        assert_eq!(e.drain_ticks(), 1);
        e.knob_turned(12);
        assert_eq!(e.drain_ticks(), -1);
    }

    #[test]
    fn half_range_boundary() {
        // Range 13, half 6: a jump of exactly 6 is taken at face value.
        let e = dial();
        e.knob_turned(6);
        assert_eq!(e.drain_ticks(), 1);
        e.knob_turned(0);
        assert_eq!(e.drain_ticks(), -1);
        // One past the half range is a wrap.
        e.knob_turned(7);
        assert_eq!(e.drain_ticks(), -1);
    }

    #[test]
    fn same_position_is_no_tick() {
        let e = dial();
        e.knob_turned(0);
        assert_eq!(e.drain_ticks(), 0);
    }

    #[test]
    fn button_latch_is_taken_once() {
        let e = dial();
        assert!(!e.take_button());
        e.button_pressed();
        e.button_pressed();
        assert!(e.take_button());
        assert!(!e.take_button());
    }

    /// One detent clockwise: 11 -> 01 -> 00 -> 10 -> 11.
    const CLOCKWISE: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

    #[test]
    fn full_detent_moves_one_position() {
        let q = Quadrature::new(DIAL_MIN, DIAL_MAX);
        let moves: Vec<_> = CLOCKWISE.iter().map(|&(a, b)| q.pins_changed(a, b)).collect();
        assert_eq!(moves, vec![None, None, None, Some(1)]);
        for &(a, b) in CLOCKWISE.iter().rev().skip(1) {
            assert_eq!(q.pins_changed(a, b), None);
        }
        assert_eq!(q.pins_changed(true, true), Some(0));
    }

    #[test]
    fn position_wraps_at_the_bounds() {
        let q = Quadrature::new(DIAL_MIN, DIAL_MAX);
        // Counter-clockwise from the minimum.
        for &(a, b) in &[(true, false), (false, false), (false, true)] {
            assert_eq!(q.pins_changed(a, b), None);
        }
        assert_eq!(q.pins_changed(true, true), Some(DIAL_MAX));
    }

    #[test]
    fn contact_bounce_cancels_out() {
        let q = Quadrature::new(DIAL_MIN, DIAL_MAX);
        assert_eq!(q.pins_changed(false, true), None);
        assert_eq!(q.pins_changed(true, true), None);
        assert_eq!(q.pins_changed(false, true), None);
        assert_eq!(q.pins_changed(false, false), None);
        assert_eq!(q.pins_changed(true, false), None);
        assert_eq!(q.pins_changed(true, true), Some(1));
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        use std::sync::Arc;
        let e = Arc::new(dial());
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let e = Arc::clone(&e);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        e.ticks.fetch_add(1, Ordering::AcqRel);
                    }
                })
            })
            .collect();
        let mut total = 0;
        for p in producers {
            p.join().unwrap();
            total += e.drain_ticks();
        }
        total += e.drain_ticks();
        assert_eq!(total, 4000);
    }
}
