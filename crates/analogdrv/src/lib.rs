//! Analog (PWM) output driver: per-terminal RGBWW store, PWM-limit clamp,
//! and pulse-register emission.
//!
//! `AnalogDriver` is a leaf component, mirroring [`strip::Strip`] — it knows
//! nothing about topology or universe routing; [`control`] decides which
//! terminal gets which component and when to call [`AnalogDriver::sync`].

use color::ColorSpaceConverter;
use iface::PwmTimer;
use types::Rgbww;

/// Number of analog terminals this workspace's topology table ever drives
/// at once (spec §3: "at most two analog terminals driven").
pub const TERMINAL_COUNT: usize = 2;

/// One analog terminal: its current linear RGBWW value, PWM ceiling, and
/// active colorspace.
struct Terminal {
    value: Rgbww,
    pwm_limit: f32,
    colorspace: ColorSpaceConverter,
}

impl Terminal {
    fn new() -> Self {
        Self {
            value: Rgbww::default(),
            pwm_limit: 1.0,
            colorspace: ColorSpaceConverter::default(),
        }
    }

    /// Clamp every component to `limit * 65535` and return the six pulse
    /// register values (r,g,b,w,ww, and a reserved sixth register held at
    /// zero — the driver entity always backs six registers per spec §4.3
    /// even though only five components are meaningful).
    fn pulses(&self) -> [u16; 6] {
        let ceiling = self.pwm_limit.clamp(0.0, 1.0) * 65535.0;
        let clamp = |v: f32| (v.clamp(0.0, 1.0) * 65535.0).min(ceiling).round() as u16;
        [
            clamp(self.value.r),
            clamp(self.value.g),
            clamp(self.value.b),
            clamp(self.value.w),
            clamp(self.value.ww),
            0,
        ]
    }
}

/// Owns both analog terminals' current values and drives their PWM timers.
pub struct AnalogDriver {
    terminals: [Terminal; TERMINAL_COUNT],
}

impl AnalogDriver {
    pub fn new() -> Self {
        Self {
            terminals: [Terminal::new(), Terminal::new()],
        }
    }

    /// Store the tuple for `terminal` (0 or 1). No-op if out of range.
    pub fn set_rgbww(&mut self, terminal: usize, value: Rgbww) {
        if let Some(t) = self.terminals.get_mut(terminal) {
            t.value = value;
        }
    }

    /// Current stored value for `terminal`, read back in linear CIE space.
    pub fn current_rgbww(&self, terminal: usize) -> Rgbww {
        self.terminals
            .get(terminal)
            .map(|t| t.value)
            .unwrap_or_default()
    }

    pub fn set_pwm_limit(&mut self, terminal: usize, limit: f32) {
        if let Some(t) = self.terminals.get_mut(terminal) {
            t.pwm_limit = limit.clamp(0.0, 1.0);
        }
    }

    pub fn set_rgb_colorspace(&mut self, terminal: usize, space: &str) {
        if let Some(t) = self.terminals.get_mut(terminal) {
            t.colorspace = ColorSpaceConverter::named(space);
        }
    }

    pub fn colorspace(&self, terminal: usize) -> Option<&ColorSpaceConverter> {
        self.terminals.get(terminal).map(|t| &t.colorspace)
    }

    /// Write the six PWM pulse registers for `terminal` to `timer`.
    pub fn sync(&self, terminal: usize, timer: &mut dyn PwmTimer) {
        if let Some(t) = self.terminals.get(terminal) {
            timer.write_pulses(t.pulses());
        }
    }
}

impl Default for AnalogDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTimer {
        last: Option<[u16; 6]>,
    }

    impl PwmTimer for FakeTimer {
        fn write_pulses(&mut self, values: [u16; 6]) {
            self.last = Some(values);
        }
    }

    #[test]
    fn set_and_read_back_rgbww() {
        let mut drv = AnalogDriver::new();
        let v = Rgbww {
            r: 0.5,
            g: 0.25,
            b: 0.1,
            w: 0.0,
            ww: 0.9,
        };
        drv.set_rgbww(0, v);
        assert_eq!(drv.current_rgbww(0).r, 0.5);
        assert_eq!(drv.current_rgbww(1), Rgbww::default());
    }

    #[test]
    fn sync_writes_scaled_pulses() {
        let mut drv = AnalogDriver::new();
        drv.set_rgbww(
            0,
            Rgbww {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                w: 0.0,
                ww: 0.0,
            },
        );
        let mut timer = FakeTimer { last: None };
        drv.sync(0, &mut timer);
        assert_eq!(timer.last.unwrap()[0], 65535);
    }

    #[test]
    fn pwm_limit_clamps_full_scale() {
        let mut drv = AnalogDriver::new();
        drv.set_pwm_limit(0, 0.5);
        drv.set_rgbww(
            0,
            Rgbww {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                w: 1.0,
                ww: 1.0,
            },
        );
        let mut timer = FakeTimer { last: None };
        drv.sync(0, &mut timer);
        let pulses = timer.last.unwrap();
        assert_eq!(pulses[0], 32768); // round(0.5 * 65535)
        assert_eq!(pulses[5], 0);
    }

    #[test]
    fn out_of_range_terminal_is_a_noop() {
        let mut drv = AnalogDriver::new();
        drv.set_rgbww(5, Rgbww::default());
        drv.set_pwm_limit(5, 0.5);
        assert_eq!(drv.colorspace(5), None);
    }
}
