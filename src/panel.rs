// Panel adapter
// Toolkit-independent state behind a tray icon with a popup brightness slider

use crate::backend::Connect;
use crate::brightness::BrightnessEngine;
use crate::config::Config;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Owns the engine and mirrors what the widgets should show.
///
/// Session-level failures never escape: they leave the control unavailable
/// and the slider where it was.
pub struct BacklightPanel<C: Connect> {
    engine: BrightnessEngine<C>,
    scroll_step: f64,
    slider: f64,
    visible: bool,
    available: bool,
}

impl<C: Connect> BacklightPanel<C> {
    /// Build the panel and seed the slider from the current brightness.
    pub fn new(engine: BrightnessEngine<C>, config: &Config) -> Self {
        let mut panel = Self {
            engine,
            scroll_step: config.scroll_step,
            slider: 100.0,
            visible: false,
            available: false,
        };
        panel.refresh();
        panel
    }

    /// Re-read the session brightness. `None` when the control is unavailable.
    pub fn refresh(&mut self) -> Option<f64> {
        match self.engine.get_session_brightness() {
            Ok(percentage) => {
                self.available = true;
                self.slider = percentage;
                Some(percentage)
            }
            Err(e) => {
                warn!("Backlight control unavailable: {}", e);
                self.available = false;
                None
            }
        }
    }

    /// Icon click: show the popup if it is hidden and the control works, hide it otherwise.
    pub fn toggle(&mut self) -> bool {
        if self.visible {
            self.visible = false;
        } else {
            self.refresh();
            self.visible = self.available;
        }
        self.visible
    }

    /// Popup lost focus: hide it, then re-read so the tooltip reflects changes made elsewhere.
    pub fn focus_lost(&mut self) {
        self.visible = false;
        self.refresh();
    }

    /// Slider moved to `value` percent; broadcasts it to every output.
    pub fn slider_changed(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.slider = value.clamp(0.0, 100.0);
        match self.engine.set_session_brightness(self.slider) {
            Ok(_) => self.available = true,
            Err(e) => {
                warn!("Failed to set brightness: {}", e);
                if e.is_fatal() {
                    self.available = false;
                }
            }
        }
    }

    /// Mouse wheel over the slider: one step, whole percent, clamped to `[0, 100]`.
    pub fn scroll(&mut self, direction: ScrollDirection) {
        let value = match direction {
            ScrollDirection::Up => self.slider + self.scroll_step,
            ScrollDirection::Down => self.slider - self.scroll_step,
        };
        self.slider_changed(value.trunc().clamp(0.0, 100.0));
    }

    pub fn tooltip(&self) -> String {
        match self.engine.last_brightness() {
            Some(percentage) if self.available => {
                format!("Brightness: {}%", percentage.round() as i64)
            }
            _ => "Brightness".to_string(),
        }
    }

    pub fn slider_value(&self) -> f64 {
        self.slider
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeServer, NEW_ATOM};
    use std::time::Duration;

    fn panel(server: &FakeServer) -> BacklightPanel<FakeServer> {
        let engine = BrightnessEngine::new(server.clone()).with_settle_delay(Duration::ZERO);
        BacklightPanel::new(engine, &Config::default())
    }

    fn laptop() -> FakeServer {
        FakeServer::new()
            .with_screen(0x100, Some(vec![1]))
            .with_backlight(1, NEW_ATOM, 40, 0, 100)
    }

    #[test]
    fn test_construction_seeds_slider() {
        let panel = panel(&laptop());
        assert!(panel.is_available());
        assert_eq!(panel.slider_value(), 40.0);
        assert_eq!(panel.tooltip(), "Brightness: 40%");
        assert!(!panel.is_visible());
    }

    #[test]
    fn test_no_display_is_neutral() {
        let mut panel = panel(&FakeServer::unreachable());
        assert!(!panel.is_available());
        assert_eq!(panel.tooltip(), "Brightness");
        assert_eq!(panel.refresh(), None);

        // Clicking the icon does not open a dead control
        assert!(!panel.toggle());
        panel.slider_changed(50.0);
        assert!(!panel.is_available());
    }

    #[test]
    fn test_toggle_and_focus_loss() {
        let server = laptop();
        let mut panel = panel(&server);

        assert!(panel.toggle());
        assert!(panel.is_visible());
        assert!(!panel.toggle());

        panel.toggle();
        server.state.borrow_mut().properties.clear();
        panel.focus_lost();
        assert!(!panel.is_visible());
        assert!(!panel.is_available());
    }

    #[test]
    fn test_slider_change_writes_all_outputs() {
        let server = laptop()
            .with_screen(0x200, Some(vec![2]))
            .with_backlight(2, NEW_ATOM, 0, 0, 255);
        let mut panel = panel(&server);

        panel.slider_changed(70.0);
        assert_eq!(server.value(1, NEW_ATOM), Some(70));
        assert_eq!(server.value(2, NEW_ATOM), Some(179));
        assert_eq!(panel.tooltip(), "Brightness: 70%");
    }

    #[test]
    fn test_scroll_steps_and_clamps() {
        let server = FakeServer::new()
            .with_screen(0x100, Some(vec![1]))
            .with_backlight(1, NEW_ATOM, 99, 0, 100);
        let mut panel = panel(&server);

        panel.scroll(ScrollDirection::Up);
        assert_eq!(panel.slider_value(), 100.0);
        panel.scroll(ScrollDirection::Up);
        assert_eq!(panel.slider_value(), 100.0);
        panel.scroll(ScrollDirection::Down);
        assert_eq!(server.value(1, NEW_ATOM), Some(99));
    }

    #[test]
    fn test_scroll_truncates_fractional_slider() {
        // 1 of 3 is 33.33%
        let server = FakeServer::new()
            .with_screen(0x100, Some(vec![1]))
            .with_backlight(1, NEW_ATOM, 1, 0, 3);
        let mut panel = panel(&server);

        panel.scroll(ScrollDirection::Down);
        assert_eq!(panel.slider_value(), 32.0);
    }

    #[test]
    fn test_slider_ignores_nan() {
        let server = laptop();
        let mut panel = panel(&server);
        panel.slider_changed(f64::NAN);
        assert!(server.writes().is_empty());
        assert_eq!(panel.slider_value(), 40.0);
    }
}
