//! Screen-facing side of the node.
//!
//! - [`layout`]: page and component addressing plus gauge picture maps
//! - [`cache`]: last-sent values so unchanged readouts are not re-pushed
//! - [`bootstrap`]: bounded read-back of screen-held fields at startup

pub mod bootstrap;
pub mod cache;
pub mod layout;

pub use bootstrap::{Bootstrap, BootstrapSnapshot};
pub use cache::{DisplayCache, DisplayView};
pub use layout::{Attr, Component, Page, Release};

use log::{debug, warn};

use crate::app::ports::ScreenPort;

/// Text the screen library hands back when a text read failed.
pub const TEXT_NOT_READY: &str = "Error";

/// Numeric value the screen library hands back when a read failed.
pub const NUMBER_NOT_READY: i32 = -1;

/// One write towards the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    Number(Attr, i32),
    Text(Attr, String),
    Command(String),
}

impl DisplayUpdate {
    /// Send this update.  Steady-state write failures are logged and dropped.
    pub fn apply(&self, screen: &mut impl ScreenPort) {
        let result = match self {
            Self::Number(attr, v) => screen.set_number(*attr, *v),
            Self::Text(attr, s) => screen.set_text(*attr, s),
            Self::Command(cmd) => screen.command(cmd),
        };
        if let Err(e) = result {
            warn!("DISPLAY: write failed ({self:?}): {e}");
        }
    }
}

/// Apply a batch of updates in order.
pub fn apply_all(screen: &mut impl ScreenPort, updates: &[DisplayUpdate]) {
    for update in updates {
        update.apply(screen);
    }
}

/// Steady-state numeric read.  Not-ready answers read as `None`.
pub fn read_number(screen: &mut impl ScreenPort, attr: Attr) -> Option<i32> {
    match screen.get_number(attr) {
        Ok(NUMBER_NOT_READY) => None,
        Ok(v) => Some(v),
        Err(e) => {
            debug!("DISPLAY: reading {attr}: {e}");
            None
        }
    }
}

/// Steady-state text read.  Not-ready answers read as `None`.
pub fn read_text(screen: &mut impl ScreenPort, attr: Attr) -> Option<String> {
    match screen.get_text(attr) {
        Ok(s) if s == TEXT_NOT_READY => None,
        Ok(s) => Some(s),
        Err(e) => {
            debug!("DISPLAY: reading {attr}: {e}");
            None
        }
    }
}
