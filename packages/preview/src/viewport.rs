//! Device-width presets for the preview surface

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ComposeError;

/// Viewport dimensions for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    /// Mobile: 375x667 (iPhone SE)
    Mobile,

    /// Tablet: 768x1024 (iPad)
    Tablet,

    /// Desktop: 1920x1080 (HD)
    #[default]
    Desktop,

    /// Custom dimensions (width, height)
    Custom(u32, u32),
}

impl Viewport {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Viewport::Mobile => (375, 667),
            Viewport::Tablet => (768, 1024),
            Viewport::Desktop => (1920, 1080),
            Viewport::Custom(w, h) => (*w, *h),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Viewport::Mobile => f.write_str("mobile"),
            Viewport::Tablet => f.write_str("tablet"),
            Viewport::Desktop => f.write_str("desktop"),
            Viewport::Custom(w, h) => write!(f, "{}x{}", w, h),
        }
    }
}

/// Accepts preset names or `WIDTHxHEIGHT`
impl FromStr for Viewport {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "mobile" => return Ok(Viewport::Mobile),
            "tablet" => return Ok(Viewport::Tablet),
            "desktop" => return Ok(Viewport::Desktop),
            _ => {}
        }

        let invalid = || ComposeError::InvalidViewport(s.to_string());
        let (w, h) = value.split_once('x').ok_or_else(invalid)?;
        let w: u32 = w.parse().map_err(|_| invalid())?;
        let h: u32 = h.parse().map_err(|_| invalid())?;
        if w == 0 || h == 0 {
            return Err(invalid());
        }
        Ok(Viewport::Custom(w, h))
    }
}
