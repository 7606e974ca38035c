use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User interaction signals a front end can report to the monitor.
///
/// Pointer and key events are also accepted under their DOM pointer-event
/// names (`pointerdown`, `pointermove`, `keydown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    #[serde(alias = "pointerdown")]
    MouseDown,
    #[serde(alias = "pointermove")]
    MouseMove,
    #[serde(alias = "keydown")]
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    Wheel,
    Focus,
}

impl ActivityKind {
    /// Signals that reset the idle countdown unless configured otherwise.
    pub const DEFAULT_TRACKED: [ActivityKind; 6] = [
        ActivityKind::MouseDown,
        ActivityKind::MouseMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
        ActivityKind::Click,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActivityKind::MouseDown => "mousedown",
            ActivityKind::MouseMove => "mousemove",
            ActivityKind::KeyPress => "keypress",
            ActivityKind::Scroll => "scroll",
            ActivityKind::TouchStart => "touchstart",
            ActivityKind::Click => "click",
            ActivityKind::Wheel => "wheel",
            ActivityKind::Focus => "focus",
        }
    }

    pub fn default_tracked() -> Vec<ActivityKind> {
        Self::DEFAULT_TRACKED.to_vec()
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mousedown" | "pointerdown" => Ok(ActivityKind::MouseDown),
            "mousemove" | "pointermove" => Ok(ActivityKind::MouseMove),
            "keypress" | "keydown" => Ok(ActivityKind::KeyPress),
            "scroll" => Ok(ActivityKind::Scroll),
            "touchstart" => Ok(ActivityKind::TouchStart),
            "click" => Ok(ActivityKind::Click),
            "wheel" => Ok(ActivityKind::Wheel),
            "focus" => Ok(ActivityKind::Focus),
            other => Err(format!("Unknown activity kind: {}", other)),
        }
    }
}
