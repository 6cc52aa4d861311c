//! Animator Settings
//!
//! Per-animator runtime configuration, applied when an [`Animator`] is built.
//!
//! ```rust,ignore
//! use kinema::animation::{AnimatorSettings, CullingMode};
//!
//! // Defaults: always animate at normal speed
//! let settings = AnimatorSettings::default();
//!
//! // Background crowd: freeze while off screen, play slightly slower
//! let settings = AnimatorSettings {
//!     culling_mode: CullingMode::CullCompletely,
//!     speed: 0.9,
//!     ..Default::default()
//! };
//!
//! let animator = Animator::with_settings(controller, settings)?;
//! ```
//!
//! [`Animator`]: crate::animation::Animator

/// Whether an animator keeps evaluating while nothing it drives is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CullingMode {
    /// Evaluate every frame regardless of visibility.
    #[default]
    AlwaysAnimate = 0,
    /// Skip evaluation (the pose freezes) while no dependent renderer is
    /// visible. Layer state changes requested meanwhile are still kept.
    CullCompletely = 1,
}

impl CullingMode {
    /// Maps the raw `0` / `1` flag; other values are rejected.
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::AlwaysAnimate),
            1 => Some(Self::CullCompletely),
            _ => None,
        }
    }
}

impl From<CullingMode> for u8 {
    fn from(mode: CullingMode) -> Self {
        mode as u8
    }
}

/// Initial runtime parameters of an animator.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatorSettings {
    /// Global playback speed multiplier applied on top of each state's speed.
    pub speed: f32,
    pub culling_mode: CullingMode,
    /// Disabled animators skip `update` entirely but keep their layer state.
    pub enabled: bool,
}

impl Default for AnimatorSettings {
    #[inline]
    fn default() -> Self {
        Self {
            speed: 1.0,
            culling_mode: CullingMode::AlwaysAnimate,
            enabled: true,
        }
    }
}
