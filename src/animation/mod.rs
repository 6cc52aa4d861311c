//! Layered animation runtime.
//!
//! Data flows bottom-up:
//!
//! - [`KeyframeTrack`] / [`AnimationClip`]: immutable keyframe data
//! - [`AnimatorState`] / [`StateMachine`]: named playable states over clips
//! - [`AnimatorController`]: ordered layer definitions, shared between animators
//! - [`LayerRuntime`]: per-entity playback and crossfade state of one layer
//! - [`Animator`]: evaluates, composites and pushes poses every frame
//! - [`AnimationSystem`]: owns animators and ticks them once per frame

pub mod values;
pub mod tracks;
pub mod clip;
pub mod binding;
pub mod binder;
pub mod pose;
pub mod state;
pub mod state_machine;
pub mod controller;
pub mod layer;
pub mod settings;
pub mod target;
pub mod animator;
pub mod system;

pub use values::{Interpolatable, MorphWeightData};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack, TrackFault};
pub use clip::{AnimationClip, ClipFault, Track, TrackData, TrackMeta};
pub use binding::{TargetPath, TrackBinding};
pub use binder::Binder;
pub use pose::{ChannelMask, LocalTransform, Pose, PoseBase, PoseLayout, TargetId};
pub use state::{AnimatorState, StateId, StatePlayback, WrapMode};
pub use state_machine::StateMachine;
pub use controller::{AnimatorController, LayerBlendMode, LayerDefinition, TargetMask};
pub use layer::{CrossFade, CrossFadeOutcome, LayerPhase, LayerRuntime, LayerState};
pub use settings::{AnimatorSettings, CullingMode};
pub use target::{NullSink, PoseSink, VisibilityQuery};
pub use animator::{Animator, AnimatorStateInfo};
pub use system::{AnimationHost, AnimationSystem, AnimatorHandle};
