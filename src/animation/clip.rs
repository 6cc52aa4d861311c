use glam::{Quat, Vec3};
use thiserror::Error;

use crate::animation::binding::TargetPath;
use crate::animation::tracks::{KeyframeTrack, TrackFault};
use crate::animation::values::MorphWeightData;

/// Identifies what a track animates: a named node (bone path or property
/// owner) and the channel on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackMeta {
    pub node_name: String,
    pub target: TargetPath,
}

impl TrackMeta {
    pub fn new(node_name: impl Into<String>, target: TargetPath) -> Self {
        Self {
            node_name: node_name.into(),
            target,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
    Scalar(KeyframeTrack<f32>),
    MorphWeights(KeyframeTrack<MorphWeightData>),
}

impl TrackData {
    #[must_use]
    pub fn end_time(&self) -> f32 {
        match self {
            Self::Vector3(t) => t.end_time(),
            Self::Quaternion(t) => t.end_time(),
            Self::Scalar(t) => t.end_time(),
            Self::MorphWeights(t) => t.end_time(),
        }
    }

    #[must_use]
    pub fn fault(&self) -> Option<TrackFault> {
        match self {
            Self::Vector3(t) => t.fault(),
            Self::Quaternion(t) => t.fault(),
            Self::Scalar(t) => t.fault(),
            Self::MorphWeights(t) => t.fault(),
        }
    }

    /// Whether this data kind can drive the given channel.
    #[must_use]
    pub fn fits(&self, target: TargetPath) -> bool {
        matches!(
            (self, target),
            (Self::Vector3(_), TargetPath::Translation | TargetPath::Scale)
                | (Self::Quaternion(_), TargetPath::Rotation)
                | (Self::MorphWeights(_), TargetPath::Weights)
                | (Self::Scalar(_), TargetPath::Weight(_))
        )
    }
}

/// A complete track: what it animates plus its keyframes.
#[derive(Debug, Clone)]
pub struct Track {
    pub meta: TrackMeta,
    pub data: TrackData,
}

impl Track {
    pub fn new(node_name: impl Into<String>, target: TargetPath, data: TrackData) -> Self {
        Self {
            meta: TrackMeta::new(node_name, target),
            data,
        }
    }
}

/// Data-integrity problem in a clip.
///
/// Faults never stop playback: the affected track is sampled from its valid
/// prefix (or skipped when nothing is usable). They are surfaced once, when an
/// animator is built over the clip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipFault {
    #[error("clip '{clip}': track {track} ('{node}') has no keyframes")]
    EmptyTrack {
        clip: String,
        track: usize,
        node: String,
    },

    #[error("clip '{clip}': track {track} ('{node}') keyframe {index} is out of order")]
    UnsortedKeyframes {
        clip: String,
        track: usize,
        node: String,
        index: usize,
    },

    #[error(
        "clip '{clip}': track {track} ('{node}') has {actual} values, expected {expected}"
    )]
    ValueCountMismatch {
        clip: String,
        track: usize,
        node: String,
        expected: usize,
        actual: usize,
    },

    #[error("clip '{clip}': track {track} ('{node}') data does not fit channel {target:?}")]
    ChannelMismatch {
        clip: String,
        track: usize,
        node: String,
        target: TargetPath,
    },

    #[error("state '{state}' loops clip '{clip}' which has zero duration")]
    ZeroDurationLoop { clip: String, state: String },
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    /// Builds a clip; the duration is the latest usable keyframe time across
    /// all tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .map(|t| t.data.end_time())
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Checks every track and returns the problems found.
    #[must_use]
    pub fn validate(&self) -> Vec<ClipFault> {
        let mut faults = Vec::new();
        for (track, t) in self.tracks.iter().enumerate() {
            let clip = self.name.clone();
            let node = t.meta.node_name.clone();

            if !t.data.fits(t.meta.target) {
                faults.push(ClipFault::ChannelMismatch {
                    clip,
                    track,
                    node,
                    target: t.meta.target,
                });
                continue;
            }

            match t.data.fault() {
                None => {}
                Some(TrackFault::Empty) => {
                    faults.push(ClipFault::EmptyTrack { clip, track, node });
                }
                Some(TrackFault::Unsorted { index }) => {
                    faults.push(ClipFault::UnsortedKeyframes {
                        clip,
                        track,
                        node,
                        index,
                    });
                }
                Some(TrackFault::ValueCountMismatch { expected, actual }) => {
                    faults.push(ClipFault::ValueCountMismatch {
                        clip,
                        track,
                        node,
                        expected,
                        actual,
                    });
                }
            }
        }
        faults
    }

    /// Whether the track at `index` can be bound to a pose.
    #[must_use]
    pub fn is_track_usable(&self, index: usize) -> bool {
        self.tracks.get(index).is_some_and(|t| {
            t.data.fits(t.meta.target) && !matches!(t.data.fault(), Some(TrackFault::Empty))
        })
    }
}
