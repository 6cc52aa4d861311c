use crate::animation::binding::{TargetPath, TrackBinding};
use crate::animation::clip::{AnimationClip, TrackData};
use crate::animation::pose::PoseLayout;

pub struct Binder;

impl Binder {
    /// Resolves every usable track of `clip` to a pose slot, registering new
    /// target names in `layout` as needed.
    ///
    /// Tracks with no keyframes, or whose data kind does not fit their
    /// channel, are left unbound.
    pub fn bind(layout: &mut PoseLayout, clip: &AnimationClip) -> Vec<TrackBinding> {
        let mut bindings = Vec::with_capacity(clip.tracks.len());

        for (track_index, track) in clip.tracks.iter().enumerate() {
            if !clip.is_track_usable(track_index) {
                continue;
            }

            let target = layout.insert(&track.meta.node_name);
            let path = track.meta.target;

            match (&track.data, path) {
                (TrackData::MorphWeights(t), TargetPath::Weights) => {
                    let count = t.values().iter().map(|w| w.len()).max().unwrap_or(0);
                    layout.reserve_morph_targets(target, count);
                }
                (_, TargetPath::Weight(index)) => {
                    layout.reserve_morph_targets(target, usize::from(index) + 1);
                }
                _ => {}
            }

            bindings.push(TrackBinding {
                track_index,
                target,
                path,
            });
        }

        bindings
    }
}
