//! Rig
//!
//! A minimal bone hierarchy that an [`Animator`] can drive. It is the
//! reference [`PoseSink`]: [`Rig::bind`] maps the animator's targets to bones
//! by name, after which every pushed pose lands on the matching bone's
//! [`Transform`].

use glam::Affine3A;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::animation::{Animator, LocalTransform, PoseSink, TargetId, VisibilityQuery};
use crate::scene::transform::Transform;

new_key_type! {
    pub struct BoneHandle;
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub(crate) parent: Option<BoneHandle>,
    pub(crate) children: Vec<BoneHandle>,
    pub transform: Transform,
    /// Blend-shape weights of the mesh attached to this bone, if any.
    pub morph_weights: Vec<f32>,
}

impl Bone {
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<BoneHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[BoneHandle] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct Rig {
    bones: SlotMap<BoneHandle, Bone>,
    roots: Vec<BoneHandle>,
    by_name: FxHashMap<String, BoneHandle>,
    /// Bound bone per animator [`TargetId`].
    targets: Vec<Option<BoneHandle>>,
    /// Reported to the animator as "some dependent renderer is visible".
    pub visible: bool,
}

impl Rig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bones: SlotMap::with_key(),
            roots: Vec::new(),
            by_name: FxHashMap::default(),
            targets: Vec::new(),
            visible: true,
        }
    }

    /// Adds a bone under `parent` (or as a root) with the given rest pose.
    ///
    /// Names are expected to be unique; on a duplicate the first bone keeps
    /// the name for lookups.
    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<BoneHandle>,
        rest: &LocalTransform,
    ) -> BoneHandle {
        let handle = self.bones.insert(Bone {
            name: name.to_owned(),
            parent,
            children: Vec::new(),
            transform: Transform::from_local(rest),
            morph_weights: Vec::new(),
        });

        match parent.and_then(|p| self.bones.get_mut(p)) {
            Some(parent_bone) => parent_bone.children.push(handle),
            None => self.roots.push(handle),
        }

        if self.by_name.contains_key(name) {
            log::warn!("Rig: duplicate bone name '{name}', lookups resolve to the first one");
        } else {
            self.by_name.insert(name.to_owned(), handle);
        }

        handle
    }

    #[inline]
    #[must_use]
    pub fn find_bone_by_name(&self, name: &str) -> Option<BoneHandle> {
        self.by_name.get(name).copied()
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, handle: BoneHandle) -> Option<&Bone> {
        self.bones.get(handle)
    }

    #[inline]
    pub fn bone_mut(&mut self, handle: BoneHandle) -> Option<&mut Bone> {
        self.bones.get_mut(handle)
    }

    /// Convenience lookup by name.
    #[must_use]
    pub fn bone_named(&self, name: &str) -> Option<&Bone> {
        self.find_bone_by_name(name).and_then(|h| self.bones.get(h))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[BoneHandle] {
        &self.roots
    }

    /// Resolves `animator`'s targets to bones by name and hands each bound
    /// bone's current local transform to the animator as its rest pose.
    ///
    /// Returns the number of targets bound. Targets with no matching bone are
    /// evaluated but their output is dropped.
    pub fn bind(&mut self, animator: &mut Animator) -> usize {
        let names: Vec<(TargetId, String)> = animator
            .layout()
            .iter()
            .map(|(id, name)| (id, name.to_owned()))
            .collect();

        self.targets.clear();
        self.targets.resize(names.len(), None);

        let mut bound = 0;
        for (id, name) in names {
            let Some(handle) = self.find_bone_by_name(&name) else {
                log::warn!("Rig: no bone named '{name}', animation target left unbound");
                continue;
            };
            let Some(bone) = self.bones.get(handle) else {
                continue;
            };
            animator.set_rest_pose(&name, bone.transform.local());
            self.targets[id.index()] = Some(handle);
            bound += 1;
        }

        log::debug!("Rig: bound {bound} animation target(s)");
        bound
    }

    #[inline]
    #[must_use]
    pub fn bound_bone(&self, target: TargetId) -> Option<BoneHandle> {
        self.targets.get(target.index()).copied().flatten()
    }

    /// Propagates local matrices down the hierarchy into world matrices.
    pub fn update_world_matrices(&mut self) {
        let mut stack: Vec<(BoneHandle, Affine3A, bool)> = self
            .roots
            .iter()
            .rev()
            .map(|&root| (root, Affine3A::IDENTITY, false))
            .collect();

        while let Some((handle, parent_world, parent_changed)) = stack.pop() {
            let Some(bone) = self.bones.get_mut(handle) else {
                continue;
            };
            let changed = bone.transform.update_local_matrix() || parent_changed;
            if changed {
                let world = parent_world * bone.transform.local_matrix;
                bone.transform.set_world_matrix(world);
            }
            let world = bone.transform.world_matrix;
            stack.extend(bone.children.iter().rev().map(|&c| (c, world, changed)));
        }
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSink for Rig {
    fn set_pose(&mut self, target: TargetId, transform: &LocalTransform) {
        let Some(handle) = self.bound_bone(target) else {
            return;
        };
        if let Some(bone) = self.bones.get_mut(handle) {
            bone.transform.set_local(transform);
        }
    }

    fn set_blend_shape_weight(&mut self, target: TargetId, index: usize, weight: f32) {
        let Some(handle) = self.bound_bone(target) else {
            return;
        };
        if let Some(bone) = self.bones.get_mut(handle) {
            if bone.morph_weights.len() <= index {
                bone.morph_weights.resize(index + 1, 0.0);
            }
            bone.morph_weights[index] = weight;
        }
    }
}

impl VisibilityQuery for Rig {
    #[inline]
    fn is_visible(&self) -> bool {
        self.visible
    }
}
