//! # Attached State
//!
//! Per-object runtime record owned by the scene synchronizer: cached global
//! transform, opacity, and visibility, plus the dirty/change-reason bitmask
//! bookkeeping.
//!
//! Created when an object is built into the live scene, destroyed when it
//! leaves it. No other collaborator writes to these records directly.

use glam::Mat4;
use podium_data::ObjectCategory;

/// Dirty bits recording which cached derived state needs recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFlags(u32);

impl DirtyFlags {
    pub const EMPTY: DirtyFlags = DirtyFlags(0);
    pub const TRANSFORM: DirtyFlags = DirtyFlags(1 << 0);
    pub const OPACITY: DirtyFlags = DirtyFlags(1 << 1);
    pub const VISIBILITY: DirtyFlags = DirtyFlags(1 << 2);

    // One bit per object category, set when the object's own properties
    // changed and its category handler must run.
    pub const GROUP: DirtyFlags = DirtyFlags(1 << 8);
    pub const LAYER: DirtyFlags = DirtyFlags(1 << 9);
    pub const MODEL: DirtyFlags = DirtyFlags(1 << 10);
    pub const CAMERA: DirtyFlags = DirtyFlags(1 << 11);
    pub const LIGHT: DirtyFlags = DirtyFlags(1 << 12);
    pub const MATERIAL: DirtyFlags = DirtyFlags(1 << 13);
    pub const EFFECT: DirtyFlags = DirtyFlags(1 << 14);
    pub const TEXT: DirtyFlags = DirtyFlags(1 << 15);
    pub const COMPONENT: DirtyFlags = DirtyFlags(1 << 16);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: DirtyFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: DirtyFlags) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub const fn union(self, other: DirtyFlags) -> DirtyFlags {
        DirtyFlags(self.0 | other.0)
    }

    pub fn category_bit(category: ObjectCategory) -> DirtyFlags {
        match category {
            ObjectCategory::Group => DirtyFlags::GROUP,
            ObjectCategory::Layer => DirtyFlags::LAYER,
            ObjectCategory::Model => DirtyFlags::MODEL,
            ObjectCategory::Camera => DirtyFlags::CAMERA,
            ObjectCategory::Light => DirtyFlags::LIGHT,
            ObjectCategory::Material => DirtyFlags::MATERIAL,
            ObjectCategory::Effect => DirtyFlags::EFFECT,
            ObjectCategory::Text => DirtyFlags::TEXT,
            ObjectCategory::Component => DirtyFlags::COMPONENT,
        }
    }
}

/// What kind of edit caused an object to be marked dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeReasons(u32);

impl ChangeReasons {
    pub const EMPTY: ChangeReasons = ChangeReasons(0);
    /// Local position/rotation/scale edited.
    pub const TRANSFORM: ChangeReasons = ChangeReasons(1 << 0);
    /// Local opacity edited.
    pub const OPACITY: ChangeReasons = ChangeReasons(1 << 1);
    /// The authored eyeball flag flipped.
    pub const EYEBALL: ChangeReasons = ChangeReasons(1 << 2);
    /// Slide membership visibility committed by a player.
    pub const TIMELINE: ChangeReasons = ChangeReasons(1 << 3);
    /// Some category-specific property edited.
    pub const PROPERTY: ChangeReasons = ChangeReasons(1 << 4);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ChangeReasons) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: ChangeReasons) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub const fn union(self, other: ChangeReasons) -> ChangeReasons {
        ChangeReasons(self.0 | other.0)
    }

    /// The dirty bits a set of change reasons implies for an object of the
    /// given category.
    pub fn dirty_bits(self, category: ObjectCategory) -> DirtyFlags {
        let mut dirty = DirtyFlags::EMPTY;
        if self.contains(ChangeReasons::TRANSFORM) {
            dirty.insert(DirtyFlags::TRANSFORM);
        }
        if self.contains(ChangeReasons::OPACITY) {
            dirty.insert(DirtyFlags::OPACITY);
        }
        if self.contains(ChangeReasons::EYEBALL.union(ChangeReasons::TIMELINE)) {
            dirty.insert(DirtyFlags::VISIBILITY);
        }
        if !self.is_empty() {
            dirty.insert(DirtyFlags::category_bit(category));
        }
        dirty
    }
}

/// Cached inherited state for one live graph object.
#[derive(Debug, Clone, Copy)]
pub struct AttachedState {
    /// Category of the owning object, fixed for the record's lifetime.
    pub category: ObjectCategory,
    pub global_transform: Mat4,
    /// Inherited opacity in `[0, 1]`.
    pub global_opacity: f32,
    /// Inherited visibility ignoring slide membership.
    pub global_logical_visible: bool,
    /// Inherited visibility including slide membership.
    pub global_effective_visible: bool,
    pub dirty: DirtyFlags,
    pub reasons: ChangeReasons,
}

impl AttachedState {
    pub fn new(category: ObjectCategory) -> Self {
        Self {
            category,
            global_transform: Mat4::IDENTITY,
            global_opacity: 1.0,
            global_logical_visible: true,
            // Effective visibility starts false: nothing is shown until a
            // slide player commits membership.
            global_effective_visible: false,
            dirty: DirtyFlags::EMPTY,
            reasons: ChangeReasons::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_flags_set_and_clear() {
        let mut flags = DirtyFlags::EMPTY;
        assert!(flags.is_empty());

        flags.insert(DirtyFlags::TRANSFORM);
        flags.insert(DirtyFlags::CAMERA);
        assert!(flags.contains(DirtyFlags::TRANSFORM));
        assert!(flags.contains(DirtyFlags::CAMERA));
        assert!(!flags.contains(DirtyFlags::OPACITY));

        flags.clear();
        assert!(flags.is_empty());
    }

    #[test]
    fn reasons_map_to_dirty_bits() {
        let mut reasons = ChangeReasons::EMPTY;
        reasons.insert(ChangeReasons::TRANSFORM);
        reasons.insert(ChangeReasons::EYEBALL);

        let dirty = reasons.dirty_bits(ObjectCategory::Model);
        assert!(dirty.contains(DirtyFlags::TRANSFORM));
        assert!(dirty.contains(DirtyFlags::VISIBILITY));
        assert!(dirty.contains(DirtyFlags::MODEL));
        assert!(!dirty.contains(DirtyFlags::OPACITY));
    }

    #[test]
    fn empty_reasons_imply_no_dirty_bits() {
        assert!(ChangeReasons::EMPTY
            .dirty_bits(ObjectCategory::Group)
            .is_empty());
    }
}
