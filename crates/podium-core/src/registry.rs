//! # Capability Registry
//!
//! Runtime registry of per-category animatable properties and their value
//! kinds. The animation manager consults it to resolve a track's backend
//! type before channel construction; hosts can query it for authoring UIs.

use podium_data::{ObjectCategory, ValueKind};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Metadata about one animatable property.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PropertyInfo {
    pub name: &'static str,
    pub kind: ValueKind,
}

/// Global capability registry - lazily initialized.
static REGISTRY: OnceLock<CapabilityRegistry> = OnceLock::new();

/// Animatable-property tables for every object category.
pub struct CapabilityRegistry {
    animatable: HashMap<ObjectCategory, Vec<PropertyInfo>>,
}

/// Properties every category animates.
const NODE_PROPERTIES: [PropertyInfo; 4] = [
    PropertyInfo {
        name: "position",
        kind: ValueKind::Vec3,
    },
    PropertyInfo {
        name: "rotation",
        kind: ValueKind::Vec3,
    },
    PropertyInfo {
        name: "scale",
        kind: ValueKind::Vec3,
    },
    PropertyInfo {
        name: "opacity",
        kind: ValueKind::Float,
    },
];

impl CapabilityRegistry {
    /// Get the global registry instance.
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(Self::build)
    }

    fn build() -> Self {
        let mut animatable: HashMap<ObjectCategory, Vec<PropertyInfo>> = HashMap::new();

        for category in ObjectCategory::ALL {
            animatable.insert(category, NODE_PROPERTIES.to_vec());
        }

        let mut extend = |category: ObjectCategory, extra: &[PropertyInfo]| {
            animatable
                .get_mut(&category)
                .expect("all categories pre-seeded")
                .extend_from_slice(extra);
        };

        extend(
            ObjectCategory::Camera,
            &[
                PropertyInfo {
                    name: "fov",
                    kind: ValueKind::Float,
                },
                PropertyInfo {
                    name: "clip_near",
                    kind: ValueKind::Float,
                },
                PropertyInfo {
                    name: "clip_far",
                    kind: ValueKind::Float,
                },
            ],
        );
        extend(
            ObjectCategory::Light,
            &[
                PropertyInfo {
                    name: "brightness",
                    kind: ValueKind::Float,
                },
                PropertyInfo {
                    name: "color",
                    kind: ValueKind::Color,
                },
            ],
        );
        extend(
            ObjectCategory::Material,
            &[
                PropertyInfo {
                    name: "transparency",
                    kind: ValueKind::Float,
                },
                PropertyInfo {
                    name: "diffuse",
                    kind: ValueKind::Color,
                },
            ],
        );
        extend(
            ObjectCategory::Effect,
            &[PropertyInfo {
                name: "strength",
                kind: ValueKind::Float,
            }],
        );
        extend(
            ObjectCategory::Text,
            &[
                PropertyInfo {
                    name: "size",
                    kind: ValueKind::Float,
                },
                PropertyInfo {
                    name: "color",
                    kind: ValueKind::Color,
                },
            ],
        );

        Self { animatable }
    }
}

// ============ Public API ============

/// All animatable properties for a category.
pub fn animatable_properties(category: ObjectCategory) -> &'static [PropertyInfo] {
    CapabilityRegistry::global()
        .animatable
        .get(&category)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The value kind of an animatable property, if the category supports it.
/// `name` is the base property name without any component suffix.
pub fn animatable_kind(category: ObjectCategory, name: &str) -> Option<ValueKind> {
    animatable_properties(category)
        .iter()
        .find(|info| info.name == name)
        .map(|info| info.kind)
}

/// Whether a category supports animating a property.
pub fn supports_animation(category: ObjectCategory, name: &str) -> bool {
    animatable_kind(category, name).is_some()
}
