//! # Generic Property Access
//!
//! Get/set by string name on any graph object, the single path used by
//! animation binding, static slide overrides, rollback reads, data inputs,
//! and external edits.
//!
//! Property names may carry a vector component suffix (`position.x`,
//! `color.z`). Dispatch is a match over the closed category set — no runtime
//! reflection.

use glam::Vec3;
use podium_data::{Value, ValueKind};

use crate::attached::ChangeReasons;
use crate::error::PropertyError;
use crate::object::{GraphObject, ObjectData};

/// A vector component addressed by a `.x`/`.y`/`.z` property suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VecComponent {
    X,
    Y,
    Z,
}

impl VecComponent {
    pub fn index(self) -> usize {
        match self {
            VecComponent::X => 0,
            VecComponent::Y => 1,
            VecComponent::Z => 2,
        }
    }
}

/// Splits `position.x` into `("position", Some(X))`.
///
/// Any suffix other than `x`, `y`, or `z` is an authoring error.
pub fn split_path(property: &str) -> Result<(&str, Option<VecComponent>), PropertyError> {
    match property.split_once('.') {
        None => Ok((property, None)),
        Some((base, "x")) => Ok((base, Some(VecComponent::X))),
        Some((base, "y")) => Ok((base, Some(VecComponent::Y))),
        Some((base, "z")) => Ok((base, Some(VecComponent::Z))),
        Some((_, suffix)) => Err(PropertyError::BadComponent {
            property: property.to_string(),
            suffix: suffix.to_string(),
        }),
    }
}

fn unknown(obj: &GraphObject, property: &str) -> PropertyError {
    PropertyError::UnknownProperty {
        category: obj.category(),
        property: property.to_string(),
    }
}

fn get_base(obj: &GraphObject, base: &str) -> Option<Value> {
    // Properties shared by every category.
    match base {
        "position" => return Some(Value::Vec3(obj.position.to_array())),
        "rotation" => return Some(Value::Vec3(obj.rotation.to_array())),
        "scale" => return Some(Value::Vec3(obj.scale.to_array())),
        "opacity" => return Some(Value::Float(obj.opacity)),
        "active" => return Some(Value::Bool(obj.active)),
        "start_time" => return Some(Value::Float(obj.start_time)),
        "end_time" => return Some(Value::Float(obj.end_time)),
        _ => {}
    }

    match &obj.data {
        ObjectData::Camera {
            fov_degrees,
            clip_near,
            clip_far,
            orthographic,
            ..
        } => match base {
            "fov" => Some(Value::Float(*fov_degrees)),
            "clip_near" => Some(Value::Float(*clip_near)),
            "clip_far" => Some(Value::Float(*clip_far)),
            "orthographic" => Some(Value::Bool(*orthographic)),
            _ => None,
        },
        ObjectData::Light {
            color,
            brightness,
            cast_shadow,
            ..
        } => match base {
            "color" => Some(Value::Color(color.to_array())),
            "brightness" => Some(Value::Float(*brightness)),
            "cast_shadow" => Some(Value::Bool(*cast_shadow)),
            _ => None,
        },
        ObjectData::Material {
            diffuse,
            transparency,
        } => match base {
            "diffuse" => Some(Value::Color(diffuse.to_array())),
            "transparency" => Some(Value::Float(*transparency)),
            _ => None,
        },
        ObjectData::Model { mesh, .. } => match base {
            "mesh" => Some(Value::String(mesh.clone())),
            _ => None,
        },
        ObjectData::Effect { strength, .. } => match base {
            "strength" => Some(Value::Float(*strength)),
            _ => None,
        },
        ObjectData::Text { text, color, size } => match base {
            "text" => Some(Value::String(text.clone())),
            "color" => Some(Value::Color(color.to_array())),
            "size" => Some(Value::Float(*size)),
            _ => None,
        },
        ObjectData::Group | ObjectData::Layer { .. } | ObjectData::Component { .. } => None,
    }
}

/// Reads a property value, resolving component suffixes.
pub fn get(obj: &GraphObject, property: &str) -> Result<Value, PropertyError> {
    let (base, component) = split_path(property)?;
    let value = get_base(obj, base).ok_or_else(|| unknown(obj, property))?;

    match component {
        None => Ok(value),
        Some(c) => match value {
            Value::Vec3(v) | Value::Color(v) => Ok(Value::Float(v[c.index()])),
            Value::Vec2(v) => {
                if c.index() < 2 {
                    Ok(Value::Float(v[c.index()]))
                } else {
                    Err(PropertyError::BadComponent {
                        property: property.to_string(),
                        suffix: "z".to_string(),
                    })
                }
            }
            other => Err(PropertyError::TypeMismatch {
                property: property.to_string(),
                expected: ValueKind::Vec3,
                got: other.kind(),
            }),
        },
    }
}

fn expect_float(property: &str, value: &Value) -> Result<f32, PropertyError> {
    value.as_float().ok_or_else(|| PropertyError::TypeMismatch {
        property: property.to_string(),
        expected: ValueKind::Float,
        got: value.kind(),
    })
}

fn expect_bool(property: &str, value: &Value) -> Result<bool, PropertyError> {
    value.as_bool().ok_or_else(|| PropertyError::TypeMismatch {
        property: property.to_string(),
        expected: ValueKind::Bool,
        got: value.kind(),
    })
}

fn expect_vec3(property: &str, value: &Value) -> Result<Vec3, PropertyError> {
    match value {
        Value::Vec3(v) | Value::Color(v) => Ok(Vec3::from_array(*v)),
        other => Err(PropertyError::TypeMismatch {
            property: property.to_string(),
            expected: ValueKind::Vec3,
            got: other.kind(),
        }),
    }
}

fn expect_string(property: &str, value: &Value) -> Result<String, PropertyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(PropertyError::TypeMismatch {
            property: property.to_string(),
            expected: ValueKind::String,
            got: other.kind(),
        }),
    }
}

fn write_vec3(
    target: &mut Vec3,
    property: &str,
    component: Option<VecComponent>,
    value: &Value,
) -> Result<(), PropertyError> {
    match component {
        None => {
            *target = expect_vec3(property, value)?;
        }
        Some(c) => {
            let f = expect_float(property, value)?;
            target[c.index()] = f;
        }
    }
    Ok(())
}

/// Writes a property value, resolving component suffixes.
///
/// Returns the change reasons the edit implies so the caller can queue the
/// right dirty marks. The write itself is immediate; dirty marking is the
/// caller's responsibility.
pub fn set(
    obj: &mut GraphObject,
    property: &str,
    value: &Value,
) -> Result<ChangeReasons, PropertyError> {
    let (base, component) = split_path(property)?;

    // Properties shared by every category.
    match base {
        "position" => {
            write_vec3(&mut obj.position, property, component, value)?;
            return Ok(ChangeReasons::TRANSFORM);
        }
        "rotation" => {
            write_vec3(&mut obj.rotation, property, component, value)?;
            return Ok(ChangeReasons::TRANSFORM);
        }
        "scale" => {
            write_vec3(&mut obj.scale, property, component, value)?;
            return Ok(ChangeReasons::TRANSFORM);
        }
        "opacity" => {
            obj.opacity = expect_float(property, value)?;
            return Ok(ChangeReasons::OPACITY);
        }
        "active" => {
            obj.active = expect_bool(property, value)?;
            return Ok(ChangeReasons::EYEBALL);
        }
        "start_time" => {
            obj.start_time = expect_float(property, value)?;
            return Ok(ChangeReasons::PROPERTY);
        }
        "end_time" => {
            obj.end_time = expect_float(property, value)?;
            return Ok(ChangeReasons::PROPERTY);
        }
        _ => {}
    }

    match &mut obj.data {
        ObjectData::Camera {
            fov_degrees,
            clip_near,
            clip_far,
            orthographic,
            ..
        } => match base {
            "fov" => {
                *fov_degrees = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "clip_near" => {
                *clip_near = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "clip_far" => {
                *clip_far = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "orthographic" => {
                *orthographic = expect_bool(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            _ => Err(unknown(obj, property)),
        },
        ObjectData::Light {
            color,
            brightness,
            cast_shadow,
            ..
        } => match base {
            "color" => {
                write_vec3(color, property, component, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "brightness" => {
                *brightness = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "cast_shadow" => {
                *cast_shadow = expect_bool(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            _ => Err(unknown(obj, property)),
        },
        ObjectData::Material {
            diffuse,
            transparency,
        } => match base {
            "diffuse" => {
                write_vec3(diffuse, property, component, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "transparency" => {
                *transparency = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            _ => Err(unknown(obj, property)),
        },
        ObjectData::Model { mesh, .. } => match base {
            "mesh" => {
                *mesh = expect_string(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            _ => Err(unknown(obj, property)),
        },
        ObjectData::Effect { strength, .. } => match base {
            "strength" => {
                *strength = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            _ => Err(unknown(obj, property)),
        },
        ObjectData::Text { text, color, size } => match base {
            "text" => {
                *text = expect_string(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "color" => {
                write_vec3(color, property, component, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            "size" => {
                *size = expect_float(property, value)?;
                Ok(ChangeReasons::PROPERTY)
            }
            _ => Err(unknown(obj, property)),
        },
        ObjectData::Group | ObjectData::Layer { .. } | ObjectData::Component { .. } => {
            Err(unknown(obj, property))
        }
    }
}
