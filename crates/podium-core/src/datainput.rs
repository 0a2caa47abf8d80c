//! # Data Inputs
//!
//! Named external inputs driving object properties. A value set on an input
//! fans out to every binding as an immediate property-change batch, with
//! optional linear range remapping when the input declares min/max bounds.

use podium_data::{DataInput, Value};
use tracing::warn;

use crate::animation::PendingChanges;

/// Remaps `value` from the input's declared bounds onto a binding's target
/// range. Non-float values and unbounded inputs pass through untouched.
fn remap(input: &DataInput, target_range: Option<(f32, f32)>, value: &Value) -> Value {
    let (Some(min), Some(max), Some((t_min, t_max))) = (input.min, input.max, target_range) else {
        return value.clone();
    };
    let Value::Float(v) = value else {
        return value.clone();
    };

    let span = max - min;
    if span.abs() <= f32::EPSILON {
        warn!(input = %input.name, "data input declares an empty range; passing value through");
        return value.clone();
    }

    let normalized = ((v - min) / span).clamp(0.0, 1.0);
    Value::Float(t_min + normalized * (t_max - t_min))
}

/// Builds the property-change batch for one incoming input value.
///
/// The caller applies the batch immediately; data inputs are not deferred to
/// the animation queue's tick boundary.
pub fn build_changes(input: &DataInput, value: &Value) -> PendingChanges {
    let mut pending = PendingChanges::new();
    for binding in &input.bindings {
        let mapped = remap(input, binding.target_range, value);
        pending.queue(binding.object, binding.property.clone(), mapped);
    }
    pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_input_passes_through() {
        let input = DataInput::new("title").bind(3, "text");
        let pending = build_changes(&input, &Value::String("hello".into()));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn bounded_input_remaps_linearly() {
        let input = DataInput::new("dial")
            .with_bounds(0.0, 10.0)
            .bind_range(1, "rotation.z", (0.0, 360.0));

        let pending = build_changes(&input, &Value::Float(2.5));
        let value = pending.queued(1, "rotation.z").unwrap();
        assert_eq!(value, Value::Float(90.0));
    }

    #[test]
    fn remap_clamps_outside_declared_bounds() {
        let input = DataInput::new("dial")
            .with_bounds(0.0, 1.0)
            .bind_range(1, "opacity", (0.0, 100.0));

        assert_eq!(
            build_changes(&input, &Value::Float(4.0)).queued(1, "opacity"),
            Some(Value::Float(100.0))
        );
        assert_eq!(
            build_changes(&input, &Value::Float(-1.0)).queued(1, "opacity"),
            Some(Value::Float(0.0))
        );
    }

    #[test]
    fn fan_out_reaches_every_binding() {
        let input = DataInput::new("accent")
            .bind(1, "color.x")
            .bind(2, "diffuse.x");
        let pending = build_changes(&input, &Value::Float(0.5));
        assert_eq!(pending.len(), 2);
    }
}
