//! Late-bound step properties.
//!
//! A step declares the properties it accepts as a static table of
//! [`PropertySpec`]. A definition may bind any of them to a context attribute;
//! right before execution the attribute value is coerced to the declared type
//! and handed to the step's setter. Unknown property names are rejected when
//! the binding is declared, not when the run happens.

use std::path::PathBuf;

use crate::core::value::Value;

/// Declared type of an injectable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Bool,
    I16,
    I32,
    I64,
    Float,
    Text,
    Path,
    Files,
    /// Any value is accepted as is.
    Any,
}

/// One injectable property of a step type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub ty: PropertyType,
    /// Whether a `Null` value may be assigned (object-like vs primitive-like).
    pub nullable: bool,
}

impl PropertySpec {
    pub const fn new(name: &'static str, ty: PropertyType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, ty: PropertyType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// A `(property, context attribute)` pair registered on a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateBinding {
    pub property: String,
    pub attribute: String,
    pub spec: PropertySpec,
}

/// Look up a property by name in a step's table.
pub fn find_spec(specs: &[PropertySpec], name: &str) -> Option<PropertySpec> {
    specs.iter().find(|spec| spec.name == name).copied()
}

/// Coerce `value` to the type declared by `spec`.
///
/// Integers are widened to floats and narrowed to smaller integer types when
/// they fit. `Null` is only accepted by nullable or `Any` properties.
pub fn coerce(value: &Value, spec: &PropertySpec) -> Result<Value, String> {
    if value.is_null() {
        return if spec.nullable || spec.ty == PropertyType::Any {
            Ok(Value::Null)
        } else {
            Err(format!("null cannot be assigned to {} property", type_label(spec.ty)))
        };
    }

    let coerced = match (spec.ty, value) {
        (PropertyType::Any, v) => Some(v.clone()),
        (PropertyType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (PropertyType::I16, Value::Int(i)) => i16::try_from(*i).ok().map(|n| Value::Int(n.into())),
        (PropertyType::I32, Value::Int(i)) => i32::try_from(*i).ok().map(|n| Value::Int(n.into())),
        (PropertyType::I64, Value::Int(i)) => Some(Value::Int(*i)),
        (PropertyType::Float, Value::Float(x)) => Some(Value::Float(*x)),
        (PropertyType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (PropertyType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
        (PropertyType::Path, Value::Path(p)) => Some(Value::Path(p.clone())),
        (PropertyType::Path, Value::Text(s)) => Some(Value::Path(PathBuf::from(s))),
        (PropertyType::Files, v) => v.as_files().map(Value::Files),
        _ => None,
    };

    coerced.ok_or_else(|| {
        format!(
            "a {} value is not assignable to {} property",
            value.type_name(),
            type_label(spec.ty)
        )
    })
}

fn type_label(ty: PropertyType) -> &'static str {
    match ty {
        PropertyType::Bool => "a bool",
        PropertyType::I16 => "a 16-bit integer",
        PropertyType::I32 => "a 32-bit integer",
        PropertyType::I64 => "an integer",
        PropertyType::Float => "a float",
        PropertyType::Text => "a text",
        PropertyType::Path => "a path",
        PropertyType::Files => "a files",
        PropertyType::Any => "an untyped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_narrow_when_they_fit() {
        let spec = PropertySpec::new("number", PropertyType::I16);
        assert_eq!(coerce(&Value::Int(12), &spec), Ok(Value::Int(12)));
        assert!(coerce(&Value::Int(70_000), &spec).is_err());
    }

    #[test]
    fn integers_widen_to_float() {
        let spec = PropertySpec::new("ratio", PropertyType::Float);
        assert_eq!(coerce(&Value::Int(3), &spec), Ok(Value::Float(3.0)));
    }

    #[test]
    fn null_only_reaches_nullable_properties() {
        let primitive = PropertySpec::new("number", PropertyType::I32);
        let object = PropertySpec::nullable("color", PropertyType::Text);
        assert!(coerce(&Value::Null, &primitive).is_err());
        assert_eq!(coerce(&Value::Null, &object), Ok(Value::Null));
    }

    #[test]
    fn text_is_accepted_as_path() {
        let spec = PropertySpec::new("target", PropertyType::Path);
        assert_eq!(
            coerce(&Value::Text("a/b".into()), &spec),
            Ok(Value::Path(PathBuf::from("a/b")))
        );
        assert!(coerce(&Value::Bool(true), &spec).is_err());
    }
}
