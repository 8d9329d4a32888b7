//! Discriminated JSON variants.
//!
//! A polymorphic value is a JSON object whose `type` field picks the concrete
//! schema for the rest of its fields. Each polymorphic type owns a fixed table
//! mapping discriminator strings to parsers; nothing is registered at runtime.

use serde_json::{Map, Value};

/// Field holding the variant name.
pub const DISCRIMINATOR: &str = "type";

#[derive(Debug)]
pub enum SchemaError {
    Json(serde_json::Error),
    NotAnObject {
        context: &'static str,
    },
    MissingDiscriminator {
        context: &'static str,
    },
    UnknownDiscriminator {
        context: &'static str,
        value: String,
    },
    InvalidFields {
        context: &'static str,
        tag: &'static str,
        source: serde_json::Error,
    },
    MissingField {
        context: &'static str,
        field: &'static str,
    },
    Entry {
        index: usize,
        source: Box<SchemaError>,
    },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::NotAnObject { context } => write!(f, "{} must be a JSON object", context),
            Self::MissingDiscriminator { context } => {
                write!(f, "{} is missing the '{}' property", context, DISCRIMINATOR)
            }
            Self::UnknownDiscriminator { context, value } => {
                write!(f, "unknown {} type '{}'", context, value)
            }
            Self::InvalidFields {
                context,
                tag,
                source,
            } => write!(f, "invalid {} '{}': {}", context, tag, source),
            Self::MissingField { context, field } => {
                write!(f, "{} is missing required field '{}'", context, field)
            }
            Self::Entry { index, source } => write!(f, "entry {}: {}", index, source),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// One row of a discriminator table.
pub struct Variant<T: 'static> {
    pub tag: &'static str,
    pub parse: fn(Value) -> serde_json::Result<T>,
}

/// A closed sum type read from and written to discriminated JSON.
pub trait Polymorphic: Sized + 'static {
    /// Human name used in error messages, e.g. "collider".
    const CONTEXT: &'static str;
    const VARIANTS: &'static [Variant<Self>];

    /// Discriminator of the runtime variant.
    fn tag(&self) -> &'static str;

    /// The variant's own fields, without the discriminator.
    fn fields(&self) -> serde_json::Result<Value>;
}

/// Resolve a discriminated JSON object into its concrete variant.
///
/// Tags match ASCII case-insensitively.
pub fn resolve<T: Polymorphic>(value: Value) -> Result<T, SchemaError> {
    let mut map: Map<String, Value> = match value {
        Value::Object(map) => map,
        _ => return Err(SchemaError::NotAnObject { context: T::CONTEXT }),
    };

    let tag = match map.remove(DISCRIMINATOR) {
        None | Some(Value::Null) => {
            return Err(SchemaError::MissingDiscriminator { context: T::CONTEXT })
        }
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(SchemaError::UnknownDiscriminator {
                context: T::CONTEXT,
                value: other.to_string(),
            })
        }
    };

    let variant = T::VARIANTS
        .iter()
        .find(|v| v.tag.eq_ignore_ascii_case(&tag))
        .ok_or_else(|| SchemaError::UnknownDiscriminator {
            context: T::CONTEXT,
            value: tag.clone(),
        })?;

    (variant.parse)(Value::Object(map)).map_err(|source| SchemaError::InvalidFields {
        context: T::CONTEXT,
        tag: variant.tag,
        source,
    })
}

/// Mirror of [`resolve`]: the variant's fields plus its discriminator.
pub fn to_value<T: Polymorphic>(item: &T) -> Result<Value, SchemaError> {
    match item.fields()? {
        Value::Object(mut map) => {
            map.insert(DISCRIMINATOR.to_string(), Value::String(item.tag().to_string()));
            Ok(Value::Object(map))
        }
        _ => Err(SchemaError::NotAnObject { context: T::CONTEXT }),
    }
}

/// Resolve every element of a JSON array, tagging failures with their index.
pub fn resolve_all<T: Polymorphic>(items: Vec<Value>) -> Result<Vec<T>, SchemaError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            resolve(item).map_err(|e| SchemaError::Entry {
                index,
                source: Box::new(e),
            })
        })
        .collect()
}

/// Implement serde traits for a [`Polymorphic`] type so it can sit inside
/// ordinary derived structs.
#[macro_export]
macro_rules! polymorphic_serde {
    ($ty:ty) => {
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                $crate::schema::resolve(value).map_err(serde::de::Error::custom)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let value = $crate::schema::to_value(self).map_err(serde::ser::Error::custom)?;
                serde::Serialize::serialize(&value, serializer)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Circle {
        radius: f32,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Square {
        side: f32,
    }

    #[derive(Debug, PartialEq)]
    enum Shape {
        Circle(Circle),
        Square(Square),
    }

    fn parse_circle(v: Value) -> serde_json::Result<Shape> {
        serde_json::from_value(v).map(Shape::Circle)
    }

    fn parse_square(v: Value) -> serde_json::Result<Shape> {
        serde_json::from_value(v).map(Shape::Square)
    }

    impl Polymorphic for Shape {
        const CONTEXT: &'static str = "shape";
        const VARIANTS: &'static [Variant<Self>] = &[
            Variant { tag: "circle", parse: parse_circle },
            Variant { tag: "square", parse: parse_square },
        ];

        fn tag(&self) -> &'static str {
            match self {
                Shape::Circle(_) => "circle",
                Shape::Square(_) => "square",
            }
        }

        fn fields(&self) -> serde_json::Result<Value> {
            match self {
                Shape::Circle(c) => serde_json::to_value(c),
                Shape::Square(s) => serde_json::to_value(s),
            }
        }
    }

    #[test]
    fn test_resolve_picks_variant() {
        let shape: Shape = resolve(json!({ "type": "square", "side": 2.0 })).unwrap();
        assert_eq!(shape, Shape::Square(Square { side: 2.0 }));
    }

    #[test]
    fn test_tag_match_ignores_case() {
        let shape: Shape = resolve(json!({ "type": "Circle", "radius": 1.5 })).unwrap();
        assert_eq!(shape, Shape::Circle(Circle { radius: 1.5 }));
        // Output always uses the registered spelling.
        assert_eq!(to_value(&shape).unwrap()["type"], "circle");
    }

    #[test]
    fn test_missing_and_unknown_are_distinct() {
        let missing = resolve::<Shape>(json!({ "radius": 1.0 })).unwrap_err();
        assert!(matches!(missing, SchemaError::MissingDiscriminator { context: "shape" }));

        let null = resolve::<Shape>(json!({ "type": null, "radius": 1.0 })).unwrap_err();
        assert!(matches!(null, SchemaError::MissingDiscriminator { .. }));

        let unknown = resolve::<Shape>(json!({ "type": "hexagon" })).unwrap_err();
        match unknown {
            SchemaError::UnknownDiscriminator { value, .. } => assert_eq!(value, "hexagon"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_bad_fields_name_the_variant() {
        let err = resolve::<Shape>(json!({ "type": "circle", "radius": "big" })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFields { tag: "circle", .. }));
    }

    #[test]
    fn test_resolve_all_reports_index() {
        let items = vec![json!({ "type": "circle", "radius": 1.0 }), json!({ "side": 1.0 })];
        match resolve_all::<Shape>(items).unwrap_err() {
            SchemaError::Entry { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, SchemaError::MissingDiscriminator { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_serialize_round_trip() {
        let original = json!({ "type": "square", "side": 4.0 });
        let shape: Shape = resolve(original.clone()).unwrap();
        assert_eq!(to_value(&shape).unwrap(), original);
    }
}
