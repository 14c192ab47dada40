// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DynamicData container and borrowed views for runtime data access.

use crate::{DynamicValue, FieldPath, PathSegment, PrimitiveKind, TypeDescriptor, TypeKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Errors for DynamicData operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicDataError {
    FieldNotFound(String),
    TypeMismatch { expected: String, got: String },
    InvalidOperation(String),
    IndexOutOfBounds { index: usize, length: usize },
    SequenceTooLong { length: usize, max: usize },
    InactiveCase { requested: String, active: String },
    InvalidPath(String),
    UnresolvedAlias(String),
}

impl fmt::Display for DynamicDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldNotFound(name) => write!(f, "Field not found: {}", name),
            Self::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, got)
            }
            Self::InvalidOperation(msg) => write!(f, "Invalid operation for type: {}", msg),
            Self::IndexOutOfBounds { index, length } => {
                write!(f, "Index out of bounds: {} >= {}", index, length)
            }
            Self::SequenceTooLong { length, max } => {
                write!(f, "Sequence length exceeds maximum: {} > {}", length, max)
            }
            Self::InactiveCase { requested, active } => {
                write!(f, "Union case '{}' is not active (active: '{}')", requested, active)
            }
            Self::InvalidPath(path) => write!(f, "Invalid field path: '{}'", path),
            Self::UnresolvedAlias(name) => {
                write!(f, "Alias '{}' is unbound or cyclic", name)
            }
        }
    }
}

impl std::error::Error for DynamicDataError {}

/// Dynamic data container with runtime type checking.
#[derive(Debug, Clone)]
pub struct DynamicData {
    /// Type descriptor.
    descriptor: Arc<TypeDescriptor>,
    /// Actual value.
    value: DynamicValue,
}

impl DynamicData {
    /// Create new DynamicData with default values.
    pub fn new(descriptor: &Arc<TypeDescriptor>) -> Self {
        let value = default_value(descriptor);
        Self {
            descriptor: descriptor.clone(),
            value,
        }
    }

    /// Create from an existing value.
    ///
    /// Only the outermost shape is checked; nested members are validated
    /// lazily by the accessors.
    pub fn from_value(
        descriptor: &Arc<TypeDescriptor>,
        value: DynamicValue,
    ) -> Result<Self, DynamicDataError> {
        let resolved = resolve(descriptor)?;
        let shape_ok = match (&resolved.kind, &value) {
            (TypeKind::Struct(_), DynamicValue::Struct(_)) => true,
            (TypeKind::Union(_), DynamicValue::Union(..)) => true,
            (TypeKind::Sequence(_), DynamicValue::Sequence(_)) => true,
            (TypeKind::Array(_), DynamicValue::Array(_) | DynamicValue::Sequence(_)) => true,
            (TypeKind::Enum(_), DynamicValue::Enum(..)) => true,
            (TypeKind::Primitive(_), v) => !matches!(
                v,
                DynamicValue::Struct(_)
                    | DynamicValue::Sequence(_)
                    | DynamicValue::Array(_)
                    | DynamicValue::Union(..)
            ),
            _ => false,
        };
        if !shape_ok {
            return Err(DynamicDataError::TypeMismatch {
                expected: descriptor.name.clone(),
                got: value.kind_name().to_string(),
            });
        }
        Ok(Self {
            descriptor: descriptor.clone(),
            value,
        })
    }

    /// Get the type descriptor.
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Get the type name.
    pub fn type_name(&self) -> &str {
        &self.descriptor.name
    }

    /// Get the underlying value.
    pub fn value(&self) -> &DynamicValue {
        &self.value
    }

    /// Get mutable reference to value.
    pub fn value_mut(&mut self) -> &mut DynamicValue {
        &mut self.value
    }

    /// Into inner value.
    pub fn into_value(self) -> DynamicValue {
        self.value
    }

    /// Borrowed view of the whole sample.
    pub fn view(&self) -> DynamicDataRef<'_> {
        DynamicDataRef::new(self.descriptor.clone(), &self.value)
    }

    /// Look up a nested value by path string.
    pub fn lookup(&self, path: &str) -> Result<DynamicDataRef<'_>, DynamicDataError> {
        self.view().lookup(&FieldPath::parse(path)?)
    }

    /// Get a field value by name.
    pub fn get<T: FromDynamicValue>(&self, name: &str) -> Result<T, DynamicDataError> {
        let field_value = self.get_field(name)?;
        T::from_dynamic(field_value)
    }

    /// Set a field value by name.
    pub fn set<T: IntoDynamicValue>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<(), DynamicDataError> {
        let resolved = resolve(&self.descriptor)?;
        if resolved.field(name).is_none() {
            return Err(DynamicDataError::FieldNotFound(name.to_string()));
        }

        match &mut self.value {
            DynamicValue::Struct(fields) => {
                fields.insert(name.to_string(), value.into_dynamic());
                Ok(())
            }
            _ => Err(DynamicDataError::InvalidOperation(
                "set requires struct type".into(),
            )),
        }
    }

    /// Get field by name.
    pub fn get_field(&self, name: &str) -> Result<&DynamicValue, DynamicDataError> {
        self.view().member(name).map(|member| member.value())
    }

    /// Push element to sequence.
    pub fn push_element(&mut self, value: DynamicValue) -> Result<(), DynamicDataError> {
        let resolved = resolve(&self.descriptor)?;
        match &mut self.value {
            DynamicValue::Sequence(seq) => {
                if let TypeKind::Sequence(desc) = &resolved.kind {
                    if let Some(max) = desc.max_length {
                        if seq.len() >= max {
                            return Err(DynamicDataError::SequenceTooLong {
                                length: seq.len() + 1,
                                max,
                            });
                        }
                    }
                }
                seq.push(value);
                Ok(())
            }
            _ => Err(DynamicDataError::InvalidOperation(
                "push_element requires sequence type".into(),
            )),
        }
    }

    /// Iterate over fields (for structs).
    pub fn fields(&self) -> impl Iterator<Item = (&str, &DynamicValue)> {
        match &self.value {
            DynamicValue::Struct(fields) => {
                Box::new(fields.iter().map(|(k, v)| (k.as_str(), v))) as Box<dyn Iterator<Item = _>>
            }
            _ => Box::new(std::iter::empty()),
        }
    }
}

impl PartialEq for DynamicData {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name == other.descriptor.name && self.value == other.value
    }
}

/// Borrowed, typed view into a value inside a sample.
///
/// Traversal never copies values; each step only clones the descriptor `Arc`.
#[derive(Debug, Clone)]
pub struct DynamicDataRef<'a> {
    descriptor: Arc<TypeDescriptor>,
    value: &'a DynamicValue,
}

impl<'a> DynamicDataRef<'a> {
    /// Pair a descriptor with a value.
    pub fn new(descriptor: Arc<TypeDescriptor>, value: &'a DynamicValue) -> Self {
        Self { descriptor, value }
    }

    /// Declared type of this value (may be an alias).
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Underlying value.
    pub fn value(&self) -> &'a DynamicValue {
        self.value
    }

    /// Declared type with aliases followed.
    pub fn resolved_type(&self) -> Result<Arc<TypeDescriptor>, DynamicDataError> {
        resolve(&self.descriptor)
    }

    /// Primitive kind of this value, if it is a primitive.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        self.resolved_type().ok()?.primitive_kind()
    }

    /// Struct member, or the active case of a union.
    pub fn member(&self, name: &str) -> Result<DynamicDataRef<'a>, DynamicDataError> {
        let resolved = self.resolved_type()?;
        match &resolved.kind {
            TypeKind::Struct(_) => {
                let field = resolved
                    .field(name)
                    .ok_or_else(|| DynamicDataError::FieldNotFound(name.to_string()))?;
                let value = self
                    .value
                    .get_field(name)
                    .ok_or_else(|| DynamicDataError::FieldNotFound(name.to_string()))?;
                if value.is_null() {
                    return Err(DynamicDataError::FieldNotFound(name.to_string()));
                }
                Ok(DynamicDataRef::new(field.type_desc.clone(), value))
            }
            TypeKind::Union(_) => {
                let case = resolved
                    .union_case(name)
                    .ok_or_else(|| DynamicDataError::FieldNotFound(name.to_string()))?;
                match self.value.union_case() {
                    Some((active, value)) if active == name => {
                        Ok(DynamicDataRef::new(case.type_desc.clone(), value))
                    }
                    Some((active, _)) => Err(DynamicDataError::InactiveCase {
                        requested: name.to_string(),
                        active: active.to_string(),
                    }),
                    None => Err(DynamicDataError::TypeMismatch {
                        expected: "union".into(),
                        got: self.value.kind_name().into(),
                    }),
                }
            }
            _ => Err(DynamicDataError::InvalidOperation(format!(
                "member '{}' requires struct or union type, got '{}'",
                name, resolved.name
            ))),
        }
    }

    /// Sequence/array element (0-based).
    pub fn element(&self, index: usize) -> Result<DynamicDataRef<'a>, DynamicDataError> {
        let resolved = self.resolved_type()?;
        let element_type = resolved.element_type().ok_or_else(|| {
            DynamicDataError::InvalidOperation("element requires sequence/array type".into())
        })?;
        let elements = self.elements()?;
        let value = elements.get(index).ok_or(DynamicDataError::IndexOutOfBounds {
            index,
            length: elements.len(),
        })?;
        Ok(DynamicDataRef::new(element_type.clone(), value))
    }

    /// Sequence/array length.
    pub fn len(&self) -> Result<usize, DynamicDataError> {
        self.elements().map(<[DynamicValue]>::len)
    }

    /// Check if sequence/array is empty.
    pub fn is_empty(&self) -> Result<bool, DynamicDataError> {
        self.len().map(|l| l == 0)
    }

    /// Walk a parsed path. The empty path returns the view itself.
    pub fn lookup(&self, path: &FieldPath) -> Result<DynamicDataRef<'a>, DynamicDataError> {
        let mut current = self.clone();
        for segment in path.segments() {
            current = match segment {
                PathSegment::Member(name) => current.member(name)?,
                PathSegment::Index(index) => current.element(*index)?,
            };
        }
        Ok(current)
    }

    /// Numeric scalar widened to f64.
    pub fn to_f64(&self) -> Result<f64, DynamicDataError> {
        self.value
            .to_f64()
            .ok_or_else(|| DynamicDataError::TypeMismatch {
                expected: "numeric".into(),
                got: self.value.kind_name().into(),
            })
    }

    fn elements(&self) -> Result<&'a [DynamicValue], DynamicDataError> {
        self.value
            .as_sequence()
            .ok_or_else(|| DynamicDataError::TypeMismatch {
                expected: "sequence/array".into(),
                got: self.value.kind_name().into(),
            })
    }
}

fn resolve(descriptor: &Arc<TypeDescriptor>) -> Result<Arc<TypeDescriptor>, DynamicDataError> {
    descriptor
        .resolve_alias()
        .ok_or_else(|| DynamicDataError::UnresolvedAlias(descriptor.name.clone()))
}

/// Create default value for a type.
fn default_value(descriptor: &Arc<TypeDescriptor>) -> DynamicValue {
    let Some(resolved) = descriptor.resolve_alias() else {
        return DynamicValue::Null;
    };
    match &resolved.kind {
        TypeKind::Primitive(p) => default_primitive(*p),
        TypeKind::Struct(fields) => {
            let mut map = HashMap::new();
            for field in fields {
                let value = if field.optional {
                    DynamicValue::Null
                } else {
                    default_value(&field.type_desc)
                };
                map.insert(field.name.clone(), value);
            }
            DynamicValue::Struct(map)
        }
        TypeKind::Sequence(_) => DynamicValue::Sequence(Vec::new()),
        TypeKind::Array(arr) => {
            let elem_default = default_value(&arr.element_type);
            DynamicValue::Array(vec![elem_default; arr.length])
        }
        TypeKind::Enum(e) => match e.variants.first() {
            Some(v) => DynamicValue::Enum(v.value, v.name.clone()),
            None => DynamicValue::Enum(0, String::new()),
        },
        TypeKind::Union(u) => match u.cases.first() {
            Some(c) => {
                let disc = c.labels.first().copied().unwrap_or(0);
                let inner = default_value(&c.type_desc);
                DynamicValue::Union(disc, c.name.clone(), Box::new(inner))
            }
            None => DynamicValue::Union(0, String::new(), Box::new(DynamicValue::Null)),
        },
        // resolve_alias never returns an alias
        TypeKind::Alias(_) => DynamicValue::Null,
    }
}

/// Create default value for a primitive.
fn default_primitive(kind: PrimitiveKind) -> DynamicValue {
    match kind {
        PrimitiveKind::Bool => DynamicValue::Bool(false),
        PrimitiveKind::U8 => DynamicValue::U8(0),
        PrimitiveKind::U16 => DynamicValue::U16(0),
        PrimitiveKind::U32 => DynamicValue::U32(0),
        PrimitiveKind::U64 => DynamicValue::U64(0),
        PrimitiveKind::I8 => DynamicValue::I8(0),
        PrimitiveKind::I16 => DynamicValue::I16(0),
        PrimitiveKind::I32 => DynamicValue::I32(0),
        PrimitiveKind::I64 => DynamicValue::I64(0),
        PrimitiveKind::F32 => DynamicValue::F32(0.0),
        PrimitiveKind::F64 => DynamicValue::F64(0.0),
        PrimitiveKind::LongDouble => DynamicValue::LongDouble(0.0),
        PrimitiveKind::Char => DynamicValue::Char('\0'),
        PrimitiveKind::String { .. } => DynamicValue::String(String::new()),
        PrimitiveKind::WString { .. } => DynamicValue::WString(String::new()),
    }
}

/// Trait for converting from DynamicValue.
pub trait FromDynamicValue: Sized {
    fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError>;
}

/// Trait for converting to DynamicValue.
pub trait IntoDynamicValue {
    fn into_dynamic(self) -> DynamicValue;
}

macro_rules! impl_from_dynamic {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl FromDynamicValue for $ty {
            fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError> {
                match value {
                    DynamicValue::$variant(v) => Ok(*v),
                    other => Err(DynamicDataError::TypeMismatch {
                        expected: $name.to_string(),
                        got: other.kind_name().to_string(),
                    }),
                }
            }
        }
    };
}

impl_from_dynamic!(bool, Bool, "bool");
impl_from_dynamic!(u8, U8, "u8");
impl_from_dynamic!(u16, U16, "u16");
impl_from_dynamic!(u32, U32, "u32");
impl_from_dynamic!(u64, U64, "u64");
impl_from_dynamic!(i8, I8, "i8");
impl_from_dynamic!(i16, I16, "i16");
impl_from_dynamic!(i32, I32, "i32");
impl_from_dynamic!(i64, I64, "i64");
impl_from_dynamic!(f32, F32, "f32");
impl_from_dynamic!(f64, F64, "f64");
impl_from_dynamic!(char, Char, "char");

impl FromDynamicValue for String {
    fn from_dynamic(value: &DynamicValue) -> Result<Self, DynamicDataError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DynamicDataError::TypeMismatch {
                expected: "string".to_string(),
                got: value.kind_name().to_string(),
            })
    }
}

// Covers DynamicValue itself through the reflexive `From`.
impl<T: Into<DynamicValue>> IntoDynamicValue for T {
    fn into_dynamic(self) -> DynamicValue {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeDescriptorBuilder, UnionBuilder};

    fn sensor_type() -> Arc<TypeDescriptor> {
        let sample = Arc::new(
            TypeDescriptorBuilder::new("Sample")
                .field("value", PrimitiveKind::F64)
                .build(),
        );
        Arc::new(
            TypeDescriptorBuilder::new("Sensor")
                .key_field("id", PrimitiveKind::I32)
                .string_field("name")
                .sequence_of_type("samples", sample)
                .optional_field("spare", PrimitiveKind::U32)
                .build(),
        )
    }

    fn sample_value(value: f64) -> DynamicValue {
        let mut fields = HashMap::new();
        fields.insert("value".to_string(), value.into());
        DynamicValue::Struct(fields)
    }

    #[test]
    fn test_dynamic_data_struct() {
        let desc = Arc::new(
            TypeDescriptorBuilder::new("TestStruct")
                .field("x", PrimitiveKind::I32)
                .field("y", PrimitiveKind::F64)
                .string_field("name")
                .build(),
        );

        let mut data = DynamicData::new(&desc);
        data.set("x", 42i32).expect("set x");
        data.set("y", std::f64::consts::PI).expect("set y");
        data.set("name", "test").expect("set name");

        assert_eq!(data.get::<i32>("x").expect("get x"), 42);
        assert_eq!(data.get::<f64>("y").expect("get y"), std::f64::consts::PI);
        assert_eq!(data.get::<String>("name").expect("get name"), "test");
        assert!(data.get::<i32>("z").is_err());
        assert_eq!(data.fields().count(), 3);
    }

    #[test]
    fn test_lookup_nested_path() {
        let mut data = DynamicData::new(&sensor_type());
        data.set("id", 7i32).expect("set id");
        data.set(
            "samples",
            DynamicValue::Sequence(vec![sample_value(1.0), sample_value(2.5)]),
        )
        .expect("set samples");

        let value = data.lookup("samples[1].value").expect("lookup");
        assert_eq!(value.to_f64().expect("numeric"), 2.5);
        assert_eq!(value.primitive_kind(), Some(PrimitiveKind::F64));

        let samples = data.lookup("samples").expect("lookup");
        assert_eq!(samples.len().expect("len"), 2);

        let root = data.lookup("").expect("empty path");
        assert_eq!(root.value(), data.value());

        assert!(matches!(
            data.lookup("samples[2].value"),
            Err(DynamicDataError::IndexOutOfBounds { index: 2, length: 2 })
        ));
        assert!(matches!(
            data.lookup("missing"),
            Err(DynamicDataError::FieldNotFound(_))
        ));
        assert!(matches!(
            data.lookup("samples["),
            Err(DynamicDataError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_unset_optional_is_not_found() {
        let data = DynamicData::new(&sensor_type());
        assert!(data.value().get_field("spare").is_some_and(DynamicValue::is_null));
        assert!(matches!(
            data.lookup("spare"),
            Err(DynamicDataError::FieldNotFound(_))
        ));
    }

    #[test]
    fn test_union_active_case() {
        let reading = Arc::new(
            UnionBuilder::new("Reading", PrimitiveKind::I32)
                .case("count", 1, PrimitiveKind::U32)
                .case("ratio", 2, PrimitiveKind::F64)
                .build(),
        );
        let value = DynamicValue::Union(2, "ratio".into(), Box::new(0.25f64.into()));
        let data = DynamicData::from_value(&reading, value).expect("union");

        assert_eq!(data.lookup("ratio").and_then(|v| v.to_f64()), Ok(0.25));
        assert!(matches!(
            data.lookup("count"),
            Err(DynamicDataError::InactiveCase { .. })
        ));
        assert!(matches!(
            data.lookup("other"),
            Err(DynamicDataError::FieldNotFound(_))
        ));
    }

    #[test]
    fn test_alias_transparent_access() {
        let inner = sensor_type();
        let alias = Arc::new(TypeDescriptor::alias("SensorAlias", inner));
        let mut data = DynamicData::new(&alias);
        data.set("id", 3i32).expect("set through alias");
        assert_eq!(data.lookup("id").and_then(|v| v.to_f64()), Ok(3.0));
    }

    #[test]
    fn test_from_value_shape_mismatch() {
        let err = DynamicData::from_value(&sensor_type(), DynamicValue::from(1i32));
        assert!(matches!(err, Err(DynamicDataError::TypeMismatch { .. })));
    }

    #[test]
    fn test_bounded_sequence_push() {
        let seq = Arc::new(TypeDescriptor::new(
            "Bounded",
            TypeKind::Sequence(crate::SequenceDescriptor::bounded(
                Arc::new(TypeDescriptor::primitive("int32", PrimitiveKind::I32)),
                1,
            )),
        ));
        let mut data = DynamicData::new(&seq);
        data.push_element(1i32.into()).expect("first push");
        assert!(matches!(
            data.push_element(2i32.into()),
            Err(DynamicDataError::SequenceTooLong { length: 2, max: 1 })
        ));
    }

    #[test]
    fn test_to_f64_rejects_strings() {
        let mut data = DynamicData::new(&sensor_type());
        data.set("name", "probe").expect("set name");
        assert!(matches!(
            data.lookup("name").and_then(|v| v.to_f64()),
            Err(DynamicDataError::TypeMismatch { .. })
        ));
    }
}
