// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor-guided conversion from JSON documents to dynamic values.
//!
//! Unions are single-key objects `{"case": value}`, enums accept either the
//! variant name or its numeric value, and absent optional members become
//! [`DynamicValue::Null`].

use crate::{DynamicData, DynamicDataError, DynamicValue, PrimitiveKind, TypeDescriptor, TypeKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Build a [`DynamicData`] sample from JSON.
pub fn data_from_json(
    descriptor: &Arc<TypeDescriptor>,
    json: &Value,
) -> Result<DynamicData, DynamicDataError> {
    let value = value_from_json(descriptor, json)?;
    DynamicData::from_value(descriptor, value)
}

/// Convert JSON into a [`DynamicValue`] shaped by `descriptor`.
pub fn value_from_json(
    descriptor: &Arc<TypeDescriptor>,
    json: &Value,
) -> Result<DynamicValue, DynamicDataError> {
    let resolved = descriptor
        .resolve_alias()
        .ok_or_else(|| DynamicDataError::UnresolvedAlias(descriptor.name.clone()))?;

    match &resolved.kind {
        TypeKind::Primitive(kind) => primitive_from_json(*kind, json),
        TypeKind::Struct(fields) => {
            let object = json.as_object().ok_or_else(|| mismatch("object", json))?;
            let mut map = HashMap::with_capacity(fields.len());
            for field in fields {
                let value = match object.get(&field.name) {
                    Some(Value::Null) | None if field.optional => DynamicValue::Null,
                    Some(member) => value_from_json(&field.type_desc, member)?,
                    None => return Err(DynamicDataError::FieldNotFound(field.name.clone())),
                };
                map.insert(field.name.clone(), value);
            }
            Ok(DynamicValue::Struct(map))
        }
        TypeKind::Sequence(seq) => {
            let items = json.as_array().ok_or_else(|| mismatch("array", json))?;
            if let Some(max) = seq.max_length {
                if items.len() > max {
                    return Err(DynamicDataError::SequenceTooLong {
                        length: items.len(),
                        max,
                    });
                }
            }
            let elements = items
                .iter()
                .map(|item| value_from_json(&seq.element_type, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynamicValue::Sequence(elements))
        }
        TypeKind::Array(arr) => {
            let items = json.as_array().ok_or_else(|| mismatch("array", json))?;
            if items.len() != arr.length {
                return Err(DynamicDataError::TypeMismatch {
                    expected: format!("array of {}", arr.length),
                    got: format!("array of {}", items.len()),
                });
            }
            let elements = items
                .iter()
                .map(|item| value_from_json(&arr.element_type, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynamicValue::Array(elements))
        }
        TypeKind::Enum(e) => {
            let variant = match json {
                Value::String(name) => e.variant(name),
                Value::Number(n) => n.as_i64().and_then(|v| e.variant_by_value(v)),
                _ => None,
            }
            .ok_or_else(|| mismatch(&resolved.name, json))?;
            Ok(DynamicValue::Enum(variant.value, variant.name.clone()))
        }
        TypeKind::Union(u) => {
            let object = json
                .as_object()
                .filter(|o| o.len() == 1)
                .ok_or_else(|| mismatch("single-key object", json))?;
            let Some((case_name, inner)) = object.iter().next() else {
                return Err(mismatch("single-key object", json));
            };
            let case = u
                .case(case_name)
                .ok_or_else(|| DynamicDataError::FieldNotFound(case_name.clone()))?;
            let discriminator = case.labels.first().copied().unwrap_or(0);
            let value = value_from_json(&case.type_desc, inner)?;
            Ok(DynamicValue::Union(
                discriminator,
                case.name.clone(),
                Box::new(value),
            ))
        }
        TypeKind::Alias(_) => Err(DynamicDataError::UnresolvedAlias(resolved.name.clone())),
    }
}

fn primitive_from_json(kind: PrimitiveKind, json: &Value) -> Result<DynamicValue, DynamicDataError> {
    let expected = kind.idl_name();
    let value = match kind {
        PrimitiveKind::Bool => json.as_bool().map(DynamicValue::Bool),
        PrimitiveKind::Char => json
            .as_str()
            .filter(|s| s.chars().count() == 1)
            .and_then(|s| s.chars().next())
            .map(DynamicValue::Char),
        PrimitiveKind::U8 => unsigned(json).map(DynamicValue::U8),
        PrimitiveKind::U16 => unsigned(json).map(DynamicValue::U16),
        PrimitiveKind::U32 => unsigned(json).map(DynamicValue::U32),
        PrimitiveKind::U64 => json.as_u64().map(DynamicValue::U64),
        PrimitiveKind::I8 => signed(json).map(DynamicValue::I8),
        PrimitiveKind::I16 => signed(json).map(DynamicValue::I16),
        PrimitiveKind::I32 => signed(json).map(DynamicValue::I32),
        PrimitiveKind::I64 => json.as_i64().map(DynamicValue::I64),
        PrimitiveKind::F32 => json.as_f64().map(|v| DynamicValue::F32(v as f32)),
        PrimitiveKind::F64 => json.as_f64().map(DynamicValue::F64),
        PrimitiveKind::LongDouble => json.as_f64().map(DynamicValue::LongDouble),
        PrimitiveKind::String { .. } => json.as_str().map(|s| DynamicValue::String(s.into())),
        PrimitiveKind::WString { .. } => json.as_str().map(|s| DynamicValue::WString(s.into())),
    };
    value.ok_or_else(|| mismatch(expected, json))
}

fn unsigned<T: TryFrom<u64>>(json: &Value) -> Option<T> {
    json.as_u64().and_then(|v| T::try_from(v).ok())
}

fn signed<T: TryFrom<i64>>(json: &Value) -> Option<T> {
    json.as_i64().and_then(|v| T::try_from(v).ok())
}

fn mismatch(expected: &str, json: &Value) -> DynamicDataError {
    let got = match json {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    DynamicDataError::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    }
}
