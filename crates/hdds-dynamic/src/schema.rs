// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML schema documents describing runtime types.
//!
//! ```yaml
//! root: Sensor
//! types:
//!   - name: Sensor
//!     struct:
//!       - { name: id, type: int32, key: true }
//!       - { name: samples, type: float64, sequence: true }
//!   - name: Meters
//!     alias: float64
//! ```
//!
//! Types may reference each other in any order. A reference back to a type
//! still being built becomes a forward alias bound once that type completes,
//! so recursive schemas (and alias cycles) load without error.

use crate::{
    AliasDescriptor, ArrayDescriptor, EnumDescriptor, EnumVariant, FieldDescriptor,
    PrimitiveKind, SequenceDescriptor, TypeDescriptor, TypeKind, UnionCase, UnionDescriptor,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Schema loading errors.
#[derive(Debug)]
pub enum SchemaError {
    /// YAML parsing failed.
    Yaml(serde_yaml::Error),
    /// File I/O failed.
    Io(std::io::Error),
    /// A member or alias references a type that is neither primitive nor declared.
    UnknownType(String),
    /// A type definition is malformed.
    Invalid(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Yaml(e) => write!(f, "YAML parse error: {}", e),
            SchemaError::Io(e) => write!(f, "I/O error: {}", e),
            SchemaError::UnknownType(name) => write!(f, "Unknown type: '{}'", name),
            SchemaError::Invalid(msg) => write!(f, "Invalid schema: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::Yaml(e) => Some(e),
            SchemaError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(e: serde_yaml::Error) -> Self {
        SchemaError::Yaml(e)
    }
}

impl From<std::io::Error> for SchemaError {
    fn from(e: std::io::Error) -> Self {
        SchemaError::Io(e)
    }
}

/// Top-level schema document.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    /// Name of the sample type.
    pub root: String,
    /// Declared types.
    pub types: Vec<TypeDef>,
}

/// One declared type. Exactly one of the kind fields must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(rename = "struct")]
    pub struct_members: Option<Vec<MemberDef>>,
    pub union: Option<UnionDef>,
    pub sequence: Option<CollectionDef>,
    pub array: Option<CollectionDef>,
    /// Alias target type name.
    pub alias: Option<String>,
    #[serde(rename = "enum")]
    pub enum_variants: Option<Vec<String>>,
}

/// Struct member.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub optional: bool,
    /// Wrap the member type in an unbounded sequence.
    #[serde(default)]
    pub sequence: bool,
    /// Wrap the member type in a fixed-length array.
    pub array: Option<usize>,
}

/// Union body.
#[derive(Debug, Clone, Deserialize)]
pub struct UnionDef {
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    pub cases: Vec<CaseDef>,
}

/// Union case. Cases without labels take their position as label.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub labels: Vec<i64>,
}

/// Sequence or array body.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDef {
    pub element: String,
    /// Sequence bound or array length.
    pub length: Option<usize>,
}

fn default_discriminator() -> String {
    "int32".to_string()
}

impl SchemaDocument {
    /// Parse a schema from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = serde_yaml::from_str(yaml)?;
        Ok(doc)
    }

    /// Parse a schema from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Build the root type descriptor.
    pub fn build(&self) -> Result<Arc<TypeDescriptor>, SchemaError> {
        self.build_type(&self.root)
    }

    /// Build any declared (or primitive) type by name.
    pub fn build_type(&self, name: &str) -> Result<Arc<TypeDescriptor>, SchemaError> {
        let mut defs = HashMap::new();
        for def in &self.types {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(SchemaError::Invalid(format!(
                    "type '{}' declared twice",
                    def.name
                )));
            }
        }
        let mut loader = Loader {
            defs,
            built: HashMap::new(),
            in_progress: HashMap::new(),
        };
        loader.resolve(name)
    }
}

struct Loader<'a> {
    defs: HashMap<&'a str, &'a TypeDef>,
    built: HashMap<String, Arc<TypeDescriptor>>,
    in_progress: HashMap<String, AliasDescriptor>,
}

impl Loader<'_> {
    fn resolve(&mut self, name: &str) -> Result<Arc<TypeDescriptor>, SchemaError> {
        if let Some(desc) = self.built.get(name) {
            return Ok(desc.clone());
        }
        if let Some(forward) = self.in_progress.get(name) {
            log::debug!("[schema] forward reference to '{}'", name);
            return Ok(Arc::new(TypeDescriptor::new(
                name,
                TypeKind::Alias(forward.clone()),
            )));
        }
        let Some(def) = self.defs.get(name).copied() else {
            return PrimitiveKind::from_idl_name(name)
                .map(|kind| Arc::new(TypeDescriptor::primitive(name, kind)))
                .ok_or_else(|| SchemaError::UnknownType(name.to_string()));
        };

        self.in_progress
            .insert(name.to_string(), AliasDescriptor::forward());
        let desc = Arc::new(self.build(def)?);
        if let Some(forward) = self.in_progress.remove(name) {
            forward.bind(desc.clone());
        }
        self.built.insert(name.to_string(), desc.clone());
        Ok(desc)
    }

    fn build(&mut self, def: &TypeDef) -> Result<TypeDescriptor, SchemaError> {
        let declared = [
            def.struct_members.is_some(),
            def.union.is_some(),
            def.sequence.is_some(),
            def.array.is_some(),
            def.alias.is_some(),
            def.enum_variants.is_some(),
        ];
        if declared.iter().filter(|set| **set).count() != 1 {
            return Err(SchemaError::Invalid(format!(
                "type '{}' must declare exactly one of struct/union/sequence/array/alias/enum",
                def.name
            )));
        }

        let kind = if let Some(members) = &def.struct_members {
            let mut fields = Vec::with_capacity(members.len());
            for member in members {
                fields.push(self.member(member)?);
            }
            TypeKind::Struct(fields)
        } else if let Some(union) = &def.union {
            let discriminator = self.resolve(&union.discriminator)?;
            let mut cases = Vec::with_capacity(union.cases.len());
            for (pos, case) in union.cases.iter().enumerate() {
                let labels = if case.labels.is_empty() {
                    vec![pos as i64]
                } else {
                    case.labels.clone()
                };
                cases.push(UnionCase::new(
                    &case.name,
                    labels,
                    self.resolve(&case.type_name)?,
                ));
            }
            TypeKind::Union(UnionDescriptor::new(discriminator, cases))
        } else if let Some(seq) = &def.sequence {
            let element = self.resolve(&seq.element)?;
            TypeKind::Sequence(match seq.length {
                Some(max) => SequenceDescriptor::bounded(element, max),
                None => SequenceDescriptor::unbounded(element),
            })
        } else if let Some(arr) = &def.array {
            let length = arr.length.ok_or_else(|| {
                SchemaError::Invalid(format!("array '{}' needs a length", def.name))
            })?;
            TypeKind::Array(ArrayDescriptor::new(self.resolve(&arr.element)?, length))
        } else if let Some(target) = &def.alias {
            TypeKind::Alias(AliasDescriptor::new(self.resolve(target)?))
        } else {
            let variants = def
                .enum_variants
                .iter()
                .flatten()
                .enumerate()
                .map(|(value, name)| EnumVariant::new(name, value as i64))
                .collect();
            TypeKind::Enum(EnumDescriptor::new(variants))
        };

        Ok(TypeDescriptor::new(&def.name, kind))
    }

    fn member(&mut self, member: &MemberDef) -> Result<FieldDescriptor, SchemaError> {
        let mut type_desc = self.resolve(&member.type_name)?;
        if member.sequence && member.array.is_some() {
            return Err(SchemaError::Invalid(format!(
                "member '{}' cannot be both sequence and array",
                member.name
            )));
        }
        if member.sequence {
            type_desc = Arc::new(TypeDescriptor::sequence_of(type_desc));
        } else if let Some(length) = member.array {
            type_desc = Arc::new(TypeDescriptor::array_of(type_desc, length));
        }

        let mut field = FieldDescriptor::new(&member.name, type_desc);
        if member.key {
            field = field.key();
        }
        if member.optional {
            field = field.optional();
        }
        Ok(field)
    }
}
