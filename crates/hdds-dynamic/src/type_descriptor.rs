// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for runtime type information.

use std::fmt;
use std::sync::{Arc, OnceLock};

/// Maximum number of alias hops followed before a chain is treated as a cycle.
pub const MAX_ALIAS_DEPTH: usize = 64;

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    LongDouble,
    String { max_length: Option<usize> },
    WString { max_length: Option<usize> },
}

impl PrimitiveKind {
    /// Numeric scalar that can become a metric sample.
    ///
    /// Boolean, character and byte-sized kinds are excluded, as are strings.
    pub fn is_mappable(&self) -> bool {
        matches!(
            self,
            Self::U16
                | Self::I16
                | Self::U32
                | Self::I32
                | Self::U64
                | Self::I64
                | Self::F32
                | Self::F64
                | Self::LongDouble
        )
    }

    /// Narrow or wide string.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String { .. } | Self::WString { .. })
    }

    /// IDL spelling of the kind, used in diagnostics and schema files.
    pub fn idl_name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Char => "char",
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::U64 => "uint64",
            Self::I64 => "int64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::LongDouble => "float128",
            Self::String { .. } => "string",
            Self::WString { .. } => "wstring",
        }
    }

    /// Parse an IDL primitive name (both `int32` and `long` spellings).
    pub fn from_idl_name(name: &str) -> Option<Self> {
        let kind = match name {
            "boolean" | "bool" => Self::Bool,
            "char" | "char8" => Self::Char,
            "octet" | "uint8" | "byte" => Self::U8,
            "int8" => Self::I8,
            "uint16" | "unsigned short" => Self::U16,
            "int16" | "short" => Self::I16,
            "uint32" | "unsigned long" => Self::U32,
            "int32" | "long" => Self::I32,
            "uint64" | "unsigned long long" => Self::U64,
            "int64" | "long long" => Self::I64,
            "float32" | "float" => Self::F32,
            "float64" | "double" => Self::F64,
            "float128" | "long double" => Self::LongDouble,
            "string" => Self::String { max_length: None },
            "wstring" => Self::WString { max_length: None },
            _ => return None,
        };
        Some(kind)
    }
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Primitive type.
    Primitive(PrimitiveKind),
    /// Struct with named members.
    Struct(Vec<FieldDescriptor>),
    /// Union with discriminator.
    Union(UnionDescriptor),
    /// Sequence (dynamic length).
    Sequence(SequenceDescriptor),
    /// Array (fixed length).
    Array(ArrayDescriptor),
    /// Enumeration.
    Enum(EnumDescriptor),
    /// Typedef to another type.
    Alias(AliasDescriptor),
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name.
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Create a new type descriptor.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a primitive type descriptor.
    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, TypeKind::Primitive(kind))
    }

    /// Create a struct type descriptor.
    pub fn struct_type(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(name, TypeKind::Struct(fields))
    }

    /// Create an unbounded sequence of `element_type`.
    pub fn sequence_of(element_type: Arc<TypeDescriptor>) -> Self {
        Self::new("", TypeKind::Sequence(SequenceDescriptor::unbounded(element_type)))
    }

    /// Create a fixed-length array of `element_type`.
    pub fn array_of(element_type: Arc<TypeDescriptor>, length: usize) -> Self {
        Self::new("", TypeKind::Array(ArrayDescriptor::new(element_type, length)))
    }

    /// Create an alias bound to `target`.
    pub fn alias(name: impl Into<String>, target: Arc<TypeDescriptor>) -> Self {
        Self::new(name, TypeKind::Alias(AliasDescriptor::new(target)))
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Check if this is a struct type.
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    /// Check if this is a sequence or an array.
    pub fn is_collection(&self) -> bool {
        matches!(self.kind, TypeKind::Sequence(_) | TypeKind::Array(_))
    }

    /// Check if this is an alias.
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, TypeKind::Alias(_))
    }

    /// Primitive kind, if this is a primitive.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Get fields if this is a struct.
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match &self.kind {
            TypeKind::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields()?.iter().find(|f| f.name == name)
    }

    /// Key members of a struct, in declaration order.
    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields().unwrap_or_default().iter().filter(|f| f.key)
    }

    /// Get union case by name.
    pub fn union_case(&self, name: &str) -> Option<&UnionCase> {
        match &self.kind {
            TypeKind::Union(u) => u.case(name),
            _ => None,
        }
    }

    /// Element type of a sequence or array.
    pub fn element_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.kind {
            TypeKind::Sequence(seq) => Some(&seq.element_type),
            TypeKind::Array(arr) => Some(&arr.element_type),
            _ => None,
        }
    }

    /// Immediate alias target (one hop), if this is a bound alias.
    pub fn alias_target(&self) -> Option<Arc<TypeDescriptor>> {
        match &self.kind {
            TypeKind::Alias(alias) => alias.target(),
            _ => None,
        }
    }

    /// Follow alias indirection until a non-alias type is reached.
    ///
    /// Returns `None` for an unbound forward declaration or when the chain
    /// exceeds [`MAX_ALIAS_DEPTH`] hops (an alias cycle).
    pub fn resolve_alias(self: &Arc<Self>) -> Option<Arc<TypeDescriptor>> {
        let mut current = Arc::clone(self);
        for _ in 0..=MAX_ALIAS_DEPTH {
            if !current.is_alias() {
                return Some(current);
            }
            current = current.alias_target()?;
        }
        log::debug!(
            "[dynamic] alias chain from '{}' exceeds {} hops, treating as cycle",
            self.name,
            MAX_ALIAS_DEPTH
        );
        None
    }
}

/// Field descriptor for struct members.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Field type.
    pub type_desc: Arc<TypeDescriptor>,
    /// Field ID (for extensible types).
    pub id: Option<u32>,
    /// Is optional (@optional annotation).
    pub optional: bool,
    /// Part of the instance identity (@key annotation).
    pub key: bool,
}

impl FieldDescriptor {
    /// Create a new field descriptor.
    pub fn new(name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            type_desc,
            id: None,
            optional: false,
            key: false,
        }
    }

    /// Set field ID.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark as key member.
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }
}

/// Sequence type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDescriptor {
    /// Element type.
    pub element_type: Arc<TypeDescriptor>,
    /// Maximum length (None = unbounded).
    pub max_length: Option<usize>,
}

impl SequenceDescriptor {
    /// Create unbounded sequence.
    pub fn unbounded(element_type: Arc<TypeDescriptor>) -> Self {
        Self {
            element_type,
            max_length: None,
        }
    }

    /// Create bounded sequence.
    pub fn bounded(element_type: Arc<TypeDescriptor>, max_length: usize) -> Self {
        Self {
            element_type,
            max_length: Some(max_length),
        }
    }
}

/// Array type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDescriptor {
    /// Element type.
    pub element_type: Arc<TypeDescriptor>,
    /// Fixed length.
    pub length: usize,
}

impl ArrayDescriptor {
    /// Create array descriptor.
    pub fn new(element_type: Arc<TypeDescriptor>, length: usize) -> Self {
        Self {
            element_type,
            length,
        }
    }
}

/// Enumeration type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    /// Enum variants.
    pub variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    /// Create enum descriptor.
    pub fn new(variants: Vec<EnumVariant>) -> Self {
        Self { variants }
    }

    /// Get variant by name.
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Get variant by value.
    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    /// Variant name.
    pub name: String,
    /// Variant value.
    pub value: i64,
}

impl EnumVariant {
    /// Create enum variant.
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Union type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionDescriptor {
    /// Discriminator type.
    pub discriminator: Arc<TypeDescriptor>,
    /// Union cases.
    pub cases: Vec<UnionCase>,
}

impl UnionDescriptor {
    /// Create union descriptor.
    pub fn new(discriminator: Arc<TypeDescriptor>, cases: Vec<UnionCase>) -> Self {
        Self {
            discriminator,
            cases,
        }
    }

    /// Get case by name.
    pub fn case(&self, name: &str) -> Option<&UnionCase> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// Get case by discriminator value.
    pub fn case_by_discriminator(&self, value: i64) -> Option<&UnionCase> {
        self.cases.iter().find(|c| c.labels.contains(&value))
    }
}

/// Union case.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionCase {
    /// Case name.
    pub name: String,
    /// Discriminator labels for this case.
    pub labels: Vec<i64>,
    /// Case type.
    pub type_desc: Arc<TypeDescriptor>,
}

impl UnionCase {
    /// Create union case.
    pub fn new(name: impl Into<String>, labels: Vec<i64>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            labels,
            type_desc,
        }
    }

    /// Create single-label case.
    pub fn single(name: impl Into<String>, label: i64, type_desc: Arc<TypeDescriptor>) -> Self {
        Self::new(name, vec![label], type_desc)
    }
}

/// Alias (typedef) descriptor.
///
/// The target lives in a shared once-cell: clones of a forward-declared
/// alias observe a later [`AliasDescriptor::bind`].
#[derive(Clone)]
pub struct AliasDescriptor {
    target: Arc<OnceLock<Arc<TypeDescriptor>>>,
}

impl AliasDescriptor {
    /// Create an alias bound to `target`.
    pub fn new(target: Arc<TypeDescriptor>) -> Self {
        let alias = Self::forward();
        let _ = alias.target.set(target);
        alias
    }

    /// Create an unbound alias (forward declaration).
    pub fn forward() -> Self {
        Self {
            target: Arc::new(OnceLock::new()),
        }
    }

    /// Bind a forward-declared alias. Returns false if already bound.
    pub fn bind(&self, target: Arc<TypeDescriptor>) -> bool {
        self.target.set(target).is_ok()
    }

    /// Target type, if bound.
    pub fn target(&self) -> Option<Arc<TypeDescriptor>> {
        self.target.get().cloned()
    }

    fn target_name(&self) -> Option<&str> {
        self.target.get().map(|t| t.name.as_str())
    }
}

// Debug and PartialEq stop at the target name: alias graphs may be cyclic.
impl fmt::Debug for AliasDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasDescriptor")
            .field("target", &self.target_name())
            .finish()
    }
}

impl PartialEq for AliasDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.target, &other.target) || self.target_name() == other.target_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mappable_kinds() {
        assert!(PrimitiveKind::I32.is_mappable());
        assert!(PrimitiveKind::U64.is_mappable());
        assert!(PrimitiveKind::F32.is_mappable());
        assert!(PrimitiveKind::LongDouble.is_mappable());
        assert!(!PrimitiveKind::Bool.is_mappable());
        assert!(!PrimitiveKind::Char.is_mappable());
        assert!(!PrimitiveKind::U8.is_mappable());
        assert!(!PrimitiveKind::String { max_length: None }.is_mappable());
    }

    #[test]
    fn test_idl_names() {
        assert_eq!(PrimitiveKind::from_idl_name("long"), Some(PrimitiveKind::I32));
        assert_eq!(PrimitiveKind::from_idl_name("float64"), Some(PrimitiveKind::F64));
        assert_eq!(PrimitiveKind::from_idl_name("struct"), None);
        assert_eq!(PrimitiveKind::U16.idl_name(), "uint16");
    }

    #[test]
    fn test_type_descriptor_struct() {
        let u32_type = Arc::new(TypeDescriptor::primitive("uint32", PrimitiveKind::U32));
        let f64_type = Arc::new(TypeDescriptor::primitive("float64", PrimitiveKind::F64));

        let fields = vec![
            FieldDescriptor::new("id", u32_type).key(),
            FieldDescriptor::new("y", f64_type),
        ];

        let desc = TypeDescriptor::struct_type("Point", fields);
        assert!(desc.is_struct());
        assert_eq!(desc.fields().map(|f| f.len()), Some(2));
        assert!(desc.field("id").is_some());
        assert!(desc.field("z").is_none());
        let keys: Vec<_> = desc.key_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(keys, vec!["id"]);
    }

    #[test]
    fn test_alias_resolution() {
        let f64_type = Arc::new(TypeDescriptor::primitive("float64", PrimitiveKind::F64));
        let inner = Arc::new(TypeDescriptor::alias("Meters", f64_type));
        let outer = Arc::new(TypeDescriptor::alias("Distance", inner));

        let resolved = outer.resolve_alias().expect("resolves");
        assert_eq!(resolved.primitive_kind(), Some(PrimitiveKind::F64));
    }

    #[test]
    fn test_alias_cycle_is_bounded() {
        let a = AliasDescriptor::forward();
        let b = AliasDescriptor::forward();
        let a_type = Arc::new(TypeDescriptor::new("A", TypeKind::Alias(a.clone())));
        let b_type = Arc::new(TypeDescriptor::new("B", TypeKind::Alias(b.clone())));
        assert!(a.bind(b_type.clone()));
        assert!(b.bind(a_type.clone()));
        assert!(!a.bind(b_type));

        assert!(a_type.resolve_alias().is_none());
        // Debug must not recurse through the cycle.
        assert!(format!("{:?}", a_type).contains("AliasDescriptor"));
    }

    #[test]
    fn test_unbound_alias() {
        let alias = Arc::new(TypeDescriptor::new(
            "Pending",
            TypeKind::Alias(AliasDescriptor::forward()),
        ));
        assert!(alias.resolve_alias().is_none());
    }

    #[test]
    fn test_collection_element_type() {
        let f64_type = Arc::new(TypeDescriptor::primitive("float64", PrimitiveKind::F64));
        let seq = TypeDescriptor::sequence_of(f64_type.clone());
        let arr = TypeDescriptor::array_of(f64_type, 3);
        assert!(seq.is_collection());
        assert!(arr.is_collection());
        assert_eq!(
            seq.element_type().and_then(|t| t.primitive_kind()),
            Some(PrimitiveKind::F64)
        );
    }

    #[test]
    fn test_union_case_lookup() {
        let i32_type = Arc::new(TypeDescriptor::primitive("int32", PrimitiveKind::I32));
        let f64_type = Arc::new(TypeDescriptor::primitive("float64", PrimitiveKind::F64));
        let u = UnionDescriptor::new(
            i32_type.clone(),
            vec![
                UnionCase::single("count", 1, i32_type),
                UnionCase::new("ratio", vec![2, 3], f64_type),
            ],
        );
        let desc = TypeDescriptor::new("Reading", TypeKind::Union(u.clone()));
        assert!(desc.union_case("ratio").is_some());
        assert_eq!(u.case_by_discriminator(3).map(|c| c.name.as_str()), Some("ratio"));
        assert!(u.case_by_discriminator(9).is_none());
    }
}
