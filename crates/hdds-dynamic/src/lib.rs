// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic Types for HDDS bridges
//!
//! Runtime type manipulation without compile-time type knowledge.
//! Bridges (Prometheus, InfluxDB, recorders) receive samples whose schema is
//! only known once a topic is discovered; this crate carries that schema and
//! gives path-addressed access to the data.
//!
//! # Features
//!
//! - **TypeDescriptor**: Runtime type description (primitives, structs, unions,
//!   sequences, arrays, enums, aliases)
//! - **DynamicData**: Type-erased data container with field access
//! - **DynamicDataRef**: Borrowed view with `member` / `element` / `lookup`
//! - **Builder API**: Fluent interface for building type descriptors
//! - **Loaders** (feature `loaders`): YAML schema documents and JSON samples
//!
//! # Example
//!
//! ```rust
//! use hdds_dynamic::{TypeDescriptorBuilder, DynamicData, DynamicValue, PrimitiveKind};
//! use std::sync::Arc;
//!
//! let descriptor = Arc::new(TypeDescriptorBuilder::new("SensorReading")
//!     .key_field("sensor_id", PrimitiveKind::U32)
//!     .sequence_field("temperatures", PrimitiveKind::F64)
//!     .build());
//!
//! let mut data = DynamicData::new(&descriptor);
//! data.set("sensor_id", 42u32).unwrap();
//! data.set("temperatures", DynamicValue::from(vec![21.5f64, 23.0])).unwrap();
//!
//! let temp = data.lookup("temperatures[1]").unwrap().to_f64().unwrap();
//! assert_eq!(temp, 23.0);
//! ```

mod builder;
mod dynamic_data;
mod path;
mod sample_info;
mod type_descriptor;
mod value;

#[cfg(feature = "loaders")]
pub mod json;
#[cfg(feature = "loaders")]
pub mod schema;

pub use builder::{bounded_sequence, EnumBuilder, TypeDescriptorBuilder, UnionBuilder};
pub use dynamic_data::{
    DynamicData, DynamicDataError, DynamicDataRef, FromDynamicValue, IntoDynamicValue,
};
pub use path::{FieldPath, PathSegment};
pub use sample_info::{InstanceHandle, SampleInfo, ViewState};
pub use type_descriptor::{
    AliasDescriptor, ArrayDescriptor, EnumDescriptor, EnumVariant, FieldDescriptor,
    PrimitiveKind, SequenceDescriptor, TypeDescriptor, TypeKind, UnionCase, UnionDescriptor,
    MAX_ALIAS_DEPTH,
};
pub use value::DynamicValue;
