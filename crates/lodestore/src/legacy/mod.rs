// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Schema evolution: mapping legacy layout versions onto the current layout
//! and deriving the handlers that read them.

pub mod handlers;
pub mod mapper;
pub mod result;

pub use handlers::{
    derive_legacy_handler, CustomLegacyHandlerRegistry, LegacyEnumHandler, LegacyWrapperHandler,
    MappedLegacyHandler, UnreachableTypeHandler,
};
pub use mapper::{
    ExplicitMappings, LegacyTypeMapper, MappingResultor, StandardResultor, TypeMemberMapping,
};
pub use result::{MappingResult, MemberPairing, EXPLICIT_MATCH_SCORE};
