// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The AdCP skill set and its dispatch spine.
//!
//! Tenant resolution and principal authentication ([`auth`]), parameter
//! normalization ([`params`]), the typed skill registry and dispatcher
//! ([`dispatch`]), and the nine skill handlers ([`discovery`],
//! [`media_buy`], [`creatives`]). Both transports call [`dispatch::dispatch`]
//! and shape the returned [`dispatch::SkillReply`] for their own wire.

pub mod auth;
pub mod creatives;
pub mod discovery;
pub mod dispatch;
pub mod media_buy;
pub mod params;

pub use auth::{authenticate, resolve_and_maybe_authenticate, resolve_tenant, AuthContext, ResolvedTenant};
pub use dispatch::{
    dispatch, is_discovery_skill, ProductRanker, Services, Skill, SkillRegistry, SkillReply,
    Transport, DISCOVERY_SKILLS,
};
