// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Task lifecycle, protocol webhooks, and background schedulers.
//!
//! Long-running operations return a `submitted` task; the services here
//! advance state and emit protocol-shaped push notifications to
//! buyer-registered endpoints. Delivery is at-least-once with idempotent
//! payloads; a webhook failure never fails the originating call.

pub mod delivery_scheduler;
pub mod service;
pub mod status_scheduler;
pub mod webhook;

pub use delivery_scheduler::DeliveryScheduler;
pub use service::TaskService;
pub use status_scheduler::StatusScheduler;
pub use webhook::WebhookSender;
