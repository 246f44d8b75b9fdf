// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for `MariaDB` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor `MariaDB` objects, their owned children and referenced secrets
//! 2. **Reconcile** - Walk the ordered steps in [`mariadb`], converging each child object
//! 3. **Status** - Report per-step conditions back through [`status::MariaDBStatusUpdater`]
//!
//! # Shared Helpers
//!
//! - [`resources`] - Server-side apply and delete for child objects
//! - [`finalizers`] - Finalizer add/remove guarded by `resourceVersion`
//! - [`retry`] - Retry with backoff for transient API errors
//!
//! # Example: Using the Reconciler
//!
//! ```rust,no_run
//! use mariadb_operator::context::Context;
//! use mariadb_operator::crd::MariaDB;
//! use mariadb_operator::reconcilers::reconcile_mariadb;
//! use std::sync::Arc;
//!
//! async fn reconcile(ctx: Arc<Context>, db: Arc<MariaDB>) -> anyhow::Result<()> {
//!     let action = reconcile_mariadb(db, ctx).await?;
//!     println!("next: {action:?}");
//!     Ok(())
//! }
//! ```

pub mod finalizers;
pub mod mariadb;
pub mod resources;
pub mod retry;
pub mod status;

pub use mariadb::reconcile_mariadb;
