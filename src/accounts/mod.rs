// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Database account provisioning and credential rotation.
//!
//! Consumer controllers (services that need a database login) reference a
//! `MariaDBAccount` by name. This module gives them:
//!
//! - [`ensure_mariadb_account`] - create the account and its password secret on demand
//! - [`AccountRotation`] - move the consumer's finalizer from an old account to a new
//!   one once the new account is ready, and strip it from every account on delete
//! - [`AccountStore`] - the storage seam, backed by the API server in production
//!   ([`KubeAccountStore`]) and by memory in tests ([`MemoryAccountStore`])
//!
//! # Example
//!
//! ```rust,no_run
//! use mariadb_operator::accounts::{AccountRotation, KubeAccountStore};
//! use kube::Client;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Client::try_default().await?;
//! let store = KubeAccountStore::new(client);
//! let rotation = AccountRotation::new(&store, "openstack", "keystone", "openstack.org/keystone");
//!
//! let status = rotation.reconcile("keystone-v2", "keystone").await?;
//! if status.ready {
//!     println!("now running on {}", status.account.spec.user_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod kube_store;
pub mod memory;
pub mod provisioner;
pub mod rotation;
pub mod store;

pub use kube_store::KubeAccountStore;
pub use memory::MemoryAccountStore;
pub use provisioner::{
    account_secret_name, ensure_mariadb_account, generate_password, generate_user_name,
    new_account, new_password_secret, secret_password,
};
pub use rotation::{plan_release, plan_rotation, AccountRotation, FinalizerPlan, RotationStatus};
pub use store::AccountStore;
