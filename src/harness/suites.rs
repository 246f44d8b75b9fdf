// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Account lifecycle scenarios run against a consumer.

use super::{
    consistently, eventually, AccountConsumer, ConfigHashSource, HarnessError, MariaDBTestHarness,
    PopulateHarness, Scenario, UrlAsserter, EXISTING_ACCOUNT_NAME, NEW_ACCOUNT_NAME,
    OLD_ACCOUNT_NAME,
};
use crate::accounts::{
    account_secret_name, new_account, new_password_secret, secret_password, AccountStore,
};
use crate::crd::MariaDBAccount;
use crate::labels::MARIADB_DATABASE_NAME_LABEL;
use anyhow::{anyhow, bail, ensure};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Store-side checks shared by every scenario.
struct AccountProbe {
    store: Arc<dyn AccountStore>,
    namespace: String,
    database: String,
    finalizer: String,
}

impl AccountProbe {
    async fn account(&self, name: &str) -> anyhow::Result<MariaDBAccount> {
        self.store
            .get_account(&self.namespace, name)
            .await?
            .ok_or_else(|| anyhow!("MariaDBAccount {name} does not exist"))
    }

    async fn password(&self, account: &MariaDBAccount) -> anyhow::Result<String> {
        let secret = self
            .store
            .get_secret(&self.namespace, &account.spec.secret)
            .await?
            .ok_or_else(|| anyhow!("secret {} does not exist", account.spec.secret))?;
        secret_password(&secret)
            .ok_or_else(|| anyhow!("secret {} has no password", account.spec.secret))
    }

    /// The account is finalized, labeled and has usable credentials.
    async fn claimed(&self, name: &str) -> anyhow::Result<MariaDBAccount> {
        let account = self.account(name).await?;
        ensure!(
            account.has_finalizer(&self.finalizer),
            "{name} lacks finalizer {}",
            self.finalizer
        );
        let label = account.labels().get(MARIADB_DATABASE_NAME_LABEL);
        ensure!(
            label == Some(&self.database),
            "{name} has database label {label:?}, want {}",
            self.database
        );
        ensure!(!account.spec.user_name.is_empty(), "{name} has no user name");
        ensure!(!account.spec.secret.is_empty(), "{name} has no secret");
        self.password(&account).await?;
        Ok(account)
    }

    async fn released(&self, name: &str) -> anyhow::Result<()> {
        let account = self.account(name).await?;
        if account.has_finalizer(&self.finalizer) {
            bail!("{name} still has finalizer {}", self.finalizer);
        }
        Ok(())
    }

    async fn still_claimed(&self, name: &str) -> anyhow::Result<()> {
        let account = self.account(name).await?;
        ensure!(
            account.has_finalizer(&self.finalizer),
            "{name} lost finalizer {}",
            self.finalizer
        );
        Ok(())
    }

    async fn completed_shape(&self, new: &str, old: &str) -> anyhow::Result<()> {
        self.claimed(new).await?;
        self.released(old).await
    }

    async fn both_finalized(&self) -> anyhow::Result<()> {
        for name in [OLD_ACCOUNT_NAME, NEW_ACCOUNT_NAME] {
            let account = self.account(name).await?;
            ensure!(
                account.has_finalizer(&self.finalizer),
                "{name} lacks finalizer {}",
                self.finalizer
            );
        }
        Ok(())
    }

    async fn both_released(&self) -> anyhow::Result<()> {
        self.released(OLD_ACCOUNT_NAME).await?;
        self.released(NEW_ACCOUNT_NAME).await
    }
}

async fn url_matches<C: UrlAsserter>(
    probe: &AccountProbe,
    consumer: &C,
    name: &str,
) -> anyhow::Result<()> {
    let account = probe.claimed(name).await?;
    let password = probe.password(&account).await?;
    consumer
        .assert_url(name, &account.spec.user_name, &password)
        .await
}

async fn fresh_hash<C: ConfigHashSource>(
    consumer: &C,
    previous: Option<&str>,
) -> anyhow::Result<String> {
    let hash = consumer.config_hash().await?;
    ensure!(!hash.is_empty(), "config hash is empty");
    if let Some(previous) = previous {
        ensure!(hash != previous, "config hash still {previous}");
    }
    Ok(hash)
}

impl<P: PopulateHarness> MariaDBTestHarness<P> {
    fn scenario_name(&self, scenario: &str) -> String {
        format!("{}: {}", self.description, scenario)
    }

    async fn start(
        &self,
        scenario: &str,
    ) -> Result<(Scenario<P::Consumer>, AccountProbe), HarnessError> {
        info!("Running account scenario {}", scenario);
        let populated = self
            .populate
            .populate(&self.namespace, &self.database_name, &self.finalizer_name)
            .await
            .map_err(|e| HarnessError::step(scenario, "populate", e))?;
        let probe = AccountProbe {
            store: populated.store.clone(),
            namespace: self.namespace.clone(),
            database: self.database_name.clone(),
            finalizer: self.finalizer_name.clone(),
        };
        Ok((populated, probe))
    }

    async fn wait_claimed(
        &self,
        scenario: &str,
        probe: &AccountProbe,
        name: &str,
    ) -> Result<MariaDBAccount, HarnessError> {
        eventually(
            scenario,
            &format!("{name} to be claimed"),
            self.timeout,
            self.interval,
            || probe.claimed(name),
        )
        .await
    }

    async fn simulate_account_completed(
        &self,
        scenario: &str,
        probe: &AccountProbe,
        name: &str,
    ) -> Result<(), HarnessError> {
        eventually(
            scenario,
            &format!("{name} to exist"),
            self.timeout,
            self.interval,
            || probe.account(name),
        )
        .await?;
        probe
            .store
            .mark_ready(&self.namespace, name)
            .await
            .map_err(|e| HarnessError::step(scenario, "mark account ready", e))
    }

    /// Claim and complete the old account, then switch to the new one and wait
    /// until it is claimed.
    async fn run_account_update_with_wait(
        &self,
        scenario: &str,
        populated: &Scenario<P::Consumer>,
        probe: &AccountProbe,
    ) -> Result<(), HarnessError> {
        populated
            .consumer
            .setup_cr(OLD_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(scenario, "setup_cr", e))?;
        self.wait_claimed(scenario, probe, OLD_ACCOUNT_NAME).await?;
        self.simulate_account_completed(scenario, probe, OLD_ACCOUNT_NAME)
            .await?;

        populated
            .consumer
            .update_account(NEW_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(scenario, "update_account", e))?;
        self.wait_claimed(scenario, probe, NEW_ACCOUNT_NAME).await?;
        Ok(())
    }

    /// The five account lifecycle scenarios.
    ///
    /// # Errors
    ///
    /// Returns the first failing scenario.
    pub async fn run_basic_suite(&self) -> Result<(), HarnessError> {
        self.existing_account().await?;
        self.auto_created_account().await?;
        self.change_while_in_progress().await?;
        self.completion_moves_finalizer().await?;
        self.delete_releases_all().await
    }

    async fn existing_account(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("pre-existing account");
        let (populated, probe) = self.start(&scenario).await?;

        let account = new_account(
            &self.namespace,
            EXISTING_ACCOUNT_NAME,
            &format!("{}_pre1", self.database_name),
            None,
        );
        let secret = new_password_secret(
            &self.namespace,
            &account_secret_name(EXISTING_ACCOUNT_NAME),
            "existing-password",
        );
        populated
            .store
            .create_account(&account)
            .await
            .map_err(|e| HarnessError::step(&scenario, "create account", e))?;
        populated
            .store
            .create_secret(&secret)
            .await
            .map_err(|e| HarnessError::step(&scenario, "create secret", e))?;

        populated
            .consumer
            .setup_cr(EXISTING_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(&scenario, "setup_cr", e))?;
        self.wait_claimed(&scenario, &probe, EXISTING_ACCOUNT_NAME)
            .await?;
        Ok(())
    }

    async fn auto_created_account(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("auto-created account");
        let (populated, probe) = self.start(&scenario).await?;

        populated
            .consumer
            .setup_cr(EXISTING_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(&scenario, "setup_cr", e))?;
        self.wait_claimed(&scenario, &probe, EXISTING_ACCOUNT_NAME)
            .await?;
        Ok(())
    }

    async fn change_while_in_progress(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("account change while in progress");
        let (populated, probe) = self.start(&scenario).await?;

        self.run_account_update_with_wait(&scenario, &populated, &probe)
            .await?;
        consistently(
            &scenario,
            "old account keeps its finalizer",
            self.timeout,
            self.interval,
            || probe.still_claimed(OLD_ACCOUNT_NAME),
        )
        .await
    }

    async fn completion_moves_finalizer(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("account change completes");
        let (populated, probe) = self.start(&scenario).await?;

        self.run_account_update_with_wait(&scenario, &populated, &probe)
            .await?;
        self.simulate_account_completed(&scenario, &probe, NEW_ACCOUNT_NAME)
            .await?;
        eventually(
            &scenario,
            "finalizer to move to the new account",
            self.timeout,
            self.interval,
            || probe.completed_shape(NEW_ACCOUNT_NAME, OLD_ACCOUNT_NAME),
        )
        .await
    }

    async fn delete_releases_all(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("consumer delete");
        let (populated, probe) = self.start(&scenario).await?;

        self.run_account_update_with_wait(&scenario, &populated, &probe)
            .await?;
        eventually(
            &scenario,
            "both accounts to carry the finalizer",
            self.timeout,
            self.interval,
            || probe.both_finalized(),
        )
        .await?;
        populated
            .consumer
            .delete_cr()
            .await
            .map_err(|e| HarnessError::step(&scenario, "delete_cr", e))?;
        eventually(
            &scenario,
            "finalizers to be removed from both accounts",
            self.timeout,
            self.interval,
            || probe.both_released(),
        )
        .await
    }
}

impl<P> MariaDBTestHarness<P>
where
    P: PopulateHarness,
    P::Consumer: UrlAsserter,
{
    /// The consumer's connection URL follows the account through rotation.
    ///
    /// # Errors
    ///
    /// Returns the failing step.
    pub async fn run_url_assert_suite(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("connection url");
        let (populated, probe) = self.start(&scenario).await?;
        let consumer = populated.consumer.clone();

        populated
            .consumer
            .setup_cr(OLD_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(&scenario, "setup_cr", e))?;
        self.wait_claimed(&scenario, &probe, OLD_ACCOUNT_NAME).await?;
        self.simulate_account_completed(&scenario, &probe, OLD_ACCOUNT_NAME)
            .await?;
        eventually(
            &scenario,
            "url for the first account",
            self.timeout,
            self.interval,
            || url_matches(&probe, consumer.as_ref(), OLD_ACCOUNT_NAME),
        )
        .await?;

        populated
            .consumer
            .update_account(NEW_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(&scenario, "update_account", e))?;
        self.simulate_account_completed(&scenario, &probe, NEW_ACCOUNT_NAME)
            .await?;
        eventually(
            &scenario,
            "url for the rotated account",
            self.timeout,
            self.interval,
            || url_matches(&probe, consumer.as_ref(), NEW_ACCOUNT_NAME),
        )
        .await
    }
}

impl<P> MariaDBTestHarness<P>
where
    P: PopulateHarness,
    P::Consumer: ConfigHashSource,
{
    /// The consumer's config hash changes when the account rotates.
    ///
    /// # Errors
    ///
    /// Returns the failing step.
    pub async fn run_config_hash_suite(&self) -> Result<(), HarnessError> {
        let scenario = self.scenario_name("config hash");
        let (populated, probe) = self.start(&scenario).await?;
        let consumer = populated.consumer.clone();

        populated
            .consumer
            .setup_cr(OLD_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(&scenario, "setup_cr", e))?;
        self.wait_claimed(&scenario, &probe, OLD_ACCOUNT_NAME).await?;
        self.simulate_account_completed(&scenario, &probe, OLD_ACCOUNT_NAME)
            .await?;
        let first = eventually(
            &scenario,
            "a config hash",
            self.timeout,
            self.interval,
            || fresh_hash(consumer.as_ref(), None),
        )
        .await?;

        populated
            .consumer
            .update_account(NEW_ACCOUNT_NAME)
            .await
            .map_err(|e| HarnessError::step(&scenario, "update_account", e))?;
        self.simulate_account_completed(&scenario, &probe, NEW_ACCOUNT_NAME)
            .await?;
        eventually(
            &scenario,
            "the config hash to change",
            self.timeout,
            self.interval,
            || fresh_hash(consumer.as_ref(), Some(&first)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "suites_tests.rs"]
mod suites_tests;
