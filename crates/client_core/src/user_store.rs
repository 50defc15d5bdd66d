use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use shared::{
    domain::{AccountId, BankAccount, Employee, EmployeeId, Employer, EmployerId},
    error::FieldErrorMap,
    protocol::{
        ApiResponse, Credentials, EmployeeAssignment, EmployerPatch, NewBankAccount, NewEmployee,
        NewEmployer, ResetPassword,
    },
};

use crate::{
    access::{derive_access, AccessMap},
    error::SnapshotError,
    notification::{BroadcastNotifier, NotificationSink},
    outcome::{notify_outcome, settle_response, ActionOutcome, Settled},
    MemorySessionStore, MemoryTokenVault, SessionStore, TokenVault, UserApi,
};

/// Session-storage key for the persisted user snapshot.
pub const USER_STATE_KEY: &str = "userstate";

#[derive(Debug, Clone, Default)]
struct UserState {
    is_loading: bool,
    is_employer: bool,
    user: Option<Employer>,
    errors: FieldErrorMap,
    employees: Vec<Employee>,
    access: AccessMap,
    bank_accounts: Vec<BankAccount>,
}

/// Persisted subset of the state; the loading flag and the error map are
/// transient and never written out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSnapshot {
    is_employer: bool,
    user: Option<Employer>,
    employees: Vec<Employee>,
    access: AccessMap,
    bank_accounts: Vec<BankAccount>,
}

impl UserState {
    fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            is_employer: self.is_employer,
            user: self.user.clone(),
            employees: self.employees.clone(),
            access: self.access.clone(),
            bank_accounts: self.bank_accounts.clone(),
        }
    }

    fn restore(snapshot: UserSnapshot) -> Self {
        Self {
            is_loading: false,
            is_employer: snapshot.is_employer,
            user: snapshot.user,
            errors: FieldErrorMap::new(),
            employees: snapshot.employees,
            access: snapshot.access,
            bank_accounts: snapshot.bank_accounts,
        }
    }
}

/// Cache of the session principal, the employee list, and the bank-account
/// list. Shared via `Arc`; any holder may dispatch any action.
pub struct UserStore {
    api: Arc<dyn UserApi>,
    notifier: Arc<dyn NotificationSink>,
    session: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenVault>,
    state: RwLock<UserState>,
}

impl UserStore {
    pub async fn new(api: Arc<dyn UserApi>) -> Arc<Self> {
        Self::new_with_dependencies(
            api,
            Arc::new(BroadcastNotifier::default()),
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryTokenVault::new()),
        )
        .await
    }

    /// Builds the store and rehydrates the persisted snapshot, if any. An
    /// unreadable snapshot is discarded and evicted.
    pub async fn new_with_dependencies(
        api: Arc<dyn UserApi>,
        notifier: Arc<dyn NotificationSink>,
        session: Arc<dyn SessionStore>,
        tokens: Arc<dyn TokenVault>,
    ) -> Arc<Self> {
        let state = match rehydrate(session.as_ref()).await {
            Ok(Some(snapshot)) => UserState::restore(snapshot),
            Ok(None) => UserState::default(),
            Err(err) => {
                warn!("session: discarding unreadable user snapshot: {err}");
                if let Err(err) = session.remove(USER_STATE_KEY).await {
                    warn!("session: failed to evict unreadable user snapshot: {err}");
                }
                UserState::default()
            }
        };
        Arc::new(Self {
            api,
            notifier,
            session,
            tokens,
            state: RwLock::new(state),
        })
    }

    /// Restores every field to its initial value, evicts the persisted
    /// snapshot, and clears the token vault. Idempotent; no network call.
    pub async fn reset(&self) {
        {
            let mut state = self.state.write().await;
            *state = UserState::default();
        }
        if let Err(err) = self.session.remove(USER_STATE_KEY).await {
            warn!("session: failed to evict user snapshot: {err}");
        }
        if let Err(err) = self.tokens.clear().await {
            warn!("session: failed to clear auth token: {err}");
        }
    }

    /// Clears one field's validation message; every other field keeps its
    /// error. No-op when the field has none.
    pub async fn clear_error(&self, field: &str) {
        self.set_state(|state| state.errors.clear_one(field)).await;
    }

    pub async fn clear_errors(&self) {
        self.set_state(|state| state.errors.clear_all()).await;
    }

    /// Authenticates the principal: stores the returned profile, derives the
    /// access map from its roles, and moves the bearer token into the
    /// process-wide vault. On a validation failure only the error map is
    /// touched; on a fault nothing is.
    pub async fn login(&self, credentials: &Credentials, as_employer: bool) -> ActionOutcome {
        self.begin().await;
        let result = self.api.login(credentials, as_employer).await;
        // The attempted mode is recorded regardless of how the call settled.
        self.set_state(|state| state.is_employer = as_employer)
            .await;

        let mut token = None;
        let outcome = self
            .settle(
                "login",
                Some("Successful Login"),
                result,
                false,
                |state, employer: Option<Employer>| {
                    let Some(mut employer) = employer else {
                        return;
                    };
                    token = employer.token.take();
                    state.access = derive_access(&employer.roles);
                    state.user = Some(employer);
                },
            )
            .await;

        if let Some(token) = token {
            if let Err(err) = self.tokens.save(&token).await {
                warn!("login: failed to persist auth token: {err}");
            }
        }
        outcome
    }

    /// Requests a one-time passcode for the address; nothing is cached.
    pub async fn request_otp(&self, email: &str) -> ActionOutcome {
        self.begin().await;
        let result = self.api.request_otp(email).await;
        self.settle("request_otp", None, result, false, |_, _| {})
            .await
    }

    pub async fn verify_employer(&self, email: &str, otp: &str) -> ActionOutcome {
        self.begin().await;
        let result = self.api.verify_employer(email, otp).await;
        self.settle("verify_employer", None, result, false, |_, _| {})
            .await
    }

    pub async fn reset_password(&self, reset: &ResetPassword, as_employer: bool) -> ActionOutcome {
        self.begin().await;
        let result = self.api.reset_password(reset, as_employer).await;
        self.settle("reset_password", None, result, false, |_, _| {})
            .await
    }

    /// Registers a new employer account. The principal is not established
    /// here; the caller logs in after verification.
    pub async fn add_employer(&self, employer: &NewEmployer) -> ActionOutcome {
        self.begin().await;
        let result = self.api.add_employer(employer).await;
        self.settle("add_employer", None, result, false, |_, _| {})
            .await
    }

    /// Shallow-merges the edited profile fields into the session principal;
    /// fields absent from the response survive.
    pub async fn edit_employer(&self, patch: &EmployerPatch) -> ActionOutcome {
        self.begin().await;
        let result = self.api.edit_employer(patch).await;
        self.settle(
            "edit_employer",
            None,
            result,
            false,
            |state, patch: Option<EmployerPatch>| {
                let Some(patch) = patch else { return };
                if let Some(user) = state.user.as_mut() {
                    patch.apply_to(user);
                }
            },
        )
        .await
    }

    /// Replaces the cached employee list wholesale. Quiet on success.
    pub async fn get_employees(&self) -> ActionOutcome {
        self.begin().await;
        let result = self.api.get_employees().await;
        self.settle("get_employees", None, result, true, |state, employees| {
            if let Some(employees) = employees {
                state.employees = employees;
            }
        })
        .await
    }

    pub async fn add_employee(&self, employee: &NewEmployee) -> ActionOutcome {
        self.begin().await;
        let result = self.api.add_employee(employee).await;
        self.settle("add_employee", None, result, false, |state, employee| {
            if let Some(employee) = employee {
                state.employees.insert(0, employee);
            }
        })
        .await
    }

    /// Replaces the matching employee with the server's updated record; the
    /// rest of the list keeps its order.
    pub async fn assign_employee(
        &self,
        assignment: &EmployeeAssignment,
        employee_id: &EmployeeId,
    ) -> ActionOutcome {
        self.begin().await;
        let result = self.api.assign_employee(assignment, employee_id).await;
        let target = employee_id.clone();
        self.settle(
            "assign_employee",
            None,
            result,
            false,
            move |state, updated: Option<Employee>| {
                let Some(updated) = updated else { return };
                for employee in state.employees.iter_mut() {
                    if employee.id == target {
                        *employee = updated.clone();
                    }
                }
            },
        )
        .await
    }

    pub async fn update_employee_status(
        &self,
        is_active: bool,
        employee_id: &EmployeeId,
    ) -> ActionOutcome {
        self.begin().await;
        let result = self
            .api
            .update_employee_status(is_active, employee_id)
            .await;
        let target = employee_id.clone();
        self.settle(
            "update_employee_status",
            None,
            result,
            false,
            move |state, updated: Option<Employee>| {
                let Some(updated) = updated else { return };
                for employee in state.employees.iter_mut() {
                    if employee.id == target {
                        *employee = updated.clone();
                    }
                }
            },
        )
        .await
    }

    pub async fn delete_employee(&self, employee_id: &EmployeeId) -> ActionOutcome {
        self.begin().await;
        let result = self.api.delete_employee(employee_id).await;
        let target = employee_id.clone();
        self.settle(
            "delete_employee",
            None,
            result,
            false,
            move |state, _: Option<()>| {
                state.employees.retain(|employee| employee.id != target);
            },
        )
        .await
    }

    /// Replaces the cached bank-account list wholesale. Quiet on success.
    pub async fn get_bank_accounts(&self, employer_id: &EmployerId) -> ActionOutcome {
        self.begin().await;
        let result = self.api.get_bank_accounts(employer_id).await;
        self.settle(
            "get_bank_accounts",
            None,
            result,
            true,
            |state, accounts| {
                if let Some(accounts) = accounts {
                    state.bank_accounts = accounts;
                }
            },
        )
        .await
    }

    pub async fn add_bank_account(&self, account: &NewBankAccount) -> ActionOutcome {
        self.begin().await;
        let result = self.api.add_bank_account(account).await;
        self.settle("add_bank_account", None, result, false, |state, account| {
            if let Some(account) = account {
                state.bank_accounts.insert(0, account);
            }
        })
        .await
    }

    pub async fn delete_bank_account(&self, account_id: &AccountId) -> ActionOutcome {
        self.begin().await;
        let result = self.api.delete_bank_account(account_id).await;
        let target = account_id.clone();
        self.settle(
            "delete_bank_account",
            None,
            result,
            false,
            move |state, _: Option<()>| {
                state.bank_accounts.retain(|account| account.id != target);
            },
        )
        .await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    pub async fn is_employer(&self) -> bool {
        self.state.read().await.is_employer
    }

    pub async fn user(&self) -> Option<Employer> {
        self.state.read().await.user.clone()
    }

    pub async fn access(&self) -> AccessMap {
        self.state.read().await.access.clone()
    }

    pub async fn errors(&self) -> FieldErrorMap {
        self.state.read().await.errors.clone()
    }

    pub async fn employees(&self) -> Vec<Employee> {
        self.state.read().await.employees.clone()
    }

    pub async fn bank_accounts(&self) -> Vec<BankAccount> {
        self.state.read().await.bank_accounts.clone()
    }

    async fn begin(&self) {
        self.set_state(|state| state.is_loading = true).await;
    }

    /// Settles one dispatched request: reconciles the envelope into state,
    /// clears the loading flag on every path, and reports the outcome
    /// through the notification policy exactly once.
    async fn settle<T>(
        &self,
        op: &'static str,
        title: Option<&str>,
        result: Result<ApiResponse<T>>,
        failures_only: bool,
        reconcile: impl FnOnce(&mut UserState, Option<T>),
    ) -> ActionOutcome {
        let Settled {
            outcome,
            data,
            field_errors,
        } = settle_response(op, result);
        let succeeded = outcome.succeeded();
        self.set_state(|state| {
            if succeeded {
                reconcile(state, data);
            } else if let Some(errors) = field_errors {
                state.errors.set_all(errors);
            }
            state.is_loading = false;
        })
        .await;
        notify_outcome(self.notifier.as_ref(), title, &outcome, failures_only);
        outcome
    }

    /// Applies a mutation and mirrors the persisted subset back to the
    /// session medium, so every settled write survives a reload.
    async fn set_state(&self, apply: impl FnOnce(&mut UserState)) {
        let snapshot = {
            let mut state = self.state.write().await;
            apply(&mut state);
            state.snapshot()
        };
        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("session: failed to encode user snapshot: {err}");
                return;
            }
        };
        if let Err(err) = self.session.put(USER_STATE_KEY, &raw).await {
            warn!("session: failed to persist user snapshot: {err}");
        }
    }
}

async fn rehydrate(session: &dyn SessionStore) -> Result<Option<UserSnapshot>, SnapshotError> {
    let Some(raw) = session.get(USER_STATE_KEY).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
