//! Client-side state synchronization core for the retail admin dashboard.
//!
//! Two store instances cache server-owned entities for the UI: [`UserStore`]
//! (session principal, employees, bank accounts) and [`ProductStore`]
//! (paginated product list). Every write goes through an injected backend
//! operation; the response envelope is reconciled into the cache by id,
//! validation failures land in a field-error map, and each settled action is
//! reported through the notification sink exactly once.
//!
//! Stores are explicit instances shared via `Arc`; construct one per test
//! with in-memory collaborators, or wire the durable adapters in
//! [`session`] for a real client. Reads are snapshot getters; overlapping
//! actions are not coordinated, so the last one to settle wins on any field
//! both touch.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use shared::{
    domain::{
        AccountId, BankAccount, Employee, EmployeeId, Employer, EmployerId, Product, ProductId,
        ProductList,
    },
    protocol::{
        ApiResponse, Credentials, EmployeeAssignment, EmployerPatch, GalleryUpdate, NewBankAccount,
        NewEmployee, NewEmployer, NewProduct, ProductDetail, ProductListing, ProductPrice,
        ResetPassword, SearchParams,
    },
};

pub mod access;
pub mod error;
pub mod notification;
pub mod outcome;
pub mod product_store;
pub mod session;
pub mod user_store;

pub use outcome::ActionOutcome;
pub use product_store::ProductStore;
pub use user_store::UserStore;

/// Backend operations for the user/employer domain. One method per store
/// action; every method resolves to the uniform envelope, and an `Err` is a
/// transport-level fault that never carries response data.
#[async_trait]
pub trait UserApi: Send + Sync {
    async fn login(
        &self,
        credentials: &Credentials,
        as_employer: bool,
    ) -> Result<ApiResponse<Employer>>;
    async fn request_otp(&self, email: &str) -> Result<ApiResponse<()>>;
    async fn verify_employer(&self, email: &str, otp: &str) -> Result<ApiResponse<()>>;
    async fn reset_password(
        &self,
        reset: &ResetPassword,
        as_employer: bool,
    ) -> Result<ApiResponse<()>>;
    async fn add_employer(&self, employer: &NewEmployer) -> Result<ApiResponse<()>>;
    async fn edit_employer(&self, patch: &EmployerPatch) -> Result<ApiResponse<EmployerPatch>>;
    async fn get_employees(&self) -> Result<ApiResponse<Vec<Employee>>>;
    async fn add_employee(&self, employee: &NewEmployee) -> Result<ApiResponse<Employee>>;
    async fn assign_employee(
        &self,
        assignment: &EmployeeAssignment,
        employee_id: &EmployeeId,
    ) -> Result<ApiResponse<Employee>>;
    async fn update_employee_status(
        &self,
        is_active: bool,
        employee_id: &EmployeeId,
    ) -> Result<ApiResponse<Employee>>;
    async fn delete_employee(&self, employee_id: &EmployeeId) -> Result<ApiResponse<()>>;
    async fn get_bank_accounts(
        &self,
        employer_id: &EmployerId,
    ) -> Result<ApiResponse<Vec<BankAccount>>>;
    async fn add_bank_account(&self, account: &NewBankAccount)
        -> Result<ApiResponse<BankAccount>>;
    async fn delete_bank_account(&self, account_id: &AccountId) -> Result<ApiResponse<()>>;
}

/// Backend operations for the product domain.
#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn get_products(
        &self,
        owner_id: &EmployerId,
        params: &SearchParams,
    ) -> Result<ApiResponse<ProductList>>;
    async fn add_product(&self, product: &NewProduct) -> Result<ApiResponse<Product>>;
    async fn update_product_detail(
        &self,
        detail: &ProductDetail,
        product_id: &ProductId,
    ) -> Result<ApiResponse<Product>>;
    async fn update_product_price(
        &self,
        price: &ProductPrice,
        product_id: &ProductId,
    ) -> Result<ApiResponse<Product>>;
    async fn update_product_listing(
        &self,
        listing: &ProductListing,
        product_id: &ProductId,
    ) -> Result<ApiResponse<Product>>;
    async fn update_gallery(
        &self,
        gallery: &GalleryUpdate,
        product_id: &ProductId,
    ) -> Result<ApiResponse<Product>>;
}

/// Session-scoped key-value medium backing the persisted store snapshots.
/// It exists to survive a client restart within one session; the server
/// stays the source of truth.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-wide location for the bearer token, shared by every outbound
/// request layer and deliberately outside the per-store snapshots.
#[async_trait]
pub trait TokenVault: Send + Sync {
    async fn save(&self, token: &str) -> Result<()>;
    async fn load(&self) -> Result<Option<String>>;
    async fn clear(&self) -> Result<()>;
}

/// In-memory session medium; state lives for the process only.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// In-memory token slot; lost when the process exits.
#[derive(Default)]
pub struct MemoryTokenVault {
    token: RwLock<Option<String>>,
}

impl MemoryTokenVault {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenVault for MemoryTokenVault {
    async fn save(&self, token: &str) -> Result<()> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
