use std::{collections::VecDeque, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{oneshot, Mutex};

use shared::{
    domain::{
        AccountId, BankAccount, Employee, EmployeeId, Employer, EmployerId, Product, ProductId,
        ProductList, Role, StoreId,
    },
    protocol::{
        ApiResponse, Credentials, EmployeeAssignment, EmployerPatch, GalleryUpdate, NewBankAccount,
        NewEmployee, NewEmployer, NewProduct, ProductDetail, ProductListing, ProductPrice,
        ResetPassword, SearchParams,
    },
};

use crate::{
    notification::{Notification, NotificationSink},
    ProductApi, UserApi,
};

enum ScriptStep {
    Respond(String),
    Fault(String),
    Gated(oneshot::Receiver<()>, String),
}

/// Scripted backend: every call pops the next queued step. Responses are
/// stored JSON-encoded so one queue serves every operation's payload type,
/// which also exercises the envelope's wire format on each test.
#[derive(Default)]
pub struct ScriptedApi {
    steps: Mutex<VecDeque<ScriptStep>>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn push<T: Serialize>(&self, response: ApiResponse<T>) {
        let raw = serde_json::to_string(&response).expect("scripted response encodes");
        self.steps.lock().await.push_back(ScriptStep::Respond(raw));
    }

    pub async fn push_fault(&self, message: &str) {
        self.steps
            .lock()
            .await
            .push_back(ScriptStep::Fault(message.to_string()));
    }

    /// Queues a response held until the returned sender fires, keeping the
    /// action observably in flight.
    pub async fn push_gated<T: Serialize>(&self, response: ApiResponse<T>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        let raw = serde_json::to_string(&response).expect("scripted response encodes");
        self.steps
            .lock()
            .await
            .push_back(ScriptStep::Gated(rx, raw));
        tx
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().await.clone()
    }

    async fn next<T: DeserializeOwned>(&self, op: &'static str) -> Result<ApiResponse<T>> {
        self.calls.lock().await.push(op);
        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response for {op}"));
        let raw = match step {
            ScriptStep::Respond(raw) => raw,
            ScriptStep::Fault(message) => return Err(anyhow!(message)),
            ScriptStep::Gated(gate, raw) => {
                let _ = gate.await;
                raw
            }
        };
        Ok(serde_json::from_str(&raw).expect("scripted response decodes"))
    }
}

#[async_trait]
impl UserApi for ScriptedApi {
    async fn login(
        &self,
        _credentials: &Credentials,
        _as_employer: bool,
    ) -> Result<ApiResponse<Employer>> {
        self.next("login").await
    }

    async fn request_otp(&self, _email: &str) -> Result<ApiResponse<()>> {
        self.next("request_otp").await
    }

    async fn verify_employer(&self, _email: &str, _otp: &str) -> Result<ApiResponse<()>> {
        self.next("verify_employer").await
    }

    async fn reset_password(
        &self,
        _reset: &ResetPassword,
        _as_employer: bool,
    ) -> Result<ApiResponse<()>> {
        self.next("reset_password").await
    }

    async fn add_employer(&self, _employer: &NewEmployer) -> Result<ApiResponse<()>> {
        self.next("add_employer").await
    }

    async fn edit_employer(&self, _patch: &EmployerPatch) -> Result<ApiResponse<EmployerPatch>> {
        self.next("edit_employer").await
    }

    async fn get_employees(&self) -> Result<ApiResponse<Vec<Employee>>> {
        self.next("get_employees").await
    }

    async fn add_employee(&self, _employee: &NewEmployee) -> Result<ApiResponse<Employee>> {
        self.next("add_employee").await
    }

    async fn assign_employee(
        &self,
        _assignment: &EmployeeAssignment,
        _employee_id: &EmployeeId,
    ) -> Result<ApiResponse<Employee>> {
        self.next("assign_employee").await
    }

    async fn update_employee_status(
        &self,
        _is_active: bool,
        _employee_id: &EmployeeId,
    ) -> Result<ApiResponse<Employee>> {
        self.next("update_employee_status").await
    }

    async fn delete_employee(&self, _employee_id: &EmployeeId) -> Result<ApiResponse<()>> {
        self.next("delete_employee").await
    }

    async fn get_bank_accounts(
        &self,
        _employer_id: &EmployerId,
    ) -> Result<ApiResponse<Vec<BankAccount>>> {
        self.next("get_bank_accounts").await
    }

    async fn add_bank_account(
        &self,
        _account: &NewBankAccount,
    ) -> Result<ApiResponse<BankAccount>> {
        self.next("add_bank_account").await
    }

    async fn delete_bank_account(&self, _account_id: &AccountId) -> Result<ApiResponse<()>> {
        self.next("delete_bank_account").await
    }
}

#[async_trait]
impl ProductApi for ScriptedApi {
    async fn get_products(
        &self,
        _owner_id: &EmployerId,
        _params: &SearchParams,
    ) -> Result<ApiResponse<ProductList>> {
        self.next("get_products").await
    }

    async fn add_product(&self, _product: &NewProduct) -> Result<ApiResponse<Product>> {
        self.next("add_product").await
    }

    async fn update_product_detail(
        &self,
        _detail: &ProductDetail,
        _product_id: &ProductId,
    ) -> Result<ApiResponse<Product>> {
        self.next("update_product_detail").await
    }

    async fn update_product_price(
        &self,
        _price: &ProductPrice,
        _product_id: &ProductId,
    ) -> Result<ApiResponse<Product>> {
        self.next("update_product_price").await
    }

    async fn update_product_listing(
        &self,
        _listing: &ProductListing,
        _product_id: &ProductId,
    ) -> Result<ApiResponse<Product>> {
        self.next("update_product_listing").await
    }

    async fn update_gallery(
        &self,
        _gallery: &GalleryUpdate,
        _product_id: &ProductId,
    ) -> Result<ApiResponse<Product>> {
        self.next("update_gallery").await
    }
}

/// Sink that records every published notification for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notes: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notes(&self) -> Vec<Notification> {
        self.notes.lock().expect("notes lock").clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn publish(&self, notification: Notification) {
        self.notes.lock().expect("notes lock").push(notification);
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        email: "owner@example.com".into(),
        password: "hunter2".into(),
    }
}

pub fn employer(roles: Vec<Role>, token: Option<&str>) -> Employer {
    Employer {
        id: EmployerId::new("emp-1"),
        business_name: "Acme Stores".into(),
        email: "owner@example.com".into(),
        phone_number: "0700000000".into(),
        address: Some("12 Market Road".into()),
        is_verified: true,
        roles,
        token: token.map(str::to_string),
    }
}

pub fn employee(id: &str) -> Employee {
    Employee {
        id: EmployeeId::new(id),
        first_name: "Ada".into(),
        last_name: "Okoro".into(),
        email: format!("{id}@example.com"),
        phone_number: "0700000001".into(),
        roles: vec![Role::Cashier],
        stores: vec![StoreId::new("s1")],
        is_active: true,
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 14, 9, 30, 0)
            .single()
            .expect("timestamp"),
    }
}

pub fn new_employee() -> NewEmployee {
    NewEmployee {
        first_name: "Ada".into(),
        last_name: "Okoro".into(),
        email: "ada@example.com".into(),
        phone_number: "0700000001".into(),
    }
}

pub fn bank_account(id: &str, name: &str) -> BankAccount {
    BankAccount {
        id: AccountId::new(id),
        account_name: name.into(),
        account_number: "0123456789".into(),
        bank: "Acme Bank".into(),
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 14, 9, 30, 0)
            .single()
            .expect("timestamp"),
    }
}

pub fn product(id: &str, name: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.into(),
        description: "A reliable item".into(),
        category: "general".into(),
        cost_price: 400.0,
        selling_price: 550.0,
        quantity: 20,
        is_listed: true,
        images: Vec::new(),
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 14, 9, 30, 0)
            .single()
            .expect("timestamp"),
    }
}

pub fn product_list(items: Vec<Product>) -> ProductList {
    let total_item = items.len() as u64;
    ProductList {
        items,
        current_page: 1,
        total_item,
        total_page: 1,
    }
}
