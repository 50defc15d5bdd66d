use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use shared::{
    domain::{EmployerId, Product, ProductId, ProductList},
    error::FieldErrorMap,
    protocol::{
        ApiResponse, GalleryUpdate, NewProduct, ProductDetail, ProductListing, ProductPrice,
        SearchParams,
    },
};

use crate::{
    error::SnapshotError,
    notification::{BroadcastNotifier, NotificationSink},
    outcome::{notify_outcome, settle_response, ActionOutcome, Settled},
    MemorySessionStore, ProductApi, SessionStore,
};

/// Session-storage key for the persisted product snapshot.
pub const PRODUCT_STATE_KEY: &str = "productstate";

#[derive(Debug, Clone, Default)]
struct ProductState {
    is_loading: bool,
    errors: FieldErrorMap,
    product_list: ProductList,
}

/// Persisted subset of the state; the loading flag and the error map stay
/// transient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductSnapshot {
    product_list: ProductList,
}

impl ProductState {
    fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_list: self.product_list.clone(),
        }
    }

    fn restore(snapshot: ProductSnapshot) -> Self {
        Self {
            is_loading: false,
            errors: FieldErrorMap::new(),
            product_list: snapshot.product_list,
        }
    }
}

/// Cache of the owner's paginated product list.
pub struct ProductStore {
    api: Arc<dyn ProductApi>,
    notifier: Arc<dyn NotificationSink>,
    session: Arc<dyn SessionStore>,
    state: RwLock<ProductState>,
}

impl ProductStore {
    pub async fn new(api: Arc<dyn ProductApi>) -> Arc<Self> {
        Self::new_with_dependencies(
            api,
            Arc::new(BroadcastNotifier::default()),
            Arc::new(MemorySessionStore::new()),
        )
        .await
    }

    /// Builds the store and rehydrates the persisted snapshot, if any. An
    /// unreadable snapshot is discarded and evicted.
    pub async fn new_with_dependencies(
        api: Arc<dyn ProductApi>,
        notifier: Arc<dyn NotificationSink>,
        session: Arc<dyn SessionStore>,
    ) -> Arc<Self> {
        let state = match rehydrate(session.as_ref()).await {
            Ok(Some(snapshot)) => ProductState::restore(snapshot),
            Ok(None) => ProductState::default(),
            Err(err) => {
                warn!("session: discarding unreadable product snapshot: {err}");
                if let Err(err) = session.remove(PRODUCT_STATE_KEY).await {
                    warn!("session: failed to evict unreadable product snapshot: {err}");
                }
                ProductState::default()
            }
        };
        Arc::new(Self {
            api,
            notifier,
            session,
            state: RwLock::new(state),
        })
    }

    /// Restores the initial empty state and evicts the persisted snapshot.
    /// Idempotent; no network call.
    pub async fn reset(&self) {
        {
            let mut state = self.state.write().await;
            *state = ProductState::default();
        }
        if let Err(err) = self.session.remove(PRODUCT_STATE_KEY).await {
            warn!("session: failed to evict product snapshot: {err}");
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

    /// Fetches one page of the owner's products, replacing the cached list
    /// wholesale, pagination counters included. Quiet on success.
    pub async fn get_products(&self, owner_id: &EmployerId, params: &SearchParams) -> ActionOutcome {
        self.begin().await;
        let result = self.api.get_products(owner_id, params).await;
        self.settle("get_products", result, true, |state, list| {
            if let Some(list) = list {
                state.product_list = list;
            }
        })
        .await
    }

    /// Prepends the created product and bumps the total count by one.
    pub async fn add_product(&self, product: &NewProduct) -> ActionOutcome {
        self.begin().await;
        let result = self.api.add_product(product).await;
        self.settle("add_product", result, false, |state, product| {
            if let Some(product) = product {
                state.product_list.items.insert(0, product);
                state.product_list.total_item += 1;
            }
        })
        .await
    }

    pub async fn update_product_detail(
        &self,
        detail: &ProductDetail,
        product_id: &ProductId,
    ) -> ActionOutcome {
        self.begin().await;
        let result = self.api.update_product_detail(detail, product_id).await;
        self.upsert("update_product_detail", product_id, result).await
    }

    pub async fn update_product_price(
        &self,
        price: &ProductPrice,
        product_id: &ProductId,
    ) -> ActionOutcome {
        self.begin().await;
        let result = self.api.update_product_price(price, product_id).await;
        self.upsert("update_product_price", product_id, result).await
    }

    pub async fn update_product_listing(
        &self,
        listing: &ProductListing,
        product_id: &ProductId,
    ) -> ActionOutcome {
        self.begin().await;
        let result = self.api.update_product_listing(listing, product_id).await;
        self.upsert("update_product_listing", product_id, result)
            .await
    }

    pub async fn update_gallery(
        &self,
        gallery: &GalleryUpdate,
        product_id: &ProductId,
    ) -> ActionOutcome {
        self.begin().await;
        let result = self.api.update_gallery(gallery, product_id).await;
        self.upsert("update_gallery", product_id, result).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    pub async fn errors(&self) -> FieldErrorMap {
        self.state.read().await.errors.clone()
    }

    pub async fn product_list(&self) -> ProductList {
        self.state.read().await.product_list.clone()
    }

    async fn begin(&self) {
        self.set_state(|state| state.is_loading = true).await;
    }

    /// Replaces the matching product with the server's updated record,
    /// preserving item order and pagination counters. An unknown id changes
    /// nothing; there is no implicit insert.
    async fn upsert(
        &self,
        op: &'static str,
        product_id: &ProductId,
        result: Result<ApiResponse<Product>>,
    ) -> ActionOutcome {
        let target = product_id.clone();
        self.settle(op, result, false, move |state, updated| {
            let Some(updated) = updated else { return };
            for product in state.product_list.items.iter_mut() {
                if product.id == target {
                    *product = updated.clone();
                }
            }
        })
        .await
    }

    /// Settles one dispatched request: reconciles the envelope into state,
    /// clears the loading flag on every path, and reports the outcome
    /// through the notification policy exactly once.
    async fn settle<T>(
        &self,
        op: &'static str,
        result: Result<ApiResponse<T>>,
        failures_only: bool,
        reconcile: impl FnOnce(&mut ProductState, Option<T>),
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
        notify_outcome(self.notifier.as_ref(), None, &outcome, failures_only);
        outcome
    }

    /// Applies a mutation and mirrors the persisted subset back to the
    /// session medium.
    async fn set_state(&self, apply: impl FnOnce(&mut ProductState)) {
        let snapshot = {
            let mut state = self.state.write().await;
            apply(&mut state);
            state.snapshot()
        };
        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("session: failed to encode product snapshot: {err}");
                return;
            }
        };
        if let Err(err) = self.session.put(PRODUCT_STATE_KEY, &raw).await {
            warn!("session: failed to persist product snapshot: {err}");
        }
    }
}

async fn rehydrate(session: &dyn SessionStore) -> Result<Option<ProductSnapshot>, SnapshotError> {
    let Some(raw) = session.get(PRODUCT_STATE_KEY).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
