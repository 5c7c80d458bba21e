//! In-memory product catalog kept in step with the remote gateway.
//!
//! [`CatalogStore`] exclusively owns the product list, the selected product
//! and the loading flag. The presentation layer only reads them, either as
//! snapshots or through `watch` receivers, and calls the operations below.
//!
//! Backend reads and local removals draw tickets from one counter. A full
//! list snapshot is dropped only when a newer snapshot has already been
//! applied. Otherwise it is applied and then merged with whatever happened
//! after it was requested: records reloaded later are spliced back in and
//! products deleted later are removed again.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::domain::product::{ImageUpload, NewProduct, Product, ProductPatch};
use crate::domain::types::{ImageUrl, ProductId};
use crate::forms::products::{
    AddProductForm, AddProductFormPayload, EditProductForm, EditProductFormPayload,
};
use crate::repository::{ImageUploader, ProductReader, ProductWriter, RepositoryError};
use crate::services::search::{SearchScope, search_products};
use crate::services::{CatalogError, CatalogResult};

pub const PRODUCT_ADDED: &str = "Product added";
pub const PRODUCT_UPDATED: &str = "Product updated";
pub const PRODUCT_DELETED: &str = "Product deleted";

#[derive(Default)]
struct Sequencing {
    last_ticket: u64,
    /// Ticket of the last full list snapshot applied.
    snapshot: u64,
    /// Tickets of backend reads not yet finished.
    pending_reads: BTreeSet<u64>,
    /// Products removed locally. `None` while the backend delete is still
    /// running, then the ticket issued once it settled.
    removed: HashMap<ProductId, Option<u64>>,
    /// Single records written into the list, with the ticket they were read at.
    reloaded: HashMap<ProductId, (u64, Product)>,
    /// Operations currently waiting on the gateway.
    in_flight: usize,
}

impl Sequencing {
    fn issue(&mut self) -> u64 {
        self.last_ticket += 1;
        self.last_ticket
    }

    /// Forget merge records that no pending read predates.
    fn prune(&mut self) {
        let oldest = self.pending_reads.first().copied();
        let needed = |ticket: u64| oldest.is_some_and(|oldest| oldest < ticket);
        self.removed.retain(|_, ticket| ticket.is_none_or(needed));
        self.reloaded.retain(|_, (ticket, _)| needed(*ticket));
    }

    fn removed_after(&self, id: &ProductId, ticket: u64) -> bool {
        self.removed
            .get(id)
            .is_some_and(|removed| removed.is_none_or(|removed| removed > ticket))
    }
}

fn lock(sequencing: &Mutex<Sequencing>) -> MutexGuard<'_, Sequencing> {
    sequencing.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps `loading` true while at least one operation is in flight.
struct LoadingGuard<'a> {
    sequencing: &'a Mutex<Sequencing>,
    loading: &'a watch::Sender<bool>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut sequencing = lock(self.sequencing);
        sequencing.in_flight = sequencing.in_flight.saturating_sub(1);
        if sequencing.in_flight == 0 {
            self.loading.send_replace(false);
        }
    }
}

/// A backend read in progress. Dropping it releases the merge records kept
/// for its sake.
struct PendingRead<'a> {
    sequencing: &'a Mutex<Sequencing>,
    ticket: u64,
}

impl Drop for PendingRead<'_> {
    fn drop(&mut self) {
        let mut sequencing = lock(self.sequencing);
        sequencing.pending_reads.remove(&self.ticket);
        sequencing.prune();
    }
}

/// Catalog state manager for one UI session.
pub struct CatalogStore<R> {
    repo: R,
    products: watch::Sender<Vec<Product>>,
    selected: watch::Sender<Option<Product>>,
    loading: watch::Sender<bool>,
    sequencing: Mutex<Sequencing>,
}

impl<R> CatalogStore<R>
where
    R: ProductReader + ProductWriter + ImageUploader,
{
    /// Create an empty store. Nothing is fetched until [`Self::refresh`].
    pub fn new(repo: R) -> Self {
        let (products, _) = watch::channel(Vec::new());
        let (selected, _) = watch::channel(None);
        let (loading, _) = watch::channel(false);
        Self {
            repo,
            products,
            selected,
            loading,
            sequencing: Mutex::new(Sequencing::default()),
        }
    }

    /// Create a store and load the initial product list.
    ///
    /// A failed initial load is logged and leaves the list empty.
    pub async fn open(repo: R) -> Self {
        let store = Self::new(repo);
        if let Err(e) = store.refresh().await {
            log::warn!("Initial product load failed: {e}");
        }
        store
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Snapshot of the product list in backend order.
    pub fn products(&self) -> Vec<Product> {
        self.products.borrow().clone()
    }

    pub fn selected(&self) -> Option<Product> {
        self.selected.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_products(&self) -> watch::Receiver<Vec<Product>> {
        self.products.subscribe()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Product>> {
        self.selected.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Products matching `query` within `scope`; see [`search_products`].
    pub fn search(&self, query: &str, scope: SearchScope) -> Vec<Product> {
        search_products(&self.products.borrow(), query, scope)
    }

    /// Products ordered newest first. The stored list keeps backend order.
    pub fn sorted_by_created_at(&self) -> Vec<Product> {
        let mut products = self.products();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products
    }

    /// Replace the product list with the backend snapshot.
    ///
    /// A failed fetch clears the list. Returns the number of products fetched.
    pub async fn refresh(&self) -> CatalogResult<usize> {
        let _loading = self.begin_loading();
        let read = self.begin_read();

        match self.repo.list_products().await {
            Ok(products) => {
                let count = products.len();
                if self.apply_snapshot(read.ticket, products) {
                    log::info!("Fetched {count} products");
                } else {
                    log::debug!("Discarded stale product list (request {})", read.ticket);
                }
                Ok(count)
            }
            Err(e) => {
                log::error!("Error getting products: {e}");
                self.clear_on_failure(read.ticket);
                Err(e.into())
            }
        }
    }

    /// Create a product, then refresh so the list carries the assigned id.
    pub async fn add(&self, draft: NewProduct) -> CatalogResult<ProductId> {
        let _loading = self.begin_loading();

        let id = self.repo.create_product(&draft).await.map_err(|e| {
            log::error!("Failed to create product: {e}");
            CatalogError::from(e)
        })?;
        log::info!("Created product {id}");

        if let Err(e) = self.refresh().await {
            log::warn!("Product {id} was created but the list could not be refreshed: {e}");
        }
        Ok(id)
    }

    /// Merge `patch` into the product, then reload that single record and
    /// splice it into the list.
    pub async fn update(&self, id: &ProductId, patch: ProductPatch) -> CatalogResult<()> {
        let _loading = self.begin_loading();

        if let Err(e) = self.repo.update_product(id, &patch).await {
            log::error!("Failed to update product {id}: {e}");
            return Err(e.into());
        }

        let read = self.begin_read();
        match self.repo.get_product_by_id(id).await {
            Ok(Some(product)) => {
                if self.apply_record(read.ticket, &product) {
                    self.replace_selected(&product);
                } else {
                    log::debug!("Discarded stale reload of product {id}");
                }
                log::info!("Updated product {id}");
                Ok(())
            }
            Ok(None) => {
                log::warn!("Product {id} vanished right after being updated");
                self.remove_local(id);
                self.settle_removal(id);
                self.clear_selected(id);
                Err(CatalogError::NotFound(id.clone()))
            }
            Err(e) => {
                // The write went through; fall back to patching the local copy.
                log::warn!("Product {id} was updated but could not be reloaded: {e}");
                if let Some(product) = self.patch_local(id, &patch) {
                    self.replace_selected(&product);
                }
                Ok(())
            }
        }
    }

    /// Remove a product.
    ///
    /// The entry disappears from the list immediately. If the backend then
    /// fails for any reason other than the product being gone already, the
    /// entry is put back where it was.
    pub async fn delete(&self, id: &ProductId) -> CatalogResult<()> {
        let _loading = self.begin_loading();

        let removed = self.remove_local(id);

        match self.repo.delete_product(id).await {
            Ok(()) => {
                log::info!("Deleted product {id}");
                self.settle_removal(id);
                self.clear_selected(id);
                Ok(())
            }
            Err(RepositoryError::NotFound(_)) => {
                log::warn!("Product {id} was already deleted");
                self.settle_removal(id);
                self.clear_selected(id);
                Err(CatalogError::NotFound(id.clone()))
            }
            Err(e) => {
                log::error!("Failed to delete product {id}: {e}");
                self.restore_local(id, removed);
                Err(e.into())
            }
        }
    }

    /// Fetch one product into the `selected` slot.
    ///
    /// An absent product or a failed fetch both leave the slot empty.
    pub async fn load_product(&self, id: &ProductId) -> CatalogResult<Option<Product>> {
        let _loading = self.begin_loading();

        match self.repo.get_product_by_id(id).await {
            Ok(product) => {
                self.selected.send_replace(product.clone());
                Ok(product)
            }
            Err(e) => {
                log::error!("Error getting product {id}: {e}");
                self.selected.send_replace(None);
                Err(e.into())
            }
        }
    }

    /// Upload the image, then create the product with it attached.
    ///
    /// The draft gets a client-side id when it has none, so the record can be
    /// addressed even if the final refresh fails. Not atomic: a create failure
    /// after a successful upload is reported as
    /// [`CatalogError::PartialWorkflowFailure`] naming the orphaned image.
    pub async fn upload_image_then_create(
        &self,
        image: ImageUpload,
        draft: NewProduct,
    ) -> CatalogResult<ProductId> {
        let _loading = self.begin_loading();

        let url = self.upload(&image).await?;
        let mut draft = draft.with_image(url.clone());
        if draft.id.is_none() {
            draft.id = Some(ProductId::generate());
        }

        self.add(draft)
            .await
            .map_err(|source| orphaned_image(url, source))
    }

    /// Upload a replacement image, then update the product to point at it.
    pub async fn upload_image_then_update(
        &self,
        image: ImageUpload,
        id: &ProductId,
        patch: ProductPatch,
    ) -> CatalogResult<()> {
        let _loading = self.begin_loading();

        let url = self.upload(&image).await?;
        self.update(id, patch.image(Some(url.clone())))
            .await
            .map_err(|source| orphaned_image(url, source))
    }

    /// Validate an add-product form and create the product with its image.
    pub async fn submit_new_product(
        &self,
        form: AddProductForm,
        image: ImageUpload,
    ) -> CatalogResult<ProductId> {
        let payload = AddProductFormPayload::try_from(form)?;
        self.upload_image_then_create(image, payload.into_new_product())
            .await
    }

    /// Validate an edit-product form and apply it, uploading a new image
    /// first when one was picked.
    pub async fn submit_product_edit(
        &self,
        form: EditProductForm,
        image: Option<ImageUpload>,
    ) -> CatalogResult<()> {
        let (id, patch) = EditProductFormPayload::try_from(form)?.into_patch();
        match image {
            Some(image) => self.upload_image_then_update(image, &id, patch).await,
            None => self.update(&id, patch).await,
        }
    }

    async fn upload(&self, image: &ImageUpload) -> CatalogResult<ImageUrl> {
        match self.repo.upload_image(image).await {
            Ok(url) => {
                log::debug!("Uploaded image to {url}");
                Ok(url)
            }
            Err(e) => {
                log::error!("Failed to upload image: {e}");
                Err(CatalogError::UploadFailed(e.to_string()))
            }
        }
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        let mut sequencing = lock(&self.sequencing);
        sequencing.in_flight += 1;
        self.loading.send_replace(true);
        LoadingGuard {
            sequencing: &self.sequencing,
            loading: &self.loading,
        }
    }

    fn begin_read(&self) -> PendingRead<'_> {
        let mut sequencing = lock(&self.sequencing);
        let ticket = sequencing.issue();
        sequencing.pending_reads.insert(ticket);
        PendingRead {
            sequencing: &self.sequencing,
            ticket,
        }
    }

    /// Apply a full list fetched at `ticket`, merged with later local
    /// changes. Returns false when a newer snapshot was applied already.
    fn apply_snapshot(&self, ticket: u64, mut products: Vec<Product>) -> bool {
        let mut sequencing = lock(&self.sequencing);
        if ticket < sequencing.snapshot {
            return false;
        }
        sequencing.snapshot = ticket;

        for (reloaded_at, product) in sequencing.reloaded.values() {
            if *reloaded_at > ticket {
                splice(&mut products, product.clone());
            }
        }
        products.retain(|p| !sequencing.removed_after(&p.id, ticket));
        self.products.send_replace(products);
        true
    }

    fn clear_on_failure(&self, ticket: u64) {
        let mut sequencing = lock(&self.sequencing);
        if ticket >= sequencing.snapshot {
            sequencing.snapshot = ticket;
            self.products.send_replace(Vec::new());
        }
    }

    /// Splice a single record read at `ticket` into the list. Skipped when
    /// something newer about that same record is known: a later snapshot, a
    /// later reload or a later delete.
    fn apply_record(&self, ticket: u64, product: &Product) -> bool {
        let mut sequencing = lock(&self.sequencing);
        let newer_reload = sequencing
            .reloaded
            .get(&product.id)
            .is_some_and(|(reloaded_at, _)| *reloaded_at > ticket);
        if ticket < sequencing.snapshot
            || newer_reload
            || sequencing.removed_after(&product.id, ticket)
        {
            return false;
        }
        self.record_local(&mut sequencing, ticket, product.clone());
        true
    }

    /// Apply `patch` to the listed copy of `id`, if any.
    fn patch_local(&self, id: &ProductId, patch: &ProductPatch) -> Option<Product> {
        let mut sequencing = lock(&self.sequencing);
        let mut product = self.products.borrow().iter().find(|p| &p.id == id).cloned()?;
        patch.apply(&mut product);
        let ticket = sequencing.issue();
        self.record_local(&mut sequencing, ticket, product.clone());
        Some(product)
    }

    fn record_local(&self, sequencing: &mut Sequencing, ticket: u64, product: Product) {
        sequencing.removed.remove(&product.id);
        sequencing
            .reloaded
            .insert(product.id.clone(), (ticket, product.clone()));
        sequencing.prune();
        self.products.send_modify(|list| splice(list, product));
    }

    /// Drop `id` from the list. Until [`Self::settle_removal`] no read can
    /// bring the product back. Returns the former position.
    fn remove_local(&self, id: &ProductId) -> Option<(usize, Product)> {
        let mut sequencing = lock(&self.sequencing);
        sequencing.reloaded.remove(id);
        sequencing.removed.insert(id.clone(), None);

        let mut removed = None;
        self.products.send_if_modified(|list| {
            if let Some(position) = list.iter().position(|p| &p.id == id) {
                removed = Some((position, list.remove(position)));
            }
            removed.is_some()
        });
        removed
    }

    /// The backend no longer has `id`. Reads issued from now on reflect that,
    /// older ones still get the product filtered out.
    fn settle_removal(&self, id: &ProductId) {
        let mut sequencing = lock(&self.sequencing);
        let ticket = sequencing.issue();
        sequencing.removed.insert(id.clone(), Some(ticket));
        sequencing.prune();
    }

    /// Undo [`Self::remove_local`] after the backend refused the delete.
    fn restore_local(&self, id: &ProductId, removed: Option<(usize, Product)>) {
        let mut sequencing = lock(&self.sequencing);
        sequencing.removed.remove(id);
        if let Some((position, product)) = removed {
            self.products.send_if_modified(|list| {
                if list.iter().any(|p| p.id == product.id) {
                    return false;
                }
                list.insert(position.min(list.len()), product);
                true
            });
        }
    }

    fn replace_selected(&self, product: &Product) {
        self.selected.send_if_modified(|selected| match selected {
            Some(current) if current.id == product.id => {
                *current = product.clone();
                true
            }
            _ => false,
        });
    }

    fn clear_selected(&self, id: &ProductId) {
        self.selected.send_if_modified(|selected| {
            if selected.as_ref().is_some_and(|p| &p.id == id) {
                *selected = None;
                true
            } else {
                false
            }
        });
    }
}

/// Replace the entry with the same id in place, or append it.
fn splice(list: &mut Vec<Product>, product: Product) {
    match list.iter_mut().find(|p| p.id == product.id) {
        Some(existing) => *existing = product,
        None => list.push(product),
    }
}

fn orphaned_image(image: ImageUrl, source: CatalogError) -> CatalogError {
    log::error!("Image {image} was uploaded but the product write failed: {source}");
    CatalogError::PartialWorkflowFailure {
        image,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::types::{CategoryName, ProductName, ProductPrice};
    use crate::repository::test::TestRepository;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn product(id: &str, name: &str, millis: i64) -> Product {
        Product {
            id: ProductId::new(id).unwrap(),
            name: ProductName::new(name).unwrap(),
            description: String::new(),
            price: ProductPrice::new(5.0).unwrap(),
            image: None,
            category: None,
            created_at: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    fn serum_draft() -> NewProduct {
        NewProduct::new(
            ProductName::new("Serum").unwrap(),
            "Hydrating",
            ProductPrice::new(19.99).unwrap(),
        )
        .with_category(CategoryName::new("Skin Care").unwrap())
    }

    fn id(value: &str) -> ProductId {
        ProductId::new(value).unwrap()
    }

    fn image() -> ImageUpload {
        ImageUpload::new(Some("serum.jpg".to_string()), vec![0xff, 0xd8])
    }

    #[tokio::test]
    async fn add_assigns_backend_id_and_refreshes() {
        init_logging();
        let store = CatalogStore::new(TestRepository::default());

        let draft = serum_draft();
        let created = store.add(draft.clone()).await.unwrap();

        assert_eq!(created, "p1");
        let products = store.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "p1");
        assert!(draft.matches(&products[0]));
        assert_eq!(products[0].price, 19.99);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn failed_add_leaves_list_unchanged() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        repo.fail_create(RepositoryError::Rejected("malformed document".into()));
        let store = CatalogStore::open(repo).await;

        let err = store.add(serum_draft()).await.unwrap_err();

        assert_eq!(
            err,
            CatalogError::ValidationRejected("malformed document".into())
        );
        assert_eq!(store.products().len(), 1);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn refresh_failure_clears_the_list() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        assert_eq!(store.products().len(), 1);

        store
            .repository()
            .fail_list(RepositoryError::Unavailable("timeout".into()));
        let err = store.refresh().await.unwrap_err();

        assert_eq!(err, CatalogError::GatewayUnavailable);
        assert!(store.products().is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn latest_refresh_wins_when_responses_arrive_out_of_order() {
        init_logging();
        let store = CatalogStore::new(TestRepository::default());
        let release_first = store
            .repository()
            .gate_next_list(vec![product("old", "Old", 0)]);
        store
            .repository()
            .script_next_list(vec![product("new", "New", 1)]);

        let (first, second) = tokio::join!(store.refresh(), async {
            let result = store.refresh().await;
            let _ = release_first.send(());
            result
        });

        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 1);
        let products = store.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "new");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn stale_refresh_cannot_resurrect_a_deleted_product() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        let release = store
            .repository()
            .gate_next_list(vec![product("p1", "Toner", 0)]);

        let (refreshed, deleted) = tokio::join!(store.refresh(), async {
            let result = store.delete(&id("p1")).await;
            let _ = release.send(());
            result
        });

        refreshed.unwrap();
        deleted.unwrap();
        assert!(store.products().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_locally_and_reports_missing_ids() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0), product("p2", "Serum", 1)]);
        let store = CatalogStore::open(repo).await;

        store.delete(&id("p1")).await.unwrap();
        assert!(store.products().iter().all(|p| p.id != "p1"));
        let list_calls = store.repository().list_calls();

        let err = store.delete(&id("p1")).await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound(id("p1")));
        assert_eq!(store.products().len(), 1);
        assert_eq!(store.repository().list_calls(), list_calls);
    }

    #[tokio::test]
    async fn failed_delete_restores_entry_in_place() {
        let repo = TestRepository::new(vec![
            product("p1", "Toner", 0),
            product("p2", "Serum", 1),
            product("p3", "Mask", 2),
        ]);
        repo.fail_delete(RepositoryError::Unavailable("offline".into()));
        let store = CatalogStore::open(repo).await;

        let err = store.delete(&id("p2")).await.unwrap_err();

        assert_eq!(err, CatalogError::GatewayUnavailable);
        let ids: Vec<_> = store.products().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, [id("p1"), id("p2"), id("p3")]);
    }

    #[tokio::test]
    async fn delete_notifies_product_observers() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        let mut products = store.subscribe_products();
        products.mark_unchanged();

        store.delete(&id("p1")).await.unwrap();

        assert!(products.has_changed().unwrap());
        assert!(products.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn update_reloads_and_splices_record() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0), product("p2", "Serum", 1)]);
        let store = CatalogStore::open(repo).await;
        store.load_product(&id("p2")).await.unwrap();

        let patch = ProductPatch::default().price(ProductPrice::new(24.0).unwrap());
        store.update(&id("p2"), patch).await.unwrap();

        let products = store.products();
        assert_eq!(products[1].id, "p2");
        assert_eq!(products[1].price, 24.0);
        assert_eq!(store.selected().unwrap().price, 24.0);
        assert_eq!(store.repository().list_calls(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_product_is_not_found() {
        let store = CatalogStore::new(TestRepository::default());

        let err = store
            .update(&id("ghost"), ProductPatch::default())
            .await
            .unwrap_err();

        assert_eq!(err, CatalogError::NotFound(id("ghost")));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn update_falls_back_to_local_patch_when_reload_fails() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        store
            .repository()
            .fail_get(RepositoryError::Unavailable("timeout".into()));

        let patch = ProductPatch::default().name(ProductName::new("Rose Toner").unwrap());
        store.update(&id("p1"), patch).await.unwrap();

        assert_eq!(store.products()[0].name, "Rose Toner");
    }

    #[tokio::test]
    async fn failed_update_leaves_record_unchanged() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        repo.fail_update(RepositoryError::Unavailable("timeout".into()));
        let store = CatalogStore::open(repo).await;

        let patch = ProductPatch::default().price(ProductPrice::new(24.0).unwrap());
        let err = store.update(&id("p1"), patch).await.unwrap_err();

        assert_eq!(err, CatalogError::GatewayUnavailable);
        assert_eq!(store.products()[0].price, 5.0);
        assert_eq!(store.repository().stored()[0].price, 5.0);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn add_survives_concurrent_delete_of_another_product() {
        init_logging();
        let repo = TestRepository::new(vec![product("p0", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        let release = store
            .repository()
            .gate_next_list(vec![product("p0", "Toner", 0), product("p1", "Serum", 1)]);

        let (added, deleted) = tokio::join!(store.add(serum_draft()), async {
            let result = store.delete(&id("p0")).await;
            let _ = release.send(());
            result
        });

        assert_eq!(added.unwrap(), "p1");
        deleted.unwrap();
        let ids: Vec<_> = store.products().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, [id("p1")]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn update_survives_concurrent_delete_of_another_product() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0), product("p2", "Serum", 1)]);
        let store = CatalogStore::open(repo).await;
        let release = store.repository().gate_next_get();

        let patch = ProductPatch::default().price(ProductPrice::new(24.0).unwrap());
        let p2 = id("p2");
        let (updated, deleted) = tokio::join!(store.update(&p2, patch), async {
            let result = store.delete(&id("p1")).await;
            let _ = release.send(());
            result
        });

        updated.unwrap();
        deleted.unwrap();
        let products = store.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "p2");
        assert_eq!(products[0].price, 24.0);
    }

    #[tokio::test]
    async fn slow_refresh_keeps_record_reloaded_after_it_was_issued() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        let release = store
            .repository()
            .gate_next_list(vec![product("p1", "Toner", 0)]);

        let patch = ProductPatch::default().price(ProductPrice::new(24.0).unwrap());
        let (refreshed, updated) = tokio::join!(store.refresh(), async {
            let result = store.update(&id("p1"), patch).await;
            let _ = release.send(());
            result
        });

        refreshed.unwrap();
        updated.unwrap();
        let products = store.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, 24.0);
    }

    #[tokio::test]
    async fn failed_delete_can_be_listed_again_by_a_slow_refresh() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        repo.fail_delete(RepositoryError::Unavailable("offline".into()));
        let store = CatalogStore::open(repo).await;
        let release = store
            .repository()
            .gate_next_list(vec![product("p1", "Toner", 0)]);

        let (refreshed, deleted) = tokio::join!(store.refresh(), async {
            let result = store.delete(&id("p1")).await;
            let _ = release.send(());
            result
        });

        refreshed.unwrap();
        assert_eq!(deleted.unwrap_err(), CatalogError::GatewayUnavailable);
        assert_eq!(store.products().len(), 1);
    }

    #[tokio::test]
    async fn load_product_fills_selected_slot() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::new(repo);

        let found = store.load_product(&id("p1")).await.unwrap();
        assert_eq!(found.unwrap().name, "Toner");
        assert_eq!(store.selected().unwrap().id, "p1");

        assert_eq!(store.load_product(&id("p9")).await.unwrap(), None);
        assert!(store.selected().is_none());
    }

    #[tokio::test]
    async fn upload_failure_aborts_before_create() {
        let repo = TestRepository::default();
        repo.fail_upload(RepositoryError::UploadFailed("quota exceeded".into()));
        let store = CatalogStore::new(repo);

        let err = store
            .upload_image_then_create(image(), serum_draft())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::UploadFailed(_)));
        assert_eq!(store.repository().create_calls(), 0);
        assert!(store.products().is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn upload_then_create_attaches_image_and_client_id() {
        let store = CatalogStore::new(TestRepository::default());

        let created = store
            .upload_image_then_create(image(), serum_draft())
            .await
            .unwrap();

        let products = store.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, created);
        assert_ne!(created, "p1");
        assert_eq!(
            products[0].image.clone().unwrap(),
            "https://storage.test/product_images/serum.jpg"
        );
    }

    #[tokio::test]
    async fn create_failure_after_upload_reports_orphaned_image() {
        let repo = TestRepository::default();
        repo.fail_create(RepositoryError::Unavailable("offline".into()));
        let store = CatalogStore::new(repo);

        let err = store
            .upload_image_then_create(image(), serum_draft())
            .await
            .unwrap_err();

        match err {
            CatalogError::PartialWorkflowFailure { image, source } => {
                assert_eq!(image, "https://storage.test/product_images/serum.jpg");
                assert_eq!(*source, CatalogError::GatewayUnavailable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.repository().upload_calls(), 1);
    }

    #[tokio::test]
    async fn upload_then_update_replaces_image() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;

        store
            .upload_image_then_update(image(), &id("p1"), ProductPatch::default())
            .await
            .unwrap();

        assert!(store.products()[0].image.is_some());
    }

    #[tokio::test]
    async fn update_failure_after_upload_reports_orphaned_image() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        repo.fail_update(RepositoryError::Unavailable("offline".into()));
        let store = CatalogStore::open(repo).await;

        let err = store
            .upload_image_then_update(image(), &id("p1"), ProductPatch::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CatalogError::PartialWorkflowFailure {
                image: ImageUrl::new("https://storage.test/product_images/serum.jpg").unwrap(),
                source: Box::new(CatalogError::GatewayUnavailable),
            }
        );
        assert!(store.products()[0].image.is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn upload_failure_aborts_before_update() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        repo.fail_upload(RepositoryError::UploadFailed("quota exceeded".into()));
        let store = CatalogStore::open(repo).await;

        let err = store
            .upload_image_then_update(image(), &id("p1"), ProductPatch::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::UploadFailed(_)));
        assert_eq!(store.repository().update_calls(), 0);
        assert!(store.products()[0].image.is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_gateway() {
        let store = CatalogStore::new(TestRepository::default());
        let form = AddProductForm {
            name: "Serum".to_string(),
            price: "abc".to_string(),
            description: "Hydrating".to_string(),
            category: "Skin Care".to_string(),
        };

        let err = store.submit_new_product(form, image()).await.unwrap_err();

        assert!(matches!(err, CatalogError::InvalidInput(_)));
        assert_eq!(store.repository().upload_calls(), 0);
        assert_eq!(store.repository().create_calls(), 0);
    }

    #[tokio::test]
    async fn edit_form_without_image_updates_directly() {
        let repo = TestRepository::new(vec![product("p1", "Toner", 0)]);
        let store = CatalogStore::open(repo).await;
        let form = EditProductForm {
            product_id: "p1".to_string(),
            name: "Toner".to_string(),
            price: "7.5".to_string(),
            description: "Balancing".to_string(),
        };

        store.submit_product_edit(form, None).await.unwrap();

        assert_eq!(store.repository().upload_calls(), 0);
        assert_eq!(store.repository().update_calls(), 1);
        assert_eq!(store.products()[0].description, "Balancing");
    }

    #[tokio::test]
    async fn search_reads_current_products() {
        let repo = TestRepository::new(vec![
            product("p1", "Rose Lipstick", 0),
            product("p2", "Serum", 1),
        ]);
        let store = CatalogStore::open(repo).await;

        let found = store.search("rose", SearchScope::ALL);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p1");
        assert!(store.search(" ", SearchScope::ALL).is_empty());
    }

    #[tokio::test]
    async fn sorts_newest_first_without_touching_list() {
        let repo = TestRepository::new(vec![product("p1", "Old", 10), product("p2", "New", 20)]);
        let store = CatalogStore::open(repo).await;

        let sorted = store.sorted_by_created_at();

        assert_eq!(sorted[0].id, "p2");
        assert_eq!(store.products()[0].id, "p1");
    }

    #[tokio::test]
    async fn loading_flag_tracks_in_flight_operations() {
        let store = CatalogStore::new(TestRepository::default());
        let release = store.repository().gate_next_list(Vec::new());
        let mut loading = store.subscribe_loading();

        let (result, ()) = tokio::join!(store.refresh(), async {
            loading.wait_for(|loading| *loading).await.unwrap();
            assert!(store.is_loading());
            let _ = release.send(());
        });

        result.unwrap();
        assert!(!store.is_loading());
    }
}
