//! The synchronization pipeline.
//!
//! Walks a paginated listing, catalogs every visible item, queues asset
//! downloads for the items the filter selects, then assigns local
//! sequence numbers oldest-first and enriches stub authors. Each listing
//! page is committed in one transaction, so an interrupted run resumes
//! cleanly at a page boundary.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use pixm_api::types::ListingPage;
use pixm_api::{normalize_item, AuthorStub, GalleryApi, ItemKind, ListingSource, NormalizedItem};
use pixm_download::DownloadTask;
use pixm_store::Store;

use crate::error::Result;
use crate::filter::ItemFilter;
use crate::sink::DownloadSink;

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub source: ListingSource,
    pub author_id: i64,
    /// Maximum number of listing pages to process; `None` walks to the
    /// end.
    pub page_budget: Option<u32>,
    pub filter: ItemFilter,
}

impl SyncRequest {
    pub fn works(author_id: i64) -> Self {
        Self {
            source: ListingSource::Works,
            author_id,
            page_budget: None,
            filter: ItemFilter::default(),
        }
    }
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: u32,
    pub items_seen: usize,
    pub items_queued: usize,
    /// Restricted or deleted items skipped without cataloging.
    pub items_skipped: usize,
    /// Items that received a new local sequence number.
    pub sequenced: usize,
    pub authors_enriched: usize,
}

pub struct SyncPipeline {
    api: Arc<dyn GalleryApi>,
    store: Store,
    sink: Arc<dyn DownloadSink>,
    works_root: PathBuf,
}

impl SyncPipeline {
    pub fn new(
        api: Arc<dyn GalleryApi>,
        store: Store,
        sink: Arc<dyn DownloadSink>,
        works_root: PathBuf,
    ) -> Self {
        Self {
            api,
            store,
            sink,
            works_root,
        }
    }

    #[instrument(skip(self, request), fields(author_id = request.author_id))]
    pub async fn run(&self, request: &SyncRequest) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        // Ids in arrival order (newest first); reversed before sequencing
        // so older items get lower numbers.
        let mut processed: Vec<i64> = Vec::new();

        let mut budget = request.page_budget;
        let mut page = self
            .api
            .fetch_listing_page(request.source, request.author_id)
            .await?;

        loop {
            if page.illusts.is_empty() || budget == Some(0) {
                break;
            }
            report.pages += 1;
            self.process_page(&page, request, &mut report, &mut processed)
                .await?;

            if let Some(remaining) = budget.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    debug!("Page budget exhausted");
                    break;
                }
            }
            match &page.next_url {
                Some(next) => page = self.api.fetch_next_page(next).await?,
                None => break,
            }
        }

        report.sequenced = self.assign_sequence(&processed).await?;
        report.authors_enriched = self.enrich_stub_authors().await?;

        info!(
            pages = report.pages,
            seen = report.items_seen,
            queued = report.items_queued,
            "Sync finished"
        );
        Ok(report)
    }

    /// Catalog one listing page inside a single transaction.
    async fn process_page(
        &self,
        page: &ListingPage,
        request: &SyncRequest,
        report: &mut SyncReport,
        processed: &mut Vec<i64>,
    ) -> Result<()> {
        let mut uow = self.store.begin().await?;

        // Authors first so item rows always reference an existing author.
        let mut seen_authors = HashSet::new();
        for raw in page.illusts.iter().filter(|raw| raw.visible) {
            if seen_authors.insert(raw.user.id) {
                uow.upsert_author_stub(&AuthorStub {
                    id: raw.user.id,
                    name: raw.user.name.clone(),
                    account: raw.user.account.clone(),
                    is_followed: raw.user.is_followed,
                })
                .await?;
            }
        }

        for raw in &page.illusts {
            report.items_seen += 1;
            if !raw.visible {
                info!(item_id = raw.id, "Item restricted or deleted, skipping");
                report.items_skipped += 1;
                continue;
            }

            let ugoira = if raw.kind == ItemKind::Ugoira.as_str() {
                Some(self.api.fetch_animation_metadata(raw.id).await?)
            } else {
                None
            };
            let item = normalize_item(raw, ugoira.as_ref())?;

            uow.upsert_item(&item).await?;

            // Filtered-out items stay cataloged but are neither
            // downloaded nor sequenced.
            if request.filter.matches(&item) {
                processed.push(item.id);
                if self.queue_downloads(&item) > 0 {
                    uow.mark_downloaded(item.id).await?;
                    report.items_queued += 1;
                }
            }
        }

        uow.commit().await?;
        Ok(())
    }

    /// Submit every asset of one item. Returns the number of tasks queued.
    fn queue_downloads(&self, item: &NormalizedItem) -> usize {
        if let Some(animation) = &item.animation {
            self.sink.submit(DownloadTask::animated(
                animation.archive_url.clone(),
                self.works_root.clone(),
                item.author.id,
                item.id,
                animation.frame_delays_cs.clone(),
            ));
            let mut queued = 1;
            // The display still image lands next to the archive.
            if let Some(url) = item.pages.first().and_then(|page| page.best()) {
                self.sink.submit(DownloadTask::in_item_dir(
                    url,
                    self.works_root.clone(),
                    item.author.id,
                    item.id,
                ));
                queued += 1;
            }
            return queued;
        }

        let mut queued = 0;
        if item.pages.len() == 1 {
            if let Some(url) = item.pages[0].best() {
                self.sink.submit(DownloadTask::single(
                    url,
                    self.works_root.clone(),
                    item.author.id,
                    item.id,
                ));
                queued += 1;
            }
        } else {
            for page in &item.pages {
                if let Some(url) = page.best() {
                    self.sink.submit(DownloadTask::in_item_dir(
                        url,
                        self.works_root.clone(),
                        item.author.id,
                        item.id,
                    ));
                    queued += 1;
                }
            }
        }
        queued
    }

    /// Number items oldest-first; items numbered on a previous run keep
    /// their number.
    async fn assign_sequence(&self, processed: &[i64]) -> Result<usize> {
        if processed.is_empty() {
            return Ok(0);
        }
        let mut assigned = 0;
        let mut uow = self.store.begin().await?;
        for id in processed.iter().rev() {
            if uow.assign_local_sequence(*id).await? {
                assigned += 1;
            }
        }
        uow.commit().await?;
        Ok(assigned)
    }

    /// Fill in full profiles for authors known only from listing stubs.
    /// A failed profile fetch is logged and leaves the stub for the next
    /// run.
    async fn enrich_stub_authors(&self) -> Result<usize> {
        let mut enriched = 0;
        for author_id in self.store.stub_author_ids().await? {
            match self.api.fetch_author_profile(author_id).await {
                Ok(profile) => {
                    let mut uow = self.store.begin().await?;
                    uow.upsert_author_profile(&profile).await?;
                    uow.commit().await?;
                    enriched += 1;
                }
                Err(e) => {
                    warn!(author_id, error = %e, "Profile enrichment failed");
                }
            }
        }
        Ok(enriched)
    }
}
