//! Catalog access: read-side queries on [`Store`] and transactional
//! write batches on [`UnitOfWork`].
//!
//! The sync pipeline opens one unit of work per listing page, so a crash
//! mid-page leaves the catalog at the previous page boundary.

use std::path::Path;

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;

use pixm_api::{AuthorProfile, AuthorStub, NormalizedItem};

use crate::db;
use crate::error::Result;
use crate::models::{AnimationAssetRow, AuthorRow, ItemRow};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the catalog at `path`, creating and migrating as needed.
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            pool: db::create_pool(path).await?,
        })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write batch.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        Ok(UnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    pub async fn author(&self, id: i64) -> Result<Option<AuthorRow>> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, name, account, is_followed, is_stub, total_illusts, total_manga, \
             total_novels, total_public_bookmarks, total_followers FROM authors WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn item(&self, id: i64) -> Result<Option<ItemRow>> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, author_id, kind, title, caption, page_count, total_views, \
             total_bookmarks, bookmark_rate, is_bookmarked, is_downloaded, created_at \
             FROM items WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Tag names of an item, alphabetical.
    pub async fn item_tags(&self, item_id: i64) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT t.name FROM tags t \
             JOIN item_tags it ON it.tag_id = t.id \
             WHERE it.item_id = ? ORDER BY t.name",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    pub async fn animation_asset(&self, item_id: i64) -> Result<Option<AnimationAssetRow>> {
        let row = sqlx::query_as::<_, AnimationAssetRow>(
            "SELECT item_id, archive_url, frame_delays FROM animation_assets WHERE item_id = ?",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Local sequence number of an item, if one has been assigned.
    pub async fn local_sequence_of(&self, item_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT local_id FROM local_sequence WHERE item_id = ?",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Authors still waiting for profile enrichment.
    pub async fn stub_author_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM authors WHERE is_stub = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

/// A transaction over the catalog. Nothing is visible until [`commit`].
///
/// [`commit`]: UnitOfWork::commit
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Insert an author known only from a listing item. Returns `true` if
    /// the author was newly created. An existing row keeps its profile
    /// totals; only the listing-level fields are refreshed.
    pub async fn upsert_author_stub(&mut self, author: &AuthorStub) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authors WHERE id = ?")
            .bind(author.id)
            .fetch_one(&mut *self.tx)
            .await?
            > 0;

        if exists {
            sqlx::query(
                "UPDATE authors SET name = ?, account = ?, is_followed = ?, \
                 updated_at = datetime('now') WHERE id = ?",
            )
            .bind(&author.name)
            .bind(&author.account)
            .bind(author.is_followed)
            .bind(author.id)
            .execute(&mut *self.tx)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO authors (id, name, account, is_followed, is_stub) \
                 VALUES (?, ?, ?, ?, 1)",
            )
            .bind(author.id)
            .bind(&author.name)
            .bind(&author.account)
            .bind(author.is_followed)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(!exists)
    }

    /// Store the full profile, clearing the stub flag.
    pub async fn upsert_author_profile(&mut self, profile: &AuthorProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO authors (id, name, account, is_followed, is_stub, total_illusts, \
             total_manga, total_novels, total_public_bookmarks, total_followers) \
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = excluded.name, \
                 account = excluded.account, \
                 is_followed = excluded.is_followed, \
                 is_stub = 0, \
                 total_illusts = excluded.total_illusts, \
                 total_manga = excluded.total_manga, \
                 total_novels = excluded.total_novels, \
                 total_public_bookmarks = excluded.total_public_bookmarks, \
                 total_followers = excluded.total_followers, \
                 updated_at = datetime('now')",
        )
        .bind(profile.id)
        .bind(&profile.name)
        .bind(&profile.account)
        .bind(profile.is_followed)
        .bind(profile.total_illusts)
        .bind(profile.total_manga)
        .bind(profile.total_novels)
        .bind(profile.total_public_bookmarks)
        .bind(profile.total_followers)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Insert or refresh an item with its tags, pages and animation
    /// metadata. The `is_downloaded` flag survives refreshes.
    #[instrument(skip(self, item), fields(item_id = item.id))]
    pub async fn upsert_item(&mut self, item: &NormalizedItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO items (id, author_id, kind, title, caption, page_count, total_views, \
             total_bookmarks, bookmark_rate, is_bookmarked, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                 author_id = excluded.author_id, \
                 kind = excluded.kind, \
                 title = excluded.title, \
                 caption = excluded.caption, \
                 page_count = excluded.page_count, \
                 total_views = excluded.total_views, \
                 total_bookmarks = excluded.total_bookmarks, \
                 bookmark_rate = excluded.bookmark_rate, \
                 is_bookmarked = excluded.is_bookmarked, \
                 created_at = excluded.created_at, \
                 updated_at = datetime('now')",
        )
        .bind(item.id)
        .bind(item.author.id)
        .bind(item.kind.as_str())
        .bind(&item.title)
        .bind(&item.caption)
        .bind(item.page_count)
        .bind(item.total_views)
        .bind(item.total_bookmarks)
        .bind(item.bookmark_rate)
        .bind(item.is_bookmarked)
        .bind(item.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await?;

        // Tags and pages are replaced wholesale on refresh.
        sqlx::query("DELETE FROM item_tags WHERE item_id = ?")
            .bind(item.id)
            .execute(&mut *self.tx)
            .await?;
        for tag in &item.tags {
            sqlx::query(
                "INSERT INTO tags (name, translated_name) VALUES (?, ?) \
                 ON CONFLICT (name) DO UPDATE SET \
                     translated_name = COALESCE(excluded.translated_name, tags.translated_name)",
            )
            .bind(&tag.name)
            .bind(&tag.translated_name)
            .execute(&mut *self.tx)
            .await?;
            let tag_id = sqlx::query_scalar::<_, i64>("SELECT id FROM tags WHERE name = ?")
                .bind(&tag.name)
                .fetch_one(&mut *self.tx)
                .await?;
            sqlx::query("INSERT INTO item_tags (item_id, tag_id) VALUES (?, ?)")
                .bind(item.id)
                .bind(tag_id)
                .execute(&mut *self.tx)
                .await?;
        }

        sqlx::query("DELETE FROM item_pages WHERE item_id = ?")
            .bind(item.id)
            .execute(&mut *self.tx)
            .await?;
        for (index, page) in item.pages.iter().enumerate() {
            sqlx::query(
                "INSERT INTO item_pages (item_id, page_index, url_original, url_large, \
                 url_medium, url_square) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(item.id)
            .bind(index as i64)
            .bind(&page.original)
            .bind(&page.large)
            .bind(&page.medium)
            .bind(&page.square)
            .execute(&mut *self.tx)
            .await?;
        }

        if let Some(animation) = &item.animation {
            let delays = serde_json::to_string(&animation.frame_delays_cs)?;
            sqlx::query(
                "INSERT INTO animation_assets (item_id, archive_url, frame_delays) \
                 VALUES (?, ?, ?) \
                 ON CONFLICT (item_id) DO UPDATE SET \
                     archive_url = excluded.archive_url, \
                     frame_delays = excluded.frame_delays",
            )
            .bind(item.id)
            .bind(&animation.archive_url)
            .bind(delays)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    pub async fn mark_downloaded(&mut self, item_id: i64) -> Result<()> {
        sqlx::query("UPDATE items SET is_downloaded = 1 WHERE id = ?")
            .bind(item_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Assign the next local sequence number to `item_id`. Returns `true`
    /// if a number was assigned, `false` if the item already had one.
    /// The guarded insert keeps AUTOINCREMENT from consuming an id when
    /// the item is already numbered, so reruns leave no gaps.
    pub async fn assign_local_sequence(&mut self, item_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO local_sequence (item_id) SELECT ? \
             WHERE NOT EXISTS (SELECT 1 FROM local_sequence WHERE item_id = ?)",
        )
        .bind(item_id)
        .bind(item_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use chrono::DateTime;
    use pixm_api::{AnimationDescriptor, ItemKind, PageUrls, Tag};

    fn stub(id: i64) -> AuthorStub {
        AuthorStub {
            id,
            name: format!("author-{id}"),
            account: format!("acct-{id}"),
            is_followed: false,
        }
    }

    fn item(id: i64, author_id: i64) -> NormalizedItem {
        NormalizedItem {
            id,
            author: stub(author_id),
            kind: ItemKind::Illust,
            title: "title".into(),
            caption: "caption".into(),
            page_count: 1,
            total_views: 100,
            total_bookmarks: 10,
            bookmark_rate: 0.1,
            is_bookmarked: false,
            created_at: DateTime::parse_from_rfc3339("2024-05-01T12:00:00+09:00").unwrap(),
            tags: vec![
                Tag {
                    name: "sky".into(),
                    translated_name: Some("Sky".into()),
                },
                Tag {
                    name: "landscape".into(),
                    translated_name: None,
                },
            ],
            pages: vec![PageUrls {
                original: Some("https://i.pximg.net/o/p0.png".into()),
                large: None,
                medium: None,
                square: None,
            }],
            animation: None,
        }
    }

    async fn store() -> Store {
        Store::from_pool(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn author_stub_created_once() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        assert!(uow.upsert_author_stub(&stub(7)).await.unwrap());
        assert!(!uow.upsert_author_stub(&stub(7)).await.unwrap());
        uow.commit().await.unwrap();

        let author = store.author(7).await.unwrap().unwrap();
        assert!(author.is_stub);
    }

    #[tokio::test]
    async fn profile_clears_stub_flag_and_stub_update_keeps_totals() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.upsert_author_stub(&stub(7)).await.unwrap();
        uow.upsert_author_profile(&AuthorProfile {
            id: 7,
            name: "full".into(),
            account: "acct".into(),
            is_followed: true,
            total_illusts: 12,
            total_manga: 3,
            total_novels: 0,
            total_public_bookmarks: 40,
            total_followers: 99,
        })
        .await
        .unwrap();
        // A later listing mention must not reset the enriched fields.
        uow.upsert_author_stub(&stub(7)).await.unwrap();
        uow.commit().await.unwrap();

        let author = store.author(7).await.unwrap().unwrap();
        assert!(!author.is_stub);
        assert_eq!(author.total_illusts, 12);
        assert_eq!(author.total_followers, 99);
    }

    #[tokio::test]
    async fn item_upsert_is_idempotent() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.upsert_author_stub(&stub(7)).await.unwrap();
        uow.upsert_item(&item(100, 7)).await.unwrap();
        uow.upsert_item(&item(100, 7)).await.unwrap();
        uow.commit().await.unwrap();

        let row = store.item(100).await.unwrap().unwrap();
        assert_eq!(row.kind, "illust");
        assert_eq!(row.page_count, 1);
        assert_eq!(store.item_tags(100).await.unwrap(), vec!["landscape", "sky"]);
    }

    #[tokio::test]
    async fn refresh_preserves_downloaded_flag() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.upsert_author_stub(&stub(7)).await.unwrap();
        uow.upsert_item(&item(100, 7)).await.unwrap();
        uow.mark_downloaded(100).await.unwrap();
        uow.upsert_item(&item(100, 7)).await.unwrap();
        uow.commit().await.unwrap();

        assert!(store.item(100).await.unwrap().unwrap().is_downloaded);
    }

    #[tokio::test]
    async fn animation_metadata_round_trips() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.upsert_author_stub(&stub(7)).await.unwrap();
        let mut ugoira = item(77, 7);
        ugoira.kind = ItemKind::Ugoira;
        ugoira.animation = Some(AnimationDescriptor {
            archive_url: "https://i.pximg.net/z/1920x1080/77.zip".into(),
            frame_delays_cs: vec![7, 13, 7],
        });
        uow.upsert_item(&ugoira).await.unwrap();
        uow.commit().await.unwrap();

        let asset = store.animation_asset(77).await.unwrap().unwrap();
        assert_eq!(asset.archive_url, "https://i.pximg.net/z/1920x1080/77.zip");
        assert_eq!(asset.frame_delays().unwrap(), vec![7, 13, 7]);
    }

    #[tokio::test]
    async fn sequence_is_monotonic_and_assigned_once() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.upsert_author_stub(&stub(7)).await.unwrap();
        for id in [199, 200, 201] {
            uow.upsert_item(&item(id, 7)).await.unwrap();
        }
        assert!(uow.assign_local_sequence(199).await.unwrap());
        assert!(uow.assign_local_sequence(200).await.unwrap());
        assert!(!uow.assign_local_sequence(199).await.unwrap());
        assert!(uow.assign_local_sequence(201).await.unwrap());
        uow.commit().await.unwrap();

        assert_eq!(store.local_sequence_of(199).await.unwrap(), Some(1));
        assert_eq!(store.local_sequence_of(200).await.unwrap(), Some(2));
        assert_eq!(store.local_sequence_of(201).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn stub_author_ids_lists_unenriched_only() {
        let store = store().await;
        let mut uow = store.begin().await.unwrap();
        uow.upsert_author_stub(&stub(1)).await.unwrap();
        uow.upsert_author_stub(&stub(2)).await.unwrap();
        uow.upsert_author_profile(&AuthorProfile {
            id: 1,
            name: "full".into(),
            account: "acct".into(),
            is_followed: false,
            total_illusts: 0,
            total_manga: 0,
            total_novels: 0,
            total_public_bookmarks: 0,
            total_followers: 0,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.stub_author_ids().await.unwrap(), vec![2]);
    }
}
