//! # pixm API client
//!
//! Typed access to the Pixiv app-API: wire payload types, the
//! [`GalleryApi`] trait consumed by the sync pipeline, a reqwest-backed
//! implementation with refresh-token auth, and the single mapping function
//! that turns raw payloads into normalized records. Nothing outside this
//! crate touches untyped JSON.

pub mod client;
pub mod error;
pub mod gallery;
pub mod mapping;
pub mod models;
pub mod types;

pub use client::PixivAppApi;
pub use error::{ApiError, Result};
pub use gallery::{GalleryApi, ListingSource};
pub use mapping::{map_author_profile, normalize_item};
pub use models::{
    AnimationDescriptor, AuthorProfile, AuthorStub, ItemKind, NormalizedItem, PageUrls, Tag,
};
