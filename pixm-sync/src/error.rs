use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("API error: {0}")]
    Api(#[from] pixm_api::ApiError),

    #[error("Store error: {0}")]
    Store(#[from] pixm_store::StoreError),
}
