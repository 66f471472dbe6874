pub mod delivery;
pub mod pipeline;
pub mod registration;

use relay_core::error::RelayError;
use relay_db::StoreError;

pub(crate) fn store_err(err: StoreError) -> RelayError {
    match err {
        StoreError::Conflict(message) => RelayError::Conflict(message),
        other => RelayError::Internal(anyhow::Error::new(other)),
    }
}
