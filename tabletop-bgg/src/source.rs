use std::future::Future;

use tabletop_catalog::{CatalogId, FamilyEntity, GameEntity};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Something that can resolve catalog ids into entities.
///
/// Returned entities have `refreshed_at == None`; whoever persists them
/// stamps the refresh time.
pub trait CatalogSource: Send + Sync {
    fn fetch_game(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<GameEntity, FetchError>> + Send;

    fn fetch_family(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<FamilyEntity, FetchError>> + Send;
}
