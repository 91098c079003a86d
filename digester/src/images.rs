//! Header image selection across the asset pool and past digests.

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::assets::select_least_recently_used;
use crate::io::asset_store::AssetStore;
use crate::io::documents::DocumentStore;

/// Pick the header image for the next digest.
///
/// Returns the site path (`{url_prefix}/{filename}`), or `None` when the pool
/// is empty.
#[instrument(skip_all, fields(images_dir = %assets.dir().display()))]
pub fn select_image(
    assets: &AssetStore,
    documents: &DocumentStore,
    url_prefix: &str,
) -> Result<Option<String>> {
    let pool = assets.pool()?;
    let history = documents.image_history()?;
    debug!(pool = pool.len(), history = history.len(), "selecting image");
    Ok(select_least_recently_used(&pool, &history)
        .map(|name| format!("{}/{name}", url_prefix.trim_end_matches('/'))))
}
