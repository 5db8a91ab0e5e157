//! Asset resolution as the interpreter sees it: id -> playable URL plus
//! the little metadata the handlers need. The real asset pipeline lives
//! in the authoring/packaging tooling; `Project` carries enough of its
//! table to back this at runtime.

use fabula_doc::{AssetKind, Project};

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetMeta {
    pub is_video: bool,
    pub looping: bool,
}

pub trait AssetSource {
    fn resolve(&self, asset_id: &str, kind: AssetKind) -> Option<String>;
    fn metadata(&self, asset_id: &str, kind: AssetKind) -> AssetMeta;
    /// Human-readable name, used when conditions compare an id-holding
    /// variable against an authored string.
    fn display_name(&self, asset_id: &str) -> Option<String>;
}

impl AssetSource for Project {
    fn resolve(&self, asset_id: &str, kind: AssetKind) -> Option<String> {
        let asset = self.asset(asset_id)?;
        if asset.kind != kind {
            log::warn!(
                "asset '{}' requested as {:?} but declared {:?}",
                asset_id,
                kind,
                asset.kind
            );
        }
        Some(asset.path.clone())
    }

    fn metadata(&self, asset_id: &str, _kind: AssetKind) -> AssetMeta {
        self.asset(asset_id)
            .map(|a| AssetMeta {
                is_video: a.is_video,
                looping: a.looping,
            })
            .unwrap_or_default()
    }

    fn display_name(&self, asset_id: &str) -> Option<String> {
        self.asset(asset_id).map(|a| a.name.clone())
    }
}

/// Resolver that knows nothing. Tests and benches.
pub struct NullAssets;

impl AssetSource for NullAssets {
    fn resolve(&self, _asset_id: &str, _kind: AssetKind) -> Option<String> {
        None
    }

    fn metadata(&self, _asset_id: &str, _kind: AssetKind) -> AssetMeta {
        AssetMeta::default()
    }

    fn display_name(&self, _asset_id: &str) -> Option<String> {
        None
    }
}
