pub mod assets;
pub mod ctx;
pub mod patch;
pub mod stage;

pub use assets::{AssetMeta, AssetSource, NullAssets};
pub use ctx::Ctx;
