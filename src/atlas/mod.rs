//! Atlas formats, asset fetching and loading

mod fetch;
mod format;
mod loader;

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{join_url, parent_url, AssetFetcher, FetchError, FileFetcher, MemoryFetcher};
pub use format::{
    Asset, AssetSrc, AtlasDescriptor, Bundle, FrameEntry, FramePoint, FrameRect, FrameSize, Frames, Manifest, Meta,
    NamedFrame,
};
pub use loader::{AtlasLoader, LoadError, LoadOutcome, LoadReport, MANIFEST_FILE};
