//! Static bundle serving.
//!
//! # Data Flow
//! ```text
//! Request not claimed by a proxy rule
//!     → assets.rs (exact file under the web folder)
//!     → spa.rs (entry document for navigation paths, unless excluded)
//!     → 404
//! ```

pub mod assets;
pub mod spa;

pub use assets::{head_only, AssetLookup, StaticAssets};
pub use spa::HistoryFallback;
