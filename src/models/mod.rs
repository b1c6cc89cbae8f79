//! Data models for the CMS backend.
//!
//! Wire names are camelCase so the JSON snapshots and API payloads share one shape.

mod block;
mod navigation;
mod page;
mod settings;
mod site;
mod template;

pub use block::*;
pub use navigation::*;
pub use page::*;
pub use settings::*;
pub use site::*;
pub use template::*;
