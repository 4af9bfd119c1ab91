//! Alt-text workflow: image extraction, sidecar files, draft generation,
//! and injection of reviewed text into the structure tree.

pub mod extract;
pub mod generate;
pub mod injector;
pub mod store;

pub use extract::{ExtractedImage, decode_image, extract_all, extract_by_hash, prepare_for_provider};
pub use generate::{DraftReport, generate_drafts};
pub use injector::{InjectionReport, inject_alt_text};
pub use store::{SIDECAR_SUFFIX, SidecarStore};
