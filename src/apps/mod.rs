pub mod detector;

pub use detector::{discover_bundles, find_associated_files, AppBundle, AssociatedFile, AssociatedKind};
