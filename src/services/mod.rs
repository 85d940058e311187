pub mod launchd;

pub use launchd::{
    discover_descriptors, glob_ci, is_loaded, unload, ServiceDescriptor, ServiceKind,
    UnloadResult,
};
