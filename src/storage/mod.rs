mod seen;

pub use seen::{
    JsonSeenStore, MemorySeenStore, SeenSet, SeenStore, StoreError, SEEN_WINDOW_SECS,
};
