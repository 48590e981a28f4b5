pub mod store;

pub use store::{
    FeatureLayout, FeatureStore, StoreError, Transition, DOCUMENT_FILE, MAX_LOCATE_DEPTH,
};
