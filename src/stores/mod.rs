pub mod dismissals;
pub mod preferences;
pub mod saved;

pub use dismissals::DismissalStore;
pub use preferences::PreferenceStore;
pub use saved::SavedChoiceStore;
