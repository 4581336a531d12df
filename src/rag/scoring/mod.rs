// Similarity scoring for retrieved and caller-supplied context
pub mod local;
pub mod similarity;

pub use local::LocalFragmentScorer;
pub use similarity::similarity;
