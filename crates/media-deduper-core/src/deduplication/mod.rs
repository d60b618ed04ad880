pub mod grouping;
pub mod ordering;

pub use grouping::{link_components, similarity_score, DisjointSet, SimilarityGrouper};
pub use ordering::{compare_members, order_by_duration, order_groups};
