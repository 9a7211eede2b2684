pub mod builder;
pub mod export;
pub mod models;
pub mod similarity;

pub use builder::{BuilderConfig, GraphBuilder};
pub use export::{ExportEdge, ExportNode, GraphExport, GraphStats};
pub use models::{Edge, EdgeKind, EdgePolicy, Graph, NodeRecord, SymbolicClique};
pub use similarity::{cosine_similarity, pairwise_edges};
