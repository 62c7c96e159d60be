//! gene_subregions
//!
//! Derives sub-regions of genes from gene -> transcript -> exon annotation
//! trees: transcription start/stop sites, exons, introns, splice sites and
//! alternate/common exons across the transcripts of a gene. Coordinates are
//! 1-based and inclusive.
//!
//! ```
//! use gene_subregions::{FeatureNode, RegionConfig, RegionKind, RegionWalker, Strand};
//!
//! let exons = vec![
//!     FeatureNode::new("e1", "exon", "chr1", 100, 200, Strand::Minus),
//!     FeatureNode::new("e2", "exon", "chr1", 300, 400, Strand::Minus),
//! ];
//! let tx = FeatureNode::new("T", "mRNA", "chr1", 100, 400, Strand::Minus).with_children(exons);
//!
//! let walker = RegionWalker::new(RegionConfig::new(RegionKind::Intron));
//! let introns = walker.collect_feature(&tx).unwrap();
//! assert_eq!((introns[0].start, introns[0].stop), (201, 299));
//! ```

pub mod annotation;
pub mod dedup;
pub mod error;
pub mod model;
pub mod output;
pub mod types;
pub mod walker;

pub use annotation::{AnnotationBuilder, AttributeKeys, FeatureSet};

pub use error::RegionError;

pub use types::{Adjustment, Coord, Region, Strand};

pub use model::feature::{Feature, FeatureNode};
pub use model::gene::{ExonSharing, TranscriptSelection};
pub use model::{RegionKind, TranscriptType, TranscriptTypes};

pub use dedup::dedup_regions;
pub use output::{open_output, write_regions, OutputSink};
pub use walker::{RegionConfig, RegionSummary, RegionWalker};
