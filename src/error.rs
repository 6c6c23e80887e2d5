use thiserror::Error;

/// Errors produced while reading and classifying a DXF document (§4.1).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read DXF file {path}: {source}")]
    UnreadableFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse DXF document {path}: {source}")]
    MalformedDxf {
        path: String,
        #[source]
        source: dxf::DxfError,
    },
    #[error("DXF document contained zero usable entities")]
    NoEntities,
}

/// Errors surfaced by the end-to-end pipeline (§7).
///
/// `process` never panics on malformed input or configuration; every
/// failure mode named in spec §7 has a variant here. Stage-level failures
/// are collapsed into a single `error_message` string on `LayoutResult`
/// rather than propagated as a `Result`, so that partial results (best-so-far
/// units on cancellation, zones-only on `NoOpenSpace`) can still be returned.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("size_mix fractions must sum to 1.0 +/- 0.01 and be non-negative, got {0:?}")]
    InvalidSizeMix([f64; 4]),
    #[error("ga_population must be at least 1, got {0}")]
    InvalidGaPopulation(u32),
    #[error("parser produced no polygons of any zone kind")]
    NoGeometry,
    #[error("space computation yielded zero open regions >= MIN_ZONE_AREA")]
    NoOpenSpace,
    #[error("evolutionary search placed zero units across every chromosome")]
    PlacementEmpty,
    #[error("run was cancelled before completion")]
    Cancelled,
    #[error("wall-clock deadline exceeded before the search converged")]
    DeadlineExceeded,
    #[error("internal geometry invariant violated: {0}")]
    GeometryDegenerate(String),
}
