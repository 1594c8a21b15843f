use thiserror::Error;

use crate::Length;

/// Failures surfaced while turning a map-bound location into an OpenLR
/// location reference. Typed failures are returned verbatim; anything
/// unexpected is wrapped into [`EncodeError::EncodingFailed`] with the
/// underlying cause retained.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("no road network near the given coordinate")]
    NoNetworkNearby,
    #[error("no traversable edge within {} m of the given coordinate", .tolerance.meters())]
    TooFarFromNetwork { tolerance: Length },
    #[error("coordinate cannot be projected onto the edge geometry")]
    ProjectionFailed,
    #[error("no route found between the location endpoints")]
    RouteNotFound,
    #[error("FRC and FOW cannot be resolved from the edge tags")]
    ClassificationFailed,
    #[error("location edges are not sequentially traversable")]
    DisconnectedRoute,
    #[error("invalid offsets: positive {pos}%, negative {neg}%")]
    InvalidOffsets { pos: f64, neg: f64 },
    #[error("distance between location reference points exceeds {} m", Length::MAX_LRP_DISTANCE.meters())]
    DistanceTooLarge,
    #[error("routed first or last edge does not match the edge chosen by projection")]
    RoutingMismatch,
    #[error("encoding failed: {0}")]
    EncodingFailed(String),
}
