#![doc = include_str!("../README.md")]

mod binary;
mod builder;
mod encoder;
mod error;
mod geometry;
mod graph;
mod line;
mod model;
mod validator;

pub use binary::{
    decode_coordinate, decode_coordinate_relative, encode_coordinate, encode_coordinate_relative,
};
pub use builder::LocationBuilder;
pub use encoder::{encode_line, encode_point_along_line};
pub use error::EncodeError;
pub use graph::{
    Anchor, EdgeReference, NetworkEdge, PathSegment, RoadNetwork, VehicleProfile, can_traverse,
};
pub use line::{ReferencedLine, ReferencedPointAlongLine};
pub use model::{
    Bearing, Coordinate, Fow, Frc, Length, LocationReferencePath, LocationReferencePoint,
    Orientation, PointAlongLineLocation, SideOfRoad, TagsId,
};
pub use validator::{
    AnchorPlan, adjust_to_valid_distances, adjust_to_valid_points, expand_to_valid,
    validate_binary, validate_connected, validate_offsets,
};
