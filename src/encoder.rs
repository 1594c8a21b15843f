//! Emits the OpenLR location reference points of a validated referenced
//! location.
//!
//! 1. Check validity of the location and offsets to be encoded.
//! 2. Adjust start and end node of the location to represent valid map nodes.
//! 3. Add intermediate location reference points where the distance between
//!    two consecutive points would exceed the maximum distance, and remove
//!    the start/end point if the positive/negative offset value exceeds the
//!    length of the corresponding path.
//! 4. Create the location reference points with their physical attributes.

use tracing::debug;

use crate::EncodeError;
use crate::geometry;
use crate::graph::{NetworkEdge, RoadNetwork, VehicleProfile};
use crate::line::{ReferencedLine, ReferencedPointAlongLine};
use crate::model::{
    Bearing, Coordinate, Length, LocationReferencePath, LocationReferencePoint,
    PointAlongLineLocation, SideOfRoad,
};
use crate::validator::{
    AnchorPlan, adjust_to_valid_distances, adjust_to_valid_points, validate_binary,
    validate_connected, validate_offsets,
};

/// The bearing of an LRP is taken against the point this far along the
/// attached line.
const BEARING_DISTANCE: Length = Length::from_meters(20.0);

/// Points closer than this to the line are considered to be on the road.
const SIDE_OF_ROAD_TOLERANCE: Length = Length::from_meters(1.0);

/// Encodes a referenced line into an ordered list of location reference
/// points with percentage offsets.
pub fn encode_line<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Result<LocationReferencePath, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    debug!("encoding line location over {} edges", line.edges.len());

    let (line, plan) = prepare(graph, profile, line)?;
    let points = resolve_points(graph, profile, &line, &plan)?;

    let first = plan.anchors[0];
    let last = plan.anchors[plan.anchors.len() - 1];
    let encoded_length = line.segment_length(graph, first, last);

    Ok(LocationReferencePath {
        points,
        pos_offset_pct: percentage(plan.pos_offset, encoded_length),
        neg_offset_pct: percentage(plan.neg_offset, encoded_length),
    })
}

/// Encodes a referenced point along line into its two location reference
/// points, the projection offset, the side of road and the orientation.
pub fn encode_point_along_line<G, P>(
    graph: &G,
    profile: &P,
    point: &ReferencedPointAlongLine<G::VertexId, G::Edge>,
) -> Result<PointAlongLineLocation, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    debug!("encoding point along line at {:?}", point.coordinate);

    let (line, plan) = prepare(graph, profile, &point.route)?;

    // a point along line is referenced by exactly two LRPs
    if plan.anchors.len() != 2 {
        return Err(EncodeError::DistanceTooLarge);
    }

    let points = resolve_points(graph, profile, &line, &plan)?;

    let polyline = line.geometry(graph);
    let projection = geometry::project_onto(&polyline, point.coordinate)
        .ok_or(EncodeError::ProjectionFailed)?;

    let side_of_road = if projection.distance_to <= SIDE_OF_ROAD_TOLERANCE {
        SideOfRoad::OnRoadOrUnknown
    } else {
        geometry::side_of(
            polyline[projection.segment],
            polyline[projection.segment + 1],
            point.coordinate,
        )
    };

    let total = geometry::polyline_length(&polyline);

    Ok(PointAlongLineLocation {
        first: points[0],
        last: points[1],
        pos_offset_pct: percentage(projection.distance_along, total),
        orientation: point.orientation,
        side_of_road,
    })
}

/// Runs the validation pipeline and resolves the anchor plan of the LRPs.
#[allow(clippy::type_complexity)]
fn prepare<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Result<(ReferencedLine<G::VertexId, G::Edge>, AnchorPlan), EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    validate_connected(graph, profile, line)?;
    validate_offsets(graph, line)?;
    validate_binary(graph, profile, line)?;

    let mut line = adjust_to_valid_points(graph, profile, line.clone())?;
    line.fill_edge_shapes(graph);

    let anchors = vec![0, line.vertices.len() - 1];
    let plan = adjust_to_valid_distances(graph, &line, anchors)?;

    Ok((line, plan))
}

fn resolve_points<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
    plan: &AnchorPlan,
) -> Result<Vec<LocationReferencePoint>, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let mut points = Vec::with_capacity(plan.anchors.len());

    for window in plan.anchors.windows(2) {
        points.push(anchor_point(graph, profile, line, window[0], window[1])?);
    }

    points.push(last_point(
        graph,
        profile,
        line,
        plan.anchors[plan.anchors.len() - 1],
    )?);

    Ok(points)
}

/// Resolves the LRP anchored at the vertex `index` whose successor is
/// anchored at the vertex `next`.
fn anchor_point<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
    index: usize,
    next: usize,
) -> Result<LocationReferencePoint, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let coordinate = coordinate_of(graph, line.vertices[index])?;
    let edge = line.edges[index];

    let (frc, fow) = profile
        .classify(edge.tags())
        .ok_or(EncodeError::ClassificationFailed)?;

    let polyline = line.edge_geometry(graph, index);
    let bearing = bearing_along(&polyline)?;
    let distance = line.segment_length(graph, index, next).round();

    Ok(LocationReferencePoint {
        coordinate,
        bearing,
        frc,
        fow,
        lowest_frc_to_next: frc,
        distance_to_next: Some(distance),
    })
}

/// Resolves the last LRP: its attributes refer to the incoming edge and the
/// bearing is taken against the driving direction.
fn last_point<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
    index: usize,
) -> Result<LocationReferencePoint, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let coordinate = coordinate_of(graph, line.vertices[index])?;
    let edge = line.edges[index - 1];

    let (frc, fow) = profile
        .classify(edge.tags())
        .ok_or(EncodeError::ClassificationFailed)?;

    let mut polyline = line.edge_geometry(graph, index - 1);
    polyline.reverse();
    let bearing = bearing_along(&polyline)?;

    Ok(LocationReferencePoint {
        coordinate,
        bearing,
        frc,
        fow,
        lowest_frc_to_next: frc,
        distance_to_next: None,
    })
}

/// The azimuth of the line from the start of the polyline to the point 20 m
/// along it, clockwise from the geographic North.
fn bearing_along(polyline: &[Coordinate]) -> Result<Bearing, EncodeError> {
    let target = geometry::point_along(polyline, BEARING_DISTANCE)
        .ok_or_else(|| EncodeError::EncodingFailed("edge geometry is degenerate".into()))?;

    Ok(geometry::bearing(polyline[0], target))
}

fn coordinate_of<G: RoadNetwork>(
    graph: &G,
    vertex: G::VertexId,
) -> Result<Coordinate, EncodeError> {
    graph.vertex_coordinate(vertex).ok_or_else(|| {
        EncodeError::EncodingFailed(format!("coordinate of vertex {vertex:?} is unknown"))
    })
}

/// Offset as a percentage of the path, kept within `[0, 100)` under floating
/// point slop.
fn percentage(offset: Length, total: Length) -> f32 {
    let pct = (offset / total * 100.0).max(0.0) as f32;
    if pct >= 100.0 { 99.0 } else { pct }
}
