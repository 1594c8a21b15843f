//! Builds canonical referenced locations from raw WGS84 coordinates.
//!
//! The builder projects coordinates onto the nearest traversable edges,
//! creates virtual path segments for mid-edge endpoints, runs the
//! oneway-aware shortest path search of the road network and materialises the
//! result into plain vertex and edge sequences ready for encoding.

mod segments;

use tracing::debug;

use crate::EncodeError;
use crate::geometry;
use crate::graph::{
    Anchor, EdgeReference, NetworkEdge, RoadNetwork, VehicleProfile, can_traverse,
};
use crate::line::{ReferencedLine, ReferencedPointAlongLine};
use crate::model::{Coordinate, Length, Orientation};
use crate::validator::expand_to_valid;
use segments::{Role, anchor_segments};

/// Distance under which a projected point is snapped to an edge endpoint.
const VERTEX_SNAP_TOLERANCE: Length = Length::from_meters(1.0);

/// A route endpoint located on a specific edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EndpointAnchor<V, E> {
    reference: EdgeReference<V, E>,
    /// Distance from the start vertex of the edge, following its geometry.
    distance_along: Length,
    /// The coordinate the endpoint was located from.
    coordinate: Coordinate,
}

pub struct LocationBuilder<'a, G, P> {
    graph: &'a G,
    profile: &'a P,
}

impl<'a, G: RoadNetwork, P: VehicleProfile> LocationBuilder<'a, G, P> {
    pub const fn new(graph: &'a G, profile: &'a P) -> Self {
        Self { graph, profile }
    }

    /// Builds a point location by projecting the coordinate onto the closest
    /// traversable edge and referencing the whole edge as the covering line.
    pub fn point_along_line(
        &self,
        coordinate: Coordinate,
    ) -> Result<ReferencedPointAlongLine<G::VertexId, G::Edge>, EncodeError> {
        let reference = self
            .graph
            .closest_edge(coordinate, None)
            .ok_or(EncodeError::NoNetworkNearby)?;

        // make sure the edge tuple is traversable from start to end
        let reference = if can_traverse(self.profile, &reference.edge) {
            reference
        } else {
            reference.reversed()
        };

        let start = self.coordinate_of(reference.start)?;
        let end = self.coordinate_of(reference.end)?;

        let route = self.line_vertex_exact(
            (start, end),
            Length::ZERO,
            (start, end),
            Length::ZERO,
            VERTEX_SNAP_TOLERANCE,
        )?;

        Ok(ReferencedPointAlongLine {
            route,
            coordinate,
            orientation: Orientation::Unknown,
        })
    }

    /// Builds a line location between two arbitrary coordinates, each of
    /// which must be within `tolerance` of a network edge.
    pub fn line_between(
        &self,
        start: Coordinate,
        end: Coordinate,
        tolerance: Length,
    ) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError> {
        debug!("building line location between {start:?} and {end:?}");

        let start = self.locate(start, tolerance)?;
        let end = self.locate(end, tolerance)?;
        self.route_between(start, end, tolerance)
    }

    /// Builds a line location from an explicit path through the network.
    /// The path is validated, expanded so that its endpoints are valid
    /// network nodes, and its shape cache is filled.
    pub fn line(
        &self,
        vertices: Vec<G::VertexId>,
        edges: Vec<G::Edge>,
        pos_offset_pct: f64,
        neg_offset_pct: f64,
    ) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError> {
        if vertices.len() < 2 || edges.len() + 1 != vertices.len() {
            return Err(EncodeError::DisconnectedRoute);
        }

        let within = |pct: f64| (0.0..100.0).contains(&pct);
        if !within(pos_offset_pct)
            || !within(neg_offset_pct)
            || pos_offset_pct + neg_offset_pct > 100.0
        {
            return Err(EncodeError::InvalidOffsets {
                pos: pos_offset_pct,
                neg: neg_offset_pct,
            });
        }

        let line = ReferencedLine::new(vertices, edges, pos_offset_pct, neg_offset_pct);
        let mut line = expand_to_valid(self.graph, self.profile, line)?;
        line.fill_edge_shapes(self.graph);
        Ok(line)
    }

    /// Builds a line location between two edges identified by the
    /// coordinates of their endpoints. The start anchor sits `start_offset`
    /// meters after the start of its edge, the end anchor `end_offset` meters
    /// before the end of its edge.
    fn line_vertex_exact(
        &self,
        start_edge: (Coordinate, Coordinate),
        start_offset: Length,
        end_edge: (Coordinate, Coordinate),
        end_offset: Length,
        tolerance: Length,
    ) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError> {
        let start_reference = self
            .graph
            .closest_edge_between(start_edge.0, start_edge.1, tolerance)
            .ok_or(EncodeError::TooFarFromNetwork { tolerance })?;

        let end_reference = self
            .graph
            .closest_edge_between(end_edge.0, end_edge.1, tolerance)
            .ok_or(EncodeError::TooFarFromNetwork { tolerance })?;

        let start_geometry = self.reference_polyline(&start_reference)?;
        let end_geometry = self.reference_polyline(&end_reference)?;
        let end_along = geometry::polyline_length(&end_geometry) - end_offset;

        let start = EndpointAnchor {
            coordinate: geometry::point_along(&start_geometry, start_offset)
                .ok_or(EncodeError::ProjectionFailed)?,
            reference: start_reference,
            distance_along: start_offset,
        };

        let end = EndpointAnchor {
            coordinate: geometry::point_along(&end_geometry, end_along)
                .ok_or(EncodeError::ProjectionFailed)?,
            reference: end_reference,
            distance_along: end_along,
        };

        self.route_between(start, end, tolerance)
    }

    /// Locates a coordinate on the network: closest edge plus the projection
    /// onto its geometry.
    fn locate(
        &self,
        coordinate: Coordinate,
        tolerance: Length,
    ) -> Result<EndpointAnchor<G::VertexId, G::Edge>, EncodeError> {
        let reference = self
            .graph
            .closest_edge(coordinate, Some(tolerance))
            .ok_or(EncodeError::TooFarFromNetwork { tolerance })?;

        let polyline = self.reference_polyline(&reference)?;
        let projection =
            geometry::project_onto(&polyline, coordinate).ok_or(EncodeError::ProjectionFailed)?;

        Ok(EndpointAnchor {
            reference,
            distance_along: projection.distance_along,
            coordinate,
        })
    }

    /// Stitches the route between the two located endpoints.
    fn route_between(
        &self,
        start: EndpointAnchor<G::VertexId, G::Edge>,
        end: EndpointAnchor<G::VertexId, G::Edge>,
        tolerance: Length,
    ) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError> {
        if let Some(line) = self.try_single_edge(&start, &end)? {
            return Ok(line);
        }

        let start_length = geometry::polyline_length(&self.reference_polyline(&start.reference)?);
        let end_length = geometry::polyline_length(&self.reference_polyline(&end.reference)?);

        let starts = anchor_segments(
            self.profile,
            &start.reference,
            start_length,
            start.distance_along,
            Role::Source,
            tolerance,
        );
        let ends = anchor_segments(
            self.profile,
            &end.reference,
            end_length,
            end.distance_along,
            Role::Target,
            tolerance,
        );

        if starts.is_empty() || ends.is_empty() {
            return Err(EncodeError::RouteNotFound);
        }

        let start_snapped = starts.iter().all(|segment| segment.edge.is_none());
        let end_snapped = ends.iter().all(|segment| segment.edge.is_none());

        let path = self
            .graph
            .shortest_path(starts, ends, true)
            .ok_or(EncodeError::RouteNotFound)?;

        let (anchors, edges) = path.flatten();
        if edges.is_empty() {
            return Err(EncodeError::RouteNotFound);
        }

        let vertices = self.materialize(&anchors, &edges)?;

        // the route must enter and leave the network on the projected edges
        let matches = |routed: &G::Edge, located: &EdgeReference<G::VertexId, G::Edge>| {
            *routed == located.edge || *routed == located.edge.reverse()
        };
        if !start_snapped && !matches(&edges[0], &start.reference) {
            return Err(EncodeError::RoutingMismatch);
        }
        if !end_snapped && !matches(edges.last().unwrap_or(&edges[0]), &end.reference) {
            return Err(EncodeError::RoutingMismatch);
        }

        self.finish_route(vertices, edges, &start, &end)
    }

    /// Collapses the route to a single edge when both endpoints sit on the
    /// same line and the offsets are ordered along it. The traversal
    /// direction is chosen by comparing the offsets.
    #[allow(clippy::type_complexity)]
    fn try_single_edge(
        &self,
        start: &EndpointAnchor<G::VertexId, G::Edge>,
        end: &EndpointAnchor<G::VertexId, G::Edge>,
    ) -> Result<Option<ReferencedLine<G::VertexId, G::Edge>>, EncodeError> {
        let same = start.reference.edge == end.reference.edge;
        let opposite = start.reference.edge == end.reference.edge.reverse();

        if !same && !opposite {
            return Ok(None);
        }

        let length = geometry::polyline_length(&self.reference_polyline(&start.reference)?);
        let along_start = start.distance_along;
        let along_end = if opposite {
            length - end.distance_along
        } else {
            end.distance_along
        };

        let single = if along_start <= along_end && can_traverse(self.profile, &start.reference.edge)
        {
            Some(start.reference)
        } else if along_start > along_end
            && can_traverse(self.profile, &start.reference.edge.reverse())
        {
            Some(start.reference.reversed())
        } else {
            None
        };

        let Some(reference) = single else {
            return Ok(None);
        };

        debug!("collapsing route to the single edge {reference:?}");

        let vertices = vec![reference.start, reference.end];
        let edges = vec![reference.edge];
        self.finish_route(vertices, edges, start, end).map(Some)
    }

    /// Replaces projected anchors with the real vertex of their half edge.
    fn materialize(
        &self,
        anchors: &[Anchor<G::VertexId>],
        edges: &[G::Edge],
    ) -> Result<Vec<G::VertexId>, EncodeError> {
        let mut vertices = Vec::with_capacity(anchors.len());

        for (index, anchor) in anchors.iter().enumerate() {
            let vertex = match anchor {
                Anchor::Vertex(vertex) => Some(*vertex),
                Anchor::Projected if index == 0 => {
                    self.graph.edge_vertices(edges[0]).map(|(from, _)| from)
                }
                Anchor::Projected if index == anchors.len() - 1 => self
                    .graph
                    .edge_vertices(edges[index - 1])
                    .map(|(_, to)| to),
                Anchor::Projected => None,
            };

            vertices.push(vertex.ok_or_else(|| {
                EncodeError::EncodingFailed("projected anchor inside the routed path".into())
            })?);
        }

        Ok(vertices)
    }

    /// Re-projects the endpoint coordinates onto the first and last routed
    /// edges, converts the projections into percentage offsets of the whole
    /// path and finalises the referenced line.
    fn finish_route(
        &self,
        vertices: Vec<G::VertexId>,
        edges: Vec<G::Edge>,
        start: &EndpointAnchor<G::VertexId, G::Edge>,
        end: &EndpointAnchor<G::VertexId, G::Edge>,
    ) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError> {
        let total: Length = vertices
            .windows(2)
            .map(|window| {
                self.vertex_polyline(window[0], window[1])
                    .map(|polyline| geometry::polyline_length(&polyline))
            })
            .sum::<Result<Length, _>>()?;

        let first = self.vertex_polyline(vertices[0], vertices[1])?;
        let projection = geometry::project_onto(&first, start.coordinate)
            .ok_or(EncodeError::ProjectionFailed)?;
        let pos_offset = projection.distance_along;

        let last = self.vertex_polyline(vertices[vertices.len() - 2], vertices[vertices.len() - 1])?;
        let projection = geometry::project_onto(&last, end.coordinate)
            .ok_or(EncodeError::ProjectionFailed)?;
        let neg_offset = geometry::polyline_length(&last) - projection.distance_along;

        let percentage = |offset: Length| (offset / total * 100.0).clamp(0.0, 100.0);

        self.line(
            vertices,
            edges,
            percentage(pos_offset),
            percentage(neg_offset),
        )
    }

    fn coordinate_of(&self, vertex: G::VertexId) -> Result<Coordinate, EncodeError> {
        self.graph.vertex_coordinate(vertex).ok_or_else(|| {
            EncodeError::EncodingFailed(format!("coordinate of vertex {vertex:?} is unknown"))
        })
    }

    fn vertex_polyline(
        &self,
        from: G::VertexId,
        to: G::VertexId,
    ) -> Result<Vec<Coordinate>, EncodeError> {
        let mut coordinates = vec![self.coordinate_of(from)?];
        coordinates.extend(self.graph.edge_shape(from, to));
        coordinates.push(self.coordinate_of(to)?);
        Ok(coordinates)
    }

    fn reference_polyline(
        &self,
        reference: &EdgeReference<G::VertexId, G::Edge>,
    ) -> Result<Vec<Coordinate>, EncodeError> {
        self.vertex_polyline(reference.start, reference.end)
    }
}
