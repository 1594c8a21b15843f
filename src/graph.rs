use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::{Coordinate, Fow, Frc, Length, TagsId};

/// A directed traversal of a line of the road network.
///
/// A traversal against the stored direction of a line is represented by a
/// distinct edge value obtained via [`NetworkEdge::reverse`], so that
/// `a == b.reverse()` is a defined equivalence usable for path splicing.
pub trait NetworkEdge: Copy + PartialEq + Debug {
    /// Handle into the tag index of the network.
    fn tags(&self) -> TagsId;

    /// Advertised length of the edge in meters.
    fn length(&self) -> Length;

    /// True if this traversal follows the stored direction of the line.
    fn is_forward(&self) -> bool;

    /// The same line traversed in the opposite direction.
    #[must_use]
    fn reverse(self) -> Self;
}

/// An edge together with the vertices it connects, oriented in traversal
/// direction. Produced by the nearest-edge queries; the "reversed" case is a
/// new record rather than a mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeReference<V, E> {
    pub start: V,
    pub end: V,
    pub edge: E,
}

impl<V: Copy, E: NetworkEdge> EdgeReference<V, E> {
    /// The same line traversed from `end` to `start`.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            edge: self.edge.reverse(),
        }
    }
}

/// Endpoint of a path segment: either a real network vertex or the projected
/// mid-edge position a route starts or ends at. Projected anchors only exist
/// while a route is being built and are materialised back to real vertices
/// before a referenced line is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor<V> {
    Vertex(V),
    Projected,
}

/// Element of an owned linked chain describing a path through the network.
/// Each segment holds the edge used to reach its anchor from the predecessor
/// anchor and the accumulated cost from the origin of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment<V, E> {
    pub anchor: Anchor<V>,
    pub cost: f64,
    pub edge: Option<E>,
    pub predecessor: Option<Box<PathSegment<V, E>>>,
}

impl<V: Copy + PartialEq, E: Copy> PathSegment<V, E> {
    /// A chain of a single anchor with no predecessor.
    pub fn root(anchor: Anchor<V>) -> Self {
        Self {
            anchor,
            cost: 0.0,
            edge: None,
            predecessor: None,
        }
    }

    /// Grows the chain by one segment. The cost is the accumulated cost from
    /// the origin of the chain up to the new anchor.
    #[must_use]
    pub fn extend(self, anchor: Anchor<V>, cost: f64, edge: E) -> Self {
        Self {
            anchor,
            cost,
            edge: Some(edge),
            predecessor: Some(Box::new(self)),
        }
    }

    /// Unpacks the chain into anchors and edges ordered from the origin of
    /// the chain to this segment.
    pub fn flatten(&self) -> (Vec<Anchor<V>>, Vec<E>) {
        let mut anchors = vec![];
        let mut edges = vec![];
        let mut current = Some(self);

        while let Some(segment) = current {
            anchors.push(segment.anchor);
            if let Some(edge) = segment.edge {
                edges.push(edge);
            }
            current = segment.predecessor.as_deref();
        }

        anchors.reverse();
        edges.reverse();
        (anchors, edges)
    }

    /// True if any anchor of the chain is the given vertex.
    pub fn contains_vertex(&self, vertex: V) -> bool {
        let mut current = Some(self);

        while let Some(segment) = current {
            if segment.anchor == Anchor::Vertex(vertex) {
                return true;
            }
            current = segment.predecessor.as_deref();
        }

        false
    }
}

/// Read-only view of a road network.
/// Should be implemented by the graph that represents the map the encoder is
/// supposed to run on. The view is borrowed immutably for the duration of an
/// encode call; the caller guarantees no concurrent writer.
pub trait RoadNetwork {
    /// Uniquely identify a vertex that belongs to the graph.
    type VertexId: Debug + Copy + Eq + Ord + Hash;
    /// Uniquely identify a directed edge that belongs to the graph.
    type Edge: NetworkEdge;

    /// Gets the coordinate of the vertex.
    /// Returns None if the vertex doesn't belong to the graph.
    fn vertex_coordinate(&self, vertex: Self::VertexId) -> Option<Coordinate>;

    /// Gets the start and end vertices of the edge, in traversal direction.
    /// Returns None if the edge doesn't belong to the graph.
    fn edge_vertices(&self, edge: Self::Edge) -> Option<(Self::VertexId, Self::VertexId)>;

    /// Gets the intermediate shape points of the edge connecting the two
    /// vertices, ordered from `from` to `to` and excluding the endpoints.
    /// Returns an empty sequence for a straight edge or if no edge connects
    /// the two vertices.
    fn edge_shape(&self, from: Self::VertexId, to: Self::VertexId) -> Vec<Coordinate>;

    /// Gets the closest edge to the coordinate, oriented as stored.
    /// With a tolerance, edges further away than the tolerance are ignored.
    fn closest_edge(
        &self,
        coordinate: Coordinate,
        tolerance: Option<Length>,
    ) -> Option<EdgeReference<Self::VertexId, Self::Edge>>;

    /// Gets the edge whose endpoints are closest to the two coordinates,
    /// oriented so that `start` matches the first coordinate. Used to
    /// disambiguate between candidate edges sharing a vertex.
    fn closest_edge_between(
        &self,
        start: Coordinate,
        end: Coordinate,
        tolerance: Length,
    ) -> Option<EdgeReference<Self::VertexId, Self::Edge>>;

    /// Finds the cheapest path from any of the start chains to any of the end
    /// chains. Start chains end in the vertex the search grows from; end
    /// chains are appended behind their predecessor vertex once it is
    /// reached. When `oneway_aware` is set the search must not traverse
    /// edges against their permitted direction.
    fn shortest_path(
        &self,
        starts: Vec<PathSegment<Self::VertexId, Self::Edge>>,
        ends: Vec<PathSegment<Self::VertexId, Self::Edge>>,
        oneway_aware: bool,
    ) -> Option<PathSegment<Self::VertexId, Self::Edge>>;

    /// True if the vertex is a valid network node in the sense of the OpenLR
    /// data format rules, typically a topological test such as "a shortest
    /// path search has to make a decision here".
    fn is_vertex_valid(&self, vertex: Self::VertexId) -> bool;

    /// Searches outward from the vertex, away from the given edge of the
    /// route (which points towards `neighbor`), for a path to a valid vertex
    /// not contained in `exclude`. With `forward` set the path leaves the
    /// vertex, otherwise it enters it. The returned chain flattens to the
    /// path in driving direction. Returns None when the search is exhausted.
    fn find_valid_vertex_for(
        &self,
        vertex: Self::VertexId,
        edge: Self::Edge,
        neighbor: Self::VertexId,
        exclude: &FxHashSet<Self::VertexId>,
        forward: bool,
    ) -> Option<PathSegment<Self::VertexId, Self::Edge>>;
}

/// Vehicle specific view of the edge tags.
/// Profiles outlive encode calls and are shared read-only.
pub trait VehicleProfile {
    /// Oneway restriction of the tagged line: None means both directions are
    /// open, Some(true) only the stored direction, Some(false) only the
    /// opposite direction.
    fn is_oneway(&self, tags: TagsId) -> Option<bool>;

    /// Traversal cost of covering the given distance on the tagged line.
    fn weight(&self, tags: TagsId, distance: Length) -> f64;

    /// FRC and FOW of the tagged line, None if the tags cannot be classified.
    fn classify(&self, tags: TagsId) -> Option<(Frc, Fow)>;
}

/// True if the edge can be driven in its traversal direction under the
/// profile's oneway rules.
pub fn can_traverse<P: VehicleProfile>(profile: &P, edge: &impl NetworkEdge) -> bool {
    match profile.is_oneway(edge.tags()) {
        None => true,
        Some(forward_only) => forward_only == edge.is_forward(),
    }
}
