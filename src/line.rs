use crate::geometry;
use crate::graph::{NetworkEdge, RoadNetwork};
use crate::model::{Coordinate, Length, Orientation};

/// In-memory representation of a path through the road network.
///
/// Invariants:
/// - `edges[i]` connects `vertices[i]` to `vertices[i + 1]` and is
///   traversable in that direction under the vehicle profile,
/// - both offsets are non-negative percentages below 100 and their sum does
///   not exceed 100,
/// - `edge_shapes`, once filled, holds the intermediate shape points of every
///   edge in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedLine<V, E> {
    pub vertices: Vec<V>,
    pub edges: Vec<E>,
    /// Per edge shape cache, empty until filled before encoding.
    pub edge_shapes: Vec<Vec<Coordinate>>,
    /// Distance from the start of the path to the start of the location, as a
    /// percentage of the path length.
    pub pos_offset_pct: f64,
    /// Distance from the end of the location to the end of the path, as a
    /// percentage of the path length.
    pub neg_offset_pct: f64,
}

impl<V: Copy + PartialEq, E: NetworkEdge> ReferencedLine<V, E> {
    pub fn new(vertices: Vec<V>, edges: Vec<E>, pos_offset_pct: f64, neg_offset_pct: f64) -> Self {
        Self {
            vertices,
            edges,
            edge_shapes: vec![],
            pos_offset_pct,
            neg_offset_pct,
        }
    }

    /// Sum of the advertised edge lengths.
    pub fn path_length(&self) -> Length {
        self.edges.iter().map(|edge| edge.length()).sum()
    }

    /// Full coordinate polyline of the directed edge at the given index,
    /// including both endpoint vertices.
    pub fn edge_geometry<G>(&self, graph: &G, index: usize) -> Vec<Coordinate>
    where
        G: RoadNetwork<VertexId = V, Edge = E>,
    {
        let from = self.vertices[index];
        let to = self.vertices[index + 1];

        let mut coordinates = vec![];
        coordinates.extend(graph.vertex_coordinate(from));

        if let Some(shape) = self.edge_shapes.get(index) {
            coordinates.extend_from_slice(shape);
        } else {
            coordinates.extend(graph.edge_shape(from, to));
        }

        coordinates.extend(graph.vertex_coordinate(to));
        coordinates
    }

    /// Full coordinate polyline of the whole path.
    pub fn geometry<G>(&self, graph: &G) -> Vec<Coordinate>
    where
        G: RoadNetwork<VertexId = V, Edge = E>,
    {
        let mut coordinates = vec![];
        coordinates.extend(graph.vertex_coordinate(self.vertices[0]));

        for index in 0..self.edges.len() {
            let to = self.vertices[index + 1];

            if let Some(shape) = self.edge_shapes.get(index) {
                coordinates.extend_from_slice(shape);
            } else {
                coordinates.extend(graph.edge_shape(self.vertices[index], to));
            }

            coordinates.extend(graph.vertex_coordinate(to));
        }

        coordinates
    }

    /// Length of the path coordinate polyline.
    pub fn geometry_length<G>(&self, graph: &G) -> Length
    where
        G: RoadNetwork<VertexId = V, Edge = E>,
    {
        self.segment_length(graph, 0, self.edges.len())
    }

    /// Length of the coordinate polyline covering the edges in
    /// `from..to`.
    pub(crate) fn segment_length<G>(&self, graph: &G, from: usize, to: usize) -> Length
    where
        G: RoadNetwork<VertexId = V, Edge = E>,
    {
        (from..to)
            .map(|index| geometry::polyline_length(&self.edge_geometry(graph, index)))
            .sum()
    }

    /// Queries and caches the shape points of every edge of the path.
    pub fn fill_edge_shapes<G>(&mut self, graph: &G)
    where
        G: RoadNetwork<VertexId = V, Edge = E>,
    {
        self.edge_shapes = self
            .vertices
            .windows(2)
            .map(|window| graph.edge_shape(window[0], window[1]))
            .collect();
    }
}

/// A point location defined by a referenced line and the coordinate the point
/// projects from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedPointAlongLine<V, E> {
    pub route: ReferencedLine<V, E>,
    pub coordinate: Coordinate,
    pub orientation: Orientation,
}
