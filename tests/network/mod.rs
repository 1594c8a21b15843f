//! In-memory road network backing the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo::{BoundingRect, Distance, Haversine, LineString, Point, coord};
use openlr_encoder::{
    Anchor, Coordinate, EdgeReference, Fow, Frc, Length, NetworkEdge, PathSegment, RoadNetwork,
    TagsId, VehicleProfile,
};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u64);

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    index: usize,
    forward: bool,
    tags: TagsId,
    length: Length,
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.forward == other.forward
    }
}

impl NetworkEdge for Edge {
    fn tags(&self) -> TagsId {
        self.tags
    }

    fn length(&self) -> Length {
        self.length
    }

    fn is_forward(&self) -> bool {
        self.forward
    }

    fn reverse(self) -> Self {
        Self {
            forward: !self.forward,
            ..self
        }
    }
}

pub struct EdgeSpec {
    pub from: u64,
    pub to: u64,
    /// None: both directions, Some(true): stored direction only,
    /// Some(false): opposite direction only.
    pub oneway: Option<bool>,
    pub frc: Frc,
    pub fow: Fow,
    /// Advertised edge length; None derives it from the geometry.
    pub length: Option<f64>,
    /// Intermediate shape points as (lon, lat).
    pub shape: Vec<(f64, f64)>,
}

impl EdgeSpec {
    pub fn bidirectional(from: u64, to: u64) -> Self {
        Self {
            from,
            to,
            oneway: None,
            frc: Frc::Frc4,
            fow: Fow::SingleCarriageway,
            length: None,
            shape: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub oneway: Option<bool>,
    pub frc: Frc,
    pub fow: Fow,
}

pub struct Profile {
    pub rules: FxHashMap<TagsId, Rule>,
}

impl VehicleProfile for Profile {
    fn is_oneway(&self, tags: TagsId) -> Option<bool> {
        self.rules.get(&tags).and_then(|rule| rule.oneway)
    }

    fn weight(&self, _tags: TagsId, distance: Length) -> f64 {
        distance.meters()
    }

    fn classify(&self, tags: TagsId) -> Option<(Frc, Fow)> {
        self.rules.get(&tags).map(|rule| (rule.frc, rule.fow))
    }
}

struct EdgeRecord {
    from: VertexId,
    to: VertexId,
    tags: TagsId,
    length: Length,
    oneway: Option<bool>,
    /// Full polyline from `from` to `to`, endpoints included.
    geometry: Vec<Coordinate>,
}

struct SpatialEdge {
    index: usize,
    geometry: LineString,
}

impl RTreeObject for SpatialEdge {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        let bbox = self.geometry.bounding_rect().unwrap();
        AABB::from_corners(
            Point::new(bbox.min().x, bbox.min().y),
            Point::new(bbox.max().x, bbox.max().y),
        )
    }
}

impl PointDistance for SpatialEdge {
    fn distance_2(&self, point: &Point) -> f64 {
        use geo::{Closest, HaversineClosestPoint};

        match self.geometry.haversine_closest_point(point) {
            Closest::SinglePoint(p) | Closest::Intersection(p) => {
                Haversine.distance(p, *point).powf(2.0)
            }
            Closest::Indeterminate => f64::INFINITY,
        }
    }
}

/// Legal and illegal traversals adjacent to a vertex.
type Traversals = FxHashMap<VertexId, Vec<(Edge, VertexId, bool)>>;

pub struct Network {
    vertices: FxHashMap<VertexId, Coordinate>,
    records: Vec<EdgeRecord>,
    /// Traversals leaving a vertex.
    exits: Traversals,
    /// Traversals entering a vertex, keyed by their head.
    enters: Traversals,
    tree: RTree<SpatialEdge>,
    pub shortest_path_calls: Cell<usize>,
}

pub fn network(vertices: &[(u64, f64, f64)], specs: Vec<EdgeSpec>) -> (Network, Profile) {
    let vertex_map: FxHashMap<VertexId, Coordinate> = vertices
        .iter()
        .map(|&(id, lon, lat)| (VertexId(id), Coordinate { lon, lat }))
        .collect();

    let mut records = vec![];
    let mut rules = FxHashMap::default();

    for (index, spec) in specs.into_iter().enumerate() {
        let from = VertexId(spec.from);
        let to = VertexId(spec.to);

        let mut geometry = vec![vertex_map[&from]];
        geometry.extend(spec.shape.iter().map(|&(lon, lat)| Coordinate { lon, lat }));
        geometry.push(vertex_map[&to]);

        let length = spec
            .length
            .map(Length::from_meters)
            .unwrap_or_else(|| polyline_length(&geometry));

        let tags = TagsId(index as u64);
        rules.insert(
            tags,
            Rule {
                oneway: spec.oneway,
                frc: spec.frc,
                fow: spec.fow,
            },
        );

        records.push(EdgeRecord {
            from,
            to,
            tags,
            length,
            oneway: spec.oneway,
            geometry,
        });
    }

    let mut exits: Traversals = FxHashMap::default();
    let mut enters: Traversals = FxHashMap::default();

    for (index, record) in records.iter().enumerate() {
        let forward = Edge {
            index,
            forward: true,
            tags: record.tags,
            length: record.length,
        };
        let backward = forward.reverse();

        let forward_legal = record.oneway != Some(false);
        let backward_legal = record.oneway != Some(true);

        exits
            .entry(record.from)
            .or_default()
            .push((forward, record.to, forward_legal));
        enters
            .entry(record.to)
            .or_default()
            .push((forward, record.from, forward_legal));
        exits
            .entry(record.to)
            .or_default()
            .push((backward, record.from, backward_legal));
        enters
            .entry(record.from)
            .or_default()
            .push((backward, record.to, backward_legal));
    }

    // traversals returned in a deterministic order
    for traversals in exits.values_mut().chain(enters.values_mut()) {
        traversals.sort_by_key(|(edge, _, _)| (edge.index, edge.forward));
    }

    let tree = RTree::bulk_load(
        records
            .iter()
            .enumerate()
            .map(|(index, record)| SpatialEdge {
                index,
                geometry: LineString::from_iter(
                    record.geometry.iter().map(|c| coord! { x: c.lon, y: c.lat }),
                ),
            })
            .collect(),
    );

    let network = Network {
        vertices: vertex_map,
        records,
        exits,
        enters,
        tree,
        shortest_path_calls: Cell::new(0),
    };

    (network, Profile { rules })
}

impl Network {
    pub fn edge(&self, index: usize, forward: bool) -> Edge {
        let record = &self.records[index];
        let edge = Edge {
            index,
            forward: true,
            tags: record.tags,
            length: record.length,
        };

        if forward { edge } else { edge.reverse() }
    }

    pub fn coordinate(&self, vertex: u64) -> Coordinate {
        self.vertices[&VertexId(vertex)]
    }

    fn traversals(&self, map: &Traversals, vertex: VertexId) -> Vec<(Edge, VertexId, bool)> {
        map.get(&vertex).cloned().unwrap_or_default()
    }

    fn legal_degree(&self, vertex: VertexId) -> (Vec<Edge>, Vec<Edge>) {
        let filter = |map: &Traversals| {
            self.traversals(map, vertex)
                .into_iter()
                .filter(|(_, _, legal)| *legal)
                .map(|(edge, _, _)| edge)
                .collect::<Vec<_>>()
        };

        (filter(&self.enters), filter(&self.exits))
    }
}

impl RoadNetwork for Network {
    type VertexId = VertexId;
    type Edge = Edge;

    fn vertex_coordinate(&self, vertex: VertexId) -> Option<Coordinate> {
        self.vertices.get(&vertex).copied()
    }

    fn edge_vertices(&self, edge: Edge) -> Option<(VertexId, VertexId)> {
        let record = self.records.get(edge.index)?;
        if edge.forward {
            Some((record.from, record.to))
        } else {
            Some((record.to, record.from))
        }
    }

    fn edge_shape(&self, from: VertexId, to: VertexId) -> Vec<Coordinate> {
        for record in &self.records {
            let shape = &record.geometry[1..record.geometry.len() - 1];

            if record.from == from && record.to == to {
                return shape.to_vec();
            }
            if record.from == to && record.to == from {
                let mut shape = shape.to_vec();
                shape.reverse();
                return shape;
            }
        }

        vec![]
    }

    fn closest_edge(
        &self,
        coordinate: Coordinate,
        tolerance: Option<Length>,
    ) -> Option<EdgeReference<VertexId, Edge>> {
        let point = Point::new(coordinate.lon, coordinate.lat);
        let (spatial, distance_2) = self.tree.nearest_neighbor_iter_with_distance_2(&point).next()?;

        if let Some(tolerance) = tolerance
            && distance_2.sqrt() > tolerance.meters()
        {
            return None;
        }

        let record = &self.records[spatial.index];
        Some(EdgeReference {
            start: record.from,
            end: record.to,
            edge: self.edge(spatial.index, true),
        })
    }

    fn closest_edge_between(
        &self,
        start: Coordinate,
        end: Coordinate,
        tolerance: Length,
    ) -> Option<EdgeReference<VertexId, Edge>> {
        let mut best: Option<(f64, EdgeReference<VertexId, Edge>)> = None;

        for (index, record) in self.records.iter().enumerate() {
            let from = self.vertices[&record.from];
            let to = self.vertices[&record.to];

            let candidates = [
                (
                    EdgeReference {
                        start: record.from,
                        end: record.to,
                        edge: self.edge(index, true),
                    },
                    distance(from, start),
                    distance(to, end),
                ),
                (
                    EdgeReference {
                        start: record.to,
                        end: record.from,
                        edge: self.edge(index, false),
                    },
                    distance(to, start),
                    distance(from, end),
                ),
            ];

            for (reference, d1, d2) in candidates {
                if d1 <= tolerance.meters() && d2 <= tolerance.meters() {
                    let total = d1 + d2;
                    if best.as_ref().is_none_or(|(b, _)| total < *b) {
                        best = Some((total, reference));
                    }
                }
            }
        }

        best.map(|(_, reference)| reference)
    }

    fn shortest_path(
        &self,
        starts: Vec<PathSegment<VertexId, Edge>>,
        ends: Vec<PathSegment<VertexId, Edge>>,
        oneway_aware: bool,
    ) -> Option<PathSegment<VertexId, Edge>> {
        self.shortest_path_calls.set(self.shortest_path_calls.get() + 1);

        #[derive(PartialEq)]
        struct HeapElement {
            cost: f64,
            vertex: VertexId,
        }

        impl Eq for HeapElement {}

        // min heap with deterministic tie breaking
        impl Ord for HeapElement {
            fn cmp(&self, other: &Self) -> Ordering {
                other
                    .cost
                    .total_cmp(&self.cost)
                    .then_with(|| other.vertex.cmp(&self.vertex))
            }
        }

        impl PartialOrd for HeapElement {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut origins: FxHashMap<VertexId, PathSegment<VertexId, Edge>> = FxHashMap::default();
        for segment in starts {
            let Anchor::Vertex(vertex) = segment.anchor else {
                continue;
            };
            if origins
                .get(&vertex)
                .is_none_or(|origin| segment.cost < origin.cost)
            {
                origins.insert(vertex, segment);
            }
        }

        let mut targets: FxHashMap<VertexId, PathSegment<VertexId, Edge>> = FxHashMap::default();
        for segment in ends {
            let vertex = match (segment.anchor, segment.predecessor.as_deref()) {
                (Anchor::Vertex(vertex), None) => vertex,
                (Anchor::Projected, Some(predecessor)) => match predecessor.anchor {
                    Anchor::Vertex(vertex) => vertex,
                    Anchor::Projected => continue,
                },
                _ => continue,
            };
            if targets
                .get(&vertex)
                .is_none_or(|target| segment.cost < target.cost)
            {
                targets.insert(vertex, segment);
            }
        }

        let mut best_cost: FxHashMap<VertexId, f64> = origins
            .iter()
            .map(|(&vertex, segment)| (vertex, segment.cost))
            .collect();
        let mut parents: FxHashMap<VertexId, (VertexId, Edge)> = FxHashMap::default();

        let mut heap: BinaryHeap<HeapElement> = origins
            .iter()
            .map(|(&vertex, segment)| HeapElement {
                cost: segment.cost,
                vertex,
            })
            .collect();

        let mut best: Option<(f64, VertexId)> = None;

        while let Some(HeapElement { cost, vertex }) = heap.pop() {
            if cost > best_cost.get(&vertex).copied().unwrap_or(f64::INFINITY) {
                continue;
            }

            if let Some(target) = targets.get(&vertex) {
                let total = cost + target.cost;
                if best.is_none_or(|(b, _)| total < b) {
                    best = Some((total, vertex));
                }
            }

            for (edge, to, legal) in self.traversals(&self.exits, vertex) {
                if oneway_aware && !legal {
                    continue;
                }

                let next_cost = cost + edge.length.meters();
                if next_cost < best_cost.get(&to).copied().unwrap_or(f64::INFINITY) {
                    best_cost.insert(to, next_cost);
                    parents.insert(to, (vertex, edge));
                    heap.push(HeapElement {
                        cost: next_cost,
                        vertex: to,
                    });
                }
            }
        }

        let (_, terminal) = best?;

        let mut steps = vec![];
        let mut vertex = terminal;
        while let Some(&(previous, edge)) = parents.get(&vertex) {
            steps.push((vertex, edge));
            vertex = previous;
        }

        let mut segment = origins.remove(&vertex)?;
        let mut cost = segment.cost;
        for &(vertex, edge) in steps.iter().rev() {
            cost += edge.length.meters();
            segment = segment.extend(Anchor::Vertex(vertex), cost, edge);
        }

        let target = targets.remove(&terminal)?;
        if target.anchor == Anchor::Projected {
            segment = segment.extend(Anchor::Projected, cost + target.cost, target.edge?);
        }

        Some(segment)
    }

    fn is_vertex_valid(&self, vertex: VertexId) -> bool {
        let (entering, exiting) = self.legal_degree(vertex);

        match entering.len() + exiting.len() {
            2 => {
                // only valid as the dead end of a single line
                entering.len() == 1 && exiting.len() == 1 && entering[0].index == exiting[0].index
            }
            4 => {
                let mut indices: Vec<usize> = entering
                    .iter()
                    .chain(&exiting)
                    .map(|edge| edge.index)
                    .collect();
                indices.sort_unstable();

                // two pairwise lines let a route search step over the vertex
                !(indices[0] == indices[1] && indices[2] == indices[3] && indices[1] != indices[2])
            }
            _ => true,
        }
    }

    fn find_valid_vertex_for(
        &self,
        vertex: VertexId,
        edge: Edge,
        _neighbor: VertexId,
        exclude: &FxHashSet<VertexId>,
        forward: bool,
    ) -> Option<PathSegment<VertexId, Edge>> {
        let mut current = vertex;
        let mut blocked = edge.index;
        let mut path_vertices = vec![vertex];
        let mut path_edges: Vec<Edge> = vec![];

        for _ in 0..64 {
            let map = if forward { &self.exits } else { &self.enters };

            let candidates: Vec<(Edge, VertexId)> = self
                .traversals(map, current)
                .into_iter()
                .filter(|(edge, _, legal)| *legal && edge.index != blocked)
                .map(|(edge, vertex, _)| (edge, vertex))
                .collect();

            let &[(edge, next)] = candidates.as_slice() else {
                return None;
            };

            path_vertices.push(next);
            path_edges.push(edge);
            blocked = edge.index;
            current = next;

            if self.is_vertex_valid(next) && !exclude.contains(&next) {
                return Some(expansion_chain(&path_vertices, &path_edges, forward));
            }
        }

        None
    }
}

/// Packs the walked path into a chain that flattens to driving order:
/// away from the line end for a forward walk, into the line start otherwise.
fn expansion_chain(vertices: &[VertexId], edges: &[Edge], forward: bool) -> PathSegment<VertexId, Edge> {
    let mut cost = 0.0;

    if forward {
        let mut segment = PathSegment::root(Anchor::Vertex(vertices[0]));
        for (index, &edge) in edges.iter().enumerate() {
            cost += edge.length().meters();
            segment = segment.extend(Anchor::Vertex(vertices[index + 1]), cost, edge);
        }
        segment
    } else {
        let mut segment = PathSegment::root(Anchor::Vertex(vertices[vertices.len() - 1]));
        for index in (0..edges.len()).rev() {
            cost += edges[index].length().meters();
            segment = segment.extend(Anchor::Vertex(vertices[index]), cost, edges[index]);
        }
        segment
    }
}

fn distance(from: Coordinate, to: Coordinate) -> f64 {
    Haversine.distance(Point::new(from.lon, from.lat), Point::new(to.lon, to.lat))
}

fn polyline_length(coordinates: &[Coordinate]) -> Length {
    let meters = coordinates
        .windows(2)
        .map(|window| distance(window[0], window[1]))
        .sum();
    Length::from_meters(meters)
}

/// Two vertices joined by a single bidirectional edge, FRC 2 single
/// carriageway. The advertised edge length deliberately disagrees with the
/// geometry so that tests catch distances taken from the wrong source.
pub fn single_edge_network() -> (Network, Profile) {
    network(
        &[(1, 6.12829, 49.60597), (2, 6.12779, 49.60521)],
        vec![EdgeSpec {
            oneway: None,
            frc: Frc::Frc2,
            fow: Fow::SingleCarriageway,
            length: Some(10.0),
            ..EdgeSpec::bidirectional(1, 2)
        }],
    )
}

/// The single edge network restricted to the direction opposite to the
/// stored one.
pub fn oneway_network() -> (Network, Profile) {
    network(
        &[(1, 6.12829, 49.60597), (2, 6.12779, 49.60521)],
        vec![EdgeSpec {
            oneway: Some(false),
            frc: Frc::Frc2,
            fow: Fow::SingleCarriageway,
            ..EdgeSpec::bidirectional(1, 2)
        }],
    )
}

/// A west-east main street with spur streets at the second and fourth
/// crossing, all bidirectional and roughly 100 m long:
///
/// ```text
///         6       7
///         |       |
/// 1 - 2 - 3 - 4 - 5
/// ```
///
/// Vertices 2 and 4 are junctions (valid), vertex 3 only connects its two
/// neighbors pairwise (invalid), all other vertices are dead ends (valid).
///
/// Edge indices: 0: 1-2, 1: 2-3, 2: 3-4, 3: 4-5, 4: 2-6, 5: 4-7.
pub fn corridor_network() -> (Network, Profile) {
    const LON_STEP: f64 = 0.00139;

    network(
        &[
            (1, 6.12000, 49.60500),
            (2, 6.12000 + LON_STEP, 49.60500),
            (3, 6.12000 + 2.0 * LON_STEP, 49.60500),
            (4, 6.12000 + 3.0 * LON_STEP, 49.60500),
            (5, 6.12000 + 4.0 * LON_STEP, 49.60500),
            (6, 6.12000 + LON_STEP, 49.60590),
            (7, 6.12000 + 3.0 * LON_STEP, 49.60590),
        ],
        vec![
            EdgeSpec::bidirectional(1, 2),
            EdgeSpec::bidirectional(2, 3),
            EdgeSpec::bidirectional(3, 4),
            EdgeSpec::bidirectional(4, 5),
            EdgeSpec::bidirectional(2, 6),
            EdgeSpec::bidirectional(4, 7),
        ],
    )
}

/// A straight chain of 8 bidirectional edges, each roughly 2.4 km long.
pub fn long_road_network() -> (Network, Profile) {
    const LON_STEP: f64 = 0.033261;

    let vertices: Vec<(u64, f64, f64)> = (0..9)
        .map(|index| (index, 6.0 + index as f64 * LON_STEP, 49.60500))
        .collect();

    let edges = (0..8)
        .map(|index| EdgeSpec {
            frc: Frc::Frc2,
            ..EdgeSpec::bidirectional(index, index + 1)
        })
        .collect();

    network(&vertices, edges)
}

/// A single edge whose advertised length exceeds the maximum distance
/// between two location reference points.
pub fn overlong_edge_network() -> (Network, Profile) {
    network(
        &[(1, 6.12000, 49.60500), (2, 6.12139, 49.60500)],
        vec![EdgeSpec {
            length: Some(16_000.0),
            ..EdgeSpec::bidirectional(1, 2)
        }],
    )
}

/// A single edge bending north after 15 m, dead ends on both sides.
pub fn bend_network() -> (Network, Profile) {
    network(
        &[(1, 6.12000, 49.60500), (2, 6.1202082, 49.6052698)],
        vec![EdgeSpec {
            shape: vec![(6.1202082, 49.60500)],
            ..EdgeSpec::bidirectional(1, 2)
        }],
    )
}
