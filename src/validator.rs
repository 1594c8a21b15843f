//! Enforces the OpenLR data format rules on referenced lines.
//!
//! Location reference points should be placed on valid network nodes. Valid
//! nodes are such nodes where a shortest path calculation needs to decide
//! between several different ways; invalid nodes, on the contrary, can be
//! stepped over during route search. Since the start and the end of a
//! location become location reference points, these nodes are adjusted to
//! valid nodes if necessary by expanding the location, and the real start and
//! end are then referenced using offsets.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::EncodeError;
use crate::geometry;
use crate::graph::{Anchor, NetworkEdge, PathSegment, RoadNetwork, VehicleProfile, can_traverse};
use crate::line::ReferencedLine;
use crate::model::{Coordinate, Length};

/// Anchor vertex indices of the location reference points, together with the
/// offsets in meters after dropping anchors whose offset exceeds their
/// segment.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPlan {
    pub anchors: Vec<usize>,
    pub pos_offset: Length,
    pub neg_offset: Length,
}

/// Every edge must be a legal traversal between its adjacent vertices under
/// the vehicle profile.
pub fn validate_connected<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Result<(), EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    for (index, edge) in line.edges.iter().enumerate() {
        let connected = graph.edge_vertices(*edge)
            == Some((line.vertices[index], line.vertices[index + 1]));

        if !connected || !can_traverse(profile, edge) {
            return Err(EncodeError::DisconnectedRoute);
        }
    }

    Ok(())
}

/// Both offsets must be percentages within `[0, 100)`, sum to at most 100 and
/// stay strictly below the route length.
pub fn validate_offsets<G>(
    graph: &G,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Result<(), EncodeError>
where
    G: RoadNetwork,
{
    let (pos, neg) = (line.pos_offset_pct, line.neg_offset_pct);
    let error = EncodeError::InvalidOffsets { pos, neg };

    let within = |pct: f64| (0.0..100.0).contains(&pct);
    if !within(pos) || !within(neg) || pos + neg > 100.0 {
        return Err(error);
    }

    let total = line.geometry_length(graph);
    if !(total * (pos / 100.0) < total) || !(total * (neg / 100.0) < total) {
        return Err(error);
    }

    Ok(())
}

/// The physical representation must be resolvable: the path length is
/// computable and the first and last edges can be classified.
pub fn validate_binary<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Result<(), EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let total = line.geometry_length(graph);
    if !total.meters().is_finite() || total <= Length::ZERO {
        return Err(EncodeError::EncodingFailed(
            "route length is not computable".into(),
        ));
    }

    let first = line.edges.first().ok_or(EncodeError::DisconnectedRoute)?;
    let last = line.edges.last().ok_or(EncodeError::DisconnectedRoute)?;

    if profile.classify(first.tags()).is_none() || profile.classify(last.tags()).is_none() {
        return Err(EncodeError::ClassificationFailed);
    }

    Ok(())
}

/// Ensures both endpoints are valid network nodes, expanding the line when
/// they are not. A no-op on lines that were already expanded.
pub fn adjust_to_valid_points<G, P>(
    graph: &G,
    profile: &P,
    line: ReferencedLine<G::VertexId, G::Edge>,
) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let first = line.vertices[0];
    let last = line.vertices[line.vertices.len() - 1];

    if graph.is_vertex_valid(first) && graph.is_vertex_valid(last) {
        Ok(line)
    } else {
        expand_to_valid(graph, profile, line)
    }
}

/// Expands the line by backward and forward paths so that its start and end
/// are valid network nodes, adjusting the offsets so that the location itself
/// is unchanged. Idempotent on lines whose endpoints are already valid.
pub fn expand_to_valid<G, P>(
    graph: &G,
    profile: &P,
    line: ReferencedLine<G::VertexId, G::Edge>,
) -> Result<ReferencedLine<G::VertexId, G::Edge>, EncodeError>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    ensure_distances_splittable(&line)?;

    let total = line.geometry_length(graph);
    let mut pos_offset = total * (line.pos_offset_pct / 100.0);
    let mut neg_offset = total * (line.neg_offset_pct / 100.0);

    let head = if graph.is_vertex_valid(line.vertices[0]) {
        None
    } else {
        head_expansion(graph, profile, &line)
    };

    let tail = if graph.is_vertex_valid(line.vertices[line.vertices.len() - 1]) {
        None
    } else {
        tail_expansion(graph, profile, &line)
    };

    if head.is_none() && tail.is_none() {
        return Ok(line);
    }

    let ReferencedLine {
        mut vertices,
        mut edges,
        ..
    } = line;

    if let Some((expansion_vertices, expansion_edges)) = head {
        debug!("expanding head of the location through {expansion_vertices:?}");
        pos_offset += vertex_path_length(graph, &expansion_vertices);

        // the expansion ends in the current first vertex
        let mut spliced = expansion_vertices;
        spliced.pop();
        spliced.append(&mut vertices);
        vertices = spliced;

        let mut spliced = expansion_edges;
        spliced.append(&mut edges);
        edges = spliced;
    }

    if let Some((expansion_vertices, mut expansion_edges)) = tail {
        debug!("expanding tail of the location through {expansion_vertices:?}");
        neg_offset += vertex_path_length(graph, &expansion_vertices);

        // the expansion starts in the current last vertex
        vertices.extend_from_slice(&expansion_vertices[1..]);
        edges.append(&mut expansion_edges);
    }

    let mut expanded = ReferencedLine::new(vertices, edges, 0.0, 0.0);
    ensure_distances_splittable(&expanded)?;

    let total = expanded.geometry_length(graph);
    expanded.pos_offset_pct = (pos_offset / total * 100.0).clamp(0.0, 100.0);
    expanded.neg_offset_pct = (neg_offset / total * 100.0).clamp(0.0, 100.0);

    Ok(expanded)
}

/// Inserts additional anchor indices so that no pair of consecutive location
/// reference points is further apart than the maximum distance, and drops the
/// first/last anchor while the positive/negative offset exceeds its path
/// segment.
pub fn adjust_to_valid_distances<G>(
    graph: &G,
    line: &ReferencedLine<G::VertexId, G::Edge>,
    anchors: Vec<usize>,
) -> Result<AnchorPlan, EncodeError>
where
    G: RoadNetwork,
{
    let total = line.geometry_length(graph);
    let mut pos_offset = total * (line.pos_offset_pct / 100.0);
    let mut neg_offset = total * (line.neg_offset_pct / 100.0);

    let mut adjusted = Vec::with_capacity(anchors.len());

    for window in anchors.windows(2) {
        adjusted.push(window[0]);
        let mut accumulated = Length::ZERO;

        for index in window[0]..window[1] {
            let length = line.edges[index].length();

            if length > Length::MAX_LRP_DISTANCE {
                // a location reference point cannot be placed along the edge
                // TODO: resolve an intermediate LRP on the edge geometry
                return Err(EncodeError::DistanceTooLarge);
            }

            if accumulated + length > Length::MAX_LRP_DISTANCE {
                adjusted.push(index);
                accumulated = length;
            } else {
                accumulated += length;
            }
        }
    }

    adjusted.extend(anchors.last().copied());

    while adjusted.len() > 2 {
        let segment = line.segment_length(graph, adjusted[0], adjusted[1]);
        if pos_offset < segment {
            break;
        }
        pos_offset -= segment;
        adjusted.remove(0);
    }

    while adjusted.len() > 2 {
        let last = adjusted.len() - 1;
        let segment = line.segment_length(graph, adjusted[last - 1], adjusted[last]);
        if neg_offset < segment {
            break;
        }
        neg_offset -= segment;
        adjusted.pop();
    }

    Ok(AnchorPlan {
        anchors: adjusted,
        pos_offset,
        neg_offset,
    })
}

/// A single edge longer than the maximum LRP distance cannot be subdivided at
/// a network node.
fn ensure_distances_splittable<V, E: NetworkEdge>(
    line: &ReferencedLine<V, E>,
) -> Result<(), EncodeError> {
    if line
        .edges
        .iter()
        .any(|edge| edge.length() > Length::MAX_LRP_DISTANCE)
    {
        return Err(EncodeError::DistanceTooLarge);
    }
    Ok(())
}

type Expansion<G> = (
    Vec<<G as RoadNetwork>::VertexId>,
    Vec<<G as RoadNetwork>::Edge>,
);

/// Finds a path from a valid vertex into the start of the line, retrying with
/// a widened exclude set while the candidate vertex cannot be confirmed by a
/// shortest path containing the current start.
fn head_expansion<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Option<Expansion<G>>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let mut exclude = FxHashSet::default();

    loop {
        let chain = graph.find_valid_vertex_for(
            line.vertices[0],
            line.edges[0],
            line.vertices[1],
            &exclude,
            false,
        )?;

        let (vertices, edges) = flatten_expansion::<G>(&chain)?;
        let found = *vertices.first()?;

        if !edges.iter().all(|edge| can_traverse(profile, edge)) {
            warn!("expansion path into {found:?} is not traversable");
            exclude.insert(found);
            continue;
        }

        // the expanded start is confirmed only if the original start lies on
        // the shortest path from the candidate vertex into the line
        let starts = vec![PathSegment::root(Anchor::Vertex(found))];
        let ends = vec![PathSegment::root(Anchor::Vertex(line.vertices[1]))];

        match graph.shortest_path(starts, ends, true) {
            Some(path) if path.contains_vertex(line.vertices[0]) => {
                return Some((vertices, edges));
            }
            _ => {
                debug!("vertex {found:?} bypasses the start of the location");
                exclude.insert(found);
            }
        }
    }
}

/// Symmetric to [`head_expansion`], from the end of the line outward.
fn tail_expansion<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::VertexId, G::Edge>,
) -> Option<Expansion<G>>
where
    G: RoadNetwork,
    P: VehicleProfile,
{
    let mut exclude = FxHashSet::default();
    let last = line.vertices.len() - 1;
    let last_edge = line.edges[line.edges.len() - 1];

    loop {
        let chain = graph.find_valid_vertex_for(
            line.vertices[last],
            last_edge.reverse(),
            line.vertices[last - 1],
            &exclude,
            true,
        )?;

        let (vertices, edges) = flatten_expansion::<G>(&chain)?;
        let found = *vertices.last()?;

        if !edges.iter().all(|edge| can_traverse(profile, edge)) {
            warn!("expansion path into {found:?} is not traversable");
            exclude.insert(found);
            continue;
        }

        let starts = vec![PathSegment::root(Anchor::Vertex(line.vertices[last - 1]))];
        let ends = vec![PathSegment::root(Anchor::Vertex(found))];

        match graph.shortest_path(starts, ends, true) {
            Some(path) if path.contains_vertex(line.vertices[last]) => {
                return Some((vertices, edges));
            }
            _ => {
                debug!("vertex {found:?} bypasses the end of the location");
                exclude.insert(found);
            }
        }
    }
}

fn flatten_expansion<G: RoadNetwork>(
    chain: &PathSegment<G::VertexId, G::Edge>,
) -> Option<Expansion<G>> {
    let (anchors, edges) = chain.flatten();

    let vertices = anchors
        .into_iter()
        .map(|anchor| match anchor {
            Anchor::Vertex(vertex) => Some(vertex),
            Anchor::Projected => None,
        })
        .collect::<Option<Vec<_>>>()?;

    (vertices.len() == edges.len() + 1 && !edges.is_empty()).then_some((vertices, edges))
}

fn vertex_path_length<G: RoadNetwork>(graph: &G, vertices: &[G::VertexId]) -> Length {
    vertices
        .windows(2)
        .map(|window| {
            let mut coordinates: Vec<Coordinate> = vec![];
            coordinates.extend(graph.vertex_coordinate(window[0]));
            coordinates.extend(graph.edge_shape(window[0], window[1]));
            coordinates.extend(graph.vertex_coordinate(window[1]));
            geometry::polyline_length(&coordinates)
        })
        .sum()
}
