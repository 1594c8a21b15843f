use crate::graph::{Anchor, EdgeReference, NetworkEdge, PathSegment, VehicleProfile, can_traverse};
use crate::model::Length;

/// Whether the mid-edge anchor is the source or the target of the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Source,
    Target,
}

/// Builds the path segment candidates for a route endpoint sitting at
/// `distance_along` meters from the start of the referenced edge.
///
/// An anchor within `tolerance` of either endpoint collapses to that vertex
/// and yields a single rooted segment. Otherwise the two half edges become
/// candidates, each weighted by the vehicle profile and emitted only if its
/// traversal direction is open; ties between the halves are left to the
/// shortest path search.
pub(crate) fn anchor_segments<V, E, P>(
    profile: &P,
    reference: &EdgeReference<V, E>,
    edge_length: Length,
    distance_along: Length,
    role: Role,
    tolerance: Length,
) -> Vec<PathSegment<V, E>>
where
    V: Copy + PartialEq,
    E: NetworkEdge,
    P: VehicleProfile,
{
    if distance_along < tolerance {
        return vec![PathSegment::root(Anchor::Vertex(reference.start))];
    }
    if edge_length - distance_along < tolerance {
        return vec![PathSegment::root(Anchor::Vertex(reference.end))];
    }

    let tags = reference.edge.tags();
    let weight_before = profile.weight(tags, distance_along);
    let weight_after = profile.weight(tags, edge_length - distance_along);

    let mut candidates = Vec::with_capacity(2);

    match role {
        Role::Source => {
            // leaving the anchor towards the start vertex runs against the edge
            let backward = reference.edge.reverse();
            if can_traverse(profile, &backward) {
                let segment = PathSegment::root(Anchor::Projected).extend(
                    Anchor::Vertex(reference.start),
                    weight_before,
                    backward,
                );
                candidates.push(segment);
            }

            if can_traverse(profile, &reference.edge) {
                let segment = PathSegment::root(Anchor::Projected).extend(
                    Anchor::Vertex(reference.end),
                    weight_after,
                    reference.edge,
                );
                candidates.push(segment);
            }
        }
        Role::Target => {
            // reaching the anchor from the start vertex follows the edge
            if can_traverse(profile, &reference.edge) {
                let segment = PathSegment::root(Anchor::Vertex(reference.start)).extend(
                    Anchor::Projected,
                    weight_before,
                    reference.edge,
                );
                candidates.push(segment);
            }

            let backward = reference.edge.reverse();
            if can_traverse(profile, &backward) {
                let segment = PathSegment::root(Anchor::Vertex(reference.end)).extend(
                    Anchor::Projected,
                    weight_after,
                    backward,
                );
                candidates.push(segment);
            }
        }
    }

    candidates
}
