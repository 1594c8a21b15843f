//! Geodesic helpers over polylines expressed as coordinate sequences.

use geo::{Bearing as _, Closest, Distance, Haversine, HaversineClosestPoint, Line, Point, coord};

use crate::model::{Bearing, Coordinate, Length, SideOfRoad};

/// Result of projecting a coordinate onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Projection {
    /// Distance from the start of the polyline to the projected point,
    /// following the polyline.
    pub distance_along: Length,
    /// Distance between the coordinate and the projected point.
    pub distance_to: Length,
    /// Index of the polyline segment the projection falls on.
    pub segment: usize,
}

fn point(coordinate: Coordinate) -> Point {
    Point::new(coordinate.lon, coordinate.lat)
}

pub(crate) fn distance(from: Coordinate, to: Coordinate) -> Length {
    Length::from_meters(Haversine.distance(point(from), point(to)))
}

pub(crate) fn polyline_length(coordinates: &[Coordinate]) -> Length {
    coordinates
        .windows(2)
        .map(|window| distance(window[0], window[1]))
        .sum()
}

/// Azimuth of the line between the two coordinates, measured clockwise from
/// the geographic North, in integer degrees.
pub(crate) fn bearing(from: Coordinate, to: Coordinate) -> Bearing {
    let degrees = Haversine.bearing(point(from), point(to)).round() as u16;
    Bearing::from_degrees(degrees)
}

/// The coordinate reached after following the polyline for the given
/// distance, interpolating on the final segment. Clamps to the polyline
/// endpoints. Returns None for a degenerate polyline.
pub(crate) fn point_along(coordinates: &[Coordinate], distance_along: Length) -> Option<Coordinate> {
    if coordinates.len() < 2 {
        return None;
    }
    if distance_along <= Length::ZERO {
        return coordinates.first().copied();
    }

    let mut remaining = distance_along;

    for window in coordinates.windows(2) {
        let segment = distance(window[0], window[1]);

        if remaining <= segment && !segment.is_zero() {
            let fraction = remaining / segment;
            return Some(Coordinate {
                lon: window[0].lon + (window[1].lon - window[0].lon) * fraction,
                lat: window[0].lat + (window[1].lat - window[0].lat) * fraction,
            });
        }

        remaining -= segment;
    }

    coordinates.last().copied()
}

/// Projects the target onto the closest segment of the polyline.
/// Returns None if the polyline is degenerate or the projection is
/// geometrically impossible.
pub(crate) fn project_onto(coordinates: &[Coordinate], target: Coordinate) -> Option<Projection> {
    let target_point = point(target);
    let mut accumulated = Length::ZERO;
    let mut best: Option<Projection> = None;

    for (index, window) in coordinates.windows(2).enumerate() {
        let line = Line::new(
            coord! { x: window[0].lon, y: window[0].lat },
            coord! { x: window[1].lon, y: window[1].lat },
        );

        let segment_length = distance(window[0], window[1]);

        match line.haversine_closest_point(&target_point) {
            Closest::SinglePoint(projected) | Closest::Intersection(projected) => {
                let distance_to = Length::from_meters(Haversine.distance(target_point, projected));

                if best.is_none_or(|projection| distance_to < projection.distance_to) {
                    let along =
                        Length::from_meters(Haversine.distance(point(window[0]), projected));

                    best = Some(Projection {
                        distance_along: (accumulated + along).min(accumulated + segment_length),
                        distance_to,
                        segment: index,
                    });
                }
            }
            Closest::Indeterminate => (),
        }

        accumulated += segment_length;
    }

    best
}

/// Classifies on which side of the directed segment `from -> to` the target
/// lies. Collinear targets are classified as on the road.
pub(crate) fn side_of(from: Coordinate, to: Coordinate, target: Coordinate) -> SideOfRoad {
    let cross = (to.lon - from.lon) * (target.lat - from.lat)
        - (to.lat - from.lat) * (target.lon - from.lon);

    if cross > 0.0 {
        SideOfRoad::Left
    } else if cross < 0.0 {
        SideOfRoad::Right
    } else {
        SideOfRoad::OnRoadOrUnknown
    }
}
