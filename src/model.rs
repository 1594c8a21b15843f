use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use approx::abs_diff_eq;

/// Functional Road Class.
/// The functional road class (FRC) of a line is a road classification
/// based on the importance of the road represented by the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Frc {
    /// Main road, highest importance.
    Frc0 = 0,
    /// First class road.
    Frc1 = 1,
    /// Second class road.
    Frc2 = 2,
    /// Third class road.
    Frc3 = 3,
    /// Fourth class road.
    Frc4 = 4,
    /// Fifth class road.
    Frc5 = 5,
    /// Sixth class road.
    Frc6 = 6,
    /// Other class road, lowest importance.
    Frc7 = 7,
}

impl Default for Frc {
    fn default() -> Self {
        Self::Frc7
    }
}

impl Frc {
    pub const fn from_value(value: i8) -> Option<Self> {
        match value {
            0 => Some(Self::Frc0),
            1 => Some(Self::Frc1),
            2 => Some(Self::Frc2),
            3 => Some(Self::Frc3),
            4 => Some(Self::Frc4),
            5 => Some(Self::Frc5),
            6 => Some(Self::Frc6),
            7 => Some(Self::Frc7),
            _ => None,
        }
    }
}

/// Form of Way.
/// The form of way (FOW) describes the physical road type of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Fow {
    /// The physical road type is unknown.
    Undefined = 0,
    /// A Motorway is defined as a road permitted for motorized vehicles
    /// only in combination with a prescribed minimum speed. It has two
    /// or more physically separated carriageways and no single level-crossings.
    Motorway = 1,
    /// A multiple carriageway is defined as a road with physically separated
    /// carriageways regardless of the number of lanes. If a road is also a
    /// motorway, it should be coded as such and not as a multiple carriageway.
    MultipleCarriageway = 2,
    /// All roads without separate carriageways are considered as roads with
    /// a single carriageway.
    SingleCarriageway = 3,
    /// A Roundabout is a road which forms a ring on which traffic traveling
    /// in only one direction is allowed.
    Roundabout = 4,
    /// A Traffic Square is an open area (partly) enclosed by roads which is
    /// used for non-traffic purposes and which is not a Roundabout.
    TrafficSquare = 5,
    /// A Slip Road is a road especially designed to enter or leave a line.
    SlipRoad = 6,
    /// The physical road type is known but does not fit into one of the
    /// other categories.
    Other = 7,
}

impl Default for Fow {
    fn default() -> Self {
        Self::Other
    }
}

impl Fow {
    pub const fn from_value(value: i8) -> Option<Self> {
        match value {
            0 => Some(Self::Undefined),
            1 => Some(Self::Motorway),
            2 => Some(Self::MultipleCarriageway),
            3 => Some(Self::SingleCarriageway),
            4 => Some(Self::Roundabout),
            5 => Some(Self::TrafficSquare),
            6 => Some(Self::SlipRoad),
            7 => Some(Self::Other),
            _ => None,
        }
    }
}

/// The side of road information (SOR) describes the relationship between a
/// point of interest and a referenced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SideOfRoad {
    /// Point is directly on (or above) the road, or determination of right/left
    /// side is not applicable.
    OnRoadOrUnknown = 0,
    /// Point is on right side of the road.
    Right = 1,
    /// Point is on left side of the road.
    Left = 2,
    /// Point is on both sides of the road.
    Both = 3,
}

impl Default for SideOfRoad {
    fn default() -> Self {
        Self::OnRoadOrUnknown
    }
}

/// The orientation information (ORI) describes the relationship between a
/// point of interest and the direction of a referenced line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Orientation {
    /// Point has no sense of orientation, or determination of orientation
    /// is not applicable.
    Unknown = 0,
    /// Point has orientation from first LRP towards second LRP.
    Forward = 1,
    /// Point has orientation from second LRP towards first LRP.
    Backward = 2,
    /// Point has orientation in both directions.
    Both = 3,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Opaque handle into the tag index of the road network.
/// The core never interprets tags itself, it only hands them over to the
/// vehicle profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TagsId(pub u64);

/// Distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Length(f64);

impl Length {
    pub const ZERO: Self = Self(0.0);
    pub const MAX: Self = Self(f64::MAX);

    /// Maximum distance between two consecutive location reference points.
    pub const MAX_LRP_DISTANCE: Self = Self(15_000.0);

    pub const fn from_meters(meters: f64) -> Self {
        Self(meters)
    }

    pub const fn meters(&self) -> f64 {
        self.0
    }

    pub fn round(self) -> Self {
        Self(self.0.round())
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl Add for Length {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Length {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Length {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<f64> for Length {
    type Output = Self;
    fn mul(self, factor: f64) -> Self {
        Self(self.0 * factor)
    }
}

/// Ratio between two lengths.
impl Div for Length {
    type Output = f64;
    fn div(self, other: Self) -> f64 {
        self.0 / other.0
    }
}

impl Sum for Length {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, length| acc + length)
    }
}

/// The bearing describes the angle between the true North and the road.
/// The physical data format defines the bearing field as an integer value between 0
/// and 360 whereby “0” is included and “360” is excluded from that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bearing(u16);

impl Bearing {
    pub const fn from_degrees(degrees: u16) -> Self {
        Self(degrees % 360)
    }

    pub const fn degrees(&self) -> u16 {
        self.0
    }
}

/// Coordinate pair stands for a pair of WGS84 longitude (lon) and latitude (lat)
/// values. This coordinate pair specifies a geometric point in a digital map.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const EPSILON: f64 = 1e-5;
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        abs_diff_eq!(self.lon, other.lon, epsilon = Self::EPSILON)
            && abs_diff_eq!(self.lat, other.lat, epsilon = Self::EPSILON)
    }
}

/// A location reference point (LRP) is an anchor of an OpenLR description.
/// Its coordinate refers to a node of the road network (or a point on a line
/// for LRPs placed along a very long line) and the additional attributes refer
/// to an attached line of the network.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocationReferencePoint {
    pub coordinate: Coordinate,
    /// Angle between the true North and the attached line, in degrees.
    pub bearing: Bearing,
    pub frc: Frc,
    pub fow: Fow,
    /// Lowest functional road class to the next LRP.
    pub lowest_frc_to_next: Frc,
    /// Distance to the next LRP in meters, None for the last LRP.
    pub distance_to_next: Option<Length>,
}

/// An ordered list of location reference points covering a line location,
/// together with the offsets that trim the covered path down to the size of
/// the location.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationReferencePath {
    pub points: Vec<LocationReferencePoint>,
    /// Distance from the start of the path to the start of the location,
    /// as a percentage of the path length.
    pub pos_offset_pct: f32,
    /// Distance from the end of the location to the end of the path,
    /// as a percentage of the path length.
    pub neg_offset_pct: f32,
}

/// Point along line is a point location which is defined by a line and an
/// offset value. The line is referenced by two location reference points and
/// the concrete position on that line is referenced using the positive offset.
/// Additionally information about the side of the road where the point is
/// located and the orientation with respect to the direction of the line can
/// be added.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointAlongLineLocation {
    pub first: LocationReferencePoint,
    pub last: LocationReferencePoint,
    /// Distance from the first LRP to the projected point, as a percentage of
    /// the path length between the two LRPs.
    pub pos_offset_pct: f32,
    pub orientation: Orientation,
    pub side_of_road: SideOfRoad,
}
