/// Geographic coordinate in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned geographic bounds as a south-west / north-east pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn from_point(p: LatLng) -> Self {
        Self {
            south_west: p,
            north_east: p,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.extend(other.south_west);
        out.extend(other.north_east);
        out
    }

    /// `[[south, west], [north, east]]`, the layout map widgets expect.
    pub fn to_array(&self) -> [[f64; 2]; 2] {
        [
            [self.south_west.lat, self.south_west.lng],
            [self.north_east.lat, self.north_east.lng],
        ]
    }
}
