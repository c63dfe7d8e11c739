use geo::Geometry;
use geojson::{GeoJson, Position};
use serde_json::Value;

/// Parse a stored boundary, require a `Polygon` or `MultiPolygon` with closed
/// rings, and re-encode it as a 2D GeoJSON geometry object.
pub fn normalize_geometry(raw: &str) -> Result<Value, GeometryError> {
    let geometry = match raw.parse::<GeoJson>().map_err(GeometryError::Syntax)? {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(_) => return Err(GeometryError::NotAGeometry("Feature")),
        GeoJson::FeatureCollection(_) => {
            return Err(GeometryError::NotAGeometry("FeatureCollection"))
        }
    };

    match &geometry.value {
        geojson::Value::Polygon(rings) => check_rings(rings)?,
        geojson::Value::MultiPolygon(polygons) => {
            for rings in polygons {
                check_rings(rings)?;
            }
        }
        other => return Err(GeometryError::UnsupportedType(type_name(other))),
    }

    let boundary = Geometry::<f64>::try_from(geometry.value).map_err(GeometryError::Syntax)?;
    let encoded = geojson::Geometry::new(geojson::Value::from(&boundary));
    serde_json::to_value(encoded).map_err(GeometryError::Encode)
}

/// `geo` closes open rings on construction, so closure is checked on the
/// parsed positions first.
fn check_rings(rings: &[Vec<Position>]) -> Result<(), GeometryError> {
    if rings.is_empty() {
        return Err(GeometryError::MalformedCoordinates("polygon has no rings"));
    }

    for ring in rings {
        if ring.len() < 4 {
            return Err(GeometryError::MalformedCoordinates(
                "linear ring needs at least four positions",
            ));
        }
        if ring.iter().any(|position| position.len() < 2) {
            return Err(GeometryError::MalformedCoordinates(
                "position must hold at least two numbers",
            ));
        }
        if ring.first() != ring.last() {
            return Err(GeometryError::MalformedCoordinates("linear ring is not closed"));
        }
    }

    Ok(())
}

fn type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("geometry is not valid GeoJSON: {0}")]
    Syntax(#[source] geojson::Error),
    #[error("expected a bare geometry object, found a {0}")]
    NotAGeometry(&'static str),
    #[error("unsupported geometry type '{0}', expected Polygon or MultiPolygon")]
    UnsupportedType(&'static str),
    #[error("malformed coordinates: {0}")]
    MalformedCoordinates(&'static str),
    #[error("geometry could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}
