//! Geometry codec for the text attribute persisted on model elements
//!
//! A geometry string is a sequence of `key:value[:value...]` groups separated
//! by `|`, for example `origin:120:80|size:64|fillcolor:255:0:0`. Decoding never
//! fails: malformed groups are skipped with a warning so that old or foreign
//! diagrams stay openable.

use crate::geometry::{Rgb, Side};

/// Separator between groups
pub const GROUP_SEPARATOR: char = '|';

/// Separator between fields inside a group
pub const FIELD_SEPARATOR: char = ':';

/// Decimal places used for angles
pub const ANGLE_PRECISION: usize = 6;

/// Round an angle to the precision the text codec persists
pub fn quantize_angle(angle: f64) -> f64 {
    let scale = 10f64.powi(ANGLE_PRECISION as i32);
    (angle * scale).round() / scale
}

/// Parsed view of a geometry attribute.
///
/// Every recognized group is optional; absent groups are omitted on encode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeSet {
    /// Integer center of the figure
    pub origin: Option<(i64, i64)>,
    /// Integer width and height
    pub size: Option<(i64, i64)>,
    pub fill_color: Option<Rgb>,
    /// Boundary angle of a socket
    pub angle: Option<f64>,
    /// Angle of a node's rotating title
    pub name_angle: Option<f64>,
    /// Label distance of a parameter
    pub distance: Option<i64>,
    /// Bend points of a connection
    pub points: Option<Vec<(i64, i64)>>,
    /// Locked sides of a connection's start and end; `None` means not locked
    pub orientation: Option<(Option<Side>, Option<Side>)>,
    /// Unrecognized groups kept verbatim as (key, raw fields)
    pub passthrough: Vec<(String, String)>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no group would be written
    pub fn is_empty(&self) -> bool {
        *self == AttributeSet::default()
    }
}

/// Encoding between attribute sets and their persisted form
pub trait GeometryCodec {
    fn decode(&self, text: &str) -> AttributeSet;
    fn encode(&self, attributes: &AttributeSet) -> String;
}

/// The `|`/`:` delimited text format
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryCodec for TextCodec {
    fn decode(&self, text: &str) -> AttributeSet {
        decode(text)
    }

    fn encode(&self, attributes: &AttributeSet) -> String {
        encode(attributes)
    }
}

/// Decode a geometry string, skipping malformed groups
pub fn decode(text: &str) -> AttributeSet {
    let mut attributes = AttributeSet::default();

    for group in text.split(GROUP_SEPARATOR) {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let mut fields = group.split(FIELD_SEPARATOR);
        let key = fields.next().unwrap_or_default().trim();
        let values: Vec<&str> = fields.map(str::trim).collect();

        if let Err(reason) = apply_group(&mut attributes, key, &values, group) {
            tracing::warn!(group, reason, "skipping malformed geometry group");
        }
    }

    attributes
}

/// Encode an attribute set in the fixed group order
pub fn encode(attributes: &AttributeSet) -> String {
    let mut groups: Vec<String> = Vec::new();

    if let Some((x, y)) = attributes.origin {
        groups.push(format!("origin:{}:{}", x, y));
    }
    if let Some((w, h)) = attributes.size {
        if w == h {
            groups.push(format!("size:{}", w));
        } else {
            groups.push(format!("size:{}:{}", w, h));
        }
    }
    if let Some(color) = attributes.fill_color {
        groups.push(format!("fillcolor:{}:{}:{}", color.r, color.g, color.b));
    }
    if let Some(angle) = attributes.angle {
        groups.push(format!("angle:{:.*}", ANGLE_PRECISION, angle));
    }
    if let Some(angle) = attributes.name_angle {
        groups.push(format!("nameangle:{:.*}", ANGLE_PRECISION, angle));
    }
    if let Some(distance) = attributes.distance {
        groups.push(format!("distance:{}", distance));
    }
    if let Some(points) = &attributes.points {
        let mut group = String::from("points");
        for (x, y) in points {
            group.push_str(&format!(":{}:{}", x, y));
        }
        groups.push(group);
    }
    if let Some((start, end)) = attributes.orientation {
        groups.push(format!(
            "orientation:{}:{}",
            side_token(start),
            side_token(end)
        ));
    }
    for (key, raw) in &attributes.passthrough {
        if raw.is_empty() {
            groups.push(key.clone());
        } else {
            groups.push(format!("{}{}{}", key, FIELD_SEPARATOR, raw));
        }
    }

    groups.join(&GROUP_SEPARATOR.to_string())
}

fn apply_group(
    attributes: &mut AttributeSet,
    key: &str,
    values: &[&str],
    group: &str,
) -> Result<(), &'static str> {
    match key {
        "origin" => {
            let [x, y] = exact::<2>(values)?;
            attributes.origin = Some((parse_int(x)?, parse_int(y)?));
        }
        "size" => {
            attributes.size = Some(match values {
                [side] => {
                    let side = parse_int(side)?;
                    (side, side)
                }
                [w, h] => (parse_int(w)?, parse_int(h)?),
                _ => return Err("size takes one or two values"),
            });
        }
        "fillcolor" => {
            let [r, g, b] = exact::<3>(values)?;
            attributes.fill_color = Some(Rgb::new(
                parse_channel(r)?,
                parse_channel(g)?,
                parse_channel(b)?,
            ));
        }
        "angle" => {
            let [a] = exact::<1>(values)?;
            attributes.angle = Some(parse_angle(a)?);
        }
        "nameangle" => {
            let [a] = exact::<1>(values)?;
            attributes.name_angle = Some(parse_angle(a)?);
        }
        "distance" => {
            let [d] = exact::<1>(values)?;
            attributes.distance = Some(parse_int(d)?);
        }
        "points" => {
            if values.len() % 2 != 0 {
                return Err("points need an even number of coordinates");
            }
            let points = values
                .chunks(2)
                .map(|pair| -> Result<(i64, i64), &'static str> {
                    Ok((parse_int(pair[0])?, parse_int(pair[1])?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            attributes.points = Some(points);
        }
        "orientation" => {
            let [start, end] = exact::<2>(values)?;
            attributes.orientation = Some((parse_side(start)?, parse_side(end)?));
        }
        "" => return Err("missing key"),
        _ => {
            let raw = group
                .split_once(FIELD_SEPARATOR)
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_default();
            attributes.passthrough.retain(|(k, _)| k != key);
            attributes.passthrough.push((key.to_string(), raw));
        }
    }
    Ok(())
}

fn exact<'a, const N: usize>(values: &[&'a str]) -> Result<[&'a str; N], &'static str> {
    <[&str; N]>::try_from(values).map_err(|_| "wrong number of values")
}

fn parse_int(s: &str) -> Result<i64, &'static str> {
    s.parse::<i64>().map_err(|_| "expected an integer")
}

fn parse_channel(s: &str) -> Result<u8, &'static str> {
    s.parse::<u8>().map_err(|_| "color channel must be 0..=255")
}

fn parse_angle(s: &str) -> Result<f64, &'static str> {
    match s.parse::<f64>() {
        Ok(a) if a.is_finite() => Ok(a),
        _ => Err("expected a finite angle"),
    }
}

fn parse_side(s: &str) -> Result<Option<Side>, &'static str> {
    if s == "auto" {
        return Ok(None);
    }
    Side::parse(s).map(Some).ok_or("unknown side")
}

fn side_token(side: Option<Side>) -> &'static str {
    side.map(|s| s.as_str()).unwrap_or("auto")
}
