//! Line-oriented OBJ reader: `v`, `vt`, `vn` and `f` records, everything else skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::SplitWhitespace;

use anyhow::{Context, Result, bail};
use glam::{Vec2, Vec3};

/// One vertex reference inside a face. Indices are kept exactly as written (1-based, possibly
/// zero or negative); range checks happen when the mesh is flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceCorner {
    pub position: i64,
    pub texture: Option<i64>,
    pub normal: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Triangle([FaceCorner; 3]),
    Quad([FaceCorner; 4]),
}

impl Face {
    /// Quads are split along the 0-2 diagonal: (0, 1, 2) then (0, 2, 3).
    pub fn triangles(&self) -> impl Iterator<Item = [FaceCorner; 3]> {
        let (first, second) = match *self {
            Face::Triangle(corners) => (corners, None),
            Face::Quad([a, b, c, d]) => ([a, b, c], Some([a, c, d])),
        };
        std::iter::once(first).chain(second)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawVertexPool {
    pub positions: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ObjModel {
    pub pool: RawVertexPool,
    pub faces: Vec<Face>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Position(Vec3),
    TexCoord(Vec2),
    Normal(Vec3),
    Face(Face),
    Ignored,
}

pub fn load_obj(path: &Path) -> Result<ObjModel> {
    let file =
        File::open(path).with_context(|| format!("open mesh file: {}", path.display()))?;
    parse_obj(BufReader::new(file)).with_context(|| format!("parse mesh file: {}", path.display()))
}

pub fn parse_obj<R: BufRead>(reader: R) -> Result<ObjModel> {
    let mut model = ObjModel::default();

    // Raw bytes: names and comments from older exporters are not always UTF-8.
    for (number, bytes) in reader.split(b'\n').enumerate() {
        let raw = bytes.with_context(|| format!("read line {}", number + 1))?;
        let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
        let line = String::from_utf8_lossy(raw);
        let record =
            parse_line(&line).with_context(|| format!("line {}: {:?}", number + 1, line.trim()))?;

        match record {
            Record::Position(p) => model.pool.positions.push(p),
            Record::TexCoord(t) => model.pool.tex_coords.push(t),
            Record::Normal(n) => model.pool.normals.push(n),
            Record::Face(face) => model.faces.push(face),
            Record::Ignored => {}
        }
    }

    Ok(model)
}

/// Classifies a single line by its first token. Trailing fields beyond what a record needs are
/// ignored, which also drops corners past the fourth on a face line.
pub fn parse_line(line: &str) -> Result<Record> {
    let mut fields = line.split_whitespace();

    let record = match fields.next() {
        Some("v") => {
            let [x, y, z] = parse_floats::<3>(&mut fields, "position")?;
            Record::Position(Vec3::new(x, y, z))
        }
        Some("vt") => {
            let [u, v] = parse_floats::<2>(&mut fields, "texture coordinate")?;
            Record::TexCoord(Vec2::new(u, v))
        }
        Some("vn") => {
            let [x, y, z] = parse_floats::<3>(&mut fields, "normal")?;
            Record::Normal(Vec3::new(x, y, z))
        }
        Some("f") => Record::Face(parse_face(&mut fields)?),
        _ => Record::Ignored,
    };

    Ok(record)
}

fn parse_floats<const N: usize>(fields: &mut SplitWhitespace, kind: &str) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    for (i, value) in values.iter_mut().enumerate() {
        let Some(token) = fields.next() else {
            bail!("{kind} record needs {} numbers, found {i}", N);
        };
        *value = token
            .parse()
            .with_context(|| format!("invalid {kind} component {token:?}"))?;
    }
    Ok(values)
}

fn parse_face(fields: &mut SplitWhitespace) -> Result<Face> {
    let mut corners = Vec::with_capacity(4);
    for token in fields.take(4) {
        corners.push(parse_corner(token)?);
    }

    match corners[..] {
        [a, b, c] => Ok(Face::Triangle([a, b, c])),
        [a, b, c, d] => Ok(Face::Quad([a, b, c, d])),
        _ => bail!("face needs 3 or 4 corners, found {}", corners.len()),
    }
}

/// `p`, `p/t`, `p/t/n` or `p//n`. Empty texture/normal fields mean the attribute is absent.
fn parse_corner(token: &str) -> Result<FaceCorner> {
    let mut parts = token.split('/');

    let position = parse_index(parts.next().unwrap_or_default())
        .with_context(|| format!("invalid position index in corner {token:?}"))?;
    let texture = parse_optional_index(parts.next())
        .with_context(|| format!("invalid texture index in corner {token:?}"))?;
    let normal = parse_optional_index(parts.next())
        .with_context(|| format!("invalid normal index in corner {token:?}"))?;

    Ok(FaceCorner {
        position,
        texture,
        normal,
    })
}

fn parse_optional_index(field: Option<&str>) -> Result<Option<i64>> {
    match field {
        None | Some("") => Ok(None),
        Some(field) => parse_index(field).map(Some),
    }
}

fn parse_index(field: &str) -> Result<i64> {
    Ok(field.parse()?)
}
