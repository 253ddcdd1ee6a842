// Parser for the line-oriented geometry text format

use std::collections::BTreeMap;
use std::str::{FromStr, SplitWhitespace};

use glam::{Vec2, Vec3};
use thiserror::Error;

/// Error produced while parsing geometry text. Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjError {
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: malformed number '{value}'")]
    MalformedNumber { line: usize, value: String },

    #[error("line {line}: expected {expected} values")]
    MissingValues { line: usize, expected: usize },

    #[error("line {line}: malformed face vertex '{value}', expected v/vt/vn")]
    MalformedFace { line: usize, value: String },

    #[error("line {line}: faces must be triangles")]
    NotATriangle { line: usize },

    #[error("line {line}: face appears before any 'o' directive")]
    FaceWithoutObject { line: usize },

    #[error("line {line}: 'o' directive is missing an object name")]
    MissingObjectName { line: usize },

    #[error("line {line}: {kind} index {index} is out of range (1..={available})")]
    IndexOutOfRange {
        line: usize,
        kind: &'static str,
        index: u32,
        available: usize,
    },
}

/// Flattened geometry for one named object.
///
/// Every face corner becomes its own vertex, so the index list is simply
/// `0..vertex_count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct FaceCorner {
    line: usize,
    position: u32,
    tex_coord: u32,
    normal: u32,
}

/// Parses geometry text into meshes keyed by object name.
///
/// Supported directives:
///
/// ```text
/// # comment
/// o object_name
/// v x y z
/// vt u v
/// vn x y z
/// s off
/// f v/vt/vn v/vt/vn v/vt/vn
/// ```
///
/// Vertex, UV and normal records form file-global pools and face indices are
/// 1-based into those pools. Anything else is rejected.
pub fn parse(source: &str) -> Result<BTreeMap<String, MeshData>, ObjError> {
    let mut positions = Vec::new();
    let mut tex_coords = Vec::new();
    let mut normals = Vec::new();
    let mut faces: BTreeMap<String, Vec<FaceCorner>> = BTreeMap::new();
    let mut current_object: Option<String> = None;

    for (index, raw_line) in source.lines().enumerate() {
        let line = index + 1;
        let mut tokens = raw_line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };

        match directive {
            d if d.starts_with('#') => {}
            "o" => {
                let name = tokens.next().ok_or(ObjError::MissingObjectName { line })?;
                faces.entry(name.to_string()).or_default();
                current_object = Some(name.to_string());
            }
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, line)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&mut tokens, line)?;
                tex_coords.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&mut tokens, line)?;
                normals.push(Vec3::new(x, y, z));
            }
            "s" => {}
            "f" => {
                let object = current_object
                    .as_ref()
                    .ok_or(ObjError::FaceWithoutObject { line })?;
                let corners = tokens
                    .map(|token| parse_corner(token, line))
                    .collect::<Result<Vec<_>, _>>()?;
                if corners.len() != 3 {
                    return Err(ObjError::NotATriangle { line });
                }
                faces.entry(object.clone()).or_default().extend(corners);
            }
            other => {
                return Err(ObjError::UnknownDirective {
                    line,
                    directive: other.to_string(),
                })
            }
        }
    }

    faces
        .into_iter()
        .map(|(name, corners)| {
            let mesh = resolve_corners(&corners, &positions, &tex_coords, &normals)?;
            Ok((name, mesh))
        })
        .collect()
}

fn parse_floats<const N: usize>(
    tokens: &mut SplitWhitespace<'_>,
    line: usize,
) -> Result<[f32; N], ObjError> {
    let mut values = [0.0; N];
    for value in values.iter_mut() {
        let token = tokens
            .next()
            .ok_or(ObjError::MissingValues { line, expected: N })?;
        *value = parse_number(token, line)?;
    }
    Ok(values)
}

fn parse_number<T: FromStr>(token: &str, line: usize) -> Result<T, ObjError> {
    token.parse().map_err(|_| ObjError::MalformedNumber {
        line,
        value: token.to_string(),
    })
}

fn parse_corner(token: &str, line: usize) -> Result<FaceCorner, ObjError> {
    let malformed = || ObjError::MalformedFace {
        line,
        value: token.to_string(),
    };
    let mut parts = token.split('/');
    let mut next_index = || -> Result<u32, ObjError> {
        let part = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        parse_number(part, line)
    };
    let corner = FaceCorner {
        line,
        position: next_index()?,
        tex_coord: next_index()?,
        normal: next_index()?,
    };
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok(corner)
}

fn lookup<T: Copy>(
    pool: &[T],
    index: u32,
    kind: &'static str,
    line: usize,
) -> Result<T, ObjError> {
    // Indices are 1-based, so 0 falls through to the error as well.
    index
        .checked_sub(1)
        .and_then(|i| pool.get(i as usize))
        .copied()
        .ok_or(ObjError::IndexOutOfRange {
            line,
            kind,
            index,
            available: pool.len(),
        })
}

fn resolve_corners(
    corners: &[FaceCorner],
    positions: &[Vec3],
    tex_coords: &[Vec2],
    normals: &[Vec3],
) -> Result<MeshData, ObjError> {
    let mut mesh = MeshData::default();
    for (counter, corner) in corners.iter().enumerate() {
        let line = corner.line;
        mesh.positions.push(lookup(positions, corner.position, "vertex", line)?);
        mesh.tex_coords.push(lookup(tex_coords, corner.tex_coord, "texture coordinate", line)?);
        mesh.normals.push(lookup(normals, corner.normal, "normal", line)?);
        mesh.indices.push(counter as u32);
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_OBJECTS: &str = "\
# exported scene
o Floor_Plane
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 1.0 0.0
s off
f 1/1/1 2/2/1 3/3/1

o Head_Cube
v 0.0 1.0 0.0
f 4/1/1 1/2/1 2/3/1
f 2/3/1 3/2/1 4/1/1
";

    #[test]
    fn parses_objects_with_global_pools() {
        let meshes = parse(TWO_OBJECTS).unwrap();
        assert_eq!(meshes.len(), 2);

        let floor = &meshes["Floor_Plane"];
        assert_eq!(floor.vertex_count(), 3);
        assert_eq!(floor.indices, vec![0, 1, 2]);
        assert_eq!(floor.positions[1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(floor.tex_coords[2], Vec2::new(0.0, 1.0));
        assert!(floor.normals.iter().all(|n| *n == Vec3::Y));

        let head = &meshes["Head_Cube"];
        assert_eq!(head.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(head.positions[0], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn rejects_unknown_directive() {
        let err = parse("o Thing\nusemtl Metal\n").unwrap_err();
        assert_eq!(
            err,
            ObjError::UnknownDirective {
                line: 2,
                directive: "usemtl".to_string()
            }
        );
    }

    #[test]
    fn rejects_out_of_range_and_zero_indices() {
        let src = "o A\nv 0 0 0\nvt 0 0\nvn 0 1 0\nf 1/1/1 1/1/1 2/1/1\n";
        assert!(matches!(
            parse(src),
            Err(ObjError::IndexOutOfRange { line: 5, kind: "vertex", index: 2, available: 1 })
        ));

        let src = "o A\nv 0 0 0\nvt 0 0\nvn 0 1 0\nf 1/1/1 1/0/1 1/1/1\n";
        assert!(matches!(
            parse(src),
            Err(ObjError::IndexOutOfRange { line: 5, index: 0, .. })
        ));

        // Blank lines still count towards the reported line.
        let src = "o A\nv 0 0 0\nvt 0 0\nvn 0 1 0\n\n\nf 1/1/1 1/1/1 9/1/1\n";
        let err = parse(src).unwrap_err();
        assert!(matches!(err, ObjError::IndexOutOfRange { line: 7, index: 9, .. }));
        assert!(err.to_string().starts_with("line 7: vertex index 9"));
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(matches!(
            parse("v 1.0 abc 2.0\n"),
            Err(ObjError::MalformedNumber { line: 1, .. })
        ));
        assert!(matches!(
            parse("vn 1.0 2.0\n"),
            Err(ObjError::MissingValues { line: 1, expected: 3 })
        ));
        assert!(matches!(
            parse("o A\nf 1//1 1/1/1 1/1/1\n"),
            Err(ObjError::MalformedFace { line: 2, .. })
        ));
        assert!(matches!(
            parse("o A\nf 1/1/1 1/1/1\n"),
            Err(ObjError::NotATriangle { line: 2 })
        ));
        assert!(matches!(
            parse("f 1/1/1 1/1/1 1/1/1\n"),
            Err(ObjError::FaceWithoutObject { line: 1 })
        ));
    }

    #[test]
    fn empty_input_has_no_objects() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# nothing here\n\n").unwrap().is_empty());
    }
}
