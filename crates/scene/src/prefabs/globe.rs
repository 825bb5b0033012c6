//! Static globe mesh loaded from a Wavefront OBJ file.
//!
//! Only positions and faces are read; texture coordinates, normals, groups
//! and materials are ignored. Polygons are fan-triangulated.

use std::path::PathBuf;

use foundation::math::Vec3;

#[derive(Debug)]
pub enum GlobeLoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        line: usize,
        message: String,
    },
    Empty {
        name: String,
    },
}

impl std::fmt::Display for GlobeLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlobeLoadError::Io { path, source } => {
                write!(f, "failed to read globe model {}: {source}", path.display())
            }
            GlobeLoadError::Parse { line, message } => {
                write!(f, "invalid OBJ at line {line}: {message}")
            }
            GlobeLoadError::Empty { name } => write!(f, "globe model {name} has no faces"),
        }
    }
}

impl std::error::Error for GlobeLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GlobeLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobeModel {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl GlobeModel {
    pub fn from_obj_str(name: impl Into<String>, source: &str) -> Result<Self, GlobeLoadError> {
        let name = name.into();
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();

        for (i, raw) in source.lines().enumerate() {
            let line = i + 1;
            let mut tokens = raw.split_whitespace();
            match tokens.next() {
                Some("v") => {
                    let mut coord = || -> Result<f64, GlobeLoadError> {
                        let tok = tokens
                            .next()
                            .ok_or_else(|| parse_err(line, "vertex needs 3 coordinates"))?;
                        tok.parse::<f64>()
                            .map_err(|_| parse_err(line, &format!("bad coordinate {tok:?}")))
                    };
                    let (x, y, z) = (coord()?, coord()?, coord()?);
                    vertices.push(Vec3::new(x, y, z));
                }
                Some("f") => {
                    let corners = tokens
                        .map(|tok| resolve_index(tok, vertices.len(), line))
                        .collect::<Result<Vec<u32>, _>>()?;
                    if corners.len() < 3 {
                        return Err(parse_err(line, "face needs at least 3 vertices"));
                    }
                    for k in 1..corners.len() - 1 {
                        triangles.push([corners[0], corners[k], corners[k + 1]]);
                    }
                }
                _ => {}
            }
        }

        if triangles.is_empty() {
            return Err(GlobeLoadError::Empty { name });
        }
        Ok(Self {
            name,
            vertices,
            triangles,
        })
    }

    /// Reverses the winding of every triangle, turning the normals around.
    pub fn flip_faces(&mut self) {
        for tri in &mut self.triangles {
            tri.swap(1, 2);
        }
    }

    /// Distance from the origin to the farthest vertex.
    pub fn bounding_radius(&self) -> f64 {
        self.vertices.iter().map(|v| v.length()).fold(0.0, f64::max)
    }
}

fn parse_err(line: usize, message: &str) -> GlobeLoadError {
    GlobeLoadError::Parse {
        line,
        message: message.to_string(),
    }
}

/// Resolves `v`, `v/vt` or `v/vt/vn` (1-based, negative = relative) to a
/// 0-based vertex index.
fn resolve_index(token: &str, vertex_count: usize, line: usize) -> Result<u32, GlobeLoadError> {
    let head = token.split('/').next().unwrap_or(token);
    let raw: i64 = head
        .parse()
        .map_err(|_| parse_err(line, &format!("bad face index {token:?}")))?;
    let resolved = if raw < 0 {
        vertex_count as i64 + raw
    } else {
        raw - 1
    };
    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(parse_err(line, &format!("face index {raw} out of range")));
    }
    Ok(resolved as u32)
}

#[cfg(test)]
mod tests {
    use super::{GlobeLoadError, GlobeModel};

    const QUAD: &str = "\
# unit quad
o earth
v -1 0 0
v 0 1 0
v 1 0 0
v 0 -1 0
vt 0 0
f 1/1 2/1 3/1 4/1
";

    #[test]
    fn parses_and_triangulates_polygons() {
        let model = GlobeModel::from_obj_str("quad", QUAD).expect("valid obj");
        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(model.bounding_radius(), 1.0);
    }

    #[test]
    fn flip_faces_reverses_winding() {
        let mut model = GlobeModel::from_obj_str("quad", QUAD).expect("valid obj");
        model.flip_faces();
        assert_eq!(model.triangles[0], [0, 2, 1]);
    }

    #[test]
    fn negative_indices_are_relative() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let model = GlobeModel::from_obj_str("rel", src).expect("valid obj");
        assert_eq!(model.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn reports_bad_input() {
        let err = GlobeModel::from_obj_str("bad", "v 0 0 0\nf 1 2 3\n").expect_err("range");
        assert!(matches!(err, GlobeLoadError::Parse { line: 2, .. }));

        let err = GlobeModel::from_obj_str("bad", "v 0 x 0\n").expect_err("coordinate");
        assert!(matches!(err, GlobeLoadError::Parse { line: 1, .. }));

        let err = GlobeModel::from_obj_str("none", "v 0 0 0\n").expect_err("empty");
        assert!(matches!(err, GlobeLoadError::Empty { .. }));
    }
}
