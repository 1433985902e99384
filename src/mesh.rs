use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every point, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, point| Self {
            min: bounds.min.min(point),
            max: bounds.max.max(point),
        }))
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }
}

/// Built-in shapes a prop can use instead of a mesh file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrefabType {
    #[default]
    Cube,
    Sphere,
    Plane,
}

impl PrefabType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cube" => Some(Self::Cube),
            "sphere" => Some(Self::Sphere),
            "plane" => Some(Self::Plane),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Plane => "plane",
        }
    }

    /// Bounds of the unscaled shape: a 100 unit cube, a sphere of radius 50
    /// and a 100 x 100 plane facing +Z.
    pub fn bounds(self) -> Aabb {
        match self {
            Self::Cube | Self::Sphere => Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0)),
            Self::Plane => Aabb::new(Vec3::new(-50.0, -50.0, 0.0), Vec3::new(50.0, 50.0, 0.0)),
        }
    }
}

impl fmt::Display for PrefabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triangle mesh read from an OBJ file.
///
/// Vertices are interleaved as `position.xyz` followed by `normal.xyz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 6
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Parses an OBJ document held in memory.
pub fn load_obj_from_str(data: &str) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut faces: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                read_vec3(parts).with_context(|| format!("bad vertex at line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                read_vec3(parts).with_context(|| format!("bad normal at line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon =
                    read_face(parts).with_context(|| format!("bad face at line {}", line_no + 1))?;
                fan(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    let bounds = Aabb::from_points(positions.iter().copied())
        .ok_or_else(|| anyhow!("no vertices defined"))?;
    let (mut vertices, indices) = interleave(&positions, &normals, &faces)?;
    if vertices
        .chunks_exact(6)
        .any(|v| v[3] == 0.0 && v[4] == 0.0 && v[5] == 0.0)
    {
        generate_normals(&mut vertices, &indices);
    }
    Ok(Mesh {
        vertices,
        indices,
        bounds,
    })
}

fn read_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        let text = parts.next().ok_or_else(|| anyhow!("expected three components"))?;
        text.parse::<f32>()
            .with_context(|| format!("`{text}` is not a number"))
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    position: i32,
    normal: i32,
}

fn read_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let polygon = parts
        .map(|part| {
            let mut fields = part.split('/');
            let position = fields
                .next()
                .unwrap_or_default()
                .parse::<i32>()
                .with_context(|| format!("`{part}` has no vertex index"))?;
            // texture coordinates are not used
            let _ = fields.next();
            let normal = fields
                .next()
                .and_then(|field| field.parse::<i32>().ok())
                .unwrap_or(0);
            Ok(FaceIndex { position, normal })
        })
        .collect::<Result<Vec<_>>>()?;
    if polygon.len() < 3 {
        return Err(anyhow!("a face needs at least three vertices"));
    }
    Ok(polygon)
}

fn fan(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    for pair in polygon[1..].windows(2) {
        faces.push([polygon[0], pair[0], pair[1]]);
    }
}

fn interleave(
    positions: &[Vec3],
    normals: &[Vec3],
    faces: &[[FaceIndex; 3]],
) -> Result<(Vec<f32>, Vec<u32>)> {
    let mut seen: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(faces.len() * 3);

    for corner in faces.iter().flatten() {
        let position = resolve_index(corner.position, positions.len())
            .ok_or_else(|| anyhow!("vertex index {} out of range", corner.position))?;
        let normal = resolve_index(corner.normal, normals.len());
        let next = (vertices.len() / 6) as u32;
        let index = *seen.entry((position, normal)).or_insert_with(|| {
            let p = positions[position];
            let n = normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
            vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
            next
        });
        indices.push(index);
    }
    Ok((vertices, indices))
}

/// OBJ indices are one-based; negative values count back from the end.
fn resolve_index(index: i32, len: usize) -> Option<usize> {
    match index {
        i if i > 0 => {
            let i = i as usize - 1;
            (i < len).then_some(i)
        }
        i if i < 0 => len.checked_sub(i.unsigned_abs() as usize),
        _ => None,
    }
}

fn generate_normals(vertices: &mut [f32], indices: &[u32]) {
    let position = |vertices: &[f32], i: usize| Vec3::from_slice(&vertices[i * 6..i * 6 + 3]);
    let mut sums = vec![Vec3::ZERO; vertices.len() / 6];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let face = (position(vertices, b) - position(vertices, a))
            .cross(position(vertices, c) - position(vertices, a));
        if face.length_squared() > f32::EPSILON {
            let face = face.normalize();
            sums[a] += face;
            sums[b] += face;
            sums[c] += face;
        }
    }

    for (i, sum) in sums.into_iter().enumerate() {
        let normal = sum.normalize_or_zero();
        vertices[i * 6 + 3..i * 6 + 6].copy_from_slice(&normal.to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# unit quad
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
f 1 2 3 4
";

    #[test]
    fn quad_is_fanned_into_two_triangles() {
        let mesh = load_obj_from_str(QUAD).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn bounds_cover_every_vertex() {
        let mesh = load_obj_from_str(QUAD).unwrap();
        assert_eq!(mesh.bounds.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(mesh.bounds.max, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(mesh.bounds.size(), Vec3::new(2.0, 0.0, 2.0));
        assert_eq!(mesh.bounds.center(), Vec3::ZERO);
    }

    #[test]
    fn missing_normals_are_generated() {
        let mesh = load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        for vertex in mesh.vertices.chunks_exact(6) {
            assert!((Vec3::new(vertex[3], vertex[4], vertex[5]) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let mesh = load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(load_obj_from_str("# nothing here\n").is_err());
        assert!(load_obj_from_str("v 0 0\n").is_err());
        assert!(load_obj_from_str("v 0 0 0\nf 1 2 9\n").is_err());
    }

    #[test]
    fn prefab_names_and_bounds() {
        assert_eq!(PrefabType::from_name("sphere"), Some(PrefabType::Sphere));
        assert_eq!(PrefabType::from_name("cone"), None);
        assert_eq!(PrefabType::Cube.bounds().size(), Vec3::splat(100.0));
        assert_eq!(PrefabType::Plane.bounds().size(), Vec3::new(100.0, 100.0, 0.0));
    }
}
