//! Typed uniform values laid out with WGSL uniform-buffer alignment.

use anyhow::{Result, bail};
use glam::{Mat3, Mat4, Vec2, Vec3};

/// A single shader uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// WGSL `AlignOf` in the uniform address space.
    pub fn align(&self) -> usize {
        match self {
            UniformValue::Int(_) | UniformValue::Float(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec3(_) | UniformValue::Mat3(_) | UniformValue::Mat4(_) => 16,
        }
    }

    /// WGSL `SizeOf`. `mat3x3` columns are padded to 16 bytes.
    pub fn size(&self) -> usize {
        match self {
            UniformValue::Int(_) | UniformValue::Float(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec3(_) => 12,
            UniformValue::Mat3(_) => 48,
            UniformValue::Mat4(_) => 64,
        }
    }

    pub fn wgsl_type(&self) -> &'static str {
        match self {
            UniformValue::Int(_) => "i32",
            UniformValue::Float(_) => "f32",
            UniformValue::Vec2(_) => "vec2<f32>",
            UniformValue::Vec3(_) => "vec3<f32>",
            UniformValue::Mat3(_) => "mat3x3<f32>",
            UniformValue::Mat4(_) => "mat4x4<f32>",
        }
    }

    fn same_kind(&self, other: &UniformValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Write the value into `out`, which is exactly [`Self::size`] bytes.
    fn write(&self, out: &mut [u8]) {
        match self {
            UniformValue::Int(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Float(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => out.copy_from_slice(bytemuck::bytes_of(&v.to_array())),
            UniformValue::Vec3(v) => out.copy_from_slice(bytemuck::bytes_of(&v.to_array())),
            UniformValue::Mat3(m) => {
                for (column, chunk) in m.to_cols_array_2d().iter().zip(out.chunks_mut(16)) {
                    chunk[..12].copy_from_slice(bytemuck::bytes_of(column));
                    chunk[12..].fill(0);
                }
            }
            UniformValue::Mat4(m) => out.copy_from_slice(bytemuck::bytes_of(&m.to_cols_array())),
        }
    }
}

fn align_to(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

#[derive(Clone, Debug)]
struct Field {
    name: String,
    offset: usize,
    value: UniformValue,
}

/// Named uniform fields in declaration order, packed like a WGSL struct in
/// the uniform address space. The field set is fixed once built; values
/// can be replaced with [`UniformBlock::set`].
#[derive(Clone, Debug, Default)]
pub struct UniformBlock {
    fields: Vec<Field>,
    end: usize,
}

impl UniformBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field; returns its byte offset.
    pub fn push(&mut self, name: impl Into<String>, value: UniformValue) -> usize {
        let offset = align_to(self.end, value.align());
        self.end = offset + value.size();
        self.fields.push(Field {
            name: name.into(),
            offset,
            value,
        });
        offset
    }

    pub fn with(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.push(name, value);
        self
    }

    /// Replace the value of an existing field with one of the same type.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<()> {
        let Some(field) = self.fields.iter_mut().find(|f| f.name == name) else {
            bail!("uniform block has no field named '{name}'");
        };
        if !field.value.same_kind(&value) {
            bail!(
                "uniform '{name}' is {}, cannot set it to {}",
                field.value.wgsl_type(),
                value.wgsl_type()
            );
        }
        field.value = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value)
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.offset)
    }

    /// Struct size: the end of the last field rounded up to the largest
    /// member alignment, and never below 16 bytes.
    pub fn size(&self) -> usize {
        let align = self.fields.iter().map(|f| f.value.align()).max().unwrap_or(16);
        align_to(self.end, align).max(16)
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size()];
        for field in &self.fields {
            let range = field.offset..field.offset + field.value.size();
            field.value.write(&mut out[range]);
        }
        out
    }

    /// WGSL declaration of this block as `struct <type_name>`.
    pub fn wgsl_struct(&self, type_name: &str) -> String {
        let mut src = format!("struct {type_name} {{\n");
        for field in &self.fields {
            src.push_str(&format!("    {}: {},\n", field.name, field.value.wgsl_type()));
        }
        src.push_str("};\n");
        src
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn offsets_follow_wgsl_alignment() {
        let mut block = UniformBlock::new();
        assert_eq!(block.push("a", UniformValue::Float(0.0)), 0);
        assert_eq!(block.push("b", UniformValue::Vec3(Vec3::ZERO)), 16);
        // A scalar packs into the vec3's trailing padding.
        assert_eq!(block.push("c", UniformValue::Int(0)), 28);
        assert_eq!(block.push("d", UniformValue::Vec2(Vec2::ZERO)), 32);
        assert_eq!(block.push("e", UniformValue::Mat3(Mat3::IDENTITY)), 48);
        assert_eq!(block.push("f", UniformValue::Mat4(Mat4::IDENTITY)), 96);
        assert_eq!(block.size(), 160);
    }

    #[test]
    fn size_rounds_up_to_struct_alignment() {
        let block = UniformBlock::new()
            .with("m", UniformValue::Mat4(Mat4::IDENTITY))
            .with("x", UniformValue::Float(1.0));
        assert_eq!(block.size(), 80);
        assert_eq!(UniformBlock::new().size(), 16);
    }

    #[test]
    fn mat3_columns_are_padded() {
        let m = Mat3::from_cols(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(7.0, 8.0, 9.0),
        );
        let bytes = UniformBlock::new().with("n", UniformValue::Mat3(m)).bytes();
        assert_eq!(bytes.len(), 48);
        assert_eq!(read_f32(&bytes, 0), 1.0);
        assert_eq!(read_f32(&bytes, 12), 0.0);
        assert_eq!(read_f32(&bytes, 16), 4.0);
        assert_eq!(read_f32(&bytes, 40), 9.0);
    }

    #[test]
    fn set_replaces_value_of_same_type_only() {
        let mut block = UniformBlock::new()
            .with("fov", UniformValue::Float(45.0))
            .with("flag", UniformValue::Int(0));
        block.set("fov", UniformValue::Float(30.0)).unwrap();
        assert_eq!(block.get("fov"), Some(UniformValue::Float(30.0)));
        assert_eq!(read_f32(&block.bytes(), 0), 30.0);

        assert!(block.set("fov", UniformValue::Int(1)).is_err());
        assert!(block.set("missing", UniformValue::Int(1)).is_err());
        assert_eq!(block.offset_of("flag"), Some(4));
    }

    #[test]
    fn wgsl_struct_lists_fields_in_order() {
        let block = UniformBlock::new()
            .with("view", UniformValue::Mat4(Mat4::IDENTITY))
            .with("eye", UniformValue::Vec3(Vec3::ZERO));
        assert_eq!(
            block.wgsl_struct("Camera"),
            "struct Camera {\n    view: mat4x4<f32>,\n    eye: vec3<f32>,\n};\n"
        );
    }
}
