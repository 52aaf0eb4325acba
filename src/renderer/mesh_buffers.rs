use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::mesh::MeshData;

/// Positions and normals live in separate vertex buffers, written once at startup.
pub struct MeshBuffers {
    position_buffer: wgpu::Buffer,
    normal_buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl MeshBuffers {
    pub fn new(device: &wgpu::Device, mesh: &MeshData) -> Result<Self> {
        let vertex_count = drawable_vertex_count(mesh)?;

        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Position Buffer"),
            contents: bytemuck::cast_slice(&mesh.positions[..vertex_count as usize]),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let normal_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Normal Buffer"),
            contents: bytemuck::cast_slice(&mesh.normals[..vertex_count as usize]),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            position_buffer,
            normal_buffer,
            vertex_count,
        })
    }

    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buffer
    }

    pub fn normal_buffer(&self) -> &wgpu::Buffer {
        &self.normal_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Whole triangles only; a trailing partial triangle is never drawn.
fn drawable_vertex_count(mesh: &MeshData) -> Result<u32> {
    let count = mesh.triangle_count() * 3;
    u32::try_from(count).with_context(|| format!("mesh too large for one draw: {count} vertices"))
}

pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

pub fn normal_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}
