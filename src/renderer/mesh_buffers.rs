use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::config::Color;
use crate::math::TriangleMesh;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Per-draw data; `params.x` switches diffuse lighting on.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub params: [f32; 4],
}

impl MeshUniform {
    pub fn new(model: Mat4, color: Color, lit: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: color.to_linear_rgba(),
            params: [if lit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

pub fn mesh_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// GPU copy of one [`TriangleMesh`] plus its draw uniform. Buffers grow to the
/// next power of two when a mesh outgrows them.
pub struct MeshBuffers {
    label: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_capacity: usize,
    index_capacity: usize,
    index_count: u32,
}

impl MeshBuffers {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        vertex_capacity: usize,
        index_capacity: usize,
    ) -> Self {
        let vertex_capacity = vertex_capacity.max(4);
        let index_capacity = index_capacity.max(6);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniform Buffer")),
            size: std::mem::size_of::<MeshUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Bind Group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            vertex_buffer: create_vertex_buffer(device, label, vertex_capacity),
            index_buffer: create_index_buffer(device, label, index_capacity),
            uniform_buffer,
            bind_group,
            vertex_capacity,
            index_capacity,
            index_count: 0,
            label: label.to_string(),
        }
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, mesh: &TriangleMesh) {
        let vertices: Vec<MeshVertex> = mesh
            .vertices
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| MeshVertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();

        if vertices.len() > self.vertex_capacity {
            self.vertex_capacity = vertices.len().next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, &self.label, self.vertex_capacity);
            log::debug!("{}: vertex buffer grown to {}", self.label, self.vertex_capacity);
        }
        if mesh.indices.len() > self.index_capacity {
            self.index_capacity = mesh.indices.len().next_power_of_two();
            self.index_buffer = create_index_buffer(device, &self.label, self.index_capacity);
            log::debug!("{}: index buffer grown to {}", self.label, self.index_capacity);
        }

        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        if !mesh.indices.is_empty() {
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.index_count = mesh.indices.len() as u32;
    }

    pub fn set_uniform(&self, queue: &wgpu::Queue, uniform: MeshUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub fn clear(&mut self) {
        self.index_count = 0;
    }
}

fn create_vertex_buffer(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} Vertex Buffer")),
        size: (capacity * std::mem::size_of::<MeshVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} Index Buffer")),
        size: (capacity * std::mem::size_of::<u32>()) as u64,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
