//! Per-frame uniform: camera plus the scene's lights.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraUniform, PerspectiveCamera},
    data_structures::scene_graph::Light,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    camera: CameraUniform,
    // rgb premultiplied by intensity, w unused
    ambient: [f32; 4],
    light_direction: [f32; 4],
    light_color: [f32; 4],
}

impl FrameUniform {
    /// Ambient lights add up. Only the first directional light is used; without
    /// one the scene is lit by its ambient term alone.
    pub fn new(camera: &PerspectiveCamera, lights: &[Light]) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(camera);

        let mut ambient = [0.0f32; 3];
        let mut directional = None;
        for light in lights {
            match light {
                Light::Ambient { color, intensity } => {
                    for (acc, c) in ambient.iter_mut().zip(color) {
                        *acc += c * intensity;
                    }
                }
                Light::Directional {
                    color,
                    intensity,
                    direction,
                } if directional.is_none() => {
                    directional = Some((*color, *intensity, *direction));
                }
                Light::Directional { .. } => {
                    log::debug!("ignoring additional directional light");
                }
            }
        }

        let (light_direction, light_color) = match directional {
            Some((color, intensity, direction)) if direction.magnitude2() > 0.0 => {
                let d = direction.normalize();
                (
                    [d.x, d.y, d.z, 0.0],
                    [color[0] * intensity, color[1] * intensity, color[2] * intensity, 1.0],
                )
            }
            _ => {
                let up = Vector3::unit_y();
                ([up.x, up.y, up.z, 0.0], [0.0; 4])
            }
        };

        Self {
            camera: uniform,
            ambient: [ambient[0], ambient[1], ambient[2], 1.0],
            light_direction,
            light_color,
        }
    }

    pub fn ambient(&self) -> [f32; 3] {
        [self.ambient[0], self.ambient[1], self.ambient[2]]
    }

    pub fn light_direction(&self) -> [f32; 3] {
        [
            self.light_direction[0],
            self.light_direction[1],
            self.light_direction[2],
        ]
    }

    pub fn light_color(&self) -> [f32; 3] {
        [self.light_color[0], self.light_color[1], self.light_color[2]]
    }
}

pub fn mk_buffer(device: &wgpu::Device, frame_uniform: FrameUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Frame Uniform Buffer"),
        contents: bytemuck::cast_slice(&[frame_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("frame_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("frame_bind_group"),
    })
}
