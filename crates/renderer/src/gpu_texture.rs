//! wgpu implementation of the importer's texture upload seam.

use asset::{AddressMode, FilterMode, SamplerDesc, TextureBackend, TextureData, TextureRole};
use wgpu::{Device, Queue};

/// GPU side of a texture. Dropping it releases the wgpu resources.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Uploads decoded mip chains as 2D textures. Diffuse maps are sampled as
/// sRGB, every other role as linear data.
pub struct WgpuTextureBackend<'a> {
    device: &'a Device,
    queue: &'a Queue,
}

impl<'a> WgpuTextureBackend<'a> {
    pub fn new(device: &'a Device, queue: &'a Queue) -> Self {
        Self { device, queue }
    }
}

fn texture_format(role: TextureRole) -> wgpu::TextureFormat {
    if role.is_color() {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

impl TextureBackend for WgpuTextureBackend<'_> {
    type Handle = GpuTexture;

    fn upload(
        &mut self,
        label: &str,
        role: TextureRole,
        mips: &[TextureData],
        sampler: &SamplerDesc,
    ) -> GpuTexture {
        let (width, height) = mips.first().map_or((1, 1), |base| (base.width, base.height));
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: mips.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(role),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, mip) in mips.iter().enumerate() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &mip.data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(mip.bytes_per_pixel() * mip.width),
                    rows_per_image: Some(mip.height),
                },
                wgpu::Extent3d {
                    width: mip.width,
                    height: mip.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address = address_mode(sampler.address_mode);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter_mode(sampler.mag_filter),
            min_filter: filter_mode(sampler.min_filter),
            mipmap_filter: filter_mode(sampler.mipmap_filter),
            ..Default::default()
        });

        log::trace!("Uploaded {} ({}x{}, {} mips)", label, width, height, mips.len());
        GpuTexture {
            texture,
            view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_diffuse_is_srgb() {
        assert_eq!(texture_format(TextureRole::Diffuse), wgpu::TextureFormat::Rgba8UnormSrgb);
        for role in [TextureRole::Specular, TextureRole::Normal, TextureRole::Height] {
            assert_eq!(texture_format(role), wgpu::TextureFormat::Rgba8Unorm);
        }
    }

    #[test]
    fn sampler_modes_map_to_wgpu() {
        let desc = SamplerDesc::REPEAT_TRILINEAR;
        assert_eq!(address_mode(desc.address_mode), wgpu::AddressMode::Repeat);
        assert_eq!(filter_mode(desc.mipmap_filter), wgpu::FilterMode::Linear);
        assert_eq!(address_mode(AddressMode::ClampToEdge), wgpu::AddressMode::ClampToEdge);
    }
}
