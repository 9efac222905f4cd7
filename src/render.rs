//! Frame composition.
//!
//! A frame is two passes over the scene's renderables: a depth-only pass into
//! the spot light's shadow map for every shadow caster, then the lit main pass
//! into the surface. Meshes are split between the culled and the double-sided
//! pipeline by their material.

use std::iter;

use crate::{
    context::Context,
    data_structures::{
        model::DrawModel,
        scene_graph::{GpuMesh, Renderable},
    },
    scene::Scene,
    surface::ShadowFilter,
};

/// One uploaded mesh and how it is drawn.
pub struct DrawItem<'a> {
    pub gpu: &'a GpuMesh,
    pub cast_shadow: bool,
    pub double_sided: bool,
}

/// Everything in `scene` that is ready to be drawn, in scene order.
pub fn collect_draws(scene: &Scene) -> Vec<DrawItem<'_>> {
    let mut renderables: Vec<&dyn Renderable> = Vec::new();
    scene.root().collect_renderables(&mut renderables);
    renderables
        .into_iter()
        .filter_map(|renderable| {
            renderable.gpu().map(|gpu| DrawItem {
                gpu,
                cast_shadow: renderable.cast_shadow(),
                double_sided: gpu.material.double_sided,
            })
        })
        .collect()
}

pub fn render(ctx: &Context, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let draws = collect_draws(scene);

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

    {
        let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.light.shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        if ctx.settings.shadow_filter != ShadowFilter::Off {
            shadow_pass.set_pipeline(&ctx.shadow_pipeline);
            for draw in draws.iter().filter(|draw| draw.cast_shadow) {
                shadow_pass.set_vertex_buffer(1, draw.gpu.instance_buffer.slice(..));
                shadow_pass.draw_mesh_depth(&draw.gpu.mesh, 0..1, &ctx.light.shadow_bind_group);
            }
        }
    }

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.settings.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        for (pipeline, double_sided) in [(&ctx.pbr_pipeline, false), (&ctx.pbr_double_sided_pipeline, true)] {
            render_pass.set_pipeline(pipeline);
            for draw in draws.iter().filter(|draw| draw.double_sided == double_sided) {
                render_pass.set_vertex_buffer(1, draw.gpu.instance_buffer.slice(..));
                render_pass.draw_mesh_instanced(
                    &draw.gpu.mesh,
                    &draw.gpu.material,
                    0..1,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                );
            }
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}
