// ============================================================================
// GPU SHADERS: all WGSL code kept inline
// ============================================================================
//
// Every pass shares one uniform block (`PassUniforms` in pipelines.rs) and
// works in surface pixels with a top-left origin.  Document space maps to the
// surface as `screen = (doc + pan) * zoom`.
//
// The two overlay passes (selection edge, layer bounds) share `OVERLAY_PRELUDE`,
// which remaps a fragment into the unit square of a document rectangle.  The
// CPU passes in compositor.rs use the same remap.

/// Uniform block and document transform, prepended to every shader.
pub const PRELUDE: &str = r#"
struct PassUniforms {
    resolution: vec2<f32>,
    pan: vec2<f32>,
    rect_offset: vec2<f32>,
    rect_size: vec2<f32>,
    zoom: f32,
    brightness: f32,
    band: vec2<f32>,
};

@group(0) @binding(0) var<uniform> u: PassUniforms;

fn to_document(frag: vec2<f32>) -> vec2<f32> {
    return frag / u.zoom - u.pan;
}

struct FullscreenOut {
    @builtin(position) position: vec4<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) vi: u32) -> FullscreenOut {
    var positions = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    var out: FullscreenOut;
    out.position = vec4<f32>(positions[vi], 0.0, 1.0);
    return out;
}
"#;

/// Screen → rectangle-local unit-square remap shared by both overlays.
pub const OVERLAY_PRELUDE: &str = r#"
fn to_local(frag: vec2<f32>) -> vec2<f32> {
    return (to_document(frag) - u.rect_offset) / u.rect_size;
}

fn inside_unit(p: vec2<f32>) -> bool {
    return p.x >= 0.0 && p.y >= 0.0 && p.x < 1.0 && p.y < 1.0;
}
"#;

/// Transparency checkerboard.  Tiles are 16 document pixels, so the pattern
/// follows pan and zoom.
pub const BACKGROUND_SHADER: &str = r#"
@fragment
fn fs_background(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let doc = to_document(pos.xy);
    let cx = floor(doc.x / 16.0);
    let cy = floor(doc.y / 16.0);
    let odd = abs(cx + cy) % 2.0;
    let c = clamp(select(0.3, 0.4, odd > 0.5) * u.brightness, 0.0, 1.0);
    return vec4<f32>(c, c, c, 1.0);
}
"#;

/// One layer quad, placed at `rect_offset` with its own size.  Nearest
/// sampling keeps pixels crisp; output is premultiplied for hardware blending.
pub const LAYER_SHADER: &str = r#"
@group(1) @binding(0) var layer_tex: texture_2d<f32>;
@group(1) @binding(1) var layer_samp: sampler;

struct QuadOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_layer(@builtin(vertex_index) vi: u32) -> QuadOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let unit = corners[vi];
    let doc = u.rect_offset + unit * u.rect_size;
    let screen = (doc + u.pan) * u.zoom;
    let ndc = vec2<f32>(
        screen.x / u.resolution.x * 2.0 - 1.0,
        1.0 - screen.y / u.resolution.y * 2.0,
    );

    var out: QuadOut;
    out.position = vec4<f32>(ndc, 0.0, 1.0);
    out.uv = unit;
    return out;
}

@fragment
fn fs_layer(in: QuadOut) -> @location(0) vec4<f32> {
    let c = textureSample(layer_tex, layer_samp, in.uv);
    return vec4<f32>(c.rgb * c.a, c.a);
}
"#;

/// Marching ants: samples the mask at the fragment and its four neighbours
/// and paints a black/white dash wherever the alpha changes.  The dash phase
/// comes from the surface coordinate only, so the pattern is static.
pub const SELECTION_EDGE_SHADER: &str = r#"
@group(1) @binding(0) var mask_tex: texture_2d<f32>;

fn mask_alpha(frag: vec2<f32>) -> f32 {
    let local = to_local(frag);
    if (!inside_unit(local)) {
        return 0.0;
    }
    let dims = vec2<i32>(textureDimensions(mask_tex));
    let texel = min(vec2<i32>(floor(local * vec2<f32>(dims))), dims - vec2<i32>(1, 1));
    return textureLoad(mask_tex, texel, 0).a;
}

@fragment
fn fs_selection_edge(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let frag = pos.xy;
    let o = mask_alpha(frag);
    let n = mask_alpha(frag + vec2<f32>(0.0, -1.0));
    let e = mask_alpha(frag + vec2<f32>(1.0, 0.0));
    let s = mask_alpha(frag + vec2<f32>(0.0, 1.0));
    let w = mask_alpha(frag + vec2<f32>(-1.0, 0.0));

    var phase = -1.0;
    if (n != o || s != o) {
        phase = fract(frag.x / 8.0);
    } else if (e != o || w != o) {
        phase = fract(frag.y / 8.0);
    }
    if (phase < 0.0) {
        discard;
    }
    let v = select(0.0, 1.0, phase > 0.5);
    return vec4<f32>(v, v, v, 1.0);
}
"#;

/// Thin solid frame just inside the current layer's bounds.
pub const LAYER_BOUNDS_SHADER: &str = r#"
@fragment
fn fs_layer_bounds(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let local = to_local(pos.xy);
    let inside = local.x > 0.0 && local.y > 0.0 && local.x < 1.0 && local.y < 1.0;
    let on_band = local.x < u.band.x || local.y < u.band.y
        || 1.0 - local.x < u.band.x || 1.0 - local.y < u.band.y;
    if (!(inside && on_band)) {
        discard;
    }
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

/// Assemble a full shader module source from the shared preludes.
pub fn module_source(body: &str, overlay: bool) -> String {
    let mut src = String::from(PRELUDE);
    if overlay {
        src.push_str(OVERLAY_PRELUDE);
    }
    src.push_str(body);
    src
}
