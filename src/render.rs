use crate::config::AppConfig;
use crate::types::ConcentrationCircle;
use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;
// Ground resolution at the equator for zoom 0, meters per pixel.
const EQUATOR_RESOLUTION: f64 = 156_543.033_92;

/// Rasterizes the concentration circles into a `{z}/{x}/{y}.png` tile
/// pyramid the map frontend can overlay on its basemap.
pub fn generate_tiles(config: &AppConfig, circles: &[ConcentrationCircle]) -> Result<()> {
    println!(
        "Generating tiles from min_zoom {} to max_zoom {}...",
        config.output.min_zoom, config.output.max_zoom
    );

    // The circle list arrives count-descending; paint in reverse so the
    // largest circles land last and end up on top.
    let mut paint_order: Vec<&ConcentrationCircle> = circles.iter().collect();
    paint_order.reverse();

    (config.output.min_zoom..=config.output.max_zoom)
        .into_par_iter()
        .try_for_each(|z| render_zoom_level(config, z, &paint_order))?;

    println!("Rendered {} circles.", circles.len());
    Ok(())
}

fn render_zoom_level(
    config: &AppConfig,
    zoom: u8,
    paint_order: &[&ConcentrationCircle],
) -> Result<()> {
    let mut local_tiles: HashMap<(u32, u32), RgbaImage> = HashMap::new();
    let tiles_per_axis = 2u64.pow(zoom as u32);

    for circle in paint_order {
        let (cx, cy) = global_pixel(circle.center[0], circle.center[1], zoom);
        let radius_px = (circle.radius / ground_resolution(circle.center[0], zoom)).max(1.0);
        let stroke_px = circle.weight as f64;

        let fill = hex_to_rgba(circle.fill_color);
        let stroke = hex_to_rgba(circle.color);

        // Tiles touched by the circle's bounding box.
        let min_tx = (((cx - radius_px) / TILE_SIZE as f64).floor().max(0.0)) as u64;
        let max_tx = (((cx + radius_px) / TILE_SIZE as f64).floor() as u64).min(tiles_per_axis - 1);
        let min_ty = (((cy - radius_px) / TILE_SIZE as f64).floor().max(0.0)) as u64;
        let max_ty = (((cy + radius_px) / TILE_SIZE as f64).floor() as u64).min(tiles_per_axis - 1);

        for tx in min_tx..=max_tx {
            for ty in min_ty..=max_ty {
                let tile = local_tiles
                    .entry((tx as u32, ty as u32))
                    .or_insert_with(|| ImageBuffer::new(TILE_SIZE, TILE_SIZE));
                let origin_x = (tx * TILE_SIZE as u64) as f64;
                let origin_y = (ty * TILE_SIZE as u64) as f64;

                for py in 0..TILE_SIZE {
                    for px in 0..TILE_SIZE {
                        let dx = origin_x + px as f64 + 0.5 - cx;
                        let dy = origin_y + py as f64 + 0.5 - cy;
                        let dist = (dx * dx + dy * dy).sqrt();
                        if dist > radius_px {
                            continue;
                        }
                        let pixel = tile.get_pixel_mut(px, py);
                        if dist >= radius_px - stroke_px {
                            blend(pixel, stroke, circle.opacity);
                        } else {
                            blend(pixel, fill, circle.fill_opacity);
                        }
                    }
                }
            }
        }
    }

    // Save tiles: {tile_dir}/{z}/{x}/{y}.png
    let z_dir = config.output.tile_dir.join(zoom.to_string());
    fs::create_dir_all(&z_dir).context("Failed to create zoom directory")?;

    local_tiles.par_iter().for_each(|((x, y), img)| {
        let x_dir = z_dir.join(x.to_string());
        if !x_dir.exists() {
            let _ = fs::create_dir_all(&x_dir);
        }
        let path = x_dir.join(format!("{}.png", y));

        if let Err(e) = img.save(&path) {
            eprintln!("Failed to save tile {:?}: {:?}", path, e);
        }
    });

    Ok(())
}

// Source-over compositing of a colored layer at the given opacity.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f64) {
    let alpha = opacity.clamp(0.0, 1.0);
    let dst_alpha = dst[3] as f64 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let src_c = src[c] as f64 / 255.0;
        let dst_c = dst[c] as f64 / 255.0;
        let out_c = (src_c * alpha + dst_c * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst[c] = (out_c * 255.0).round() as u8;
    }
    dst[3] = (out_alpha * 255.0).round() as u8;
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Rgba([r, g, b, 255])
}

// Coordinate conversions
fn global_pixel(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let x = (lon + 180.0) / 360.0 * n * TILE_SIZE as f64;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n * TILE_SIZE as f64;
    (x, y)
}

/// Meters per pixel at the given latitude and zoom.
fn ground_resolution(lat: f64, zoom: u8) -> f64 {
    EQUATOR_RESOLUTION * lat.to_radians().cos() / 2.0_f64.powi(zoom as i32)
}
