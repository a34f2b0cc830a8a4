//! CPU-side alpha-mask rasterization for non-rectangular apertures and
//! Gaussian blur falloff, generated once at target-initialization time
//!.

use linktalk_proto::ApertureKind;

/// Smallest power of two at least as large as `target_size_px`, capped at
/// 512.
pub fn mask_dimension(target_size_px: u32) -> u32 {
    let mut d = 1u32;
    while d < target_size_px && d < 512 {
        d *= 2;
    }
    d.min(512)
}

fn inside_aperture(aperture: ApertureKind, x: f64, y: f64, outer_w: f64, outer_h: f64, inner_w: f64, inner_h: f64) -> bool {
    let in_rect = |hw: f64, hh: f64| x.abs() <= hw && y.abs() <= hh;
    let in_oval = |hw: f64, hh: f64| {
        if hw <= 0.0 || hh <= 0.0 {
            return false;
        }
        (x / hw).powi(2) + (y / hh).powi(2) <= 1.0
    };
    let (ow, oh, iw, ih) = (outer_w / 2.0, outer_h / 2.0, inner_w / 2.0, inner_h / 2.0);
    match aperture {
        ApertureKind::Rect => in_rect(ow, oh),
        ApertureKind::Oval => in_oval(ow, oh),
        ApertureKind::RectAnnulus => in_rect(ow, oh) && !in_rect(iw, ih),
        ApertureKind::OvalAnnulus => in_oval(ow, oh) && !in_oval(iw, ih),
    }
}

/// Coverage at one texel center, anti-aliased along the aperture boundary by
/// averaging five sample points: the texel center and one offset a quarter
/// texel in each of the four diagonal directions.
fn texel_coverage(
    aperture: ApertureKind,
    cx_deg: f64,
    cy_deg: f64,
    quarter_deg_x: f64,
    quarter_deg_y: f64,
    outer_w: f64,
    outer_h: f64,
    inner_w: f64,
    inner_h: f64,
) -> f64 {
    let samples = [
        (cx_deg, cy_deg),
        (cx_deg + quarter_deg_x, cy_deg + quarter_deg_y),
        (cx_deg - quarter_deg_x, cy_deg + quarter_deg_y),
        (cx_deg + quarter_deg_x, cy_deg - quarter_deg_y),
        (cx_deg - quarter_deg_x, cy_deg - quarter_deg_y),
    ];
    samples
        .iter()
        .filter(|&&(x, y)| inside_aperture(aperture, x, y, outer_w, outer_h, inner_w, inner_h))
        .count() as f64
        / samples.len() as f64
}

fn gaussian_factor(x_deg: f64, y_deg: f64, sigma_x_deg: f64, sigma_y_deg: f64) -> f64 {
    let fx = if sigma_x_deg > 0.0 {
        (-(x_deg * x_deg) / (2.0 * sigma_x_deg * sigma_x_deg)).exp()
    } else {
        1.0
    };
    let fy = if sigma_y_deg > 0.0 {
        (-(y_deg * y_deg) / (2.0 * sigma_y_deg * sigma_y_deg)).exp()
    } else {
        1.0
    };
    fx * fy
}

/// Rasterizes one `dim × dim` 8-bit luminance alpha mask, `dim` already
/// computed via [`mask_dimension`]. `deg_per_px` maps the square texture
/// onto the target's bounding box in visual degrees, centered at the
/// origin.
#[allow(clippy::too_many_arguments)]
pub fn rasterize_alpha_mask(
    aperture: ApertureKind,
    outer_w_deg: f64,
    outer_h_deg: f64,
    inner_w_deg: f64,
    inner_h_deg: f64,
    blur_sigma_x_deg: f64,
    blur_sigma_y_deg: f64,
    dim: u32,
    deg_per_px: f64,
) -> Vec<u8> {
    let dim = dim as usize;
    let mut out = vec![0u8; dim * dim];
    let half = dim as f64 / 2.0;
    let quarter_px = 0.25 * deg_per_px;
    for row in 0..dim {
        let y_deg = (half - row as f64 - 0.5) * deg_per_px;
        for col in 0..dim {
            let x_deg = (col as f64 - half + 0.5) * deg_per_px;
            let coverage = texel_coverage(
                aperture, x_deg, y_deg, quarter_px, quarter_px, outer_w_deg, outer_h_deg, inner_w_deg, inner_h_deg,
            );
            let gauss = gaussian_factor(x_deg, y_deg, blur_sigma_x_deg, blur_sigma_y_deg);
            out[row * dim + col] = ((coverage * gauss).clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_dimension_rounds_up_to_a_power_of_two_and_caps_at_512() {
        assert_eq!(mask_dimension(10), 16);
        assert_eq!(mask_dimension(64), 64);
        assert_eq!(mask_dimension(600), 512);
    }

    #[test]
    fn rect_aperture_is_fully_opaque_inside_and_transparent_outside() {
        let dim = 32;
        let deg_per_px = 10.0 / dim as f64;
        let mask = rasterize_alpha_mask(ApertureKind::Rect, 8.0, 8.0, 0.0, 0.0, 0.0, 0.0, dim as u32, deg_per_px);
        let center = mask[(dim / 2) * dim as usize + dim / 2];
        let corner = mask[0];
        assert_eq!(center, 255);
        assert_eq!(corner, 0);
    }

    #[test]
    fn annulus_is_transparent_at_its_own_center() {
        let dim = 32;
        let deg_per_px = 10.0 / dim as f64;
        let mask = rasterize_alpha_mask(
            ApertureKind::OvalAnnulus,
            8.0,
            8.0,
            4.0,
            4.0,
            0.0,
            0.0,
            dim as u32,
            deg_per_px,
        );
        let center = mask[(dim / 2) * dim as usize + dim / 2];
        assert_eq!(center, 0);
    }

    #[test]
    fn gaussian_blur_attenuates_away_from_center() {
        let dim = 64;
        let deg_per_px = 8.0 / dim as f64;
        let mask = rasterize_alpha_mask(ApertureKind::Oval, 8.0, 8.0, 0.0, 0.0, 1.0, 1.0, dim as u32, deg_per_px);
        let center = mask[(dim / 2) * dim as usize + dim / 2] as i32;
        let near_edge = mask[(dim / 2) * dim as usize + dim - 2] as i32;
        assert!(center > near_edge);
    }
}
