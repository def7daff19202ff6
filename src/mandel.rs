// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer
//!
//! Every pixel of the output is mapped to a point `c` on the complex
//! plane, and `z = z * z + c` is iterated from `z = 0` until `z`
//! leaves the escape radius or the iteration cap is reached.  The
//! number of iterations it took is stored per pixel, and counted in a
//! histogram.
//!
//! Coloring by raw iteration count bunches most of the image into a
//! few palette slots.  Instead, the histogram is summed into a
//! cumulative histogram and normalized to `[0, 1]`, so that a pixel's
//! position in the palette reflects the fraction of escaped pixels
//! that escaped no later than it did.  Pixels that never escaped (the
//! ones *in* the set) are left out of that sum, otherwise they would
//! push every other pixel towards the dark end of the palette; they
//! are always painted with the first palette color.

use crate::cache::Fingerprint;
use crate::color::{Color, Palette};
use crate::error::{MandelError, Result};
use crate::palette::{gray_palette, REGISTRY_PALETTE_SIZE};
use crate::planes::{Pixel, PlaneMapper};
use crossbeam::thread::ScopedJoinHandle;
use image::{ImageBuffer, RgbaImage};
use itertools::iproduct;
use log::{debug, trace};
use num::Complex;
use std::iter::Enumerate;
use std::panic;
use std::slice::ChunksMut;
use std::sync::{Arc, Mutex};
use std::time::Instant;

type RowQueue<'a> = Arc<Mutex<Enumerate<ChunksMut<'a, u32>>>>;

/// Iteration counts and histograms of a finished render.  Never
/// mutated after construction; every palette view of the same render
/// points at one of these.
#[derive(Debug)]
struct RenderData {
    // One iteration count per pixel, row-major.
    pix: Vec<u32>,
    // histo[i] is the number of pixels that took exactly i iterations.
    histo: Vec<u64>,
    // cnhisto[i] is the fraction of escaped pixels with an iteration
    // count <= i.
    cnhisto: Vec<f64>,
}

/// The parameters of a render, checked and ready to run.
#[derive(Debug, Clone)]
pub struct MandelRenderer {
    plane: PlaneMapper,
    max_iter: u32,
    radius: f64,
    radius_sqr: f64,
}

impl MandelRenderer {
    /// Requires the width and height of the image, the two corners of
    /// the complex viewport (`c0` maps to pixel 0,0), the iteration
    /// cap and the escape radius.  Size, cap and radius must all be
    /// positive.  The viewport is not checked.
    pub fn new(
        width: usize,
        height: usize,
        c0: Complex<f64>,
        c1: Complex<f64>,
        max_iter: u32,
        radius: f64,
    ) -> Result<Self> {
        if max_iter == 0 {
            return Err(MandelError::invalid("iteration cap must be positive"));
        }
        // Written this way round so that NaN is refused too.
        if !(radius > 0.0) {
            return Err(MandelError::invalid(format!(
                "escape radius must be positive, got {}",
                radius
            )));
        }
        let plane = PlaneMapper::new(width, height, c0, c1)?;
        Ok(MandelRenderer {
            plane,
            max_iter,
            radius,
            radius_sqr: radius * radius,
        })
    }

    /// The classic escape-time loop.  Returns the iteration at which
    /// `z` left the escape radius, or the cap if it never did.
    #[inline]
    fn escape(&self, c: Complex<f64>) -> u32 {
        let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
        for i in 0..self.max_iter {
            z = z * z + c;
            if self.escaped(z) {
                return i;
            }
        }
        self.max_iter
    }

    // |z|^2 against R^2 saves the square root, but only while R^2 is
    // finite; past that the orbit overflows to inf and NaN first.
    #[inline]
    fn escaped(&self, z: Complex<f64>) -> bool {
        if self.radius_sqr.is_finite() {
            z.norm_sqr() > self.radius_sqr
        } else {
            z.norm() > self.radius
        }
    }

    fn render_row(&self, row: usize, out: &mut [u32], histo: &mut [u64]) {
        for (column, slot) in out.iter_mut().enumerate() {
            let iter = self.escape(self.plane.pixel_to_point(&Pixel(column, row)));
            *slot = iter;
            histo[iter as usize] += 1;
        }
    }

    /// Renders the whole image on the calling thread.
    pub fn render_single(&self, palette: Palette) -> RenderedImage {
        let started = Instant::now();
        let width = self.plane.width();
        let mut pix = vec![0 as u32; self.plane.len()];
        let mut histo = vec![0 as u64; self.max_iter as usize + 1];
        for (row, column) in iproduct!(0..self.plane.height(), 0..width) {
            let iter = self.escape(self.plane.pixel_to_point(&Pixel(column, row)));
            pix[row * width + column] = iter;
            histo[iter as usize] += 1;
        }
        debug!(
            "rendered {}x{} at {} iterations in {:?}",
            width,
            self.plane.height(),
            self.max_iter,
            started.elapsed()
        );
        self.finish(pix, histo, palette)
    }

    /// A multi-threaded version of the render function that takes a
    /// thread count.  Rows are handed out one at a time from a shared
    /// queue; each worker keeps its own histogram, and the histograms
    /// are summed once every worker is done.  The result is identical
    /// to `render_single`.
    pub fn render(&self, palette: Palette, threads: usize) -> RenderedImage {
        let threads = threads.max(1);
        if threads == 1 {
            return self.render_single(palette);
        }

        let started = Instant::now();
        let width = self.plane.width();
        let slots = self.max_iter as usize + 1;
        let mut pix = vec![0 as u32; self.plane.len()];
        let mut histo = vec![0 as u64; slots];
        {
            let rows: RowQueue = Arc::new(Mutex::new(pix.chunks_mut(width).enumerate()));
            let partials = crossbeam::scope(|spawner| {
                let handles: Vec<ScopedJoinHandle<Vec<u64>>> = (0..threads)
                    .map(|worker| {
                        let rows = rows.clone();
                        spawner.spawn(move |_| {
                            let mut histo = vec![0 as u64; slots];
                            let mut done = 0;
                            loop {
                                let row = rows.lock().ok().and_then(|mut queue| queue.next());
                                match row {
                                    Some((y, out)) => {
                                        self.render_row(y, out, &mut histo);
                                        done += 1;
                                    }
                                    None => {
                                        break;
                                    }
                                }
                            }
                            trace!("render worker {} finished {} rows", worker, done);
                            histo
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                    .collect::<Vec<Vec<u64>>>()
            })
            .unwrap_or_else(|e| panic::resume_unwind(e));

            for partial in partials {
                for (total, count) in histo.iter_mut().zip(partial) {
                    *total += count;
                }
            }
        }
        debug!(
            "rendered {}x{} at {} iterations on {} threads in {:?}",
            width,
            self.plane.height(),
            self.max_iter,
            threads,
            started.elapsed()
        );
        self.finish(pix, histo, palette)
    }

    fn finish(&self, pix: Vec<u32>, histo: Vec<u64>, palette: Palette) -> RenderedImage {
        let cnhisto = cumulative_histogram(&histo, self.max_iter as usize);
        RenderedImage {
            plane: self.plane.clone(),
            max_iter: self.max_iter,
            radius: self.radius,
            data: Arc::new(RenderData {
                pix,
                histo,
                cnhisto,
            }),
            palette,
        }
    }
}

/// Sums `histo[0..max_iter]` into a running total and scales it to
/// `[0, 1]`.  The last slot of `histo` (pixels in the set) is left
/// out.  If no pixel escaped there is nothing to scale by, and every
/// slot stays at 0.0; no escaped pixel exists to look any of them up.
fn cumulative_histogram(histo: &[u64], max_iter: usize) -> Vec<f64> {
    let mut cnhisto = vec![0.0; max_iter];
    let mut total: u64 = 0;
    for (slot, count) in cnhisto.iter_mut().zip(&histo[..max_iter]) {
        total += count;
        *slot = total as f64;
    }
    if total == 0 {
        debug!("no pixel escaped; cumulative histogram left at zero");
        return vec![0.0; max_iter];
    }
    let total = total as f64;
    for slot in &mut cnhisto {
        *slot /= total;
    }
    cnhisto
}

/// Renders an image with every available CPU and attaches the default
/// grayscale palette.  Callers normally repalette the result.
pub fn render(
    width: usize,
    height: usize,
    c0: Complex<f64>,
    c1: Complex<f64>,
    max_iter: u32,
    radius: f64,
) -> Result<RenderedImage> {
    let renderer = MandelRenderer::new(width, height, c0, c1, max_iter, radius)?;
    let palette = gray_palette(REGISTRY_PALETTE_SIZE, 0xff, false)?;
    Ok(renderer.render(palette, num_cpus::get()))
}

/// A rendered Mandelbrot image: the iteration data of one render plus
/// the palette it is currently painted with.
///
/// The iteration data are shared, never copied, between an image and
/// every view made from it with [`RenderedImage::repalette`], so
/// cloning an image or switching its palette is cheap.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    plane: PlaneMapper,
    max_iter: u32,
    radius: f64,
    data: Arc<RenderData>,
    palette: Palette,
}

impl RenderedImage {
    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.plane.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.plane.height()
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.plane.width(), self.plane.height())
    }

    /// The corners of the complex viewport the image was computed over.
    pub fn corners(&self) -> (Complex<f64>, Complex<f64>) {
        (self.plane.complex_plane.0, self.plane.complex_plane.1)
    }

    /// The iteration cap; pixels with this count are in the set.
    pub fn max_iterations(&self) -> u32 {
        self.max_iter
    }

    /// The escape radius used.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The palette the image is painted with.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Iteration counts, one per pixel, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.data.pix
    }

    /// Pixel count per iteration count, `max_iterations() + 1` slots.
    pub fn histogram(&self) -> &[u64] {
        &self.data.histo
    }

    /// Share of escaped pixels with an iteration count at or below
    /// each slot, `max_iterations()` slots.
    pub fn cumulative_histogram(&self) -> &[f64] {
        &self.data.cnhisto
    }

    /// Iteration count of a single pixel.
    pub fn iterations(&self, x: usize, y: usize) -> Option<u32> {
        self.plane
            .pixel_to_offset(&Pixel(x, y))
            .map(|offset| self.data.pix[offset])
    }

    /// The cache key this image answers to.
    pub fn fingerprint(&self) -> Fingerprint {
        let (c0, c1) = self.corners();
        Fingerprint {
            width: self.width(),
            height: self.height(),
            max_iter: self.max_iter,
            x0: c0.re,
            y0: c0.im,
            x1: c1.re,
            y1: c1.im,
        }
    }

    /// The color of a pixel.  Pixels in the set take the first palette
    /// color; escaped pixels are placed along the palette by the
    /// cumulative histogram.  Pixels outside the image, and every
    /// pixel of an image with an empty palette, are transparent.
    pub fn at(&self, x: usize, y: usize) -> Color {
        let iter = match self.iterations(x, y) {
            Some(iter) => iter,
            None => return Color::default(),
        };
        if self.palette.is_empty() {
            return Color::default();
        }
        if iter == self.max_iter {
            return self.palette[0];
        }
        let last = self.palette.len() - 1;
        let idx = (self.data.cnhisto[iter as usize] * last as f64) as usize;
        self.palette[idx.min(last)]
    }

    /// True if every color this image can produce is fully opaque.
    pub fn is_opaque(&self) -> bool {
        self.palette.is_opaque()
    }

    /// A view of the same render painted with a different palette.
    /// The iteration data are shared with `self`, not copied.
    pub fn repalette(&self, palette: Palette) -> RenderedImage {
        RenderedImage {
            plane: self.plane.clone(),
            max_iter: self.max_iter,
            radius: self.radius,
            data: Arc::clone(&self.data),
            palette,
        }
    }

    /// True if both images are views of the same render.
    pub fn shares_data_with(&self, other: &RenderedImage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Paints every pixel into an RGBA buffer, ready for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        ImageBuffer::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            self.at(x as usize, y as usize).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gray() -> Palette {
        gray_palette(256, 0xff, false).unwrap()
    }

    fn full_view(max_iter: u32) -> MandelRenderer {
        MandelRenderer::new(
            160,
            120,
            Complex::new(-2.0, -1.2),
            Complex::new(1.0, 1.2),
            max_iter,
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn renderer_rejects_non_positive_arguments() {
        let (c0, c1) = (Complex::new(-2.0, -1.2), Complex::new(1.0, 1.2));
        assert!(MandelRenderer::new(0, 10, c0, c1, 16, 2.0).is_err());
        assert!(MandelRenderer::new(10, 0, c0, c1, 16, 2.0).is_err());
        assert!(MandelRenderer::new(10, 10, c0, c1, 0, 2.0).is_err());
        assert!(MandelRenderer::new(10, 10, c0, c1, 16, 0.0).is_err());
        assert!(MandelRenderer::new(10, 10, c0, c1, 16, -1.0).is_err());
        assert!(MandelRenderer::new(10, 10, c0, c1, 16, ::std::f64::NAN).is_err());
        assert!(MandelRenderer::new(10, 10, c0, c1, 16, 2.0).is_ok());
    }

    #[test]
    fn histogram_counts_every_pixel() {
        let img = full_view(16).render_single(gray());
        assert_eq!(img.dimensions(), (160, 120));
        assert_eq!(img.histogram().len(), 17);
        assert_eq!(img.cumulative_histogram().len(), 16);
        let escaped: u64 = img.histogram()[..16].iter().sum();
        assert_eq!(img.histogram()[16] + escaped, 160 * 120);
        assert!(escaped > 0);
        assert!(img.histogram()[16] > 0);
    }

    #[test]
    fn cumulative_histogram_is_monotone_and_ends_at_one() {
        let img = full_view(64).render_single(gray());
        let cn = img.cumulative_histogram();
        assert!(cn.windows(2).all(|w| w[0] <= w[1]));
        assert!(cn.iter().all(|v| *v >= 0.0 && *v <= 1.0));
        assert_eq!(*cn.last().unwrap(), 1.0);
    }

    #[test]
    fn iteration_counts_stay_within_the_cap() {
        let img = full_view(16).render_single(gray());
        assert!(img.pixels().iter().all(|i| *i <= 16));
        for (i, count) in img.histogram().iter().enumerate() {
            let n = img.pixels().iter().filter(|p| **p as usize == i).count() as u64;
            assert_eq!(n, *count, "slot {}", i);
        }
    }

    #[test]
    fn threaded_render_matches_single() {
        let renderer = full_view(48);
        let single = renderer.render_single(gray());
        for threads in &[0, 1, 2, 3, 8] {
            let threaded = renderer.render(gray(), *threads);
            assert_eq!(threaded.pixels(), single.pixels(), "{} threads", threads);
            assert_eq!(threaded.histogram(), single.histogram());
            assert_eq!(threaded.cumulative_histogram(), single.cumulative_histogram());
        }
    }

    #[test]
    fn origin_is_in_the_set_and_far_points_escape_at_once() {
        let img = MandelRenderer::new(
            4,
            4,
            Complex::new(-4.0, -4.0),
            Complex::new(4.0, 4.0),
            32,
            2.0,
        )
        .unwrap()
        .render_single(gray());
        // Pixel 2,2 samples 0+0i; pixel 0,0 samples -4-4i.
        assert_eq!(img.iterations(2, 2), Some(32));
        assert_eq!(img.iterations(0, 0), Some(0));
        assert_eq!(img.iterations(4, 0), None);
    }

    #[test]
    fn huge_radius_still_escapes() {
        // R^2 overflows to infinity; |z| = 1e200 on the second step.
        let renderer = MandelRenderer::new(
            1,
            1,
            Complex::new(1e100, 0.0),
            Complex::new(2e100, 1.0),
            8,
            1e155,
        )
        .unwrap();
        assert_eq!(renderer.escape(Complex::new(1e100, 0.0)), 1);
        let img = renderer.render_single(gray());
        assert_eq!(img.iterations(0, 0), Some(1));
        assert_eq!(img.histogram()[8], 0);
    }

    #[test]
    fn nothing_escapes_inside_the_main_cardioid() {
        let img = MandelRenderer::new(
            8,
            8,
            Complex::new(-0.1, -0.1),
            Complex::new(0.1, 0.1),
            16,
            2.0,
        )
        .unwrap()
        .render_single(gray());
        assert_eq!(img.histogram()[16], 64);
        assert!(img.cumulative_histogram().iter().all(|v| *v == 0.0));
        for (x, y) in iproduct!(0..8, 0..8) {
            assert_eq!(img.at(x, y), img.palette()[0]);
        }
    }

    #[test]
    fn everything_escapes_far_from_the_set() {
        let img = MandelRenderer::new(
            8,
            8,
            Complex::new(10.0, 10.0),
            Complex::new(11.0, 11.0),
            16,
            2.0,
        )
        .unwrap()
        .render_single(gray());
        assert_eq!(img.histogram()[0], 64);
        assert!(img.cumulative_histogram().iter().all(|v| *v == 1.0));
        assert_eq!(img.at(3, 3), Color::rgb(0xff, 0xff, 0xff));
    }

    #[test]
    fn in_set_pixels_take_the_first_palette_color() {
        let img = full_view(16).render_single(gray());
        let (x, y) = (107, 60);
        assert_eq!(img.iterations(x, y), Some(16));
        assert_eq!(img.at(x, y), Color::rgb(0, 0, 0));
    }

    #[test]
    fn escaped_pixels_follow_the_cumulative_histogram() {
        let img = full_view(16).render_single(gray());
        for (x, y) in iproduct!(0..160, 0..120) {
            let iter = img.iterations(x, y).unwrap();
            if iter == 16 {
                continue;
            }
            let idx = (img.cumulative_histogram()[iter as usize] * 255.0) as u8;
            assert_eq!(img.at(x, y), Color::rgb(idx, idx, idx));
        }
    }

    #[test]
    fn repalette_shares_data_and_swaps_colors() {
        let img = full_view(16).render_single(gray());
        let red = Palette::new(vec![Color::rgb(0xff, 0, 0), Color::rgb(0, 0, 0xff)]);
        let view = img.repalette(red.clone());
        assert!(view.shares_data_with(&img));
        assert_eq!(view.pixels().as_ptr(), img.pixels().as_ptr());
        assert_eq!(view.histogram(), img.histogram());
        assert_eq!(view.fingerprint(), img.fingerprint());
        assert_eq!(img.at(107, 60), Color::rgb(0, 0, 0));
        assert_eq!(view.at(107, 60), red[0]);
        assert_eq!(img.palette().len(), 256);
    }

    #[test]
    fn out_of_bounds_and_empty_palette_are_transparent() {
        let img = full_view(16).render_single(gray());
        assert_eq!(img.at(160, 0), Color::default());
        let bare = img.repalette(Palette::new(vec![]));
        assert_eq!(bare.at(0, 0), Color::default());
        assert!(bare.is_opaque());
    }

    #[test]
    fn fingerprint_reflects_render_parameters() {
        let img = full_view(16).render_single(gray());
        assert_eq!(
            img.fingerprint(),
            Fingerprint {
                width: 160,
                height: 120,
                max_iter: 16,
                x0: -2.0,
                y0: -1.2,
                x1: 1.0,
                y1: 1.2,
            }
        );
        assert_eq!(img.radius(), 2.0);
        assert_eq!(img.max_iterations(), 16);
    }

    #[test]
    fn rgba_image_matches_at() {
        let img = full_view(16).render_single(gray());
        let buf = img.to_rgba_image();
        assert_eq!(buf.dimensions(), (160, 120));
        let px: Rgba<u8> = img.at(10, 20).into();
        assert_eq!(*buf.get_pixel(10, 20), px);
    }

    #[test]
    fn render_attaches_a_grayscale_palette() {
        let img = render(
            32,
            24,
            Complex::new(-2.0, -1.2),
            Complex::new(1.0, 1.2),
            16,
            2.0,
        )
        .unwrap();
        assert_eq!(img.palette(), &gray());
        assert!(img.is_opaque());
        assert!(render(0, 24, Complex::new(0.0, 0.0), Complex::new(1.0, 1.0), 16, 2.0).is_err());
    }
}
