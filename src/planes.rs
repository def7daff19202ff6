//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane given by two arbitrary
//! corners.  The first corner maps to pixel 0,0; the rectangle may be
//! flipped along either axis.
use crate::error::{MandelError, Result};
use num::Complex;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the two corners of the viewport on the complex plane,
/// treating the real part of each value as the x-component and the
/// imaginary part as the y-component.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlane(pub Complex<f64>, pub Complex<f64>);

/// Describes the x, y of a pixel in the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Contains the definitions of two planes: an integral cartesian plane,
/// and a complex cartesian plane.  Maps pixels from one to points in
/// the other.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// Width and height of the pixel grid.
    pub integral_plane: IntegralPlane,
    /// The two corners of the complex viewport.
    pub complex_plane: ComplexPlane,
    // The step, along each axis, between neighboring pixels on the
    // complex plane.
    deltas: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the integral plane, and the two
    /// corners of the complex plane.  The viewport is taken as given;
    /// only an empty pixel grid is rejected.
    pub fn new(
        width: usize,
        height: usize,
        c0: Complex<f64>,
        c1: Complex<f64>,
    ) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(MandelError::invalid(format!(
                "image size must be positive, got {}x{}",
                width, height
            )));
        }

        let deltas = (
            (c1.re - c0.re) / (width as f64),
            (c1.im - c0.im) / (height as f64),
        );

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            complex_plane: ComplexPlane(c0, c1),
            deltas,
        })
    }

    /// Width of the pixel grid.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// Height of the pixel grid.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Given a pixel on the integral cartesian plane, return the
    /// point it samples on the complex plane.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.complex_plane.0.re + (pixel.0 as f64) * self.deltas.0,
            self.complex_plane.0.im + (pixel.1 as f64) * self.deltas.1,
        )
    }

    /// The row-major offset of a pixel in an image buffer, or None if
    /// the pixel lies outside the grid.
    pub fn pixel_to_offset(&self, pixel: &Pixel) -> Option<usize> {
        if pixel.0 >= self.integral_plane.0 || pixel.1 >= self.integral_plane.1 {
            return None;
        }
        Some(pixel.1 * self.integral_plane.0 + pixel.0)
    }
}
