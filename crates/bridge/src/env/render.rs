use std::ops::RangeInclusive;

use glam::Vec2;
use image::{Rgb, RgbImage};

use super::array::{ArrayError, DType, NdArray};

pub const SCREEN_WIDTH: u32 = 600;
pub const SCREEN_HEIGHT: u32 = 400;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const CART_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const POLE_COLOR: Rgb<u8> = Rgb([202, 152, 101]);
const AXLE_COLOR: Rgb<u8> = Rgb([129, 132, 203]);
const TRACK_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

const CART_WIDTH: f32 = 50.0;
const CART_HEIGHT: f32 = 30.0;
const POLE_WIDTH: f32 = 10.0;
const CART_Y: f32 = 100.0;

/// Draws the cart-pole scene into an RGB frame. World coordinates are y-up
/// with the track at `CART_Y`; the frame is stored top row first.
pub struct CartPoleRenderer {
    width: u32,
    height: u32,
    canvas: RgbImage,
}

impl Default for CartPoleRenderer {
    fn default() -> Self {
        Self::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl CartPoleRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            canvas: RgbImage::new(width, height),
        }
    }

    pub fn draw(
        &mut self,
        x: f64,
        theta: f64,
        x_threshold: f64,
        length: f64,
    ) -> Result<NdArray, ArrayError> {
        let scale = self.width as f32 / (x_threshold as f32 * 2.0);
        let pole_len = scale * (2.0 * length as f32);
        let cart_x = x as f32 * scale + self.width as f32 / 2.0;
        let axle = Vec2::new(cart_x, CART_Y + CART_HEIGHT / 4.0);

        for pixel in self.canvas.pixels_mut() {
            *pixel = BACKGROUND;
        }

        let (l, r) = (-CART_WIDTH / 2.0, CART_WIDTH / 2.0);
        let (t, b) = (CART_HEIGHT / 2.0, -CART_HEIGHT / 2.0);
        let cart = [
            Vec2::new(l, b),
            Vec2::new(l, t),
            Vec2::new(r, t),
            Vec2::new(r, b),
        ]
        .map(|corner| corner + Vec2::new(cart_x, CART_Y));
        self.fill_convex(&cart, CART_COLOR);

        let (l, r) = (-POLE_WIDTH / 2.0, POLE_WIDTH / 2.0);
        let (t, b) = (pole_len - POLE_WIDTH / 2.0, -POLE_WIDTH / 2.0);
        let rotation = Vec2::from_angle(-theta as f32);
        let pole = [
            Vec2::new(l, b),
            Vec2::new(l, t),
            Vec2::new(r, t),
            Vec2::new(r, b),
        ]
        .map(|corner| rotation.rotate(corner) + axle);
        self.fill_convex(&pole, POLE_COLOR);

        self.fill_circle(axle, POLE_WIDTH / 2.0, AXLE_COLOR);
        self.hline(CART_Y, TRACK_COLOR);

        self.snapshot()
    }

    fn snapshot(&self) -> Result<NdArray, ArrayError> {
        NdArray::from_u8(
            vec![self.height as usize, self.width as usize, 3],
            self.canvas.as_raw().clone(),
        )
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let row = self.height as i64 - 1 - y;
        self.canvas.put_pixel(x as u32, row as u32, color);
    }

    fn fill_convex(&mut self, corners: &[Vec2; 4], color: Rgb<u8>) {
        let min = corners.iter().fold(Vec2::splat(f32::MAX), |acc, c| acc.min(*c));
        let max = corners.iter().fold(Vec2::splat(f32::MIN), |acc, c| acc.max(*c));

        let (xs, ys) = self.clip(min, max);
        for y in ys {
            for x in xs.clone() {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if inside_convex(corners, p) {
                    self.put(x, y, color);
                }
            }
        }
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgb<u8>) {
        let (xs, ys) = self.clip(center - radius, center + radius);
        for y in ys {
            for x in xs.clone() {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if p.distance_squared(center) <= radius * radius {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Pixel ranges of a world-space bounding box, clipped to the canvas.
    fn clip(&self, min: Vec2, max: Vec2) -> (RangeInclusive<i64>, RangeInclusive<i64>) {
        let x0 = (min.x.floor() as i64).max(0);
        let x1 = (max.x.ceil() as i64).min(self.width as i64 - 1);
        let y0 = (min.y.floor() as i64).max(0);
        let y1 = (max.y.ceil() as i64).min(self.height as i64 - 1);
        (x0..=x1, y0..=y1)
    }

    fn hline(&mut self, y: f32, color: Rgb<u8>) {
        let y = y as i64;
        for x in 0..self.width as i64 {
            self.put(x, y, color);
        }
    }
}

fn inside_convex(corners: &[Vec2; 4], p: Vec2) -> bool {
    let mut sign = 0.0f32;
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        let cross = (b - a).perp_dot(p - a);
        if cross.abs() <= f32::EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Turns an `[height, width, 3]` uint8 frame back into an image.
pub fn to_rgb_image(frame: &NdArray) -> Result<RgbImage, ArrayError> {
    if frame.dtype() != DType::Uint8 {
        return Err(ArrayError::WrongDType {
            expected: DType::Uint8,
            actual: frame.dtype(),
        });
    }
    let mismatch = || ArrayError::LengthMismatch {
        shape: frame.shape().to_vec(),
        dtype: frame.dtype(),
        expected: frame.len(),
        actual: frame.as_bytes().len(),
    };
    let [height, width, 3] = frame.shape() else {
        return Err(mismatch());
    };
    RgbImage::from_raw(*width as u32, *height as u32, frame.as_bytes().to_vec())
        .ok_or_else(mismatch)
}
