// THEORY:
// The `contour` module turns a binary motion mask into the outer outlines of its
// connected regions. It is the spatial grouping step between the per-pixel mask
// and the per-region decisions the detector makes.
//
// Algorithm steps:
// 1.  **Outside Background**: flood fill (4-connected) the background reachable
//     from the image edge. Background that is not reached is a hole.
// 2.  **Component Labelling**: flood fill each 8-connected foreground region,
//     collecting its bounding box and whether it touches the outside background.
//     Regions that only touch holes are nested inside another region and are not
//     external, so they are skipped.
// 3.  **Border Following**: for each external region, walk its outer border from
//     the first pixel met in raster order (Suzuki-Abe outer border following).
// 4.  **Area**: the shoelace area of the polygon through the border pixel centres.
//     A solid `w`x`h` block therefore measures `(w - 1) * (h - 1)`.

use crate::core_modules::frame::BoundingBox;
use image::GrayImage;

/// A pixel coordinate on a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// The outer border of one connected foreground region.
#[derive(Debug, Clone)]
pub struct Contour {
    /// Border pixels in tracing order.
    pub points: Vec<Point>,
    pub bounding_box: BoundingBox,
    /// Polygon area enclosed by `points`, in square pixels.
    pub area: f64,
    /// Number of foreground pixels in the region, holes excluded.
    pub pixel_count: usize,
}

// Neighbour offsets, counter-clockwise on screen starting east (y grows downwards).
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
const WEST: usize = 4;

struct Mask<'a> {
    data: &'a [u8],
    width: i64,
    height: i64,
}

impl Mask<'_> {
    fn is_set(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height && self.data[self.index(x, y)] != 0
    }

    fn index(&self, x: i64, y: i64) -> usize {
        (y * self.width + x) as usize
    }

    fn step(&self, p: Point, dir: usize) -> (i64, i64) {
        let (dx, dy) = DIRECTIONS[dir];
        (p.x as i64 + dx, p.y as i64 + dy)
    }
}

/// Finds the external contours of every 8-connected region of non-zero pixels.
///
/// Contours are returned in raster order of each region's top-left-most pixel.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let mask = Mask {
        data: mask.as_raw(),
        width: mask.width() as i64,
        height: mask.height() as i64,
    };
    let outside = outside_background(&mask);
    let mut visited = vec![false; mask.data.len()];
    let mut contours = Vec::new();

    for y in 0..mask.height {
        for x in 0..mask.width {
            let idx = mask.index(x, y);
            if visited[idx] || !mask.is_set(x, y) {
                continue;
            }

            let region = label_region(&mask, &outside, &mut visited, x, y);
            if !region.external {
                continue;
            }

            let start = Point {
                x: x as u32,
                y: y as u32,
            };
            let points = follow_border(&mask, start);
            contours.push(Contour {
                area: polygon_area(&points),
                points,
                bounding_box: region.bounding_box,
                pixel_count: region.pixel_count,
            });
        }
    }

    contours
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

struct Region {
    bounding_box: BoundingBox,
    pixel_count: usize,
    external: bool,
}

/// Marks background pixels connected to the image edge.
fn outside_background(mask: &Mask) -> Vec<bool> {
    let mut outside = vec![false; mask.data.len()];
    let mut to_fill = Vec::new();

    let seed = |x: i64, y: i64, outside: &mut Vec<bool>, to_fill: &mut Vec<(i64, i64)>| {
        let idx = mask.index(x, y);
        if !mask.is_set(x, y) && !outside[idx] {
            outside[idx] = true;
            to_fill.push((x, y));
        }
    };

    for x in 0..mask.width {
        seed(x, 0, &mut outside, &mut to_fill);
        seed(x, mask.height - 1, &mut outside, &mut to_fill);
    }
    for y in 0..mask.height {
        seed(0, y, &mut outside, &mut to_fill);
        seed(mask.width - 1, y, &mut outside, &mut to_fill);
    }

    while let Some((x, y)) = to_fill.pop() {
        for (nx, ny) in [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)] {
            if nx < 0 || ny < 0 || nx >= mask.width || ny >= mask.height {
                continue;
            }
            seed(nx, ny, &mut outside, &mut to_fill);
        }
    }

    outside
}

/// Flood fills the 8-connected region containing `(x, y)`.
fn label_region(mask: &Mask, outside: &[bool], visited: &mut [bool], x: i64, y: i64) -> Region {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
    let mut pixel_count = 0;
    let mut external = false;

    visited[mask.index(x, y)] = true;
    let mut to_fill = vec![(x, y)];

    while let Some((x, y)) = to_fill.pop() {
        pixel_count += 1;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        for (nx, ny) in [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)] {
            let off_image = nx < 0 || ny < 0 || nx >= mask.width || ny >= mask.height;
            if off_image || outside[mask.index(nx, ny)] {
                external = true;
            }
        }

        for (dx, dy) in DIRECTIONS {
            let (nx, ny) = (x + dx, y + dy);
            if mask.is_set(nx, ny) && !visited[mask.index(nx, ny)] {
                visited[mask.index(nx, ny)] = true;
                to_fill.push((nx, ny));
            }
        }
    }

    Region {
        bounding_box: BoundingBox::from_corners(
            min_x as u32,
            min_y as u32,
            max_x as u32,
            max_y as u32,
        ),
        pixel_count,
        external,
    }
}

/// Walks the outer border of the region whose first raster pixel is `start`.
fn follow_border(mask: &Mask, start: Point) -> Vec<Point> {
    let mut points = vec![start];

    // Search clockwise from the western background neighbour for the first border pixel.
    let first = (0..8)
        .map(|k| (WEST + 8 - k) % 8)
        .map(|dir| mask.step(start, dir))
        .find(|&(x, y)| mask.is_set(x, y));
    let Some((fx, fy)) = first else {
        return points;
    };
    let first = Point {
        x: fx as u32,
        y: fy as u32,
    };

    let mut prev = first;
    let mut current = start;
    let limit = 4 * mask.data.len() + 8;

    for _ in 0..limit {
        let back = direction_between(current, prev);
        // The previous pixel is always set, so the search cannot come up empty.
        let next = (1..=8)
            .map(|k| (back + k) % 8)
            .map(|dir| mask.step(current, dir))
            .find(|&(x, y)| mask.is_set(x, y))
            .map(|(x, y)| Point {
                x: x as u32,
                y: y as u32,
            })
            .unwrap_or(prev);

        if next == start && current == first {
            break;
        }
        prev = current;
        current = next;
        points.push(current);
    }

    points
}

fn direction_between(from: Point, to: Point) -> usize {
    let delta = (to.x as i64 - from.x as i64, to.y as i64 - from.y as i64);
    DIRECTIONS
        .iter()
        .position(|&d| d == delta)
        .unwrap_or(WEST)
}
