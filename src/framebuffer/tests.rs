// src/framebuffer/tests.rs

use super::tile::TileAccumulator;
use super::*;
use crate::color::Palette;
use test_log::test;

const RED: Rgb = [0xff, 0, 0];
const GREEN: Rgb = [0, 0xff, 0];
const BLUE: Rgb = [0, 0, 0xff];

const PATHS: [DrawPath; 2] = [DrawPath::Native, DrawPath::Software];

/// 4x4 checkerboard of 2x2 red and green squares, red in the top-left.
fn checked_data() -> Vec<u8> {
    let mut data = Vec::with_capacity(64);
    for y in 0..4 {
        for x in 0..4 {
            let red = (x < 2) == (y < 2);
            let rgb = if red { RED } else { GREEN };
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0xff]);
        }
    }
    data
}

/// Writes a distinct opaque value into every pixel.
fn numbered(width: u32, height: u32, path: DrawPath) -> Framebuffer {
    let mut fb = Framebuffer::with_draw_path(width, height, path);
    for y in 0..height {
        for x in 0..width {
            let n = (y * width + x) as u8;
            fb.fill_rect(x as i32, y as i32, 1, 1, [n, n.wrapping_mul(3), 7]);
        }
    }
    fb
}

/// Copy through an explicit temporary buffer, pixel by pixel.
fn reference_copy(fb: &Framebuffer, sx: i32, sy: i32, dx: i32, dy: i32, w: i32, h: i32) -> Vec<u8> {
    let mut staged = Vec::new();
    for row in 0..h {
        for col in 0..w {
            staged.push(fb.pixel((sx + col) as u32, (sy + row) as u32).unwrap());
        }
    }
    let mut expected = fb.clone();
    for row in 0..h {
        for col in 0..w {
            let px = staged[(row * w + col) as usize];
            expected.put_rgba(dx + col, dy + row, 1, 1, &px);
        }
    }
    expected.pixels().to_vec()
}

#[test]
fn new_buffer_is_zeroed_and_never_empty() {
    let fb = Framebuffer::new(0, 3);
    assert_eq!((fb.width(), fb.height()), (1, 3));
    assert_eq!(fb.pixels(), &[0; 12]);
}

#[test]
fn fill_rect_builds_checkerboard() {
    for path in PATHS {
        let mut fb = Framebuffer::with_draw_path(4, 4, path);
        fb.fill_rect(0, 0, 4, 4, GREEN);
        fb.fill_rect(0, 0, 2, 2, RED);
        fb.fill_rect(2, 2, 2, 2, RED);
        assert_eq!(fb.pixels(), checked_data().as_slice(), "{:?}", path);
    }
}

#[test]
fn fill_rect_clips_and_ignores_degenerate_rects() {
    let mut fb = Framebuffer::new(3, 3);
    fb.fill_rect(-1, -1, 2, 2, BLUE);
    fb.fill_rect(2, 2, 10, 10, RED);
    fb.fill_rect(1, 1, 0, 5, GREEN);
    fb.fill_rect(1, 1, 5, -2, GREEN);
    fb.fill_rect(50, 50, 2, 2, GREEN);

    assert_eq!(fb.pixel(0, 0), Some([0, 0, 0xff, 0xff]));
    assert_eq!(fb.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(fb.pixel(2, 2), Some([0xff, 0, 0, 0xff]));
    assert_eq!(fb.pixel(3, 3), None);
}

#[test]
fn copy_image_builds_checkerboard() {
    for path in PATHS {
        let mut fb = Framebuffer::with_draw_path(4, 4, path);
        fb.fill_rect(0, 0, 4, 4, GREEN);
        fb.fill_rect(0, 0, 2, 2, RED);
        fb.copy_image(0, 0, 2, 2, 2, 2);
        assert_eq!(fb.pixels(), checked_data().as_slice(), "{:?}", path);
    }
}

#[test]
fn overlapping_copies_match_a_staged_copy() {
    // Scroll down, up, left, right and diagonally, each overlapping itself.
    let cases = [
        (0, 0, 0, 1, 5, 4),
        (0, 1, 0, 0, 5, 4),
        (1, 0, 0, 0, 4, 5),
        (0, 0, 1, 0, 4, 5),
        (0, 0, 1, 1, 4, 4),
        (1, 1, 0, 0, 4, 4),
        (1, 0, 0, 1, 3, 3),
    ];
    for path in PATHS {
        for &(sx, sy, dx, dy, w, h) in &cases {
            let mut fb = numbered(5, 5, path);
            let expected = reference_copy(&fb, sx, sy, dx, dy, w, h);
            fb.copy_image(sx, sy, dx, dy, w, h);
            assert_eq!(
                fb.pixels(),
                expected.as_slice(),
                "{:?} copy ({},{})->({},{}) {}x{}",
                path,
                sx,
                sy,
                dx,
                dy,
                w,
                h
            );
        }
    }
}

#[test]
fn copy_image_drops_parts_outside_the_buffer() {
    for path in PATHS {
        let mut fb = numbered(4, 4, path);
        let before = fb.clone();
        // Destination hangs off the bottom-right; only a 1x1 corner lands.
        fb.copy_image(0, 0, 3, 3, 4, 4);
        assert_eq!(fb.pixel(3, 3), before.pixel(0, 0));
        assert_eq!(fb.pixel(2, 3), before.pixel(2, 3));

        // Source starts left of the buffer; the visible part shifts along.
        let mut fb = before.clone();
        fb.copy_image(-1, 0, 0, 0, 2, 1);
        assert_eq!(fb.pixel(1, 0), before.pixel(0, 0));
        assert_eq!(fb.pixel(0, 0), before.pixel(0, 0));

        let mut fb = before.clone();
        fb.copy_image(10, 10, 0, 0, 2, 2);
        assert_eq!(fb.pixels(), before.pixels());
    }
}

#[test]
fn resize_preserves_top_left_content() {
    let mut fb = Framebuffer::new(4, 4);
    fb.fill_rect(0, 0, 4, 4, BLUE);
    fb.resize(2, 2);
    assert_eq!(fb.pixels().len(), 2 * 2 * BYTES_PER_PIXEL);
    for px in fb.pixels().chunks_exact(4) {
        assert_eq!(px, &[0, 0, 0xff, 0xff]);
    }

    fb.resize(3, 2);
    assert_eq!(fb.pixel(1, 1), Some([0, 0, 0xff, 0xff]));
    assert_eq!(fb.pixel(2, 0), Some([0, 0, 0, 0]));
}

#[test]
fn resize_to_zero_is_clamped() {
    let mut fb = Framebuffer::new(4, 4);
    fb.resize(0, 0);
    assert_eq!((fb.width(), fb.height()), (1, 1));
    assert_eq!(fb.pixels().len(), BYTES_PER_PIXEL);
}

#[test]
fn blit_bgrx_swaps_components() {
    let checked = checked_data();
    let mut data = Vec::with_capacity(checked.len());
    for px in checked.chunks_exact(4) {
        data.extend_from_slice(&[px[2], px[1], px[0], 0]);
    }
    let mut fb = Framebuffer::new(4, 4);
    fb.blit_bgrx(0, 0, 4, 4, &data, 0);
    assert_eq!(fb.pixels(), checked.as_slice());
}

#[test]
fn blit_rgb_reads_packed_triples_from_offset() {
    let checked = checked_data();
    let mut data = vec![0xaa, 0xbb];
    for px in checked.chunks_exact(4) {
        data.extend_from_slice(&px[..3]);
    }
    let mut fb = Framebuffer::new(4, 4);
    fb.blit_rgb(0, 0, 4, 4, &data, 2);
    assert_eq!(fb.pixels(), checked.as_slice());
}

#[test]
fn blit_indexed_resolves_through_palette() {
    let palette: Palette = [(1, RED), (0, GREEN)].into_iter().collect();
    let data = [1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1];
    let mut fb = Framebuffer::new(4, 4);
    fb.blit_indexed(0, 0, 4, 4, &data, 0, &palette);
    assert_eq!(fb.pixels(), checked_data().as_slice());
}

#[test]
fn clipped_blit_keeps_source_alignment() {
    // 3x2 RGB block placed at (-1, 1) on a 2x2 buffer: only columns 1..3
    // of the first source row land, in row 1.
    let data: Vec<u8> = (1..=18).collect();
    let mut fb = Framebuffer::new(2, 2);
    fb.blit_rgb(-1, 1, 3, 2, &data, 0);
    assert_eq!(fb.pixel(0, 1), Some([4, 5, 6, 0xff]));
    assert_eq!(fb.pixel(1, 1), Some([7, 8, 9, 0xff]));
    assert_eq!(fb.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn short_blit_data_is_ignored() {
    let mut fb = Framebuffer::new(2, 2);
    fb.blit_bgrx(0, 0, 2, 2, &[0xff; 15], 0);
    fb.blit_rgb(0, 0, 1, 1, &[1, 2, 3], 1);
    assert_eq!(fb.pixels(), &[0; 16]);
}

#[test]
fn draw_image_clips_to_buffer() {
    let image = DecodedImage::from_rgba(2, 2, (0..16).collect()).unwrap();
    let mut fb = Framebuffer::new(2, 2);
    fb.draw_image(&image, 1, 1);
    assert_eq!(fb.pixel(1, 1), Some([0, 1, 2, 3]));
    assert_eq!(fb.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn read_region_packs_rows() {
    let fb = numbered(3, 3, DrawPath::Native);
    let mut out = vec![0xee; 3];
    let size = fb.read_region(1, 1, 5, 5, &mut out);
    assert_eq!(size, (2, 2));
    assert_eq!(out.len(), 16);
    assert_eq!(&out[..4], &fb.pixel(1, 1).unwrap());
    assert_eq!(&out[12..], &fb.pixel(2, 2).unwrap());
}

#[test]
fn tile_matches_background_then_sub_rects_in_order() {
    let subs = [
        (0, 0, 3, 3, RED),
        (1, 1, 3, 3, BLUE),
        (2, 0, 1, 4, GREEN),
        (3, 3, 5, 5, RED), // clipped to the tile
        (-2, -2, 1, 1, BLUE), // entirely outside the tile
    ];
    for path in PATHS {
        let mut expected = numbered(6, 6, path);
        expected.fill_rect(1, 1, 4, 4, [9, 9, 9]);
        for &(x, y, w, h, rgb) in &subs {
            let clip = Rect::new(x, y, w, h).clip(4, 4);
            if let Some(c) = clip {
                expected.fill_rect(1 + c.x as i32, 1 + c.y as i32, c.width as i32, c.height as i32, rgb);
            }
        }

        let mut fb = numbered(6, 6, path);
        let mut tile = TileAccumulator::new(Rect::new(1, 1, 4, 4), [9, 9, 9], &fb);
        for &(x, y, w, h, rgb) in &subs {
            tile.sub_tile(x, y, w, h, rgb);
        }
        tile.commit(&mut fb);
        assert_eq!(fb.pixels(), expected.pixels(), "{:?}", path);
    }
}

#[test]
fn tile_is_not_visible_before_commit() {
    for path in PATHS {
        let fb = Framebuffer::with_draw_path(4, 4, path);
        let mut tile = TileAccumulator::new(Rect::new(0, 0, 4, 4), GREEN, &fb);
        tile.sub_tile(0, 0, 2, 2, RED);
        assert_eq!(fb.pixels(), &[0; 64]);

        let mut fb = fb;
        tile.sub_tile(2, 2, 2, 2, RED);
        tile.commit(&mut fb);
        assert_eq!(fb.pixels(), checked_data().as_slice(), "{:?}", path);
    }
}

#[test]
fn tile_hanging_off_the_buffer_is_clipped() {
    for path in PATHS {
        let mut fb = Framebuffer::with_draw_path(2, 2, path);
        let mut tile = TileAccumulator::new(Rect::new(1, 1, 3, 3), GREEN, &fb);
        tile.sub_tile(0, 0, 1, 1, RED);
        tile.commit(&mut fb);
        assert_eq!(fb.pixel(1, 1), Some([0xff, 0, 0, 0xff]), "{:?}", path);
        assert_eq!(fb.pixel(0, 0), Some([0, 0, 0, 0]));
    }
}

#[test]
fn huge_tile_is_clipped_before_anything_is_allocated() {
    for path in PATHS {
        let mut fb = Framebuffer::with_draw_path(4, 4, path);
        let mut tile = TileAccumulator::new(Rect::new(0, 0, i32::MAX, i32::MAX), GREEN, &fb);
        tile.sub_tile(2, 2, i32::MAX, i32::MAX, RED);
        tile.sub_tile(0, 0, 2, 2, RED);
        tile.commit(&mut fb);
        assert_eq!(fb.pixels(), checked_data().as_slice(), "{:?}", path);
    }
}

#[test]
fn sub_tiles_keep_the_origin_of_a_tile_starting_off_screen() {
    for path in PATHS {
        let mut fb = Framebuffer::with_draw_path(4, 4, path);
        // Only the bottom-right 2x2 of this tile is on screen.
        let mut tile = TileAccumulator::new(Rect::new(-2, -2, 4, 4), GREEN, &fb);
        tile.sub_tile(3, 3, 1, 1, RED);
        tile.sub_tile(0, 0, 2, 2, BLUE); // fully off screen
        tile.commit(&mut fb);
        assert_eq!(fb.pixel(0, 0), Some([0, 0xff, 0, 0xff]), "{:?}", path);
        assert_eq!(fb.pixel(1, 1), Some([0xff, 0, 0, 0xff]), "{:?}", path);
        assert_eq!(fb.pixel(2, 2), Some([0, 0, 0, 0]), "{:?}", path);
    }
}

#[test]
fn tile_entirely_outside_draws_nothing() {
    for path in PATHS {
        let mut fb = Framebuffer::with_draw_path(4, 4, path);
        let mut tile = TileAccumulator::new(Rect::new(10, 10, 100_000, 100_000), GREEN, &fb);
        tile.sub_tile(0, 0, 1, 1, RED);
        tile.commit(&mut fb);
        assert_eq!(fb.pixels(), &[0; 64], "{:?}", path);
    }
}

#[cfg(target_pointer_width = "64")]
#[test]
fn overflowing_sizes_are_refused() {
    let mut fb = Framebuffer::new(2, 2);
    fb.fill_rect(0, 0, 2, 2, RED);
    fb.resize(u32::MAX, u32::MAX);
    assert_eq!((fb.width(), fb.height()), (2, 2));
    assert_eq!(fb.pixel(1, 1), Some([0xff, 0, 0, 0xff]));

    let fb = Framebuffer::new(u32::MAX, u32::MAX);
    assert_eq!((fb.width(), fb.height()), (1, 1));
    assert_eq!(fb.pixels().len(), BYTES_PER_PIXEL);
}
