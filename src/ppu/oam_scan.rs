use super::constants::*;
use crate::memory_bus::MemoryBus;
use crate::memory_map;

/// A sprite selected during OAM scan, frozen for the rest of the scanline.
#[derive(Debug, Clone, Copy)]
pub(super) struct SpriteEntry {
    pub(super) oam_index: u8,
    pub(super) y_pos: u8, // OAM Y value (screen Y + 16)
    pub(super) x_pos: u8, // OAM X value (screen X + 8)
    pub(super) tile_index: u8,
    pub(super) palette_reg_value: u8,
    pub(super) x_flip: bool,
    pub(super) y_flip: bool,
    pub(super) bg_priority: bool, // true: BG/Win colors 1-3 win over this sprite
    pub(super) height: u8,
}

/// Scans all 40 OAM entries and selects up to [`MAX_SPRITES_PER_SCANLINE`] whose
/// vertical span intersects `ly`, in OAM order. The hardware's real scan keeps the
/// first ten matches it finds rather than the ten smallest X, so sort order here
/// only governs rendering priority, not which sprites got selected.
pub(super) fn scan_oam(memory_bus: &MemoryBus, ly: u8, lcdc: u8) -> Vec<SpriteEntry> {
    let sprite_height = if (lcdc & (1 << LCDC_OBJ_SIZE)) != 0 { 16 } else { 8 };
    let obp0 = memory_bus.read_byte(memory_map::OBP0_ADDR);
    let obp1 = memory_bus.read_byte(memory_map::OBP1_ADDR);

    let mut selected = Vec::with_capacity(MAX_SPRITES_PER_SCANLINE);
    for i in 0..40u16 {
        if selected.len() >= MAX_SPRITES_PER_SCANLINE {
            break;
        }
        let oam_addr = memory_map::OAM_START + i * 4;
        let sprite_y = memory_bus.read_byte(oam_addr);
        let sprite_x = memory_bus.read_byte(oam_addr + 1);

        let effective_y = sprite_y.wrapping_sub(16);
        let intersects = (ly.wrapping_sub(effective_y) as u16) < sprite_height as u16;
        if !intersects {
            continue;
        }

        let tile_index = memory_bus.read_byte(oam_addr + 2);
        let attributes = memory_bus.read_byte(oam_addr + 3);
        let palette_num = (attributes >> OAM_PALETTE_NUM_DMG) & 1;

        selected.push(SpriteEntry {
            oam_index: i as u8,
            y_pos: sprite_y,
            x_pos: sprite_x,
            tile_index,
            palette_reg_value: if palette_num == 0 { obp0 } else { obp1 },
            x_flip: (attributes & (1 << OAM_X_FLIP)) != 0,
            y_flip: (attributes & (1 << OAM_Y_FLIP)) != 0,
            bg_priority: (attributes & (1 << OAM_BG_WIN_PRIORITY)) != 0,
            height: sprite_height,
        });
    }
    selected
}

/// Returns the sprite's 0-3 color index at screen column `x`, along with its
/// background-priority and palette, for the first (X then OAM-index priority)
/// sprite in `sprites` that covers `x` with a non-transparent pixel.
pub(super) fn composite_sprite_pixel(
    sprites: &[SpriteEntry],
    ly: u8,
    x: u8,
    memory_bus: &MemoryBus,
) -> Option<(u8, u8, bool)> {
    let mut winner: Option<(u8, u8, bool, u8)> = None; // (color_idx, palette, bg_priority, x_pos)

    for sprite in sprites {
        let effective_x = sprite.x_pos.wrapping_sub(8);
        if x < effective_x || x >= effective_x.wrapping_add(8) {
            continue;
        }
        if let Some((_, _, _, best_x)) = winner {
            if sprite.x_pos >= best_x {
                continue;
            }
        }

        let col_in_tile = if sprite.x_flip {
            7 - (x - effective_x)
        } else {
            x - effective_x
        };
        let color_idx = sprite_tile_pixel_index(sprite, ly, col_in_tile, memory_bus);
        if color_idx == 0 {
            continue; // transparent, never participates
        }
        winner = Some((color_idx, sprite.palette_reg_value, sprite.bg_priority, sprite.x_pos));
    }

    winner.map(|(c, p, b, _)| (c, p, b))
}

fn sprite_tile_pixel_index(sprite: &SpriteEntry, ly: u8, col_in_tile: u8, memory_bus: &MemoryBus) -> u8 {
    let effective_y = sprite.y_pos.wrapping_sub(16);
    let mut row_in_sprite = ly.wrapping_sub(effective_y);
    if sprite.y_flip {
        row_in_sprite = (sprite.height - 1) - row_in_sprite;
    }

    let actual_tile_index = if sprite.height == 16 {
        if row_in_sprite < 8 {
            sprite.tile_index & 0xFE
        } else {
            sprite.tile_index | 0x01
        }
    } else {
        sprite.tile_index
    };
    let row_in_tile = row_in_sprite % 8;

    // Sprites always use the $8000-$8FFF tile data area.
    let tile_addr = memory_map::VRAM_START + (actual_tile_index as u16 * 16);
    let row_addr = tile_addr + row_in_tile as u16 * 2;

    super::render::tile_row_pixel_index(row_addr, col_in_tile, memory_bus)
}
