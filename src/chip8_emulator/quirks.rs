use std::env;

/// Behaviour switches for instructions that CHIP-8 interpreters historically disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip8Quirks {
    /// 8xy6/8xyE shift Vy into Vx instead of shifting Vx in place.
    pub shift_uses_vy: bool,
    /// Fx55/Fx65 advance I past the last register transferred.
    pub load_store_increment_i: bool,
    /// Bnnn jumps to nnn + Vx (x = top nibble of nnn) instead of nnn + V0.
    pub jump_with_vx: bool,
    /// Sprite pixels past the right/bottom edge wrap around instead of being clipped.
    pub draw_wrap: bool,
}

pub const STANDARD_QUIRKS: Chip8Quirks = Chip8Quirks {
    shift_uses_vy: false,
    load_store_increment_i: true,
    jump_with_vx: false,
    draw_wrap: false,
};

pub const ORIGINAL_QUIRKS: Chip8Quirks = Chip8Quirks {
    shift_uses_vy: true,
    ..STANDARD_QUIRKS
};

pub const MODERN_QUIRKS: Chip8Quirks = Chip8Quirks {
    shift_uses_vy: false,
    load_store_increment_i: false,
    jump_with_vx: true,
    draw_wrap: true,
};

impl Default for Chip8Quirks {
    fn default() -> Self {
        STANDARD_QUIRKS
    }
}

pub fn load_quirks_profile(profile: &str) -> Result<Chip8Quirks, String> {
    match profile.trim().to_ascii_lowercase().as_str() {
        "standard" => Ok(STANDARD_QUIRKS),
        "original" => Ok(ORIGINAL_QUIRKS),
        "modern" => Ok(MODERN_QUIRKS),
        other => Err(format!(
            "invalid CHIP8_QUIRKS '{other}', expected one of: modern, original, standard"
        )),
    }
}

/// Resolves an optional profile name to its normalized name and switches. `None` is `standard`.
pub fn resolve_quirks_profile(profile: Option<&str>) -> Result<(String, Chip8Quirks), String> {
    let normalized = profile.unwrap_or("standard").trim().to_ascii_lowercase();
    let quirks = load_quirks_profile(&normalized)?;
    Ok((normalized, quirks))
}

pub fn load_quirks_profile_from_env() -> Result<(String, Chip8Quirks), String> {
    resolve_quirks_profile(env::var("CHIP8_QUIRKS").ok().as_deref())
}
