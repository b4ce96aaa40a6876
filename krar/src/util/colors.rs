use owo_colors::Rgb;

pub const FG1_COLOR: (u8, u8, u8) = (86, 156, 214);
pub const FG2_COLOR: (u8, u8, u8) = (97, 175, 113);
pub const WARN_COLOR: (u8, u8, u8) = (212, 163, 49);
pub const ERR_COLOR: (u8, u8, u8) = (212, 49, 73);

pub const FG1: Rgb = Rgb(FG1_COLOR.0, FG1_COLOR.1, FG1_COLOR.2);
pub const FG2: Rgb = Rgb(FG2_COLOR.0, FG2_COLOR.1, FG2_COLOR.2);
pub const WARN: Rgb = Rgb(WARN_COLOR.0, WARN_COLOR.1, WARN_COLOR.2);
pub const ERR: Rgb = Rgb(ERR_COLOR.0, ERR_COLOR.1, ERR_COLOR.2);
