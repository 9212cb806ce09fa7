pub mod entries;
pub mod rounds;
pub mod sticker_usages;
pub mod stickers;
