// Phase 4: png: 二値ラスタ -> 1bit PNG (可逆・最大圧縮)

use image::GrayImage;

use super::EncodeError;

/// 白黒(0/255)の輝度画像を1bitグレースケールPNGにエンコードする。
///
/// 輝度がしきい値以上の画素を1(白)、それ以外を0(黒)として
/// 行ごとにMSB先頭でパックする。
pub fn encode_bilevel_png(gray: &GrayImage) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = gray.dimensions();
    let packed = pack_bits(gray);

    let mut buf = Vec::new();
    {
        let mut encoder = ::png::Encoder::new(&mut buf, width, height);
        encoder.set_color(::png::ColorType::Grayscale);
        encoder.set_depth(::png::BitDepth::One);
        encoder.set_compression(::png::Compression::Best);
        encoder.set_adaptive_filter(::png::AdaptiveFilterType::Adaptive);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&packed)?;
        writer.finish()?;
    }
    Ok(buf)
}

/// 1行あたり `ceil(width / 8)` バイトにパックする。
pub fn pack_bits(gray: &GrayImage) -> Vec<u8> {
    let (width, height) = gray.dimensions();
    let row_bytes = (width as usize).div_ceil(8);
    let mut packed = vec![0u8; row_bytes * height as usize];

    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] >= crate::config::compression::MONOCHROME_THRESHOLD {
            let idx = y as usize * row_bytes + (x as usize / 8);
            packed[idx] |= 0x80 >> (x % 8);
        }
    }
    packed
}
