use aidlink_client::{AuxFlags, ImageDescriptor, Transmitter};
use tracing::info;

use crate::cmd::DemoArgs;
use crate::exit::{transmit_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

/// One synthesized test image.
pub struct DemoImage {
    pub width: u32,
    pub height: u32,
    pub format: &'static str,
    pub name: &'static str,
    pub notes: &'static str,
    pub payload: Vec<u8>,
}

const IMAGE_SIZES: [u32; 4] = [256, 1024, 512, 2048];

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut transmitter = args.connect.transmitter()?;
    let selected: Vec<usize> = match args.only {
        Some(n) => vec![usize::from(n)],
        None => (1..=IMAGE_SIZES.len()).collect(),
    };

    for index in selected {
        let image = demo_image(index, IMAGE_SIZES[index - 1]);
        apply_adjustments(&mut transmitter, index);

        info!(index, name = image.name, bytes = image.payload.len(), "sending demo image");
        let desc = ImageDescriptor::new(image.width, image.height, image.format, &image.payload)
            .with_name(image.name)
            .with_notes(image.notes);
        let report = transmitter
            .send(&desc)
            .map_err(|err| transmit_error(&format!("demo image {index} failed"), err))?;
        print_report(image.name, &report, format);
    }

    Ok(SUCCESS)
}

/// Channel adjustments in effect for demo image `index`.
///
/// Adjustments accumulate across the sequence, so image 4 still carries the
/// manual gain and bias set for image 3.
fn apply_adjustments(transmitter: &mut Transmitter, index: usize) {
    if index >= 3 {
        transmitter.set_bias(0, 0.0);
        transmitter.set_gain(0, 0.5);
        transmitter.set_bias(1, 0.0);
        transmitter.set_gain(1, 0.5);
        transmitter.set_bias(2, 0.1);
        transmitter.set_gain(2, 4.0);
    }
    if index >= 4 {
        transmitter.set_flags(AuxFlags::AUTO_GAIN_BIAS);
    }
}

/// Build demo image `index` (1-4) with `size` x `size` pixels.
pub fn demo_image(index: usize, size: u32) -> DemoImage {
    match index {
        1 => DemoImage {
            width: size,
            height: size,
            format: "R8G8B8",
            name: "My image 1",
            notes: "Simple 256x256 RGB 8-bit unsigned.",
            payload: rgb8_gradient(size),
        },
        2 => DemoImage {
            width: size,
            height: size,
            format: "f R32 G32 B32 A32",
            name: "My image 2",
            notes: "Simple 1024x1024 RGBA float",
            payload: pixels32(size, |x, y, s| {
                [x / s, y / s, (x + y) / (2.0 * s), 0.5 * x / s + 0.5].map(f32::to_le_bytes)
            }),
        },
        3 => DemoImage {
            width: size,
            height: size,
            format: "f G10 G22 R30 R2 B10 B22 A32",
            name: "My image 3",
            notes: "512x512 RGBA float with manual scaling",
            payload: pixels32(size, |x, y, s| {
                [x / s * 2.0, x / s / 2.0, (x + y) / (2.0 * s) / 4.0, 0.5 * x / s + 0.5]
                    .map(f32::to_le_bytes)
            }),
        },
        _ => DemoImage {
            width: size,
            height: size,
            format: "fR32uG32fA32iB32",
            name: "My image 4",
            notes: "2048x2048 RGBA float/uint/float/int with auto scaling",
            payload: pixels32(size, |x, y, s| {
                [
                    (x / s * 2.0).to_le_bytes(),
                    (y as u32).to_le_bytes(),
                    ((x + y) / (2.0 * s) / 4.0).to_le_bytes(),
                    ((0.5 * x) as i32).to_le_bytes(),
                ]
            }),
        },
    }
}

fn rgb8_gradient(size: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity((size * size * 3) as usize);
    for y in 0..size {
        for x in 0..size {
            buf.extend_from_slice(&[x as u8, y as u8, (x + y) as u8]);
        }
    }
    buf
}

/// Four 32-bit channels per pixel, row-major. `pixel` gets x, y and size as floats.
fn pixels32(size: u32, pixel: impl Fn(f32, f32, f32) -> [[u8; 4]; 4]) -> Vec<u8> {
    let s = size as f32;
    let mut buf = Vec::with_capacity(size as usize * size as usize * 16);
    for y in 0..size {
        for x in 0..size {
            for channel in pixel(x as f32, y as f32, s) {
                buf.extend_from_slice(&channel);
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_at(payload: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(payload[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn rgb_gradient_layout() {
        let image = demo_image(1, 4);
        assert_eq!(image.payload.len(), 4 * 4 * 3);
        // pixel (x=3, y=2)
        let at = 3 * (2 * 4 + 3);
        assert_eq!(&image.payload[at..at + 3], &[3, 2, 5]);
    }

    #[test]
    fn float_images_use_sixteen_bytes_per_pixel() {
        for index in 2..=4 {
            let image = demo_image(index, 8);
            assert_eq!(image.payload.len(), 8 * 8 * 16, "image {index}");
        }
    }

    #[test]
    fn float_image_channel_values() {
        let image = demo_image(2, 4);
        // pixel (x=2, y=1)
        let at = 16 * (4 + 2);
        assert_eq!(f32_at(&image.payload, at), 0.5);
        assert_eq!(f32_at(&image.payload, at + 4), 0.25);
        assert_eq!(f32_at(&image.payload, at + 8), 3.0 / 8.0);
        assert_eq!(f32_at(&image.payload, at + 12), 0.75);
    }

    #[test]
    fn mixed_image_encodes_integer_channels() {
        let image = demo_image(4, 4);
        // pixel (x=3, y=2)
        let at = 16 * (2 * 4 + 3);
        assert_eq!(u32::from_le_bytes(image.payload[at + 4..at + 8].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(image.payload[at + 12..at + 16].try_into().unwrap()), 1);
        assert_eq!(image.format, "fR32uG32fA32iB32");
    }

    #[test]
    fn adjustments_accumulate() {
        let mut tx = Transmitter::new();
        apply_adjustments(&mut tx, 2);
        assert_eq!(tx.adjustments().gains(), [1.0; 4]);

        apply_adjustments(&mut tx, 3);
        assert_eq!(tx.adjustments().gains(), [0.5, 0.5, 4.0, 1.0]);
        assert_eq!(tx.adjustments().biases(), [0.0, 0.0, 0.1, 0.0]);
        assert!(tx.adjustments().flags().is_empty());

        apply_adjustments(&mut tx, 4);
        assert_eq!(tx.adjustments().flags(), AuxFlags::AUTO_GAIN_BIAS);
    }
}
