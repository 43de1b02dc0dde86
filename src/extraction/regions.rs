use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::layout::BoundingBox;

/// One cropped region, kept in memory and saved as `<name>.jpg`.
#[derive(Debug)]
pub struct RegionCrop {
    pub name: String,
    pub image: DynamicImage,
    pub path: PathBuf,
}

/// Crops `bbox` out of `image`, clipped to the image bounds.
///
/// A box that only partly overlaps the image is cropped to the overlap and
/// logged. A box with no overlap is a `RegionOutOfBounds` error.
pub fn crop_box(image: &DynamicImage, bbox: &BoundingBox) -> Result<DynamicImage, PipelineError> {
    let (w, h) = (image.width(), image.height());

    let x0 = bbox.bbox_x.min(w);
    let y0 = bbox.bbox_y.min(h);
    let rw = bbox.bbox_width.min(w - x0);
    let rh = bbox.bbox_height.min(h - y0);

    if rw == 0 || rh == 0 {
        return Err(PipelineError::RegionOutOfBounds {
            region: bbox.label_name.clone(),
            image_width: w,
            image_height: h,
        });
    }

    if rw < bbox.bbox_width || rh < bbox.bbox_height {
        crate::log(&format!(
            "Warning: region {} ({}x{} at {},{}) clipped to {}x{} on a {}x{} screenshot",
            bbox.label_name,
            bbox.bbox_width,
            bbox.bbox_height,
            bbox.bbox_x,
            bbox.bbox_y,
            rw,
            rh,
            w,
            h
        ));
    }

    Ok(image.crop_imm(x0, y0, rw, rh))
}

/// Crops every box in table order and saves each as `<label_name>.jpg` in
/// `dest_dir`, overwriting earlier crops.
pub fn extract_regions(
    image: &DynamicImage,
    boxes: &[BoundingBox],
    dest_dir: &Path,
) -> Result<Vec<RegionCrop>> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    let mut crops = Vec::with_capacity(boxes.len());
    for bbox in boxes {
        let crop = crop_box(image, bbox)?;
        let path = dest_dir.join(format!("{}.jpg", bbox.label_name));

        // JPEG has no alpha channel
        DynamicImage::ImageRgb8(crop.to_rgb8())
            .save(&path)
            .with_context(|| format!("Failed to save crop {}", path.display()))?;

        crops.push(RegionCrop {
            name: bbox.label_name.clone(),
            image: crop,
            path,
        });
    }

    Ok(crops)
}
