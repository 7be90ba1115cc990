// src/services/image_processor.rs
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat};
use uuid::Uuid;

use crate::errors::TravelAgentError;
use crate::models::UploadedImage;

const MAX_INPUT_DIMENSION: u32 = 4096;

pub struct ImageProcessor {
    max_dimension: u32,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Decodes the upload and checks its dimensions. Returns the image with
    /// the format sniffed from its bytes.
    pub fn decode(&self, data: &[u8]) -> Result<(DynamicImage, ImgFormat), TravelAgentError> {
        let format = image::guess_format(data)
            .map_err(|e| TravelAgentError::ImageProcessing(format!("Invalid image format: {}", e)))?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| TravelAgentError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();

        if width > MAX_INPUT_DIMENSION || height > MAX_INPUT_DIMENSION {
            return Err(TravelAgentError::ImageProcessing(format!(
                "Image dimensions exceed {0}x{0}",
                MAX_INPUT_DIMENSION
            )));
        }

        Ok((img, format))
    }

    /// Downscales `img` to fit `max_dimension`. Returns the bytes and the
    /// format they are encoded in; images already small enough pass through
    /// as the original `data`.
    pub fn resize_if_needed(
        &self,
        data: &[u8],
        img: &DynamicImage,
        format: ImgFormat,
    ) -> Result<(Vec<u8>, ImgFormat), TravelAgentError> {
        let (width, height) = img.dimensions();
        let max_size = self.max_dimension;

        if width <= max_size && height <= max_size {
            return Ok((data.to_vec(), format));
        }

        let ratio = (max_size as f32 / width.max(height) as f32).min(1.0);
        let new_width = ((width as f32 * ratio) as u32).max(1);
        let new_height = ((height as f32 * ratio) as u32).max(1);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        // Photos stay JPEG; anything else is re-encoded losslessly.
        let out_format = if format == ImgFormat::Jpeg {
            ImgFormat::Jpeg
        } else {
            ImgFormat::Png
        };
        let resized = if out_format == ImgFormat::Jpeg {
            DynamicImage::ImageRgb8(resized.to_rgb8())
        } else {
            resized
        };

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), out_format)
            .map_err(|e| {
                TravelAgentError::ImageProcessing(format!("Failed to encode resized image: {}", e))
            })?;

        Ok((output, out_format))
    }

    /// Validates, downsizes and encodes one uploaded file. The MIME type is
    /// sniffed from the bytes rather than taken from the client.
    pub fn prepare_upload(
        &self,
        filename: String,
        data: &[u8],
    ) -> Result<UploadedImage, TravelAgentError> {
        let (img, format) = self.decode(data)?;
        let (processed, format) = self.resize_if_needed(data, &img, format)?;
        let mime_type = format.to_mime_type().to_string();

        let base64 = general_purpose::STANDARD.encode(&processed);
        let preview_url = format!("data:{};base64,{}", mime_type, base64);

        Ok(UploadedImage {
            id: Uuid::new_v4(),
            filename,
            mime_type,
            size: processed.len(),
            base64,
            preview_url,
            uploaded_at: chrono::Utc::now(),
        })
    }
}
