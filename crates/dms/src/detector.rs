//! Eye detection seam and detector input preparation

use camera_capture::frame::VideoFrame;
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Detected eye region in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl EyeRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Parameters handed to the detector on every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: Option<(u32, u32)>,
}

/// Eye detector collaborator.
///
/// Receives the grayscale, histogram-equalized frame and returns every eye
/// region it finds. Results are trusted as-is.
pub trait EyeDetector: Send {
    fn detect(
        &mut self,
        input: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<EyeRegion>, DmsError>;
}

impl<D: EyeDetector + ?Sized> EyeDetector for Box<D> {
    fn detect(
        &mut self,
        input: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<EyeRegion>, DmsError> {
        (**self).detect(input, params)
    }
}

/// Detector backed by a closure
pub struct FnDetector<F>(F);

/// Build a detector from a closure
pub fn from_fn<F>(f: F) -> FnDetector<F>
where
    F: FnMut(&GrayImage, &DetectionParams) -> Result<Vec<EyeRegion>, DmsError> + Send,
{
    FnDetector(f)
}

impl<F> EyeDetector for FnDetector<F>
where
    F: FnMut(&GrayImage, &DetectionParams) -> Result<Vec<EyeRegion>, DmsError> + Send,
{
    fn detect(
        &mut self,
        input: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<EyeRegion>, DmsError> {
        (self.0)(input, params)
    }
}

/// Grayscale + histogram equalization, the input every detector expects
pub fn prepare_input(frame: &VideoFrame) -> GrayImage {
    let gray = frame.to_grayscale();
    imageproc::contrast::equalize_histogram(&gray)
}

#[cfg(feature = "opencv")]
pub use cascade::CascadeEyeDetector;

#[cfg(feature = "opencv")]
mod cascade {
    use std::path::Path;

    use image::GrayImage;
    use opencv::core::{Mat, Rect, Scalar, Size, Vector, CV_8UC1};
    use opencv::objdetect;
    use opencv::prelude::*;
    use tracing::{error, info};

    use super::{DetectionParams, EyeDetector, EyeRegion};
    use crate::DmsError;

    /// OpenCV Haar cascade eye detector
    pub struct CascadeEyeDetector {
        classifier: objdetect::CascadeClassifier,
    }

    impl CascadeEyeDetector {
        /// Load the cascade model file
        pub fn load(path: &str) -> Result<Self, DmsError> {
            info!("Loading eye cascade from {}", path);
            if !Path::new(path).is_file() {
                error!("Eye cascade not found: {}", path);
                return Err(DmsError::ModelLoad(format!("{} not found", path)));
            }

            let classifier = objdetect::CascadeClassifier::new(path)
                .map_err(|e| DmsError::ModelLoad(e.to_string()))?;
            if classifier
                .empty()
                .map_err(|e| DmsError::ModelLoad(e.to_string()))?
            {
                return Err(DmsError::ModelLoad(format!("{} holds no cascade", path)));
            }

            Ok(Self { classifier })
        }
    }

    impl EyeDetector for CascadeEyeDetector {
        fn detect(
            &mut self,
            input: &GrayImage,
            params: &DetectionParams,
        ) -> Result<Vec<EyeRegion>, DmsError> {
            let (width, height) = input.dimensions();
            if width == 0 || height == 0 {
                return Ok(Vec::new());
            }

            let detection = |e: opencv::Error| DmsError::Detection(e.to_string());
            let mut mat = Mat::new_rows_cols_with_default(
                height as i32,
                width as i32,
                CV_8UC1,
                Scalar::all(0.0),
            )
            .map_err(detection)?;
            mat.data_bytes_mut()
                .map_err(detection)?
                .copy_from_slice(input.as_raw());

            let min_size = params
                .min_size
                .map(|(w, h)| Size::new(w as i32, h as i32))
                .unwrap_or_default();

            let mut eyes = Vector::<Rect>::new();
            self.classifier
                .detect_multi_scale(
                    &mat,
                    &mut eyes,
                    params.scale_factor,
                    params.min_neighbors,
                    0,
                    min_size,
                    Size::default(),
                )
                .map_err(detection)?;

            Ok(eyes
                .iter()
                .map(|r| EyeRegion {
                    x: r.x,
                    y: r.y,
                    width: r.width.max(0) as u32,
                    height: r.height.max(0) as u32,
                })
                .collect())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_load_missing_file_is_model_load_error() {
            let result = CascadeEyeDetector::load("/nonexistent/haarcascade_eye.xml");
            assert!(matches!(result, Err(DmsError::ModelLoad(_))));
        }

        #[test]
        fn test_load_garbage_xml_is_model_load_error() {
            let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
            file.write_all(b"<opencv_storage><not_a_cascade/>").unwrap();
            file.flush().unwrap();

            let path = file.path().to_str().unwrap();
            let result = CascadeEyeDetector::load(path);
            assert!(matches!(result, Err(DmsError::ModelLoad(_))));
        }
    }
}
