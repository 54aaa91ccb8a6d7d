//! Detection service wire contract and domain types.
//!
//! The service speaks positional JSON:
//! request  `{"image_data": [<u8>, ...]}` (flattened RGBA, w*h*4 integers)
//! response `{"data": [[label, [x, y, w, h], score], ...]}`
//!
//! There is no schema beyond this convention; the wire types below mirror
//! it exactly.

use serde::{Deserialize, Serialize};

/// Rectangle marking a detected object's location within a frame, in pixel
/// coordinates of the frame the service was shown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// One detection returned by the service.
#[derive(Clone, Debug)]
pub struct Detection {
    pub label: String,
    pub bbox: BoundingBox,
    pub score: f64,
}

/// Request body. `image_data` serializes as a plain JSON array of integers,
/// which for a modest frame is megabytes of JSON. Kept for compatibility
/// with the deployed service.
#[derive(Serialize)]
pub(crate) struct DetectRequest<'a> {
    pub image_data: &'a [u8],
}

#[derive(Deserialize)]
pub(crate) struct DetectResponse {
    pub data: Vec<WireDetection>,
}

/// One positional row: `[label, [x, y, w, h], score]`.
#[derive(Deserialize)]
pub(crate) struct WireDetection(pub String, pub [f64; 4], pub f64);

impl From<WireDetection> for Detection {
    fn from(wire: WireDetection) -> Self {
        let WireDetection(label, [x, y, w, h], score) = wire;
        Detection {
            label,
            bbox: BoundingBox { x, y, w, h },
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_pixel_bytes_as_integers() {
        let request = DetectRequest {
            image_data: &[0, 128, 255, 7],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"image_data":[0,128,255,7]}"#);
    }

    #[test]
    fn response_parses_positional_rows() {
        let json = r#"{"data": [["person", [10.0, 20.0, 30.0, 40.0], 0.92],
                                 ["cell phone", [1, 2, 3, 4], 0.5]]}"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        let detections: Vec<Detection> = response.data.into_iter().map(Detection::from).collect();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "person");
        assert_eq!(
            detections[0].bbox,
            BoundingBox {
                x: 10.0,
                y: 20.0,
                w: 30.0,
                h: 40.0
            }
        );
        assert!((detections[0].score - 0.92).abs() < 1e-9);
        assert_eq!(detections[1].label, "cell phone");
    }

    #[test]
    fn response_rejects_malformed_rows() {
        let json = r#"{"data": [["person", [10, 20, 30], 0.9]]}"#;
        assert!(serde_json::from_str::<DetectResponse>(json).is_err());
    }

    #[test]
    fn empty_data_parses_to_no_detections() {
        let response: DetectResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(response.data.is_empty());
    }
}
