use vkms_config::{PlaneType, VkmsConfig};

use crate::error::Result;
use crate::options::DeviceOptions;

/// Overlay planes added when [`DeviceOptions::enable_overlay`] is set.
pub const NUM_OVERLAY_PLANES: usize = 8;

/// Graph of the device created at startup: one CRTC driving one encoder, a primary plane and,
/// depending on `options`, overlay planes, a cursor plane and writeback.
pub fn default_config(options: &DeviceOptions) -> Result<VkmsConfig> {
    let mut config = VkmsConfig::new();
    config.set_writeback(options.enable_writeback);

    let crtc = config.create_crtc();
    if let Some(c) = config.crtc_mut(crtc) {
        c.set_name("Main CRTC");
        c.set_writeback(options.enable_writeback);
    }

    let encoder = config.create_encoder();
    if let Some(e) = config.encoder_mut(encoder) {
        e.set_name("Main Encoder");
    }
    config.attach_encoder_to_crtc(encoder, crtc)?;

    let mut planes = vec![(PlaneType::Primary, "primary".to_string())];
    if options.enable_overlay {
        planes.extend((0..NUM_OVERLAY_PLANES).map(|i| (PlaneType::Overlay, format!("plane-{i}"))));
    }
    if options.enable_cursor {
        planes.push((PlaneType::Cursor, "cursor".to_string()));
    }
    for (plane_type, name) in planes {
        let plane = config.create_plane();
        if let Some(p) = config.plane_mut(plane) {
            p.set_plane_type(plane_type);
            p.set_name(name);
        }
        config.attach_plane_to_crtc(plane, crtc)?;
    }

    tracing::debug!(
        planes = config.plane_count(),
        writeback = options.enable_writeback,
        "built default configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_names(config: &VkmsConfig) -> Vec<(PlaneType, String)> {
        config
            .planes()
            .map(|p| (p.plane_type(), p.name().unwrap_or_default().to_string()))
            .collect()
    }

    #[test]
    fn defaults_have_primary_and_cursor() {
        let config = default_config(&DeviceOptions::default()).unwrap();
        assert!(config.is_valid());
        assert!(config.writeback());
        assert_eq!(
            plane_names(&config),
            vec![
                (PlaneType::Primary, "primary".to_string()),
                (PlaneType::Cursor, "cursor".to_string()),
            ]
        );
        let crtc = config.crtcs().next().unwrap();
        assert_eq!(crtc.name(), Some("Main CRTC"));
        assert!(crtc.writeback());
        assert_eq!(crtc.possible_planes().len(), 2);
        assert_eq!(
            config.encoders().next().unwrap().name(),
            Some("Main Encoder")
        );
    }

    #[test]
    fn overlays_and_no_cursor() {
        let options = DeviceOptions {
            enable_cursor: false,
            enable_writeback: false,
            enable_overlay: true,
        };
        let config = default_config(&options).unwrap();
        assert!(config.is_valid());
        assert!(!config.writeback());
        assert_eq!(config.plane_count(), 1 + NUM_OVERLAY_PLANES);
        let names = plane_names(&config);
        assert_eq!(names[1], (PlaneType::Overlay, "plane-0".to_string()));
        assert_eq!(names[8], (PlaneType::Overlay, "plane-7".to_string()));
        assert!(names.iter().all(|(t, _)| *t != PlaneType::Cursor));
    }
}
