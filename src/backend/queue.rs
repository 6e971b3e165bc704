// Queue family resolution
//
// Indices are positions in the device's queue family list, which never changes
// for a given physical device. Recomputed for every (device, surface) pair.

use super::api::InstanceApi;
use super::error::{BootstrapError, Result};
use ash::vk;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// `(graphics, present)`, or an error naming what is missing.
    pub fn complete(&self) -> Result<(u32, u32)> {
        match (self.graphics, self.present) {
            (Some(graphics), Some(present)) => Ok((graphics, present)),
            (graphics, present) => Err(BootstrapError::IncompleteQueueFamilies { graphics, present }),
        }
    }

    /// Scan families in index order. The first graphics capable family and
    /// the first family that can present to `surface` are recorded; they need
    /// not be the same. Without a surface, presentation is never queried.
    pub fn find<I: InstanceApi>(
        instance: &I,
        physical_device: vk::PhysicalDevice,
        surface: Option<vk::SurfaceKHR>,
    ) -> Result<Self> {
        let families = instance.queue_family_properties(physical_device)?;
        let mut indices = Self::default();

        for (index, family) in (0u32..).zip(families.iter()) {
            if family.queue_count == 0 {
                continue;
            }

            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }

            if let Some(surface) = surface {
                if indices.present.is_none() && instance.surface_support(physical_device, index, surface)? {
                    indices.present = Some(index);
                }
                if indices.is_complete() {
                    break;
                }
            } else if indices.graphics.is_some() {
                break;
            }
        }

        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockFamily, MockGpu, MockInstance};

    fn surface() -> Option<vk::SurfaceKHR> {
        Some(MockInstance::surface())
    }

    #[test]
    fn graphics_and_present_may_come_from_different_families() {
        let instance = MockInstance::new(vec![MockGpu::discrete("GPU").with_families(vec![
            MockFamily::NONE,
            MockFamily::GRAPHICS,
            MockFamily::PRESENT,
        ])]);

        let indices = QueueFamilyIndices::find(&instance, instance.physical_device(0), surface()).unwrap();

        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(2));
        assert!(indices.is_complete());
    }

    #[test]
    fn first_capable_family_wins() {
        let instance = MockInstance::new(vec![MockGpu::discrete("GPU").with_families(vec![
            MockFamily::PRESENT,
            MockFamily::GRAPHICS,
            MockFamily::BOTH,
        ])]);

        let indices = QueueFamilyIndices::find(&instance, instance.physical_device(0), surface()).unwrap();

        assert_eq!(indices, QueueFamilyIndices { graphics: Some(1), present: Some(0) });
    }

    #[test]
    fn scanning_stops_once_both_are_found() {
        let instance = MockInstance::new(vec![MockGpu::discrete("GPU").with_families(vec![
            MockFamily::BOTH,
            MockFamily::BOTH,
            MockFamily::BOTH,
        ])]);

        QueueFamilyIndices::find(&instance, instance.physical_device(0), surface()).unwrap();

        assert_eq!(instance.surface_support_queries(), vec![0]);
    }

    #[test]
    fn no_surface_means_no_presentation_query() {
        let instance = MockInstance::new(vec![MockGpu::discrete("GPU").with_families(vec![
            MockFamily::PRESENT,
            MockFamily::GRAPHICS,
        ])]);

        let indices = QueueFamilyIndices::find(&instance, instance.physical_device(0), None).unwrap();

        assert_eq!(indices, QueueFamilyIndices { graphics: Some(1), present: None });
        assert!(!indices.is_complete());
        assert!(instance.surface_support_queries().is_empty());
    }

    #[test]
    fn families_without_queues_are_skipped() {
        let empty_graphics = MockFamily {
            queue_count: 0,
            ..MockFamily::BOTH
        };
        let instance = MockInstance::new(vec![MockGpu::discrete("GPU").with_families(vec![
            empty_graphics,
            MockFamily::BOTH,
        ])]);

        let indices = QueueFamilyIndices::find(&instance, instance.physical_device(0), surface()).unwrap();

        assert_eq!(indices, QueueFamilyIndices { graphics: Some(1), present: Some(1) });
    }

    #[test]
    fn complete_reports_missing_half() {
        let indices = QueueFamilyIndices { graphics: Some(0), present: None };
        assert!(matches!(
            indices.complete(),
            Err(BootstrapError::IncompleteQueueFamilies { graphics: Some(0), present: None })
        ));
    }
}
