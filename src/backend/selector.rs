// Physical device selection
//
// Every candidate gets a score against the target surface. Zero means
// disqualified, not "worst": a device scoring 0 is never returned.

use super::api::InstanceApi;
use super::error::{BootstrapError, Result};
use super::instance::contains_extension;
use super::queue::QueueFamilyIndices;
use ash::extensions::khr;
use ash::vk;
use std::ffi::{CStr, CString};

const DISCRETE_GPU_BONUS: u64 = 1000;

pub struct DeviceSelector {
    required_extensions: Vec<CString>,
    require_geometry_shader: bool,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::new(Vec::new(), true)
    }
}

impl DeviceSelector {
    /// `extra_extensions` are required on top of `VK_KHR_swapchain`.
    pub fn new(extra_extensions: Vec<CString>, require_geometry_shader: bool) -> Self {
        let mut required_extensions = vec![khr::Swapchain::name().to_owned()];
        for ext in extra_extensions {
            if !required_extensions.contains(&ext) {
                required_extensions.push(ext);
            }
        }

        Self {
            required_extensions,
            require_geometry_shader,
        }
    }

    pub fn required_extensions(&self) -> Vec<&CStr> {
        self.required_extensions.iter().map(CString::as_c_str).collect()
    }

    /// All physical devices, with each name logged.
    pub fn enumerate_candidates<I: InstanceApi>(&self, instance: &I) -> Result<Vec<vk::PhysicalDevice>> {
        let devices = match instance.enumerate_physical_devices() {
            Ok(devices) if !devices.is_empty() => devices,
            Ok(_) | Err(BootstrapError::EmptyEnumeration { .. }) => {
                log::error!("failed to find GPUs with Vulkan support!");
                return Err(BootstrapError::NoDevicesFound);
            }
            Err(err) => return Err(err),
        };

        for &device in &devices {
            let props = instance.physical_device_properties(device);
            log::info!("Device name: {}", device_name(&props));
        }

        Ok(devices)
    }

    /// Candidate with the highest score; ties go to the first one seen.
    pub fn select_best<I: InstanceApi>(
        &self,
        instance: &I,
        candidates: &[vk::PhysicalDevice],
        surface: vk::SurfaceKHR,
    ) -> Result<vk::PhysicalDevice> {
        let mut best: Option<(u64, vk::PhysicalDevice)> = None;

        for &device in candidates {
            let score = self.score(instance, device, surface).unwrap_or_else(|err| {
                let props = instance.physical_device_properties(device);
                log::warn!("Skipping physical device (`{}`): {}", device_name(&props), err);
                0
            });
            log::debug!("Physical device {:?} scored {}", device, score);

            if score > best.map_or(0, |(best_score, _)| best_score) {
                best = Some((score, device));
            }
        }

        match best {
            Some((_, device)) => {
                let props = instance.physical_device_properties(device);
                log::info!("Selected GPU: {}", device_name(&props));
                Ok(device)
            }
            None => {
                log::error!("Failed to find a suitable GPU!");
                Err(BootstrapError::NoSuitableDevice)
            }
        }
    }

    pub fn score<I: InstanceApi>(
        &self,
        instance: &I,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<u64> {
        let features = instance.physical_device_features(device);
        if self.require_geometry_shader && features.geometry_shader != vk::TRUE {
            return Ok(0);
        }

        if !QueueFamilyIndices::find(instance, device, Some(surface))?.is_complete() {
            return Ok(0);
        }

        if first_missing_extension(instance, device, &self.required_extensions())?.is_some() {
            return Ok(0);
        }

        let props = instance.physical_device_properties(device);
        let mut score = 0;

        // Discrete GPUs have a significant performance advantage
        if props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += DISCRETE_GPU_BONUS;
        }
        // Maximum possible size of textures affects graphics quality
        score += u64::from(props.limits.max_image_dimension2_d);

        Ok(score)
    }
}

/// Name of the first extension in `required` the device does not offer.
pub fn first_missing_extension<I: InstanceApi>(
    instance: &I,
    device: vk::PhysicalDevice,
    required: &[&CStr],
) -> Result<Option<String>> {
    if required.is_empty() {
        return Ok(None);
    }

    let available = instance.device_extension_properties(device)?;
    Ok(required
        .iter()
        .find(|name| !contains_extension(&available, name))
        .map(|name| name.to_string_lossy().into_owned()))
}

pub fn device_name(props: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
