// Logical Device - execution context on the selected GPU
//
// Responsibilities:
// - Logical device + queue creation (one queue per unique family)
// - Device level function table, verified before it is handed out
// - Queue retrieval and strict reverse-order teardown

use super::api::{DeviceApi, InstanceApi};
use super::enumerate::enumerate;
use super::error::{BootstrapError, Result};
use super::loader::{self, Scope};
use super::queue::QueueFamilyIndices;
use super::selector;
use super::swapchain::SwapchainParams;
use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;
use std::ffi::{c_char, CStr};

/// ash-backed logical device with its swapchain extension loader.
pub struct LogicalDevice {
    pub device: ash::Device,
    swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    pub(crate) fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        extensions: &[&CStr],
    ) -> Result<Self> {
        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

        // No optional features, no device layers
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(|err| {
            log::error!("failed to create logical device: {}", err);
            BootstrapError::DeviceCreationFailed(err)
        })?;

        let get_device_proc_addr = instance.fp_v1_0().get_device_proc_addr;
        if let Err(err) = loader::verify(Scope::Device, loader::DEVICE_FUNCTIONS, |name| unsafe {
            get_device_proc_addr(device.handle(), name.as_ptr())
        }) {
            // Never leave a partially functional device behind
            let destroy = unsafe { get_device_proc_addr(device.handle(), c"vkDestroyDevice".as_ptr()) };
            if destroy.is_some() {
                unsafe { device.destroy_device(None) };
            }
            return Err(err);
        }

        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            swapchain_loader,
        })
    }
}

impl DeviceApi for LogicalDevice {
    fn device_queue(&self, queue_family: u32, index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(queue_family, index) }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.map_err(BootstrapError::vulkan("vkDeviceWaitIdle"))
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        unsafe { self.device.create_semaphore(&semaphore_info, None) }
            .map_err(BootstrapError::vulkan("vkCreateSemaphore"))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        params: &SwapchainParams,
        queue_families: &[u32],
        old: vk::SwapchainKHR,
    ) -> Result<vk::SwapchainKHR> {
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(params.image_count)
            .image_format(params.format.format)
            .image_color_space(params.format.color_space)
            .image_extent(params.extent)
            .image_array_layers(1)
            .image_usage(params.usage)
            .pre_transform(params.pre_transform)
            .composite_alpha(params.composite_alpha)
            .present_mode(params.present_mode)
            .clipped(true)
            .old_swapchain(old);

        // Images are shared between graphics and present queues when they differ
        create_info = if queue_families.len() > 1 {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(queue_families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(BootstrapError::SwapchainCreationFailed)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        let enumerate_fn = self.swapchain_loader.fp().get_swapchain_images_khr;
        let device = self.device.handle();
        unsafe { enumerate("swapchain image", |count, out| enumerate_fn(device, swapchain, count, out)) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn destroy_device(&self) {
        unsafe { self.device.destroy_device(None) };
    }
}

/// A logical device plus the queues it was created with.
pub struct LogicalDeviceContext<D: DeviceApi> {
    pub device: D,
    pub physical_device: vk::PhysicalDevice,
    pub graphics_family: u32,
    pub present_family: u32,
    /// May be the same queue as `present_queue`.
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl<D: DeviceApi> LogicalDeviceContext<D> {
    /// Queue families a swapchain's images are shared between.
    pub fn queue_families(&self) -> Vec<u32> {
        unique_families(self.graphics_family, self.present_family)
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    /// Release the device. Everything created from it must already be gone.
    pub fn destroy(self) {
        self.device.destroy_device();
    }
}

fn unique_families(graphics: u32, present: u32) -> Vec<u32> {
    if graphics == present {
        vec![graphics]
    } else {
        vec![graphics, present]
    }
}

pub struct LogicalDeviceFactory;

impl LogicalDeviceFactory {
    pub fn create<I: InstanceApi>(
        instance: &I,
        physical_device: vk::PhysicalDevice,
        indices: QueueFamilyIndices,
        required_extensions: &[&CStr],
    ) -> Result<LogicalDeviceContext<I::Device>> {
        let (graphics_family, present_family) = indices.complete()?;

        if let Some(missing) = selector::first_missing_extension(instance, physical_device, required_extensions)? {
            return Err(BootstrapError::MissingDeviceExtension(missing));
        }

        let families = unique_families(graphics_family, present_family);
        let device = instance.create_device(physical_device, &families, required_extensions)?;

        let graphics_queue = device.device_queue(graphics_family, 0);
        let present_queue = device.device_queue(present_family, 0);

        log::info!(
            "Logical device created (graphics family {}, present family {}, {} queue(s))",
            graphics_family,
            present_family,
            families.len()
        );

        Ok(LogicalDeviceContext {
            device,
            physical_device,
            graphics_family,
            present_family,
            graphics_queue,
            present_queue,
        })
    }
}
