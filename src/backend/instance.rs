// Vulkan Instance - process-wide API handle
//
// Responsibilities:
// - Load the Vulkan library and verify global entry points
// - Verify required instance extensions before creating the instance
// - Optional validation layer + debug messenger (instance scope only)
// - Instance level queries used by device selection and swapchain negotiation

use super::api::InstanceApi;
use super::device::LogicalDevice;
use super::enumerate::enumerate;
use super::error::{BootstrapError, Result};
use super::loader::{self, Scope};
use ash::extensions::{ext::DebugUtils, khr::Surface};
use ash::{vk, Entry};
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, CStr, CString};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Owns the instance; destroyed exactly once on drop.
pub struct InstanceContext {
    pub(crate) entry: Entry,
    pub(crate) instance: ash::Instance,
    surface_loader: Surface,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceContext {
    /// Create the instance
    ///
    /// # Arguments
    /// * `app_name` - Application name reported to the driver
    /// * `display_handle` - Decides which platform surface extension is required
    /// * `enable_validation` - Enable Vulkan validation layers (debug only)
    pub fn new(app_name: &str, display_handle: RawDisplayHandle, enable_validation: bool) -> Result<Self> {
        log::info!("Creating Vulkan instance: {}", app_name);

        // Step 1: Load Vulkan library (exported entry point)
        let entry = unsafe { Entry::load() }.map_err(|err| match err {
            ash::LoadingError::MissingEntryPoint(_) => BootstrapError::MissingFunction {
                scope: Scope::Export,
                names: loader::EXPORTED_FUNCTIONS
                    .iter()
                    .map(|name| name.to_string_lossy().into_owned())
                    .collect(),
            },
            other => BootstrapError::LibraryLoad(other.to_string()),
        })?;
        log::info!("Vulkan library loaded");

        // Step 2: Global level entry points
        loader::verify(Scope::Global, loader::GLOBAL_FUNCTIONS, |name| unsafe {
            entry.get_instance_proc_addr(vk::Instance::null(), name.as_ptr())
        })?;

        // Step 3: Required extensions must be available before creation
        let mut extensions: Vec<*const c_char> = ash_window::enumerate_required_extensions(display_handle)
            .map_err(BootstrapError::vulkan("vkEnumerateInstanceExtensionProperties"))?
            .to_vec();
        if enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
        }
        Self::check_extensions(&entry, &extensions)?;

        // Step 4: Create instance
        let instance = Self::create_instance(&entry, app_name, &extensions, enable_validation)?;

        // Step 5: Instance level entry points
        if let Err(err) = loader::verify(Scope::Instance, loader::INSTANCE_FUNCTIONS, |name| unsafe {
            entry.get_instance_proc_addr(instance.handle(), name.as_ptr())
        }) {
            unsafe { instance.destroy_instance(None) };
            return Err(err);
        }

        // Step 6: Debug messenger if validation enabled
        let debug_utils = if enable_validation {
            match Self::setup_debug_messenger(&entry, &instance) {
                Ok(debug_utils) => Some(debug_utils),
                Err(err) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(err);
                }
            }
        } else {
            None
        };

        let surface_loader = Surface::new(&entry, &instance);
        log::info!("Vulkan instance created");

        Ok(Self {
            entry,
            instance,
            surface_loader,
            debug_utils,
        })
    }

    fn check_extensions(entry: &Entry, required: &[*const c_char]) -> Result<()> {
        let enumerate_fn = entry.fp_v1_0().enumerate_instance_extension_properties;
        let available = unsafe {
            enumerate("instance extension", |count, out| {
                enumerate_fn(std::ptr::null(), count, out)
            })
        }?;

        for &name in required {
            let name = unsafe { CStr::from_ptr(name) };
            if !contains_extension(&available, name) {
                log::error!("Could not find instance extension named \"{}\"!", name.to_string_lossy());
                return Err(BootstrapError::MissingInstanceExtension(name.to_string_lossy().into_owned()));
            }
        }

        Ok(())
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        extensions: &[*const c_char],
        enable_validation: bool,
    ) -> Result<ash::Instance> {
        let app_name_cstr =
            CString::new(app_name).unwrap_or_else(|_| CString::from(c"gfx-bootstrap"));

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let layer_names = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(extensions)
            .enabled_layer_names(&layer_names);

        unsafe { entry.create_instance(&create_info, None) }.map_err(|err| {
            log::error!("Could not create Vulkan instance: {}", err);
            BootstrapError::InstanceCreationFailed(err)
        })
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(BootstrapError::vulkan("vkCreateDebugUtilsMessengerEXT"))?;

        Ok((debug_utils, messenger))
    }
}

pub(crate) fn contains_extension(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available
        .iter()
        .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == name)
}

impl InstanceApi for InstanceContext {
    type Device = LogicalDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        let enumerate_fn = self.instance.fp_v1_0().enumerate_physical_devices;
        let handle = self.instance.handle();
        unsafe { enumerate("physical device", |count, out| enumerate_fn(handle, count, out)) }
    }

    fn physical_device_properties(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        unsafe { self.instance.get_physical_device_properties(physical_device) }
    }

    fn physical_device_features(&self, physical_device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        unsafe { self.instance.get_physical_device_features(physical_device) }
    }

    fn queue_family_properties(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<vk::QueueFamilyProperties>> {
        let query_fn = self.instance.fp_v1_0().get_physical_device_queue_family_properties;
        unsafe {
            enumerate("queue family", |count, out| {
                query_fn(physical_device, count, out);
                vk::Result::SUCCESS
            })
        }
    }

    fn device_extension_properties(&self, physical_device: vk::PhysicalDevice) -> Result<Vec<vk::ExtensionProperties>> {
        let enumerate_fn = self.instance.fp_v1_0().enumerate_device_extension_properties;
        unsafe {
            enumerate("device extension", |count, out| {
                enumerate_fn(physical_device, std::ptr::null(), count, out)
            })
        }
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family, surface)
        }
        .map_err(BootstrapError::vulkan("vkGetPhysicalDeviceSurfaceSupportKHR"))
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
        .map_err(BootstrapError::vulkan("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        let enumerate_fn = self.surface_loader.fp().get_physical_device_surface_formats_khr;
        unsafe {
            enumerate("surface format", |count, out| {
                enumerate_fn(physical_device, surface, count, out)
            })
        }
    }

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>> {
        let enumerate_fn = self.surface_loader.fp().get_physical_device_surface_present_modes_khr;
        unsafe {
            enumerate("present mode", |count, out| {
                enumerate_fn(physical_device, surface, count, out)
            })
        }
    }

    fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_families: &[u32],
        extensions: &[&CStr],
    ) -> Result<LogicalDevice> {
        LogicalDevice::new(&self.instance, physical_device, queue_families, extensions)
    }

    fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        unsafe { self.surface_loader.destroy_surface(surface, None) };
    }
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");

        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
