// Swapchain - Window presentation
//
// Derives the swapchain parameters from what the surface advertises, creates
// the swapchain and replaces it on resize. The old swapchain is always passed
// into creation and only destroyed once its successor exists.

use super::api::{DeviceApi, InstanceApi};
use super::device::LogicalDeviceContext;
use super::error::{BootstrapError, Result};
use ash::vk;

/// Used when the surface offers no preference (or lists it explicitly).
pub const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::R8G8B8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

const REQUIRED_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
    vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw() | vk::ImageUsageFlags::TRANSFER_DST.as_raw(),
);

const COMPOSITE_ALPHA_PREFERENCE: [vk::CompositeAlphaFlagsKHR; 4] = [
    vk::CompositeAlphaFlagsKHR::OPAQUE,
    vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::INHERIT,
];

/// Snapshot of what a surface supports on one physical device. Goes stale on
/// resize, so it is re-queried before every (re)creation.
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    pub fn query<I: InstanceApi>(
        instance: &I,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        Ok(Self {
            capabilities: instance.surface_capabilities(physical_device, surface)?,
            formats: instance.surface_formats(physical_device, surface)?,
            present_modes: instance.surface_present_modes(physical_device, surface)?,
        })
    }
}

/// Concrete parameters a swapchain is created with.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainParams {
    pub image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
}

#[derive(Debug, Clone, Copy)]
pub enum Negotiation {
    Ready(SwapchainParams),
    /// Zero-sized extent, e.g. a minimized window. Nothing can be presented
    /// until the surface grows again.
    NotPresentable(vk::Extent2D),
}

/// Derive swapchain parameters from a surface snapshot.
///
/// `fallback_extent` is used when the surface lets the application pick the
/// size, clamped into the supported range.
pub fn negotiate(support: &SurfaceSupport, fallback_extent: vk::Extent2D) -> Result<Negotiation> {
    let caps = &support.capabilities;

    let extent = choose_extent(caps, fallback_extent);
    if extent.width == 0 || extent.height == 0 {
        return Ok(Negotiation::NotPresentable(extent));
    }

    Ok(Negotiation::Ready(SwapchainParams {
        image_count: choose_image_count(caps),
        format: choose_surface_format(&support.formats)?,
        extent,
        usage: choose_usage(caps)?,
        pre_transform: choose_pre_transform(caps),
        composite_alpha: choose_composite_alpha(caps)?,
        present_mode: choose_present_mode(&support.present_modes)?,
    }))
}

/// One more than the minimum, unless that exceeds a bounded maximum.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = caps.min_image_count + 1;
    if caps.max_image_count > 0 && image_count > caps.max_image_count {
        caps.max_image_count
    } else {
        image_count
    }
}

pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    // A single UNDEFINED entry means any format may be used
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Ok(DEFAULT_SURFACE_FORMAT);
        }
    }

    formats
        .iter()
        .find(|f| {
            f.format == DEFAULT_SURFACE_FORMAT.format && f.color_space == DEFAULT_SURFACE_FORMAT.color_space
        })
        .or_else(|| formats.first())
        .copied()
        .ok_or(BootstrapError::EmptyEnumeration { what: "surface format" })
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, fallback: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    // A zero-sized window stays zero-sized, never clamped up to the minimum
    if fallback.width == 0 || fallback.height == 0 {
        return fallback;
    }

    // The surface size will be determined by the swapchain extent
    vk::Extent2D {
        width: fallback
            .width
            .max(caps.min_image_extent.width)
            .min(caps.max_image_extent.width),
        height: fallback
            .height
            .max(caps.min_image_extent.height)
            .min(caps.max_image_extent.height),
    }
}

pub fn choose_usage(caps: &vk::SurfaceCapabilitiesKHR) -> Result<vk::ImageUsageFlags> {
    let supported = caps.supported_usage_flags;
    if supported.contains(REQUIRED_USAGE) {
        return Ok(REQUIRED_USAGE);
    }

    log::error!(
        "VK_IMAGE_USAGE_TRANSFER_DST image usage is not supported by the swap chain! Supported swap chain's image usages include: {:?}",
        supported
    );
    Err(BootstrapError::UnsupportedSwapchainUsage { supported })
}

pub fn choose_pre_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

pub fn choose_composite_alpha(caps: &vk::SurfaceCapabilitiesKHR) -> Result<vk::CompositeAlphaFlagsKHR> {
    COMPOSITE_ALPHA_PREFERENCE
        .into_iter()
        .find(|&alpha| caps.supported_composite_alpha.contains(alpha))
        .ok_or(BootstrapError::NoCompositeAlpha)
}

/// MAILBOX when available, otherwise FIFO. Order of the list does not matter.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> Result<vk::PresentModeKHR> {
    // MAILBOX: No vsync, no tearing, triple buffered
    // FIFO: Vsync, required of every driver but still checked
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO]
        .into_iter()
        .find(|mode| present_modes.contains(mode))
        .ok_or_else(|| {
            log::error!("FIFO present mode is not supported by the swap chain!");
            BootstrapError::NoUsablePresentMode
        })
}

/// A created swapchain. Its images belong to the driver and go away with it.
#[derive(Debug)]
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub params: SwapchainParams,
}

impl Swapchain {
    fn create<D: DeviceApi>(
        device: &D,
        surface: vk::SurfaceKHR,
        params: SwapchainParams,
        queue_families: &[u32],
        previous: Option<&Swapchain>,
    ) -> Result<Self> {
        let old = previous.map_or(vk::SwapchainKHR::null(), |swapchain| swapchain.handle);
        let handle = device.create_swapchain(surface, &params, queue_families, old)?;

        let images = match device.swapchain_images(handle) {
            Ok(images) => images,
            Err(err) => {
                device.destroy_swapchain(handle);
                return Err(err);
            }
        };

        log::info!(
            "Created swapchain with {} images ({}x{}, {:?})",
            images.len(),
            params.extent.width,
            params.extent.height,
            params.present_mode
        );

        Ok(Self { handle, images, params })
    }

    /// Make `next` current and destroy the swapchain it replaces.
    pub fn replace_with<D: DeviceApi>(&mut self, next: Swapchain, device: &D) {
        let retired = std::mem::replace(self, next);
        retired.destroy(device);
    }

    pub fn destroy<D: DeviceApi>(self, device: &D) {
        device.destroy_swapchain(self.handle);
    }
}

#[derive(Debug)]
pub enum SwapchainStatus {
    Ready(Swapchain),
    NotPresentable(vk::Extent2D),
}

pub struct SwapchainNegotiator {
    fallback_extent: vk::Extent2D,
}

impl SwapchainNegotiator {
    pub fn new(fallback_extent: vk::Extent2D) -> Self {
        Self { fallback_extent }
    }

    pub fn set_fallback_extent(&mut self, fallback_extent: vk::Extent2D) {
        self.fallback_extent = fallback_extent;
    }

    /// Wait for the device to go idle, re-query the surface and create a
    /// swapchain. `previous` is handed to the driver but left alive; the
    /// caller retires it only after a `Ready` result.
    pub fn negotiate<I: InstanceApi>(
        &self,
        instance: &I,
        context: &LogicalDeviceContext<I::Device>,
        surface: vk::SurfaceKHR,
        previous: Option<&Swapchain>,
    ) -> Result<SwapchainStatus> {
        // Never race in-flight work that still touches the old images
        context.wait_idle()?;

        let support = SurfaceSupport::query(instance, context.physical_device, surface)?;
        match negotiate(&support, self.fallback_extent)? {
            Negotiation::NotPresentable(extent) => {
                log::debug!(
                    "Surface not presentable ({}x{}), skipping swapchain creation",
                    extent.width,
                    extent.height
                );
                Ok(SwapchainStatus::NotPresentable(extent))
            }
            Negotiation::Ready(params) => {
                log::debug!("Negotiated swapchain: {:?}", params);
                Swapchain::create(
                    &context.device,
                    surface,
                    params,
                    &context.queue_families(),
                    previous,
                )
                .map(SwapchainStatus::Ready)
            }
        }
    }
}
